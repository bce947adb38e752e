use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ids::{CategoryId, OrganizationId, SubmissionId};
use crate::status::SubmissionStatus;
use crate::{ModelError, Result};

/// Submission cadence for a reporting category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    /// Submitted once, typically registry data (stations, ports).
    OneTime,
    /// Submitted once per reporting year.
    Annual,
    /// Submitted once per reporting quarter.
    Quarterly,
}

impl Cadence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cadence::OneTime => "one-time",
            Cadence::Annual => "annual",
            Cadence::Quarterly => "quarterly",
        }
    }

    /// Periodic cadences scope uniqueness checks to a reporting window.
    pub fn is_periodic(&self) -> bool {
        !matches!(self, Cadence::OneTime)
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Cadence {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "one-time" | "onetime" | "one_time" => Ok(Cadence::OneTime),
            "annual" => Ok(Cadence::Annual),
            "quarterly" => Ok(Cadence::Quarterly),
            other => Err(format!("unknown cadence: {other}")),
        }
    }
}

/// The reporting window a submission covers. Quarter is only present for
/// quarterly-cadence categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReportingPeriod {
    pub year: i32,
    pub quarter: Option<u8>,
}

impl ReportingPeriod {
    pub fn annual(year: i32) -> Self {
        Self {
            year,
            quarter: None,
        }
    }

    pub fn quarterly(year: i32, quarter: u8) -> Result<Self> {
        if !(1..=4).contains(&quarter) {
            return Err(ModelError::InvalidQuarter(quarter));
        }
        Ok(Self {
            year,
            quarter: Some(quarter),
        })
    }
}

impl fmt::Display for ReportingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.quarter {
            Some(q) => write!(f, "{}-Q{q}", self.year),
            None => write!(f, "{}", self.year),
        }
    }
}

/// Organizational tier of the submitting recipient.
///
/// A subordinate recipient's submissions require approval by its direct
/// recipient before becoming final; a direct recipient's own submissions
/// finalize on submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipientTier {
    Direct,
    Subordinate,
}

impl RecipientTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecipientTier::Direct => "direct",
            RecipientTier::Subordinate => "subordinate",
        }
    }
}

impl fmt::Display for RecipientTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One organization's bulk data transfer for one category and reporting
/// window, tracked through the status state machine.
///
/// Created at upload intake, mutated only by pipeline stages, never deleted
/// by this subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub category: CategoryId,
    pub organization: OrganizationId,
    pub parent_organization: OrganizationId,
    pub period: ReportingPeriod,
    pub tier: RecipientTier,
    pub status: SubmissionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub comments: Option<String>,
}

impl Submission {
    /// New submission at intake, before any pipeline stage has run.
    pub fn new(
        id: SubmissionId,
        category: CategoryId,
        organization: OrganizationId,
        parent_organization: OrganizationId,
        period: ReportingPeriod,
        tier: RecipientTier,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            category,
            organization,
            parent_organization,
            period,
            tier,
            status: SubmissionStatus::Processing,
            created_at: now,
            updated_at: now,
            comments: None,
        }
    }
}
