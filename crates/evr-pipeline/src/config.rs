//! Pipeline configuration.
//!
//! Constructed once at process start, immutable afterwards, and passed into
//! every stage invocation by reference. Feature toggles are resolved here
//! rather than consulted ad hoc inside validators.

use chrono::NaiveDate;

use evr_model::{ReportingPeriod, Submission};
use evr_schema::SchemaSource;
use evr_validate::FeatureConfig;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Which definition source backs the schema registry this process runs
    /// against. Recorded so stage logs and reports can name it.
    pub schema_source: SchemaSource,
    pub features: FeatureConfig,
    /// Processing date; the eligibility fallback when a submission's
    /// reporting window does not resolve to a calendar date.
    pub as_of: NaiveDate,
}

impl PipelineConfig {
    pub fn new(schema_source: SchemaSource, features: FeatureConfig, as_of: NaiveDate) -> Self {
        Self {
            schema_source,
            features,
            as_of,
        }
    }

    /// The date business rules compute eligibility against: the end of the
    /// submission's reporting window, or the processing date when the
    /// category has no window.
    pub fn reference_date(&self, submission: &Submission) -> NaiveDate {
        period_end(&submission.period).unwrap_or(self.as_of)
    }
}

fn period_end(period: &ReportingPeriod) -> Option<NaiveDate> {
    match period.quarter {
        Some(quarter) => {
            let (month, day) = match quarter {
                1 => (3, 31),
                2 => (6, 30),
                3 => (9, 30),
                _ => (12, 31),
            };
            NaiveDate::from_ymd_opt(period.year, month, day)
        }
        None => NaiveDate::from_ymd_opt(period.year, 12, 31),
    }
}
