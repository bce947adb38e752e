//! Stage signals.
//!
//! Stages communicate through the delivery layer: each handler consumes one
//! inbound signal and, unless the idempotency guard made it a no-op, emits
//! one [`StageCompletion`] for the next stage or for notification
//! collaborators.

use serde::{Deserialize, Serialize};
use std::fmt;

use evr_model::{OrganizationId, SubmissionId, SubmissionStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Integrity,
    Validation,
    Submit,
    Approval,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Integrity => "integrity",
            Stage::Validation => "validation",
            Stage::Submit => "submit",
            Stage::Approval => "approval",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outbound stage-completion signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCompletion {
    pub stage: Stage,
    pub passed: bool,
    pub submission: SubmissionId,
    pub organization: OrganizationId,
    /// Display name resolved through the organization directory.
    pub organization_name: String,
    pub parent_organization: OrganizationId,
    pub status: SubmissionStatus,
}

/// What a stage invocation did. Redelivered signals whose target status was
/// already reached resolve to `NoOp` with no side effects and no downstream
/// signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Completed(StageCompletion),
    NoOp,
}

impl StageOutcome {
    pub fn completion(&self) -> Option<&StageCompletion> {
        match self {
            StageOutcome::Completed(completion) => Some(completion),
            StageOutcome::NoOp => None,
        }
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, StageOutcome::NoOp)
    }
}
