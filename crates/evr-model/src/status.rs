//! Submission status state machine.
//!
//! A submission moves through a fixed set of statuses:
//!
//! - `Processing -> {Draft | Pending | Error}`
//! - `Draft -> Submitted` (direct recipient) or `Draft -> Pending`
//!   (subordinate recipient)
//! - `Pending -> {Approved | Rejected}`
//! - any status `-> Error`
//!
//! Transitions never move backward except into `Error`. Stage handlers use
//! [`SubmissionStatus::at_or_past`] as the idempotency guard under
//! at-least-once signal delivery: a redelivered signal whose target has
//! already been reached is a no-op.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    /// Intake accepted, pipeline stages still running.
    Processing,
    /// Validated and persisted, awaiting an explicit submit action.
    Draft,
    /// Awaiting approval by the direct recipient.
    Pending,
    /// Final for a direct recipient's own submission.
    Submitted,
    /// Approved by the direct recipient.
    Approved,
    /// Rejected by the direct recipient.
    Rejected,
    /// One or more pipeline stages failed; see the error ledger.
    Error,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Processing => "processing",
            SubmissionStatus::Draft => "draft",
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Submitted => "submitted",
            SubmissionStatus::Approved => "approved",
            SubmissionStatus::Rejected => "rejected",
            SubmissionStatus::Error => "error",
        }
    }

    /// Terminal statuses accept no further transitions (other than the
    /// absorbing `Error`, which also accepts none).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SubmissionStatus::Submitted
                | SubmissionStatus::Approved
                | SubmissionStatus::Rejected
                | SubmissionStatus::Error
        )
    }

    /// Monotonic progress rank. Statuses with equal rank are alternative
    /// outcomes of the same stage, not reachable from one another.
    fn rank(&self) -> u8 {
        match self {
            SubmissionStatus::Processing => 0,
            SubmissionStatus::Draft => 1,
            SubmissionStatus::Pending => 2,
            SubmissionStatus::Submitted => 3,
            SubmissionStatus::Approved => 3,
            SubmissionStatus::Rejected => 3,
            SubmissionStatus::Error => 4,
        }
    }

    /// Returns true when `self` has already reached (or moved beyond) the
    /// target status. Used by stage handlers to turn redelivered signals
    /// into no-ops before any side effect.
    pub fn at_or_past(&self, target: SubmissionStatus) -> bool {
        if *self == target {
            return true;
        }
        self.rank() >= target.rank()
    }

    /// Legality table for forward transitions.
    pub fn can_transition(&self, to: SubmissionStatus) -> bool {
        if to == SubmissionStatus::Error {
            return *self != SubmissionStatus::Error;
        }
        matches!(
            (self, to),
            (
                SubmissionStatus::Processing,
                SubmissionStatus::Draft | SubmissionStatus::Pending
            ) | (
                SubmissionStatus::Draft,
                SubmissionStatus::Submitted | SubmissionStatus::Pending
            ) | (
                SubmissionStatus::Pending,
                SubmissionStatus::Approved | SubmissionStatus::Rejected
            )
        )
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "processing" => Ok(SubmissionStatus::Processing),
            "draft" => Ok(SubmissionStatus::Draft),
            "pending" => Ok(SubmissionStatus::Pending),
            "submitted" => Ok(SubmissionStatus::Submitted),
            "approved" => Ok(SubmissionStatus::Approved),
            "rejected" => Ok(SubmissionStatus::Rejected),
            "error" => Ok(SubmissionStatus::Error),
            other => Err(format!("unknown submission status: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SubmissionStatus;

    #[test]
    fn forward_transitions_are_legal() {
        assert!(SubmissionStatus::Processing.can_transition(SubmissionStatus::Draft));
        assert!(SubmissionStatus::Processing.can_transition(SubmissionStatus::Pending));
        assert!(SubmissionStatus::Draft.can_transition(SubmissionStatus::Submitted));
        assert!(SubmissionStatus::Draft.can_transition(SubmissionStatus::Pending));
        assert!(SubmissionStatus::Pending.can_transition(SubmissionStatus::Approved));
        assert!(SubmissionStatus::Pending.can_transition(SubmissionStatus::Rejected));
    }

    #[test]
    fn backward_transitions_are_illegal() {
        assert!(!SubmissionStatus::Approved.can_transition(SubmissionStatus::Draft));
        assert!(!SubmissionStatus::Approved.can_transition(SubmissionStatus::Pending));
        assert!(!SubmissionStatus::Submitted.can_transition(SubmissionStatus::Draft));
        assert!(!SubmissionStatus::Pending.can_transition(SubmissionStatus::Processing));
    }

    #[test]
    fn every_status_can_error_except_error() {
        for status in [
            SubmissionStatus::Processing,
            SubmissionStatus::Draft,
            SubmissionStatus::Pending,
            SubmissionStatus::Submitted,
            SubmissionStatus::Approved,
            SubmissionStatus::Rejected,
        ] {
            assert!(status.can_transition(SubmissionStatus::Error), "{status}");
        }
        assert!(!SubmissionStatus::Error.can_transition(SubmissionStatus::Error));
    }

    #[test]
    fn at_or_past_treats_siblings_as_reached() {
        assert!(SubmissionStatus::Approved.at_or_past(SubmissionStatus::Rejected));
        assert!(SubmissionStatus::Submitted.at_or_past(SubmissionStatus::Pending));
        assert!(!SubmissionStatus::Draft.at_or_past(SubmissionStatus::Pending));
        assert!(SubmissionStatus::Draft.at_or_past(SubmissionStatus::Draft));
    }
}
