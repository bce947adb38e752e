//! Stage failure taxonomy.
//!
//! Validation-class failures (schema, duplicate, business-rule) never reach
//! this enum; they are recovered into ledger conditions. `StageError` covers
//! what must propagate to the invocation boundary so the delivery layer can
//! retry, redeliver, or surface an authorization problem.

use evr_model::{OrganizationId, SubmissionId, SubmissionStatus};

#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// Store or collaborator unavailable; the stage invocation is incomplete
    /// and must be retried via redelivery. No ledger entry is written.
    #[error("infrastructure failure: {message}")]
    Infrastructure { message: String },

    #[error("unknown submission: {submission}")]
    UnknownSubmission { submission: SubmissionId },

    #[error("schema error: {0}")]
    Schema(#[from] evr_schema::SchemaError),

    #[error("{caller} is not the approving organization for submission {submission}")]
    Unauthorized {
        submission: SubmissionId,
        caller: OrganizationId,
    },

    #[error("submission {submission} cannot move from {from} to {to}")]
    IllegalTransition {
        submission: SubmissionId,
        from: SubmissionStatus,
        to: SubmissionStatus,
    },
}

impl StageError {
    pub fn infrastructure(message: impl Into<String>) -> Self {
        Self::Infrastructure {
            message: message.into(),
        }
    }
}

impl From<crate::stores::BackendError> for StageError {
    fn from(error: crate::stores::BackendError) -> Self {
        Self::Infrastructure {
            message: error.to_string(),
        }
    }
}
