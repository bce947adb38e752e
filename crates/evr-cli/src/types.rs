use serde::Serialize;

use evr_model::{LedgerEntry, SubmissionStatus};
use evr_pipeline::StageCompletion;

/// Outcome of one `evr process` run, printed as the summary and optionally
/// written as a JSON report.
#[derive(Debug, Serialize)]
pub struct ProcessResult {
    pub submission_id: String,
    pub category: String,
    pub organization: String,
    pub status: SubmissionStatus,
    pub stages: Vec<StageCompletion>,
    pub ledger: Vec<LedgerEntry>,
    pub records: usize,
}

impl ProcessResult {
    pub fn has_errors(&self) -> bool {
        self.status == SubmissionStatus::Error
    }
}
