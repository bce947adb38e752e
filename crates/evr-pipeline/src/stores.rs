//! Persistence seams for the orchestrator.
//!
//! One stage invocation performs at most one [`StageUpdate`]: the status
//! write and any ledger appends land in a single transaction, so a ledger
//! entry can never exist without its status update or vice versa. A stage
//! that fails before `apply_stage` leaves the submission exactly as it
//! found it.

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::Utc;

use evr_model::{LedgerEntry, RecordSet, Submission, SubmissionId, SubmissionStatus};

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("submission store unavailable: {message}")]
    Unavailable { message: String },
}

impl BackendError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

/// The single transactional write a stage is allowed.
#[derive(Debug, Clone)]
pub struct StageUpdate {
    pub submission: SubmissionId,
    pub status: SubmissionStatus,
    pub ledger: Vec<LedgerEntry>,
}

/// Submission table, category record tables, and error ledger behind one
/// seam. Implementations must apply [`StageUpdate`]s atomically.
pub trait SubmissionBackend {
    fn load_submission(&self, id: &SubmissionId) -> Result<Option<Submission>, BackendError>;

    /// Insert a submission at intake. Upserts by id.
    fn put_submission(&self, submission: Submission) -> Result<(), BackendError>;

    /// Apply a stage's status transition and ledger appends in one
    /// transaction, stamping `updated_at`.
    fn apply_stage(&self, update: StageUpdate) -> Result<(), BackendError>;

    /// Persist a submission's cleaned records to its category table. Only
    /// called when validation reported zero conditions.
    fn persist_records(
        &self,
        id: &SubmissionId,
        records: &RecordSet,
    ) -> Result<(), BackendError>;

    /// The records persisted for a submission, if any.
    fn records_for(&self, id: &SubmissionId) -> Result<Option<RecordSet>, BackendError>;

    fn ledger_entries(&self, id: &SubmissionId) -> Result<Vec<LedgerEntry>, BackendError>;

    fn has_ledger_entries(&self, id: &SubmissionId) -> Result<bool, BackendError> {
        Ok(!self.ledger_entries(id)?.is_empty())
    }
}

#[derive(Debug, Default)]
struct MemoryBackendInner {
    submissions: BTreeMap<SubmissionId, Submission>,
    records: BTreeMap<SubmissionId, RecordSet>,
    ledger: BTreeMap<SubmissionId, Vec<LedgerEntry>>,
}

/// In-memory backend used by tests and the local CLI.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    inner: Mutex<MemoryBackendInner>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryBackendInner>, BackendError> {
        self.inner
            .lock()
            .map_err(|_| BackendError::unavailable("backend lock poisoned"))
    }
}

impl SubmissionBackend for MemoryBackend {
    fn load_submission(&self, id: &SubmissionId) -> Result<Option<Submission>, BackendError> {
        Ok(self.lock()?.submissions.get(id).cloned())
    }

    fn put_submission(&self, submission: Submission) -> Result<(), BackendError> {
        self.lock()?
            .submissions
            .insert(submission.id.clone(), submission);
        Ok(())
    }

    fn apply_stage(&self, update: StageUpdate) -> Result<(), BackendError> {
        let mut inner = self.lock()?;
        let submission = inner
            .submissions
            .get_mut(&update.submission)
            .ok_or_else(|| BackendError::unavailable("submission row vanished"))?;
        submission.status = update.status;
        submission.updated_at = Utc::now();
        if !update.ledger.is_empty() {
            inner
                .ledger
                .entry(update.submission.clone())
                .or_default()
                .extend(update.ledger);
        }
        Ok(())
    }

    fn persist_records(&self, id: &SubmissionId, records: &RecordSet) -> Result<(), BackendError> {
        self.lock()?.records.insert(id.clone(), records.clone());
        Ok(())
    }

    fn records_for(&self, id: &SubmissionId) -> Result<Option<RecordSet>, BackendError> {
        Ok(self.lock()?.records.get(id).cloned())
    }

    fn ledger_entries(&self, id: &SubmissionId) -> Result<Vec<LedgerEntry>, BackendError> {
        Ok(self.lock()?.ledger.get(id).cloned().unwrap_or_default())
    }
}
