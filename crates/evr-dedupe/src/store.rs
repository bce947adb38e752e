//! The accepted-records key index shared by submissions.
//!
//! The durable store holds, per uniqueness scope, the key tuples of every
//! accepted or in-flight submission. The detector reads it to find
//! cross-submission collisions; the pipeline writes to it when a submission's
//! records persist. The store enforces a unique index per scope: persisting
//! a key another submission already holds fails with [`StoreError::KeyConflict`],
//! which closes the check-then-persist race between concurrent submissions
//! without a cross-submission lock.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use evr_model::{CategoryId, OrganizationId, ReportingPeriod, SubmissionId};

/// The scope a uniqueness key lives in: one organization hierarchy, one
/// category, and (for periodic categories) one reporting window.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct UniquenessScope {
    pub parent_organization: OrganizationId,
    pub category: CategoryId,
    pub period: Option<ReportingPeriod>,
}

impl UniquenessScope {
    pub fn one_time(parent_organization: OrganizationId, category: CategoryId) -> Self {
        Self {
            parent_organization,
            category,
            period: None,
        }
    }

    pub fn periodic(
        parent_organization: OrganizationId,
        category: CategoryId,
        period: ReportingPeriod,
    ) -> Self {
        Self {
            parent_organization,
            category,
            period: Some(period),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record index unavailable: {message}")]
    Unavailable { message: String },

    #[error("key {key:?} already persisted by submission {holder}")]
    KeyConflict { key: String, holder: SubmissionId },
}

/// Matches found in the index: encoded key -> submissions holding it.
pub type KeyMatches = BTreeMap<String, BTreeSet<SubmissionId>>;

/// Read/write access to the per-scope uniqueness index.
pub trait AcceptedRecordsStore {
    /// Which of `keys` are already held within `scope`, and by whom.
    /// Includes accepted and in-flight submissions.
    fn find_matching_keys(
        &self,
        scope: &UniquenessScope,
        keys: &[String],
    ) -> Result<KeyMatches, StoreError>;

    /// Persist a submission's keys under `scope`. Fails with
    /// [`StoreError::KeyConflict`] when another submission already holds one
    /// of them; the caller must treat the submission as a duplicate.
    fn persist_keys(
        &self,
        scope: &UniquenessScope,
        submission: &SubmissionId,
        keys: &[String],
    ) -> Result<(), StoreError>;

    /// Drop a submission's keys (rejected or errored submissions leave the
    /// in-flight set).
    fn release_submission(&self, submission: &SubmissionId) -> Result<(), StoreError>;
}

/// In-memory index used by tests and the local CLI backend.
#[derive(Debug, Default)]
pub struct MemoryRecordIndex {
    scopes: Mutex<BTreeMap<UniquenessScope, BTreeMap<String, BTreeSet<SubmissionId>>>>,
}

impl MemoryRecordIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AcceptedRecordsStore for MemoryRecordIndex {
    fn find_matching_keys(
        &self,
        scope: &UniquenessScope,
        keys: &[String],
    ) -> Result<KeyMatches, StoreError> {
        let scopes = self.scopes.lock().map_err(|_| StoreError::Unavailable {
            message: "record index lock poisoned".to_string(),
        })?;
        let mut matches = KeyMatches::new();
        if let Some(index) = scopes.get(scope) {
            for key in keys {
                if let Some(holders) = index.get(key)
                    && !holders.is_empty()
                {
                    matches.insert(key.clone(), holders.clone());
                }
            }
        }
        Ok(matches)
    }

    fn persist_keys(
        &self,
        scope: &UniquenessScope,
        submission: &SubmissionId,
        keys: &[String],
    ) -> Result<(), StoreError> {
        let mut scopes = self.scopes.lock().map_err(|_| StoreError::Unavailable {
            message: "record index lock poisoned".to_string(),
        })?;
        let index = scopes.entry(scope.clone()).or_default();

        // Unique-index semantics: reject before writing anything.
        for key in keys {
            if let Some(holders) = index.get(key)
                && let Some(holder) = holders.iter().find(|holder| *holder != submission)
            {
                return Err(StoreError::KeyConflict {
                    key: key.clone(),
                    holder: holder.clone(),
                });
            }
        }

        for key in keys {
            index.entry(key.clone()).or_default().insert(submission.clone());
        }
        Ok(())
    }

    fn release_submission(&self, submission: &SubmissionId) -> Result<(), StoreError> {
        let mut scopes = self.scopes.lock().map_err(|_| StoreError::Unavailable {
            message: "record index lock poisoned".to_string(),
        })?;
        for index in scopes.values_mut() {
            for holders in index.values_mut() {
                holders.remove(submission);
            }
            index.retain(|_, holders| !holders.is_empty());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{AcceptedRecordsStore, MemoryRecordIndex, StoreError, UniquenessScope};
    use evr_model::{CategoryId, OrganizationId, SubmissionId};

    fn scope() -> UniquenessScope {
        UniquenessScope::one_time(
            OrganizationId::new("org-root").expect("org id"),
            CategoryId::new("stations").expect("category id"),
        )
    }

    #[test]
    fn persist_then_find_round_trips() {
        let index = MemoryRecordIndex::new();
        let sub = SubmissionId::new("sub-1").expect("submission id");
        index
            .persist_keys(&scope(), &sub, &["station_id=ST-1".to_string()])
            .expect("persist");

        let matches = index
            .find_matching_keys(&scope(), &["station_id=ST-1".to_string()])
            .expect("find");
        assert_eq!(matches.len(), 1);
        assert!(matches["station_id=ST-1"].contains(&sub));
    }

    #[test]
    fn conflicting_persist_is_rejected() {
        let index = MemoryRecordIndex::new();
        let first = SubmissionId::new("sub-1").expect("submission id");
        let second = SubmissionId::new("sub-2").expect("submission id");
        let keys = vec!["station_id=ST-1".to_string()];

        index.persist_keys(&scope(), &first, &keys).expect("persist");
        let error = index
            .persist_keys(&scope(), &second, &keys)
            .expect_err("conflict");
        assert!(matches!(error, StoreError::KeyConflict { .. }));
    }

    #[test]
    fn released_submissions_stop_matching() {
        let index = MemoryRecordIndex::new();
        let sub = SubmissionId::new("sub-1").expect("submission id");
        let keys = vec!["station_id=ST-1".to_string()];
        index.persist_keys(&scope(), &sub, &keys).expect("persist");
        index.release_submission(&sub).expect("release");

        let matches = index.find_matching_keys(&scope(), &keys).expect("find");
        assert!(matches.is_empty());
    }
}
