//! The pipeline orchestrator.
//!
//! Each handler is one stateless unit of work triggered by an inbound stage
//! signal. Delivery is at-least-once and unordered, so every handler applies
//! the idempotency guard before any side effect: when the submission's
//! current status is already at or past the handler's target, the signal is
//! a redelivery and resolves to [`StageOutcome::NoOp`] with no ledger write,
//! no status write, and no downstream signal.
//!
//! A handler performs at most one [`StageUpdate`]; status and ledger land in
//! a single transaction at the end of the invocation, so a timed-out or
//! failed stage leaves the submission in its pre-invocation status and
//! redelivery retries from the same state.

use tracing::{info, warn};

use evr_dedupe::{
    AcceptedRecordsStore, DuplicateQuery, StoreError, UniquenessScope, extract_key,
    find_duplicates,
};
use evr_model::{
    CategorySchema, ConditionKind, LedgerEntry, OrganizationId, RecipientTier, RecordSet,
    Submission, SubmissionId, SubmissionStatus, ValidationCondition,
};
use evr_schema::SchemaRegistry;
use evr_validate::{
    IdentityResolver, RuleContext, RuleRegistry, resolve_identities, validate_record_set,
};

use crate::config::PipelineConfig;
use crate::directory::OrgDirectory;
use crate::error::StageError;
use crate::signal::{Stage, StageCompletion, StageOutcome};
use crate::stores::{StageUpdate, SubmissionBackend};

pub struct Orchestrator<'a> {
    registry: &'a SchemaRegistry,
    rules: &'a RuleRegistry,
    resolver: &'a dyn IdentityResolver,
    orgs: &'a dyn OrgDirectory,
    backend: &'a dyn SubmissionBackend,
    index: &'a dyn AcceptedRecordsStore,
    config: &'a PipelineConfig,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        registry: &'a SchemaRegistry,
        rules: &'a RuleRegistry,
        resolver: &'a dyn IdentityResolver,
        orgs: &'a dyn OrgDirectory,
        backend: &'a dyn SubmissionBackend,
        index: &'a dyn AcceptedRecordsStore,
        config: &'a PipelineConfig,
    ) -> Self {
        Self {
            registry,
            rules,
            resolver,
            orgs,
            backend,
            index,
            config,
        }
    }

    /// Integrity signal: checksum mismatch short-circuits the pipeline with
    /// a single ledger entry; a match leaves the submission in `Processing`
    /// for the validation stage.
    pub fn on_integrity(
        &self,
        id: &SubmissionId,
        checksum_ok: bool,
    ) -> Result<StageOutcome, StageError> {
        let submission = self.load(id)?;

        if submission.status != SubmissionStatus::Processing {
            return Ok(StageOutcome::NoOp);
        }
        let org_name = self.org_name(&submission)?;

        if checksum_ok {
            info!(submission = %id, "integrity check passed");
            return Ok(StageOutcome::Completed(completion(
                Stage::Integrity,
                true,
                &submission,
                org_name,
                submission.status,
            )));
        }

        let condition = ValidationCondition::column(
            ConditionKind::IntegrityChecksumMismatch,
            "upload",
            "uploaded file checksum does not match the declared checksum",
        );
        self.fail(Stage::Integrity, &submission, org_name, vec![condition])
    }

    /// Validation signal: record validator, business rules, and the
    /// uniqueness detector, aggregated. Zero conditions persists the records
    /// and advances to Draft (direct recipient) or Pending (subordinate);
    /// anything else lands in the ledger with status Error.
    pub fn on_validation(
        &self,
        id: &SubmissionId,
        records: &RecordSet,
    ) -> Result<StageOutcome, StageError> {
        let submission = self.load(id)?;
        let target = validation_target(submission.tier);
        if submission.status.at_or_past(target) {
            return Ok(StageOutcome::NoOp);
        }
        let org_name = self.org_name(&submission)?;

        let schema = self.registry.category_schema(&submission.category)?;

        let validation = validate_record_set(schema, records);
        let mut conditions = validation.conditions;
        let mut cleaned = validation.cleaned_records;

        // Collaborator failures propagate; they are not validation outcomes.
        conditions.extend(
            resolve_identities(schema, &mut cleaned, &submission.organization, self.resolver)
                .map_err(|e| StageError::infrastructure(e.to_string()))?,
        );

        let ctx = RuleContext {
            records: &cleaned,
            features: &self.config.features,
            reference_date: self.config.reference_date(&submission),
        };
        conditions.extend(self.rules.validate(&submission.category, &ctx));

        let scope = self.scope(&submission, schema);
        let query = DuplicateQuery {
            submission: submission.id.clone(),
            scope: scope.clone(),
        };
        conditions.extend(
            find_duplicates(&query, schema, &cleaned, self.index).map_err(store_failure)?,
        );

        if !conditions.is_empty() {
            return self.fail(Stage::Validation, &submission, org_name, conditions);
        }

        // Zero conditions: claim the uniqueness keys, persist the records,
        // then advance. The storage-layer unique index turns a concurrent
        // claim of the same keys into a duplicate outcome here.
        let keys = collect_keys(schema, &cleaned);
        match self.index.persist_keys(&scope, &submission.id, &keys) {
            Ok(()) => {}
            Err(StoreError::KeyConflict { key, holder }) => {
                let condition = ValidationCondition::column(
                    ConditionKind::DuplicateRecordInSystem,
                    schema.unique_key_fields.join(", "),
                    format!("duplicate with submission {holder}: key {key} was accepted concurrently"),
                );
                return self.fail(Stage::Validation, &submission, org_name, vec![condition]);
            }
            Err(error) => return Err(store_failure(error)),
        }
        self.backend.persist_records(&submission.id, &cleaned)?;

        self.backend.apply_stage(StageUpdate {
            submission: submission.id.clone(),
            status: target,
            ledger: Vec::new(),
        })?;
        info!(submission = %id, status = %target, "validation passed");
        Ok(StageOutcome::Completed(completion(
            Stage::Validation,
            true,
            &submission,
            org_name,
            target,
        )))
    }

    /// Submit action: recompute uniqueness against the live index before
    /// advancing, guarding against data that became duplicate between
    /// validation and a delayed submit.
    pub fn on_submit(&self, id: &SubmissionId) -> Result<StageOutcome, StageError> {
        let submission = self.load(id)?;
        let target = submit_target(submission.tier);
        if submission.status.at_or_past(target) {
            return Ok(StageOutcome::NoOp);
        }
        if !submission.status.can_transition(target) {
            return Err(StageError::IllegalTransition {
                submission: submission.id.clone(),
                from: submission.status,
                to: target,
            });
        }
        let org_name = self.org_name(&submission)?;

        let schema = self.registry.category_schema(&submission.category)?;
        let records = self
            .backend
            .records_for(id)?
            .ok_or_else(|| StageError::infrastructure("no persisted records for submission"))?;

        let scope = self.scope(&submission, schema);
        let query = DuplicateQuery {
            submission: submission.id.clone(),
            scope,
        };
        let duplicates =
            find_duplicates(&query, schema, &records, self.index).map_err(store_failure)?;
        if !duplicates.is_empty() {
            let outcome = self.fail(Stage::Submit, &submission, org_name, duplicates)?;
            self.index
                .release_submission(&submission.id)
                .map_err(store_failure)?;
            return Ok(outcome);
        }

        self.backend.apply_stage(StageUpdate {
            submission: submission.id.clone(),
            status: target,
            ledger: Vec::new(),
        })?;
        info!(submission = %id, status = %target, "submitted");
        Ok(StageOutcome::Completed(completion(
            Stage::Submit,
            true,
            &submission,
            org_name,
            target,
        )))
    }

    /// Approval action: only the submission's designated approving
    /// organization may move a Pending submission to Approved or Rejected.
    pub fn on_approval(
        &self,
        id: &SubmissionId,
        caller: &OrganizationId,
        approve: bool,
    ) -> Result<StageOutcome, StageError> {
        let submission = self.load(id)?;
        let target = if approve {
            SubmissionStatus::Approved
        } else {
            SubmissionStatus::Rejected
        };
        if submission.status.at_or_past(target) {
            return Ok(StageOutcome::NoOp);
        }
        if submission.status != SubmissionStatus::Pending {
            return Err(StageError::IllegalTransition {
                submission: submission.id.clone(),
                from: submission.status,
                to: target,
            });
        }
        if *caller != submission.parent_organization {
            return Err(StageError::Unauthorized {
                submission: submission.id.clone(),
                caller: caller.clone(),
            });
        }
        let org_name = self.org_name(&submission)?;

        self.backend.apply_stage(StageUpdate {
            submission: submission.id.clone(),
            status: target,
            ledger: Vec::new(),
        })?;
        if !approve {
            // Rejected data leaves the in-flight uniqueness set.
            self.index
                .release_submission(&submission.id)
                .map_err(store_failure)?;
        }
        info!(submission = %id, status = %target, "approval recorded");
        Ok(StageOutcome::Completed(completion(
            Stage::Approval,
            approve,
            &submission,
            org_name,
            target,
        )))
    }

    /// Containment for uncaught defects: log, leave the submission in its
    /// last-known-good status, and write one generic ledger entry only if
    /// the submission has none, so repeated redelivery cannot spam the
    /// ledger.
    pub fn on_unknown_failure(&self, id: &SubmissionId, detail: &str) -> Result<(), StageError> {
        let submission = self.load(id)?;
        warn!(submission = %id, detail, "unknown pipeline failure");
        if self.backend.has_ledger_entries(id)? {
            return Ok(());
        }
        let condition = ValidationCondition::column(
            ConditionKind::InternalError,
            "pipeline",
            "an internal error occurred while processing this submission",
        );
        self.backend.apply_stage(StageUpdate {
            submission: submission.id.clone(),
            status: submission.status,
            ledger: vec![ledger_entry(&submission, condition)],
        })?;
        Ok(())
    }

    fn load(&self, id: &SubmissionId) -> Result<Submission, StageError> {
        self.backend
            .load_submission(id)?
            .ok_or_else(|| StageError::UnknownSubmission {
                submission: id.clone(),
            })
    }

    /// Resolve the submitter's display name before any side effect, so a
    /// directory outage aborts the stage cleanly.
    fn org_name(&self, submission: &Submission) -> Result<String, StageError> {
        self.orgs
            .resolve_org_name(&submission.organization)
            .map_err(|e| StageError::infrastructure(e.to_string()))
    }

    fn scope(&self, submission: &Submission, schema: &CategorySchema) -> UniquenessScope {
        UniquenessScope {
            parent_organization: submission.parent_organization.clone(),
            category: submission.category.clone(),
            period: schema.cadence.is_periodic().then_some(submission.period),
        }
    }

    /// Record conditions and move to Error in one transaction.
    fn fail(
        &self,
        stage: Stage,
        submission: &Submission,
        org_name: String,
        conditions: Vec<ValidationCondition>,
    ) -> Result<StageOutcome, StageError> {
        let ledger: Vec<LedgerEntry> = conditions
            .into_iter()
            .map(|condition| ledger_entry(submission, condition))
            .collect();
        let entries = ledger.len();
        self.backend.apply_stage(StageUpdate {
            submission: submission.id.clone(),
            status: SubmissionStatus::Error,
            ledger,
        })?;
        info!(submission = %submission.id, %stage, entries, "stage failed");
        Ok(StageOutcome::Completed(completion(
            stage,
            false,
            submission,
            org_name,
            SubmissionStatus::Error,
        )))
    }
}

fn validation_target(tier: RecipientTier) -> SubmissionStatus {
    match tier {
        RecipientTier::Direct => SubmissionStatus::Draft,
        RecipientTier::Subordinate => SubmissionStatus::Pending,
    }
}

fn submit_target(tier: RecipientTier) -> SubmissionStatus {
    match tier {
        RecipientTier::Direct => SubmissionStatus::Submitted,
        RecipientTier::Subordinate => SubmissionStatus::Pending,
    }
}

fn completion(
    stage: Stage,
    passed: bool,
    submission: &Submission,
    organization_name: String,
    status: SubmissionStatus,
) -> StageCompletion {
    StageCompletion {
        stage,
        passed,
        submission: submission.id.clone(),
        organization: submission.organization.clone(),
        organization_name,
        parent_organization: submission.parent_organization.clone(),
        status,
    }
}

fn ledger_entry(submission: &Submission, condition: ValidationCondition) -> LedgerEntry {
    LedgerEntry {
        submission: submission.id.clone(),
        category: submission.category.clone(),
        organization: submission.organization.clone(),
        parent_organization: submission.parent_organization.clone(),
        condition,
    }
}

fn collect_keys(schema: &CategorySchema, records: &RecordSet) -> Vec<String> {
    let mut keys: Vec<String> = records
        .rows
        .iter()
        .filter_map(|record| extract_key(schema, record))
        .map(|key| key.encoded())
        .collect();
    keys.sort();
    keys.dedup();
    keys
}

fn store_failure(error: StoreError) -> StageError {
    StageError::Infrastructure {
        message: error.to_string(),
    }
}
