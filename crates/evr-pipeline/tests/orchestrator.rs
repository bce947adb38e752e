//! End-to-end orchestrator scenarios against the in-memory backend.

use chrono::NaiveDate;

use evr_dedupe::{AcceptedRecordsStore, MemoryRecordIndex, UniquenessScope};
use evr_model::{
    CategoryId, CategorySchema, Cadence, ConditionKind, FieldDefinition, FieldType,
    OrganizationId, RecipientTier, Record, RecordSet, ReportingPeriod, Submission, SubmissionId,
    SubmissionStatus,
};
use evr_pipeline::{
    IdentityOrgDirectory, MemoryBackend, Orchestrator, PipelineConfig, Stage, StageError,
    SubmissionBackend,
};
use evr_schema::{SchemaRegistry, SchemaSource};
use evr_validate::{FeatureConfig, IdentityError, IdentityResolver, RuleRegistry};

fn stations_schema() -> CategorySchema {
    let mut num_ports = FieldDefinition::new("num_ports", FieldType::Integer, true);
    num_ports.min_value = Some(1.0);
    CategorySchema {
        category: CategoryId::new("stations").expect("category id"),
        label: "Charging Stations".to_string(),
        cadence: Cadence::OneTime,
        fields: vec![
            FieldDefinition::new("station_id", FieldType::Text, true),
            FieldDefinition::new("station_name", FieldType::Text, true),
            num_ports,
        ],
        unique_key_fields: vec!["station_id".to_string()],
        nullable_key_fields: Vec::new(),
    }
}

fn registry() -> SchemaRegistry {
    SchemaRegistry::from_schemas([stations_schema()])
}

struct NoPorts;

impl IdentityResolver for NoPorts {
    fn lookup_identity(
        &self,
        human_key: &str,
        _organization: &OrganizationId,
    ) -> Result<Option<String>, IdentityError> {
        Err(IdentityError {
            human_key: human_key.to_string(),
            message: "no port lookups expected in this scenario".to_string(),
        })
    }
}

fn config() -> PipelineConfig {
    PipelineConfig::new(
        SchemaSource::Central,
        FeatureConfig::default(),
        NaiveDate::from_ymd_opt(2025, 12, 31).expect("date"),
    )
}

fn submission(id: &str, tier: RecipientTier) -> Submission {
    Submission::new(
        SubmissionId::new(id).expect("submission id"),
        CategoryId::new("stations").expect("category id"),
        OrganizationId::new("org-a").expect("org id"),
        OrganizationId::new("org-root").expect("org id"),
        ReportingPeriod::annual(2025),
        tier,
        chrono::Utc::now(),
    )
}

fn station_row(id: &str, name: &str, ports: &str) -> Record {
    Record::from_pairs([
        ("station_id", id),
        ("station_name", name),
        ("num_ports", ports),
    ])
}

fn valid_records() -> RecordSet {
    RecordSet::new(
        vec![
            "station_id".to_string(),
            "station_name".to_string(),
            "num_ports".to_string(),
        ],
        vec![
            station_row("ST-1", "Main St", "4"),
            station_row("ST-2", "Elm Ave", "2"),
        ],
    )
}

struct Harness {
    registry: SchemaRegistry,
    rules: RuleRegistry,
    backend: MemoryBackend,
    index: MemoryRecordIndex,
    config: PipelineConfig,
}

impl Harness {
    fn new() -> Self {
        Self {
            registry: registry(),
            rules: RuleRegistry::builtin(),
            backend: MemoryBackend::new(),
            index: MemoryRecordIndex::new(),
            config: config(),
        }
    }

    fn orchestrator(&self) -> Orchestrator<'_> {
        Orchestrator::new(
            &self.registry,
            &self.rules,
            &NoPorts,
            &IdentityOrgDirectory,
            &self.backend,
            &self.index,
            &self.config,
        )
    }

    fn intake(&self, id: &str, tier: RecipientTier) -> SubmissionId {
        let submission = submission(id, tier);
        let sid = submission.id.clone();
        self.backend.put_submission(submission).expect("put submission");
        sid
    }

    fn status(&self, id: &SubmissionId) -> SubmissionStatus {
        self.backend
            .load_submission(id)
            .expect("load submission")
            .expect("submission exists")
            .status
    }

    fn ledger_len(&self, id: &SubmissionId) -> usize {
        self.backend.ledger_entries(id).expect("ledger").len()
    }
}

#[test]
fn scenario_a_direct_recipient_reaches_draft_then_submitted() {
    let harness = Harness::new();
    let orchestrator = harness.orchestrator();
    let id = harness.intake("sub-1", RecipientTier::Direct);

    let integrity = orchestrator.on_integrity(&id, true).expect("integrity");
    let completion = integrity.completion().expect("completion");
    assert!(completion.passed);
    assert_eq!(completion.stage, Stage::Integrity);

    let validation = orchestrator
        .on_validation(&id, &valid_records())
        .expect("validation");
    assert!(validation.completion().expect("completion").passed);
    assert_eq!(harness.status(&id), SubmissionStatus::Draft);
    assert_eq!(harness.ledger_len(&id), 0);

    let submit = orchestrator.on_submit(&id).expect("submit");
    assert!(submit.completion().expect("completion").passed);
    assert_eq!(harness.status(&id), SubmissionStatus::Submitted);
    assert_eq!(harness.ledger_len(&id), 0);
}

#[test]
fn scenario_a_subordinate_reaches_pending_then_approved() {
    let harness = Harness::new();
    let orchestrator = harness.orchestrator();
    let id = harness.intake("sub-2", RecipientTier::Subordinate);

    orchestrator.on_integrity(&id, true).expect("integrity");
    orchestrator
        .on_validation(&id, &valid_records())
        .expect("validation");
    assert_eq!(harness.status(&id), SubmissionStatus::Pending);
    assert_eq!(harness.ledger_len(&id), 0);

    let approver = OrganizationId::new("org-root").expect("org id");
    let approval = orchestrator
        .on_approval(&id, &approver, true)
        .expect("approval");
    assert!(approval.completion().expect("completion").passed);
    assert_eq!(harness.status(&id), SubmissionStatus::Approved);
}

#[test]
fn scenario_b_missing_column_and_intra_duplicate_yield_two_entries() {
    let harness = Harness::new();
    let orchestrator = harness.orchestrator();
    let id = harness.intake("sub-3", RecipientTier::Direct);

    // station_name column absent entirely; two rows share the key.
    let records = RecordSet::new(
        vec!["station_id".to_string(), "num_ports".to_string()],
        vec![
            Record::from_pairs([("station_id", "ST-1"), ("num_ports", "4")]),
            Record::from_pairs([("station_id", "ST-1"), ("num_ports", "2")]),
        ],
    );

    let outcome = orchestrator.on_validation(&id, &records).expect("validation");
    assert!(!outcome.completion().expect("completion").passed);
    assert_eq!(harness.status(&id), SubmissionStatus::Error);

    let entries = harness.backend.ledger_entries(&id).expect("ledger");
    assert_eq!(entries.len(), 2);
    let kinds: Vec<ConditionKind> = entries.iter().map(|e| e.condition.kind).collect();
    assert!(kinds.contains(&ConditionKind::MissingRequiredColumn));
    assert!(kinds.contains(&ConditionKind::DuplicateRecordInSameUpload));
}

#[test]
fn scenario_c_integrity_mismatch_short_circuits() {
    let harness = Harness::new();
    let orchestrator = harness.orchestrator();
    let id = harness.intake("sub-4", RecipientTier::Direct);

    let outcome = orchestrator.on_integrity(&id, false).expect("integrity");
    assert!(!outcome.completion().expect("completion").passed);
    assert_eq!(harness.status(&id), SubmissionStatus::Error);

    let entries = harness.backend.ledger_entries(&id).expect("ledger");
    assert_eq!(entries.len(), 1);
    assert_eq!(
        entries[0].condition.kind,
        ConditionKind::IntegrityChecksumMismatch
    );

    // Later validators never execute against an errored submission.
    let validation = orchestrator
        .on_validation(&id, &valid_records())
        .expect("validation");
    assert!(validation.is_noop());
    assert_eq!(harness.ledger_len(&id), 1);
}

#[test]
fn replayed_validation_signal_writes_ledger_once() {
    let harness = Harness::new();
    let orchestrator = harness.orchestrator();
    let id = harness.intake("sub-5", RecipientTier::Direct);

    let records = RecordSet::new(
        vec!["station_id".to_string(), "num_ports".to_string()],
        vec![Record::from_pairs([("station_id", "ST-1"), ("num_ports", "4")])],
    );

    let first = orchestrator.on_validation(&id, &records).expect("validation");
    assert!(first.completion().is_some());
    let after_first = harness.ledger_len(&id);

    let second = orchestrator.on_validation(&id, &records).expect("replay");
    assert!(second.is_noop());
    assert_eq!(harness.ledger_len(&id), after_first);
    assert_eq!(harness.status(&id), SubmissionStatus::Error);
}

#[test]
fn replayed_passing_signals_are_noops() {
    let harness = Harness::new();
    let orchestrator = harness.orchestrator();
    let id = harness.intake("sub-6", RecipientTier::Direct);

    orchestrator
        .on_validation(&id, &valid_records())
        .expect("validation");
    assert_eq!(harness.status(&id), SubmissionStatus::Draft);

    assert!(orchestrator
        .on_validation(&id, &valid_records())
        .expect("replay")
        .is_noop());
    assert!(orchestrator.on_integrity(&id, true).expect("replay").is_noop());

    orchestrator.on_submit(&id).expect("submit");
    assert!(orchestrator.on_submit(&id).expect("replay").is_noop());
    assert_eq!(harness.status(&id), SubmissionStatus::Submitted);
}

#[test]
fn approval_requires_the_parent_organization() {
    let harness = Harness::new();
    let orchestrator = harness.orchestrator();
    let id = harness.intake("sub-7", RecipientTier::Subordinate);
    orchestrator
        .on_validation(&id, &valid_records())
        .expect("validation");
    assert_eq!(harness.status(&id), SubmissionStatus::Pending);

    let intruder = OrganizationId::new("org-b").expect("org id");
    let error = orchestrator
        .on_approval(&id, &intruder, true)
        .expect_err("unauthorized");
    assert!(matches!(error, StageError::Unauthorized { .. }));
    assert_eq!(harness.status(&id), SubmissionStatus::Pending);
}

#[test]
fn approval_outside_pending_is_an_illegal_transition() {
    let harness = Harness::new();
    let orchestrator = harness.orchestrator();
    let id = harness.intake("sub-8", RecipientTier::Direct);
    orchestrator
        .on_validation(&id, &valid_records())
        .expect("validation");
    assert_eq!(harness.status(&id), SubmissionStatus::Draft);

    let approver = OrganizationId::new("org-root").expect("org id");
    let error = orchestrator
        .on_approval(&id, &approver, true)
        .expect_err("illegal transition");
    assert!(matches!(error, StageError::IllegalTransition { .. }));
    assert_eq!(harness.status(&id), SubmissionStatus::Draft);
}

#[test]
fn submit_before_validation_is_an_illegal_transition() {
    let harness = Harness::new();
    let orchestrator = harness.orchestrator();
    let id = harness.intake("sub-9", RecipientTier::Direct);

    let error = orchestrator.on_submit(&id).expect_err("illegal transition");
    assert!(matches!(error, StageError::IllegalTransition { .. }));
    assert_eq!(harness.status(&id), SubmissionStatus::Processing);
}

#[test]
fn delayed_submit_recheck_catches_new_duplicates() {
    let harness = Harness::new();
    let orchestrator = harness.orchestrator();

    // A draft submission whose keys were never claimed (simulating data
    // validated before the competing submission existed).
    let mut draft = submission("sub-10", RecipientTier::Direct);
    draft.status = SubmissionStatus::Draft;
    let id = draft.id.clone();
    harness.backend.put_submission(draft).expect("put submission");
    harness
        .backend
        .persist_records(&id, &valid_records())
        .expect("persist records");

    // A competing submission claimed the same station key in the meantime.
    let scope = UniquenessScope::one_time(
        OrganizationId::new("org-root").expect("org id"),
        CategoryId::new("stations").expect("category id"),
    );
    harness
        .index
        .persist_keys(
            &scope,
            &SubmissionId::new("sub-competing").expect("submission id"),
            &["station_id=ST-1".to_string()],
        )
        .expect("persist competing keys");

    let outcome = orchestrator.on_submit(&id).expect("submit");
    assert!(!outcome.completion().expect("completion").passed);
    assert_eq!(harness.status(&id), SubmissionStatus::Error);

    let entries = harness.backend.ledger_entries(&id).expect("ledger");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].condition.kind, ConditionKind::DuplicateRecordInSystem);
    assert!(entries[0]
        .condition
        .error_description
        .contains("sub-competing"));
}

#[test]
fn unknown_failure_writes_one_generic_entry_and_keeps_status() {
    let harness = Harness::new();
    let orchestrator = harness.orchestrator();
    let id = harness.intake("sub-11", RecipientTier::Direct);
    orchestrator
        .on_validation(&id, &valid_records())
        .expect("validation");
    assert_eq!(harness.status(&id), SubmissionStatus::Draft);

    orchestrator
        .on_unknown_failure(&id, "worker crashed")
        .expect("containment");
    orchestrator
        .on_unknown_failure(&id, "worker crashed again")
        .expect("containment replay");

    assert_eq!(harness.status(&id), SubmissionStatus::Draft);
    let entries = harness.backend.ledger_entries(&id).expect("ledger");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].condition.kind, ConditionKind::InternalError);
}

#[test]
fn rejected_submissions_release_their_keys() {
    let harness = Harness::new();
    let orchestrator = harness.orchestrator();
    let id = harness.intake("sub-12", RecipientTier::Subordinate);
    orchestrator
        .on_validation(&id, &valid_records())
        .expect("validation");

    let approver = OrganizationId::new("org-root").expect("org id");
    let outcome = orchestrator
        .on_approval(&id, &approver, false)
        .expect("rejection");
    assert!(!outcome.completion().expect("completion").passed);
    assert_eq!(harness.status(&id), SubmissionStatus::Rejected);

    // The same data from a new submission no longer collides.
    let replacement = harness.intake("sub-13", RecipientTier::Subordinate);
    orchestrator
        .on_validation(&replacement, &valid_records())
        .expect("validation");
    assert_eq!(harness.status(&replacement), SubmissionStatus::Pending);
    assert_eq!(harness.ledger_len(&replacement), 0);
}
