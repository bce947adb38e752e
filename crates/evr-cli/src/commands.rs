use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{Datelike, NaiveDate, Utc};
use comfy_table::Table;
use tracing::{info, info_span};

use evr_dedupe::MemoryRecordIndex;
use evr_ingest::{checksum_matches, file_sha256_hex, read_record_set, sha256_hex};
use evr_model::{
    Cadence, CategoryId, OrganizationId, RecipientTier, ReportingPeriod, Submission,
    SubmissionId, SubmissionStatus, ValidationCondition,
};
use evr_pipeline::{
    IdentityOrgDirectory, MemoryBackend, Orchestrator, PipelineConfig, StageOutcome,
    SubmissionBackend,
};
use evr_schema::{SchemaRegistry, SchemaSource};
use evr_validate::{
    FeatureConfig, IdentityError, IdentityResolver, RuleContext, RuleRegistry,
    validate_record_set,
};

use crate::cli::{
    CategoriesArgs, DecisionArg, DefinitionsArgs, ProcessArgs, SchemaSourceArg, TierArg,
    ValidateArgs,
};
use crate::summary::{apply_table_style, print_conditions};
use crate::types::ProcessResult;

/// Local stand-in for the external port registry: every station/port pair
/// resolves, to a key derived deterministically from the pair and the
/// organization. A deployment wires the real registry service here.
struct LocalIdentityResolver;

impl IdentityResolver for LocalIdentityResolver {
    fn lookup_identity(
        &self,
        human_key: &str,
        organization: &OrganizationId,
    ) -> Result<Option<String>, IdentityError> {
        let digest = sha256_hex(format!("{organization}/{human_key}").as_bytes());
        Ok(Some(format!("pk-{}", &digest[..12])))
    }
}

fn load_registry(args: &DefinitionsArgs) -> Result<SchemaRegistry> {
    let source = match args.schema_source {
        SchemaSourceArg::Central => SchemaSource::Central,
        SchemaSourceArg::Legacy => SchemaSource::Legacy,
    };
    SchemaRegistry::load(&args.definitions_dir, source).with_context(|| {
        format!(
            "load schema definitions from {}",
            args.definitions_dir.display()
        )
    })
}

pub fn run_categories(args: &CategoriesArgs) -> Result<()> {
    let registry = load_registry(&args.definitions)?;
    let mut table = Table::new();
    table.set_header(vec!["Category", "Label", "Cadence", "Key Fields"]);
    apply_table_style(&mut table);
    for schema in registry.categories() {
        table.add_row(vec![
            schema.category.to_string(),
            schema.label.clone(),
            schema.cadence.to_string(),
            schema.unique_key_fields.join(", "),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn run_validate(args: &ValidateArgs) -> Result<usize> {
    let registry = load_registry(&args.definitions)?;
    let category = CategoryId::new(args.category.clone()).context("category id")?;
    let schema = registry.category_schema(&category)?;

    let records = read_record_set(&args.file)
        .with_context(|| format!("read {}", args.file.display()))?;

    let reference_date = match &args.reference_date {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .with_context(|| format!("parse reference date {raw:?}"))?,
        None => Utc::now().date_naive(),
    };

    let validation = validate_record_set(schema, &records);
    let mut conditions = validation.conditions;

    let features = FeatureConfig::default();
    let rules = RuleRegistry::builtin();
    conditions.extend(rules.validate(
        &category,
        &RuleContext {
            records: &validation.cleaned_records,
            features: &features,
            reference_date,
        },
    ));

    if conditions.is_empty() {
        println!(
            "{}: {} rows, no conditions",
            args.file.display(),
            records.len()
        );
    } else {
        let refs: Vec<&ValidationCondition> = conditions.iter().collect();
        print_conditions(&refs);
    }
    Ok(conditions.len())
}

pub fn run_process(args: &ProcessArgs) -> Result<ProcessResult> {
    let registry = load_registry(&args.definitions)?;
    let category = CategoryId::new(args.category.clone()).context("category id")?;
    let schema = registry.category_schema(&category)?;

    let submission_id = submission_id_for(args)?;
    let span = info_span!("submission", id = %submission_id);
    let _guard = span.enter();

    let records = read_record_set(&args.file)
        .with_context(|| format!("read {}", args.file.display()))?;

    let period = reporting_period(args, schema.cadence)?;
    let organization = OrganizationId::new(args.organization.clone()).context("organization")?;
    let parent_organization = match &args.parent_organization {
        Some(parent) => OrganizationId::new(parent.clone()).context("parent organization")?,
        None => organization.clone(),
    };
    let tier = match args.tier {
        TierArg::Direct => RecipientTier::Direct,
        TierArg::Subordinate => RecipientTier::Subordinate,
    };

    let checksum_ok = match &args.checksum {
        Some(declared) => {
            let actual = file_sha256_hex(&args.file)?;
            checksum_matches(declared, &actual)
        }
        None => true,
    };

    let backend = MemoryBackend::new();
    let index = MemoryRecordIndex::new();
    let rules = RuleRegistry::builtin();
    let resolver = LocalIdentityResolver;
    let config = PipelineConfig::new(
        registry.source(),
        FeatureConfig::default(),
        Utc::now().date_naive(),
    );

    backend
        .put_submission(Submission::new(
            submission_id.clone(),
            category.clone(),
            organization.clone(),
            parent_organization.clone(),
            period,
            tier,
            Utc::now(),
        ))
        .context("store submission at intake")?;

    let orchestrator = Orchestrator::new(
        &registry,
        &rules,
        &resolver,
        &IdentityOrgDirectory,
        &backend,
        &index,
        &config,
    );

    let mut stages = Vec::new();
    let mut record = |outcome: StageOutcome| -> bool {
        match outcome {
            StageOutcome::Completed(completion) => {
                let passed = completion.passed;
                stages.push(completion);
                passed
            }
            StageOutcome::NoOp => true,
        }
    };

    let integrity = orchestrator.on_integrity(&submission_id, checksum_ok)?;
    if record(integrity) {
        let validation = orchestrator.on_validation(&submission_id, &records)?;
        if record(validation) {
            let submit = orchestrator.on_submit(&submission_id)?;
            if record(submit)
                && let Some(decision) = args.decision
            {
                let current = backend
                    .load_submission(&submission_id)?
                    .map(|submission| submission.status);
                if current == Some(SubmissionStatus::Pending) {
                    let approve = decision == DecisionArg::Approve;
                    let approval =
                        orchestrator.on_approval(&submission_id, &parent_organization, approve)?;
                    record(approval);
                } else {
                    info!("submission is not pending approval; decision ignored");
                }
            }
        }
    }

    let final_status = backend
        .load_submission(&submission_id)?
        .map(|submission| submission.status)
        .unwrap_or(SubmissionStatus::Error);
    let ledger = backend.ledger_entries(&submission_id)?;

    let result = ProcessResult {
        submission_id: submission_id.to_string(),
        category: category.to_string(),
        organization: organization.to_string(),
        status: final_status,
        stages,
        ledger,
        records: records.len(),
    };

    if let Some(path) = &args.json_report {
        write_json_report(path, &result)?;
    }

    Ok(result)
}

fn submission_id_for(args: &ProcessArgs) -> Result<SubmissionId> {
    let raw = match &args.submission_id {
        Some(id) => id.clone(),
        None => args
            .file
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(ToString::to_string)
            .unwrap_or_else(|| "submission".to_string()),
    };
    SubmissionId::new(raw).context("submission id")
}

fn reporting_period(args: &ProcessArgs, cadence: Cadence) -> Result<ReportingPeriod> {
    let year = args.year.unwrap_or_else(|| Utc::now().year());
    match (cadence, args.quarter) {
        (Cadence::Quarterly, Some(quarter)) => {
            ReportingPeriod::quarterly(year, quarter).context("reporting quarter")
        }
        (Cadence::Quarterly, None) => {
            bail!("category {} reports quarterly; pass --quarter", args.category)
        }
        (_, Some(_)) => {
            bail!(
                "category {} does not report quarterly; drop --quarter",
                args.category
            )
        }
        (_, None) => Ok(ReportingPeriod::annual(year)),
    }
}

fn write_json_report(path: &Path, result: &ProcessResult) -> Result<()> {
    let json = serde_json::to_string_pretty(result).context("serialize report")?;
    std::fs::write(path, format!("{json}\n"))
        .with_context(|| format!("write report to {}", path.display()))?;
    info!(path = %path.display(), "wrote JSON report");
    Ok(())
}
