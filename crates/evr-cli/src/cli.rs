//! CLI argument definitions for the reporting pipeline driver.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "evr",
    version,
    about = "Charging infrastructure reporting pipeline",
    long_about = "Validate and process bulk CSV submissions of charging \
                  infrastructure data.\n\n\
                  Submissions are checked against per-category schemas, \
                  deduplicated within and across submissions, and driven \
                  through the status pipeline against a local in-memory \
                  backend."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a submission CSV through the full pipeline.
    Process(ProcessArgs),

    /// Validate a submission CSV without persisting anything.
    Validate(ValidateArgs),

    /// List the categories defined by the loaded schema registry.
    Categories(CategoriesArgs),
}

#[derive(Parser)]
pub struct DefinitionsArgs {
    /// Directory holding the schema definition files and their manifest.
    #[arg(long = "definitions-dir", value_name = "DIR", default_value = "definitions")]
    pub definitions_dir: PathBuf,

    /// Which definition source backs the registry.
    #[arg(long = "schema-source", value_enum, default_value = "central")]
    pub schema_source: SchemaSourceArg,
}

#[derive(Parser)]
pub struct ProcessArgs {
    /// Path to the submission CSV.
    #[arg(value_name = "CSV")]
    pub file: PathBuf,

    #[command(flatten)]
    pub definitions: DefinitionsArgs,

    /// Reporting category of the submission.
    #[arg(long = "category", value_name = "CATEGORY")]
    pub category: String,

    /// Submitting organization.
    #[arg(long = "organization", value_name = "ORG", default_value = "org-local")]
    pub organization: String,

    /// Direct recipient the submitter reports to (defaults to the
    /// submitting organization).
    #[arg(long = "parent-organization", value_name = "ORG")]
    pub parent_organization: Option<String>,

    /// Submitter tier.
    #[arg(long = "tier", value_enum, default_value = "direct")]
    pub tier: TierArg,

    /// Reporting year.
    #[arg(long = "year", value_name = "YEAR")]
    pub year: Option<i32>,

    /// Reporting quarter (required for quarterly categories).
    #[arg(long = "quarter", value_name = "1-4")]
    pub quarter: Option<u8>,

    /// Submission id (defaults to the CSV file stem).
    #[arg(long = "submission-id", value_name = "ID")]
    pub submission_id: Option<String>,

    /// Declared upload checksum to verify the file against.
    #[arg(long = "checksum", value_name = "SHA256")]
    pub checksum: Option<String>,

    /// Approval decision applied after submit (subordinate submissions).
    #[arg(long = "decision", value_enum)]
    pub decision: Option<DecisionArg>,

    /// Write a JSON report of the run to a file.
    #[arg(long = "json-report", value_name = "PATH")]
    pub json_report: Option<PathBuf>,
}

#[derive(Parser)]
pub struct ValidateArgs {
    /// Path to the submission CSV.
    #[arg(value_name = "CSV")]
    pub file: PathBuf,

    #[command(flatten)]
    pub definitions: DefinitionsArgs,

    /// Reporting category of the submission.
    #[arg(long = "category", value_name = "CATEGORY")]
    pub category: String,

    /// Reference date for eligibility-dependent business rules
    /// (YYYY-MM-DD; defaults to today).
    #[arg(long = "reference-date", value_name = "DATE")]
    pub reference_date: Option<String>,
}

#[derive(Parser)]
pub struct CategoriesArgs {
    #[command(flatten)]
    pub definitions: DefinitionsArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SchemaSourceArg {
    Central,
    Legacy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TierArg {
    Direct,
    Subordinate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DecisionArg {
    Approve,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
