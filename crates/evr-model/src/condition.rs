//! Structured validation conditions and the error ledger entry shape.
//!
//! Every validator produces zero or more [`ValidationCondition`]s; the
//! pipeline persists them as ledger entries tied to a submission. A condition
//! with `error_row = None` is column-level (independent of any row).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::{CategoryId, OrganizationId, SubmissionId};

/// Stable condition templates. The ledger stores the rendered description;
/// the kind lets consumers group and count without parsing message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConditionKind {
    MissingValueForRequiredColumn,
    MissingRequiredColumn,
    UnknownColumn,
    EmptyImport,
    InvalidBoolean,
    InvalidInteger,
    InvalidDecimal,
    InvalidDatetime,
    ValueTooLong,
    IntegerLengthMismatch,
    ValueBelowMinimum,
    DecimalPrecisionExceeded,
    DecimalScaleExceeded,
    UnknownPortIdentifier,
    DuplicateRecordInSameUpload,
    DuplicateRecordInSystem,
    BusinessRuleViolation,
    IntegrityChecksumMismatch,
    InternalError,
}

impl ConditionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionKind::MissingValueForRequiredColumn => "MISSING_VALUE_FOR_REQUIRED_COLUMN",
            ConditionKind::MissingRequiredColumn => "MISSING_REQUIRED_COLUMN",
            ConditionKind::UnknownColumn => "UNKNOWN_COLUMN",
            ConditionKind::EmptyImport => "EMPTY_IMPORT",
            ConditionKind::InvalidBoolean => "INVALID_BOOLEAN",
            ConditionKind::InvalidInteger => "INVALID_INTEGER",
            ConditionKind::InvalidDecimal => "INVALID_DECIMAL",
            ConditionKind::InvalidDatetime => "INVALID_DATETIME",
            ConditionKind::ValueTooLong => "VALUE_TOO_LONG",
            ConditionKind::IntegerLengthMismatch => "INTEGER_LENGTH_MISMATCH",
            ConditionKind::ValueBelowMinimum => "VALUE_BELOW_MINIMUM",
            ConditionKind::DecimalPrecisionExceeded => "DECIMAL_PRECISION_EXCEEDED",
            ConditionKind::DecimalScaleExceeded => "DECIMAL_SCALE_EXCEEDED",
            ConditionKind::UnknownPortIdentifier => "UNKNOWN_PORT_IDENTIFIER",
            ConditionKind::DuplicateRecordInSameUpload => "DUPLICATE_RECORD_IN_SAME_UPLOAD",
            ConditionKind::DuplicateRecordInSystem => "DUPLICATE_RECORD_IN_SYSTEM",
            ConditionKind::BusinessRuleViolation => "BUSINESS_RULE_VIOLATION",
            ConditionKind::IntegrityChecksumMismatch => "INTEGRITY_CHECKSUM_MISMATCH",
            ConditionKind::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One validation finding against a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationCondition {
    pub kind: ConditionKind,
    /// Zero-based index over post-header data rows; `None` for column-level
    /// conditions.
    pub error_row: Option<usize>,
    /// The offending column header, or the key/stage name for conditions not
    /// tied to a single column.
    pub header_name: String,
    pub error_description: String,
}

impl ValidationCondition {
    /// Row-scoped condition.
    pub fn row(
        kind: ConditionKind,
        row: usize,
        header: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            error_row: Some(row),
            header_name: header.into(),
            error_description: description.into(),
        }
    }

    /// Column-level condition, independent of row count.
    pub fn column(
        kind: ConditionKind,
        header: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            error_row: None,
            header_name: header.into(),
            error_description: description.into(),
        }
    }
}

impl fmt::Display for ValidationCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.error_row {
            Some(row) => write!(
                f,
                "[{}] row {row}, column {}: {}",
                self.kind, self.header_name, self.error_description
            ),
            None => write!(
                f,
                "[{}] column {}: {}",
                self.kind, self.header_name, self.error_description
            ),
        }
    }
}

/// A persisted condition tied to its submission and organization scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub submission: SubmissionId,
    pub category: CategoryId,
    pub organization: OrganizationId,
    pub parent_organization: OrganizationId,
    pub condition: ValidationCondition,
}
