//! Record-set validation: column reconciliation plus per-cell checks.

use tracing::debug;

use evr_model::{
    CategorySchema, ConditionKind, Record, RecordSet, ValidationCondition, is_identity_column,
};

use crate::field::validate_field;

/// Outcome of validating one submission's record set against its category
/// schema.
#[derive(Debug, Clone)]
pub struct RecordSetValidation {
    pub is_compliant: bool,
    pub conditions: Vec<ValidationCondition>,
    /// Rows restricted to known and identity columns, cells trimmed. This is
    /// the shape later stages (uniqueness, persistence) consume.
    pub cleaned_records: RecordSet,
}

/// Validate a record set against its category schema.
///
/// Column names outside the schema's required and recommended fields each
/// yield one row-independent UNKNOWN_COLUMN condition; required columns
/// absent from the header yield MISSING_REQUIRED_COLUMN; every present known
/// column is run through the field validator. Identity columns (resolved
/// internal keys) pass through untouched and unchecked.
pub fn validate_record_set(schema: &CategorySchema, records: &RecordSet) -> RecordSetValidation {
    let mut conditions = Vec::new();

    for column in &records.columns {
        if is_identity_column(column) {
            continue;
        }
        if !schema.is_known_column(column) {
            conditions.push(ValidationCondition::column(
                ConditionKind::UnknownColumn,
                column,
                format!(
                    "column {column} is not defined for category {}",
                    schema.category
                ),
            ));
        }
    }

    for field in schema.required_fields() {
        if !records.has_column(&field.name) {
            conditions.push(ValidationCondition::column(
                ConditionKind::MissingRequiredColumn,
                &field.name,
                format!(
                    "required column {} is missing from the upload",
                    field.name
                ),
            ));
        }
    }

    if records.is_empty() && schema.has_required_fields() {
        conditions.push(ValidationCondition::column(
            ConditionKind::EmptyImport,
            schema.category.as_str(),
            "the upload contains no data rows".to_string(),
        ));
    }

    for column in &records.columns {
        if let Some(definition) = schema.field(column) {
            let values = records.column_values(column);
            conditions.extend(validate_field(definition, &values, 0));
        }
    }

    let cleaned_records = clean(schema, records);
    let is_compliant = conditions.is_empty();
    debug!(
        category = %schema.category,
        rows = records.len(),
        conditions = conditions.len(),
        "validated record set"
    );

    RecordSetValidation {
        is_compliant,
        conditions,
        cleaned_records,
    }
}

/// Keep known and identity columns, drop everything else, trim cells.
fn clean(schema: &CategorySchema, records: &RecordSet) -> RecordSet {
    let columns: Vec<String> = records
        .columns
        .iter()
        .filter(|column| schema.is_known_column(column) || is_identity_column(column))
        .cloned()
        .collect();

    let rows = records
        .rows
        .iter()
        .map(|row| {
            let mut cleaned = Record::new();
            for column in &columns {
                if is_identity_column(column) {
                    // Resolved identity values pass through verbatim.
                    if let Some(value) = row.get(column) {
                        cleaned.insert(column.clone(), value);
                    }
                } else if let Some(value) = row.get(column) {
                    cleaned.insert(column.clone(), value.trim());
                }
            }
            cleaned
        })
        .collect();

    RecordSet::new(columns, rows)
}
