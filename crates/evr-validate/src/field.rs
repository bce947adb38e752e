//! Per-column cell validation against one field definition.

use evr_model::{ConditionKind, FieldDefinition, FieldType, ValidationCondition, is_no_data_marker};

use crate::datetime::parse_profile_datetime;
use crate::numeric::{parse_decimal, parse_integer};

/// Validate every cell of one column against its definition.
///
/// `row_offset` shifts the reported row indices when a column is validated
/// in chunks; the convention is zero-based over post-header data rows.
/// Each independent violation contributes its own condition, so one cell can
/// surface several.
pub fn validate_field(
    definition: &FieldDefinition,
    values: &[&str],
    row_offset: usize,
) -> Vec<ValidationCondition> {
    let mut conditions = Vec::new();

    for (idx, raw) in values.iter().enumerate() {
        let row = row_offset + idx;
        let value = raw.trim();

        if value.is_empty() {
            if definition.required {
                conditions.push(missing_value(definition, row));
            }
            continue;
        }

        if is_no_data_marker(value) && definition.allow_no_data {
            continue;
        }

        match definition.datatype {
            FieldType::Text => check_text(definition, value, row, &mut conditions),
            FieldType::Boolean => check_boolean(definition, value, row, &mut conditions),
            FieldType::Integer => check_integer(definition, value, row, &mut conditions),
            FieldType::Decimal => check_decimal(definition, value, row, &mut conditions),
            FieldType::Datetime => check_datetime(definition, value, row, &mut conditions),
        }
    }

    conditions
}

fn missing_value(definition: &FieldDefinition, row: usize) -> ValidationCondition {
    ValidationCondition::row(
        ConditionKind::MissingValueForRequiredColumn,
        row,
        &definition.name,
        format!("a value is required for column {}", definition.name),
    )
}

fn check_text(
    definition: &FieldDefinition,
    value: &str,
    row: usize,
    conditions: &mut Vec<ValidationCondition>,
) {
    if let Some(limit) = definition.max_length
        && value.chars().count() > limit as usize
    {
        conditions.push(ValidationCondition::row(
            ConditionKind::ValueTooLong,
            row,
            &definition.name,
            format!(
                "value is {} characters long; maximum is {limit}",
                value.chars().count()
            ),
        ));
    }
}

fn check_boolean(
    definition: &FieldDefinition,
    value: &str,
    row: usize,
    conditions: &mut Vec<ValidationCondition>,
) {
    if !value.eq_ignore_ascii_case("true") && !value.eq_ignore_ascii_case("false") {
        conditions.push(ValidationCondition::row(
            ConditionKind::InvalidBoolean,
            row,
            &definition.name,
            format!("{value:?} is not a boolean; expected true or false"),
        ));
    }
}

fn check_integer(
    definition: &FieldDefinition,
    value: &str,
    row: usize,
    conditions: &mut Vec<ValidationCondition>,
) {
    let parsed = match parse_integer(value) {
        Ok(parsed) => parsed,
        Err(error) => {
            conditions.push(ValidationCondition::row(
                ConditionKind::InvalidInteger,
                row,
                &definition.name,
                error.to_string(),
            ));
            return;
        }
    };

    if let Some(expected) = definition.integer_length
        && parsed.digits != expected
    {
        conditions.push(ValidationCondition::row(
            ConditionKind::IntegerLengthMismatch,
            row,
            &definition.name,
            format!(
                "value has {} digits; exactly {expected} are expected",
                parsed.digits
            ),
        ));
    }

    if let Some(min) = definition.min_value
        && (parsed.value as f64) < min
    {
        conditions.push(ValidationCondition::row(
            ConditionKind::ValueBelowMinimum,
            row,
            &definition.name,
            format!("value {} is below the minimum of {min}", parsed.value),
        ));
    }
}

fn check_decimal(
    definition: &FieldDefinition,
    value: &str,
    row: usize,
    conditions: &mut Vec<ValidationCondition>,
) {
    let parsed = match parse_decimal(value) {
        Ok(parsed) => parsed,
        Err(error) => {
            conditions.push(ValidationCondition::row(
                ConditionKind::InvalidDecimal,
                row,
                &definition.name,
                error.to_string(),
            ));
            return;
        }
    };

    let max_scale = definition.max_scale.unwrap_or(0);
    if definition.max_scale.is_some() && parsed.fraction_digits > max_scale {
        conditions.push(ValidationCondition::row(
            ConditionKind::DecimalScaleExceeded,
            row,
            &definition.name,
            format!(
                "value has {} fractional digits; maximum is {max_scale}",
                parsed.fraction_digits
            ),
        ));
    }

    if let Some(max_precision) = definition.max_precision {
        // Fewer written fractional digits than the scale still count toward
        // precision as if the trailing zeros were present.
        let effective = parsed.effective_precision(max_scale);
        if effective > max_precision {
            conditions.push(ValidationCondition::row(
                ConditionKind::DecimalPrecisionExceeded,
                row,
                &definition.name,
                format!("value occupies {effective} digits; maximum precision is {max_precision}"),
            ));
        }
    }

    if let Some(min) = definition.min_value
        && parsed.value < min
    {
        conditions.push(ValidationCondition::row(
            ConditionKind::ValueBelowMinimum,
            row,
            &definition.name,
            format!("value {} is below the minimum of {min}", parsed.value),
        ));
    }
}

fn check_datetime(
    definition: &FieldDefinition,
    value: &str,
    row: usize,
    conditions: &mut Vec<ValidationCondition>,
) {
    if let Err(error) = parse_profile_datetime(value) {
        conditions.push(ValidationCondition::row(
            ConditionKind::InvalidDatetime,
            row,
            &definition.name,
            error.to_string(),
        ));
    }
}
