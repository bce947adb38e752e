use std::path::Path;
use std::str::FromStr;

use evr_model::{FieldDefinition, FieldType};

use crate::csv::{get_flag, get_string, header_index};
use crate::error::SchemaError;

/// One parsed field-definition row, before assembly into a category schema.
#[derive(Debug, Clone)]
pub struct FieldRow {
    pub category: String,
    pub definition: FieldDefinition,
    /// 1-based position within the category's unique key tuple, when the
    /// field participates in it.
    pub unique_key_order: Option<u32>,
    pub nullable_key: bool,
}

/// Parse a field-definition CSV.
///
/// The centralized source carries a `Category` column; the legacy
/// per-category files omit it and pass the category in via `category`.
/// Both layouts share the remaining columns, so one parser covers both.
pub fn parse_fields_csv(path: &Path, category: Option<&str>) -> Result<Vec<FieldRow>, SchemaError> {
    let bytes = std::fs::read(path).map_err(|e| SchemaError::io(path, e))?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes.as_slice());
    let headers = reader
        .headers()
        .map_err(|e| SchemaError::csv(path, e.to_string()))?
        .clone();

    let idx_category = header_index(&headers, "Category");
    let idx_name = header_index(&headers, "Field Name");
    let idx_required = header_index(&headers, "Required");
    let idx_recommended = header_index(&headers, "Recommended");
    let idx_type = header_index(&headers, "Type");
    let idx_max_length = header_index(&headers, "Max Length");
    let idx_integer_length = header_index(&headers, "Integer Length");
    let idx_min_value = header_index(&headers, "Min Value");
    let idx_max_precision = header_index(&headers, "Max Precision");
    let idx_max_scale = header_index(&headers, "Max Scale");
    let idx_allow_no_data = header_index(&headers, "Allow No Data");
    let idx_unique_key = header_index(&headers, "Unique Key");
    let idx_nullable_key = header_index(&headers, "Nullable Key");

    let mut results = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| SchemaError::csv(path, e.to_string()))?;

        let name =
            get_string(&row, idx_name).ok_or_else(|| SchemaError::csv(path, "missing Field Name"))?;
        let row_category = match category {
            Some(fixed) => fixed.to_string(),
            None => get_string(&row, idx_category).ok_or_else(|| {
                SchemaError::csv(path, format!("missing Category for field {name}"))
            })?,
        };

        let type_raw = get_string(&row, idx_type)
            .ok_or_else(|| SchemaError::csv(path, format!("missing Type for field {name}")))?;
        let datatype = FieldType::from_str(&type_raw).map_err(|message| SchemaError::InvalidField {
            category: row_category.clone(),
            field: name.clone(),
            message,
        })?;

        let required = get_flag(&row, idx_required);
        let recommended = get_flag(&row, idx_recommended);

        let definition = FieldDefinition {
            name: name.clone(),
            required,
            recommended: recommended || !required,
            datatype,
            max_length: parse_bound(&row_category, &name, get_string(&row, idx_max_length))?,
            integer_length: parse_bound(&row_category, &name, get_string(&row, idx_integer_length))?,
            min_value: parse_min_value(&row_category, &name, get_string(&row, idx_min_value))?,
            max_precision: parse_bound(&row_category, &name, get_string(&row, idx_max_precision))?,
            max_scale: parse_bound(&row_category, &name, get_string(&row, idx_max_scale))?,
            allow_no_data: get_flag(&row, idx_allow_no_data),
        };

        let unique_key_order = match get_string(&row, idx_unique_key) {
            Some(raw) => Some(raw.parse::<u32>().map_err(|_| SchemaError::InvalidField {
                category: row_category.clone(),
                field: name.clone(),
                message: format!("Unique Key must be a 1-based position, got {raw:?}"),
            })?),
            None => None,
        };

        results.push(FieldRow {
            category: row_category,
            definition,
            unique_key_order,
            nullable_key: get_flag(&row, idx_nullable_key),
        });
    }

    Ok(results)
}

fn parse_bound(category: &str, field: &str, raw: Option<String>) -> Result<Option<u32>, SchemaError> {
    match raw {
        None => Ok(None),
        Some(raw) => raw
            .parse::<u32>()
            .map(Some)
            .map_err(|_| SchemaError::InvalidField {
                category: category.to_string(),
                field: field.to_string(),
                message: format!("bound must be a non-negative integer, got {raw:?}"),
            }),
    }
}

fn parse_min_value(
    category: &str,
    field: &str,
    raw: Option<String>,
) -> Result<Option<f64>, SchemaError> {
    match raw {
        None => Ok(None),
        Some(raw) => raw
            .parse::<f64>()
            .map(Some)
            .map_err(|_| SchemaError::InvalidField {
                category: category.to_string(),
                field: field.to_string(),
                message: format!("Min Value must be numeric, got {raw:?}"),
            }),
    }
}
