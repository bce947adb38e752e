//! Category schema types.
//!
//! A category schema is the per-category contract a submission is validated
//! against: the ordered field definitions plus the unique-key field list.
//! Schemas are loaded once per process lifetime by the registry crate and
//! treated as immutable afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ids::CategoryId;
use crate::submission::Cadence;

/// Explicit "no data to report" marker, distinguished from an accidentally
/// blank required cell. Compared case-insensitively after trimming.
pub const NO_DATA_MARKER: &str = "N/A";

pub fn is_no_data_marker(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case(NO_DATA_MARKER)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Integer,
    Decimal,
    Boolean,
    Datetime,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Integer => "integer",
            FieldType::Decimal => "decimal",
            FieldType::Boolean => "boolean",
            FieldType::Datetime => "datetime",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "string" => Ok(FieldType::Text),
            "integer" | "int" => Ok(FieldType::Integer),
            "decimal" | "number" => Ok(FieldType::Decimal),
            "boolean" | "bool" => Ok(FieldType::Boolean),
            "datetime" | "timestamp" => Ok(FieldType::Datetime),
            other => Err(format!("unknown field type: {other}")),
        }
    }
}

/// One column's validation contract within a category schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    /// Every row must carry a value (or the no-data marker when
    /// `allow_no_data` is set).
    pub required: bool,
    /// Known, accepted column that rows may leave blank.
    pub recommended: bool,
    pub datatype: FieldType,
    /// Maximum character length for text fields.
    pub max_length: Option<u32>,
    /// Exact digit count for fixed-width integer codes (e.g. zip).
    pub integer_length: Option<u32>,
    /// Inclusive lower bound for integer/decimal fields.
    pub min_value: Option<f64>,
    /// Maximum total significant digits for decimal fields.
    pub max_precision: Option<u32>,
    /// Maximum fractional digits for decimal fields. Values with fewer
    /// fractional digits are valid (trailing zeros are assumed).
    pub max_scale: Option<u32>,
    /// Required field that may hold the explicit no-data marker instead of
    /// a value.
    pub allow_no_data: bool,
}

impl FieldDefinition {
    /// Plain field with no bounds, used as the base for builders in tests
    /// and the schema loaders.
    pub fn new(name: impl Into<String>, datatype: FieldType, required: bool) -> Self {
        Self {
            name: name.into(),
            required,
            recommended: !required,
            datatype,
            max_length: None,
            integer_length: None,
            min_value: None,
            max_precision: None,
            max_scale: None,
            allow_no_data: false,
        }
    }
}

/// The full per-category contract: ordered fields plus uniqueness keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySchema {
    pub category: CategoryId,
    pub label: String,
    pub cadence: Cadence,
    /// Ordered field definitions (required and recommended).
    pub fields: Vec<FieldDefinition>,
    /// Ordered field names that together must be unique within the
    /// organization hierarchy's accepted data.
    pub unique_key_fields: Vec<String>,
    /// Subset of `unique_key_fields` that may legitimately be empty; see the
    /// uniqueness detector's partitioning rules.
    pub nullable_key_fields: Vec<String>,
}

impl CategorySchema {
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields
            .iter()
            .find(|field| field.name.eq_ignore_ascii_case(name))
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.iter().filter(|field| field.required)
    }

    pub fn has_required_fields(&self) -> bool {
        self.fields.iter().any(|field| field.required)
    }

    /// True when `name` is a known (required or recommended) column.
    pub fn is_known_column(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn is_nullable_key_field(&self, name: &str) -> bool {
        self.nullable_key_fields
            .iter()
            .any(|field| field.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::{CategorySchema, FieldDefinition, FieldType, is_no_data_marker};
    use crate::ids::CategoryId;
    use crate::submission::Cadence;

    #[test]
    fn no_data_marker_is_case_insensitive() {
        assert!(is_no_data_marker("N/A"));
        assert!(is_no_data_marker(" n/a "));
        assert!(!is_no_data_marker(""));
        assert!(!is_no_data_marker("NA"));
    }

    #[test]
    fn field_lookup_ignores_case() {
        let schema = CategorySchema {
            category: CategoryId::new("outages").expect("category id"),
            label: "Outages".to_string(),
            cadence: Cadence::Quarterly,
            fields: vec![FieldDefinition::new("station_id", FieldType::Text, true)],
            unique_key_fields: vec!["station_id".to_string()],
            nullable_key_fields: Vec::new(),
        };
        assert!(schema.is_known_column("STATION_ID"));
        assert!(!schema.is_known_column("port_id"));
        assert!(schema.has_required_fields());
    }
}
