//! Parsed submission record sets.
//!
//! A record set is the raw shape a submission arrives in: an ordered list of
//! column headers and rows of raw string cells. No typing happens here; the
//! validators interpret cells against the category schema.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The internal port key column populated by identity resolution. Present in
/// cleaned records for port-referencing categories; exempt from the
/// unknown-column check because it never appears in category schemas.
pub const PORT_KEY_COLUMN: &str = "port_key";

/// Columns carrying resolved identity values rather than submitter input.
pub const IDENTITY_COLUMNS: &[&str] = &[PORT_KEY_COLUMN];

pub fn is_identity_column(name: &str) -> bool {
    IDENTITY_COLUMNS
        .iter()
        .any(|col| col.eq_ignore_ascii_case(name))
}

/// One row of a submission: field name -> raw cell value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    values: BTreeMap<String, String>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut record = Self::new();
        for (key, value) in pairs {
            record.insert(key, value);
        }
        record
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.values.insert(field.into(), value.into());
    }

    /// Raw cell value for a field, if the column was present.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    /// Trimmed cell value, with absent and blank cells collapsed to `None`.
    pub fn value(&self, field: &str) -> Option<&str> {
        self.values
            .get(field)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn is_blank(&self, field: &str) -> bool {
        self.value(field).is_none()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A full submission's parsed rows plus the column headers in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSet {
    pub columns: Vec<String>,
    pub rows: Vec<Record>,
}

impl RecordSet {
    pub fn new(columns: Vec<String>, rows: Vec<Record>) -> Self {
        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|col| col.eq_ignore_ascii_case(name))
    }

    /// All raw values of one column in row order; absent cells become empty
    /// strings so row indices stay aligned.
    pub fn column_values(&self, name: &str) -> Vec<&str> {
        self.rows
            .iter()
            .map(|row| row.get(name).unwrap_or(""))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{Record, RecordSet, is_identity_column};

    #[test]
    fn value_collapses_blank_cells() {
        let record = Record::from_pairs([("station_id", "  ST-1  "), ("port_id", "   ")]);
        assert_eq!(record.value("station_id"), Some("ST-1"));
        assert_eq!(record.value("port_id"), None);
        assert_eq!(record.value("absent"), None);
        assert!(record.is_blank("port_id"));
    }

    #[test]
    fn column_values_align_rows() {
        let set = RecordSet::new(
            vec!["a".to_string()],
            vec![
                Record::from_pairs([("a", "1")]),
                Record::new(),
                Record::from_pairs([("a", "3")]),
            ],
        );
        assert_eq!(set.column_values("a"), vec!["1", "", "3"]);
    }

    #[test]
    fn identity_columns_are_case_insensitive() {
        assert!(is_identity_column("port_key"));
        assert!(is_identity_column("PORT_KEY"));
        assert!(!is_identity_column("station_id"));
    }
}
