use std::path::Path;
use std::str::FromStr;

use evr_model::Cadence;

use crate::csv::{get_string, header_index};
use crate::error::SchemaError;

#[derive(Debug, Clone)]
pub struct CategoryMeta {
    pub category: String,
    pub label: String,
    pub cadence: Cadence,
}

/// Parse the category listing (`categories.csv`): one row per reporting
/// category with its display label and submission cadence.
pub fn parse_categories_csv(path: &Path) -> Result<Vec<CategoryMeta>, SchemaError> {
    let bytes = std::fs::read(path).map_err(|e| SchemaError::io(path, e))?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes.as_slice());
    let headers = reader
        .headers()
        .map_err(|e| SchemaError::csv(path, e.to_string()))?
        .clone();

    let idx_category = header_index(&headers, "Category");
    let idx_label = header_index(&headers, "Label");
    let idx_cadence = header_index(&headers, "Cadence");

    let mut results = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| SchemaError::csv(path, e.to_string()))?;

        let category = get_string(&row, idx_category)
            .ok_or_else(|| SchemaError::csv(path, "missing Category"))?;
        let cadence_raw = get_string(&row, idx_cadence)
            .ok_or_else(|| SchemaError::csv(path, format!("missing Cadence for {category}")))?;
        let cadence = Cadence::from_str(&cadence_raw)
            .map_err(|message| SchemaError::csv(path, message))?;

        results.push(CategoryMeta {
            label: get_string(&row, idx_label).unwrap_or_else(|| category.clone()),
            category,
            cadence,
        });
    }

    results.sort_by(|a, b| a.category.cmp(&b.category));
    Ok(results)
}
