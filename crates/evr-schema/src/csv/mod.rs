pub mod categories;
pub mod fields;

pub(crate) fn header_index(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name)
}

pub(crate) fn get_string(row: &csv::StringRecord, idx: Option<usize>) -> Option<String> {
    idx.and_then(|i| row.get(i))
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// Lenient boolean used by the definition CSVs ("true"/"yes"/"1").
pub(crate) fn get_flag(row: &csv::StringRecord, idx: Option<usize>) -> bool {
    get_string(row, idx)
        .map(|s| {
            let lower = s.to_ascii_lowercase();
            lower == "true" || lower == "yes" || lower == "1"
        })
        .unwrap_or(false)
}
