use std::path::Path;

use tracing::debug;

use evr_model::{Record, RecordSet};

use crate::error::IngestError;

/// Read a submission CSV into a raw [`RecordSet`].
///
/// Headers are trimmed; cells are kept verbatim (the validators own
/// trimming and interpretation). Rows shorter than the header are padded
/// with empty cells so every record carries the full column set.
pub fn read_record_set(path: &Path) -> Result<RecordSet, IngestError> {
    let bytes = std::fs::read(path).map_err(|e| IngestError::io(path, e))?;
    let set = parse_record_set(path, &bytes)?;
    debug!(
        path = %path.display(),
        columns = set.columns.len(),
        rows = set.rows.len(),
        "read record set"
    );
    Ok(set)
}

/// Parse CSV bytes into a record set; split out so the pipeline can ingest
/// transport payloads without touching the filesystem.
pub fn parse_record_set(path: &Path, bytes: &[u8]) -> Result<RecordSet, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| IngestError::csv(path, e.to_string()))?
        .clone();
    if headers.is_empty() {
        return Err(IngestError::MissingHeader {
            path: path.to_path_buf(),
        });
    }

    let mut columns = Vec::with_capacity(headers.len());
    for header in headers.iter() {
        let name = header.trim().to_string();
        if columns
            .iter()
            .any(|existing: &String| existing.eq_ignore_ascii_case(&name))
        {
            return Err(IngestError::DuplicateHeader {
                path: path.to_path_buf(),
                header: name,
            });
        }
        columns.push(name);
    }

    let mut rows = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| IngestError::csv(path, e.to_string()))?;
        let mut record = Record::new();
        for (idx, column) in columns.iter().enumerate() {
            record.insert(column.clone(), row.get(idx).unwrap_or(""));
        }
        rows.push(record);
    }

    Ok(RecordSet::new(columns, rows))
}
