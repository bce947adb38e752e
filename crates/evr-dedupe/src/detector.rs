//! Duplicate detection within a submission and against the shared index.

use std::collections::BTreeMap;

use tracing::debug;

use evr_model::{ConditionKind, RecordSet, SubmissionId, ValidationCondition};
use evr_model::CategorySchema;

use crate::keys::{KeyTuple, extract_key};
use crate::store::{AcceptedRecordsStore, StoreError, UniquenessScope};

/// Scope and identity of the submission being checked.
#[derive(Debug, Clone)]
pub struct DuplicateQuery {
    pub submission: SubmissionId,
    pub scope: UniquenessScope,
}

/// Find duplicate records in `records` against itself and against the
/// accepted-or-in-flight index.
///
/// Two distinct templates are reported: a key group with more than one row
/// in this submission yields one DUPLICATE_RECORD_IN_SAME_UPLOAD condition
/// naming every participating row; a group also held by other submissions
/// yields DUPLICATE_RECORD_IN_SYSTEM naming those submissions (the current
/// one excluded, ties reported collectively). When both apply to one group,
/// the same-upload report takes precedence.
pub fn find_duplicates(
    query: &DuplicateQuery,
    schema: &CategorySchema,
    records: &RecordSet,
    store: &dyn AcceptedRecordsStore,
) -> Result<Vec<ValidationCondition>, StoreError> {
    let mut groups: BTreeMap<String, (KeyTuple, Vec<usize>)> = BTreeMap::new();
    for (row, record) in records.rows.iter().enumerate() {
        if let Some(key) = extract_key(schema, record) {
            groups
                .entry(key.encoded())
                .or_insert_with(|| (key, Vec::new()))
                .1
                .push(row);
        }
    }

    let mut conditions = Vec::new();
    let key_header = schema.unique_key_fields.join(", ");

    // Same-upload duplicates first; these take reporting precedence.
    let mut flagged_in_upload: Vec<&str> = Vec::new();
    for (encoded, (key, rows)) in &groups {
        if rows.len() > 1 {
            flagged_in_upload.push(encoded.as_str());
            conditions.push(ValidationCondition::row(
                ConditionKind::DuplicateRecordInSameUpload,
                rows[0],
                &key_header,
                format!(
                    "duplicate within this submission: rows {} share key {}",
                    join_rows(rows),
                    key.display()
                ),
            ));
        }
    }

    let lookup_keys: Vec<String> = groups
        .keys()
        .filter(|encoded| !flagged_in_upload.contains(&encoded.as_str()))
        .cloned()
        .collect();
    if lookup_keys.is_empty() {
        return Ok(conditions);
    }

    let matches = store.find_matching_keys(&query.scope, &lookup_keys)?;
    for (encoded, holders) in matches {
        let Some((key, rows)) = groups.get(&encoded) else {
            continue;
        };
        let others: Vec<&SubmissionId> = holders
            .iter()
            .filter(|holder| **holder != query.submission)
            .collect();
        if others.is_empty() {
            continue;
        }
        let description = if others.len() == 1 {
            format!(
                "duplicate with submission {}: key {} is already reported",
                others[0],
                key.display()
            )
        } else {
            let ids: Vec<String> = others.iter().map(|id| id.to_string()).collect();
            format!(
                "duplicate with submissions {}: key {} is already reported",
                ids.join(", "),
                key.display()
            )
        };
        conditions.push(ValidationCondition::row(
            ConditionKind::DuplicateRecordInSystem,
            rows[0],
            &key_header,
            description,
        ));
    }

    debug!(
        submission = %query.submission,
        groups = groups.len(),
        conditions = conditions.len(),
        "duplicate check complete"
    );
    Ok(conditions)
}

fn join_rows(rows: &[usize]) -> String {
    let rendered: Vec<String> = rows.iter().map(|row| row.to_string()).collect();
    match rendered.split_last() {
        Some((last, rest)) if !rest.is_empty() => {
            format!("{} and {last}", rest.join(", "))
        }
        _ => rendered.join(", "),
    }
}
