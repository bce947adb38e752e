//! Identity resolution for port-referencing categories.
//!
//! Submitters identify a port by the human-entered `station_id`/`port_id`
//! pair; the durable store keys port data on an internal key. Resolution
//! happens during the validation stage: resolved keys land in the cleaned
//! records' `port_key` column, unresolvable pairs become conditions, and
//! collaborator failures surface as infrastructure errors rather than
//! validation outcomes.

use evr_model::{
    CategorySchema, ConditionKind, OrganizationId, PORT_KEY_COLUMN, RecordSet,
    ValidationCondition,
};

const STATION_ID: &str = "station_id";
const PORT_ID: &str = "port_id";

/// External lookup from a human-entered key to the internal key, scoped to
/// the submitting organization. Any failure is transient infrastructure
/// trouble; `Ok(None)` is the not-found outcome.
pub trait IdentityResolver {
    fn lookup_identity(
        &self,
        human_key: &str,
        organization: &OrganizationId,
    ) -> Result<Option<String>, IdentityError>;
}

#[derive(Debug, thiserror::Error)]
#[error("identity lookup failed for {human_key}: {message}")]
pub struct IdentityError {
    pub human_key: String,
    pub message: String,
}

/// The human-entered key a port resolves under.
pub fn port_human_key(station_id: &str, port_id: &str) -> String {
    format!("{station_id}/{port_id}")
}

/// True when the category's records reference individual ports and need
/// resolution before uniqueness checks.
pub fn references_ports(schema: &CategorySchema) -> bool {
    schema.field(STATION_ID).is_some() && schema.field(PORT_ID).is_some()
}

/// Resolve the `port_key` column in place over cleaned records.
///
/// Rows with a blank `port_id` are station-scoped and skipped. Rows whose
/// pair does not resolve each yield an UNKNOWN_PORT_IDENTIFIER condition.
pub fn resolve_identities(
    schema: &CategorySchema,
    records: &mut RecordSet,
    organization: &OrganizationId,
    resolver: &dyn IdentityResolver,
) -> Result<Vec<ValidationCondition>, IdentityError> {
    if !references_ports(schema) {
        return Ok(Vec::new());
    }

    let mut conditions = Vec::new();
    let mut resolved_any = false;

    for (row, record) in records.rows.iter_mut().enumerate() {
        let human_key = match (record.value(STATION_ID), record.value(PORT_ID)) {
            (Some(station), Some(port)) => port_human_key(station, port),
            _ => continue,
        };
        match resolver.lookup_identity(&human_key, organization)? {
            Some(internal_key) => {
                record.insert(PORT_KEY_COLUMN, internal_key);
                resolved_any = true;
            }
            None => conditions.push(ValidationCondition::row(
                ConditionKind::UnknownPortIdentifier,
                row,
                PORT_ID,
                format!("no registered port matches {human_key}"),
            )),
        }
    }

    if resolved_any && !records.has_column(PORT_KEY_COLUMN) {
        records.columns.push(PORT_KEY_COLUMN.to_string());
    }

    Ok(conditions)
}

#[cfg(test)]
mod tests {
    use super::{IdentityError, IdentityResolver, resolve_identities};
    use evr_model::{
        CategoryId, CategorySchema, Cadence, ConditionKind, FieldDefinition, FieldType,
        OrganizationId, Record, RecordSet,
    };

    struct StaticResolver;

    impl IdentityResolver for StaticResolver {
        fn lookup_identity(
            &self,
            human_key: &str,
            _organization: &OrganizationId,
        ) -> Result<Option<String>, IdentityError> {
            match human_key {
                "ST-1/P-1" => Ok(Some("pk-101".to_string())),
                _ => Ok(None),
            }
        }
    }

    fn schema() -> CategorySchema {
        CategorySchema {
            category: CategoryId::new("outages").expect("category id"),
            label: "Outages".to_string(),
            cadence: Cadence::Quarterly,
            fields: vec![
                FieldDefinition::new("station_id", FieldType::Text, true),
                FieldDefinition::new("port_id", FieldType::Text, false),
            ],
            unique_key_fields: vec!["station_id".to_string(), "port_id".to_string()],
            nullable_key_fields: vec!["port_id".to_string()],
        }
    }

    #[test]
    fn resolves_known_pairs_and_flags_unknown() {
        let org = OrganizationId::new("org-a").expect("org id");
        let mut records = RecordSet::new(
            vec!["station_id".to_string(), "port_id".to_string()],
            vec![
                Record::from_pairs([("station_id", "ST-1"), ("port_id", "P-1")]),
                Record::from_pairs([("station_id", "ST-1"), ("port_id", "P-9")]),
                Record::from_pairs([("station_id", "ST-1"), ("port_id", "")]),
            ],
        );

        let conditions =
            resolve_identities(&schema(), &mut records, &org, &StaticResolver).expect("resolve");

        assert_eq!(records.rows[0].get("port_key"), Some("pk-101"));
        assert!(records.has_column("port_key"));
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].kind, ConditionKind::UnknownPortIdentifier);
        assert_eq!(conditions[0].error_row, Some(1));
        // Station-scoped rows resolve nothing and raise nothing.
        assert_eq!(records.rows[2].get("port_key"), None);
    }
}
