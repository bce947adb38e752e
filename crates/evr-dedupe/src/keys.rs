//! Uniqueness key extraction.
//!
//! A record's key tuple is its category's `unique_key_fields` values,
//! encoded as `field=value` components joined by `|`. Nullable key fields
//! split records into two disjoint partitions:
//!
//! - rows whose nullable key fields are all empty carry a tuple restricted
//!   to the remaining key fields;
//! - every other row carries the full tuple.
//!
//! Because the encoding names its fields, the restricted and full tuples can
//! never collide, so the partitions cannot silently collapse into one group.

use evr_model::{CategorySchema, Record};

/// Which key-tuple shape a record fell into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPartition {
    /// All nullable key fields empty; tuple restricted to populated fields.
    NullKeys,
    /// Nullable key fields populated (or the category has none).
    FullKeys,
}

/// One record's extracted key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyTuple {
    pub partition: KeyPartition,
    components: Vec<(String, String)>,
}

impl KeyTuple {
    /// Encoded form used for grouping and store lookups.
    pub fn encoded(&self) -> String {
        let parts: Vec<String> = self
            .components
            .iter()
            .map(|(field, value)| format!("{field}={value}"))
            .collect();
        parts.join("|")
    }

    /// Human-readable form for condition descriptions.
    pub fn display(&self) -> String {
        self.encoded()
    }
}

/// Extract a record's key tuple, or `None` when every key field is blank
/// (such rows cannot meaningfully collide).
pub fn extract_key(schema: &CategorySchema, record: &Record) -> Option<KeyTuple> {
    let all_blank = schema
        .unique_key_fields
        .iter()
        .all(|field| record.is_blank(field));
    if all_blank {
        return None;
    }

    let has_nullable = !schema.nullable_key_fields.is_empty();
    let nullable_all_blank = has_nullable
        && schema
            .nullable_key_fields
            .iter()
            .all(|field| record.is_blank(field));

    let partition = if nullable_all_blank {
        KeyPartition::NullKeys
    } else {
        KeyPartition::FullKeys
    };

    let components = schema
        .unique_key_fields
        .iter()
        .filter(|field| {
            partition == KeyPartition::FullKeys || !schema.is_nullable_key_field(field)
        })
        .map(|field| {
            (
                field.clone(),
                record.value(field).unwrap_or_default().to_string(),
            )
        })
        .collect();

    Some(KeyTuple {
        partition,
        components,
    })
}

#[cfg(test)]
mod tests {
    use super::{KeyPartition, extract_key};
    use evr_model::{CategoryId, CategorySchema, Cadence, FieldDefinition, FieldType, Record};

    fn outage_schema() -> CategorySchema {
        CategorySchema {
            category: CategoryId::new("outages").expect("category id"),
            label: "Outages".to_string(),
            cadence: Cadence::Quarterly,
            fields: vec![
                FieldDefinition::new("station_id", FieldType::Text, true),
                FieldDefinition::new("port_id", FieldType::Text, false),
                FieldDefinition::new("outage_start", FieldType::Datetime, true),
            ],
            unique_key_fields: vec![
                "station_id".to_string(),
                "port_id".to_string(),
                "outage_start".to_string(),
            ],
            nullable_key_fields: vec!["port_id".to_string()],
        }
    }

    #[test]
    fn populated_nullable_fields_use_the_full_tuple() {
        let record = Record::from_pairs([
            ("station_id", "ST-1"),
            ("port_id", "P-1"),
            ("outage_start", "2025-05-01T08:00:00"),
        ]);
        let key = extract_key(&outage_schema(), &record).expect("key");
        assert_eq!(key.partition, KeyPartition::FullKeys);
        assert_eq!(
            key.encoded(),
            "station_id=ST-1|port_id=P-1|outage_start=2025-05-01T08:00:00"
        );
    }

    #[test]
    fn blank_nullable_fields_use_the_restricted_tuple() {
        let record = Record::from_pairs([
            ("station_id", "ST-1"),
            ("port_id", ""),
            ("outage_start", "2025-05-01T08:00:00"),
        ]);
        let key = extract_key(&outage_schema(), &record).expect("key");
        assert_eq!(key.partition, KeyPartition::NullKeys);
        assert_eq!(
            key.encoded(),
            "station_id=ST-1|outage_start=2025-05-01T08:00:00"
        );
    }

    #[test]
    fn partitions_never_share_an_encoding() {
        let with_port = Record::from_pairs([
            ("station_id", "ST-1"),
            ("port_id", "P-1"),
            ("outage_start", "2025-05-01T08:00:00"),
        ]);
        let without_port = Record::from_pairs([
            ("station_id", "ST-1"),
            ("outage_start", "2025-05-01T08:00:00"),
        ]);
        let full = extract_key(&outage_schema(), &with_port).expect("key");
        let restricted = extract_key(&outage_schema(), &without_port).expect("key");
        assert_ne!(full.encoded(), restricted.encoded());
    }

    #[test]
    fn fully_blank_keys_are_skipped() {
        let record = Record::from_pairs([("station_id", ""), ("outage_start", " ")]);
        assert!(extract_key(&outage_schema(), &record).is_none());
    }
}
