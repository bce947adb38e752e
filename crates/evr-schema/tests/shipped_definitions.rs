//! The definition files shipped in the repository must load from both
//! sources and agree with each other.

use std::path::PathBuf;

use evr_model::Cadence;
use evr_schema::{SchemaRegistry, SchemaSource};

fn definitions_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../definitions")
}

#[test]
fn shipped_definitions_load_from_both_sources() {
    let central =
        SchemaRegistry::load(&definitions_dir(), SchemaSource::Central).expect("load central");
    let legacy =
        SchemaRegistry::load(&definitions_dir(), SchemaSource::Legacy).expect("load legacy");

    assert_eq!(central.len(), 5);
    assert_eq!(central.len(), legacy.len());
    for schema in central.categories() {
        let other = legacy
            .category_schema(&schema.category)
            .expect("category present in legacy source");
        assert_eq!(schema, other, "schema mismatch for {}", schema.category);
    }
}

#[test]
fn shipped_outages_category_models_nullable_port_keys() {
    let registry =
        SchemaRegistry::load(&definitions_dir(), SchemaSource::Central).expect("load central");
    let outages = registry
        .categories()
        .find(|schema| schema.category.as_str() == "outages")
        .expect("outages category");

    assert_eq!(outages.cadence, Cadence::Quarterly);
    assert_eq!(
        outages.unique_key_fields,
        vec!["station_id", "port_id", "outage_start"]
    );
    assert_eq!(outages.nullable_key_fields, vec!["port_id"]);
    assert!(outages.field("outage_end").expect("outage_end").allow_no_data);
}
