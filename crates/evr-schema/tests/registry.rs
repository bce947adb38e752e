//! Registry loading tests against generated definition directories.

use std::fs;
use std::path::Path;

use evr_model::{Cadence, CategoryId, FieldType};
use evr_schema::{SchemaError, SchemaRegistry, SchemaSource, sha256_hex};

const CATEGORIES_CSV: &str = "\
Category,Label,Cadence
outages,Charging Outages,quarterly
stations,Charging Stations,one-time
";

const CENTRAL_FIELDS_CSV: &str = "\
Category,Field Name,Required,Recommended,Type,Max Length,Integer Length,Min Value,Max Precision,Max Scale,Allow No Data,Unique Key,Nullable Key
stations,station_id,true,,text,64,,,,,,1,
stations,station_name,true,,text,100,,,,,,,
stations,num_ports,true,,integer,,,1,,,,,
outages,station_id,true,,text,64,,,,,,1,
outages,port_id,,true,text,64,,,,,,2,true
outages,outage_start,true,,datetime,,,,,,,3,
outages,outage_end,true,,datetime,,,,,,true,,
";

const LEGACY_STATIONS_CSV: &str = "\
Field Name,Required,Recommended,Type,Max Length,Integer Length,Min Value,Max Precision,Max Scale,Allow No Data,Unique Key,Nullable Key
station_id,true,,text,64,,,,,,1,
station_name,true,,text,100,,,,,,,
num_ports,true,,integer,,,1,,,,,
";

const LEGACY_OUTAGES_CSV: &str = "\
Field Name,Required,Recommended,Type,Max Length,Integer Length,Min Value,Max Precision,Max Scale,Allow No Data,Unique Key,Nullable Key
station_id,true,,text,64,,,,,,1,
port_id,,true,text,64,,,,,,2,true
outage_start,true,,datetime,,,,,,,3,
outage_end,true,,datetime,,,,,,true,,
";

struct Fixture {
    dir: tempfile::TempDir,
}

impl Fixture {
    fn write() -> Self {
        let dir = tempfile::tempdir().expect("create temp definitions dir");
        let root = dir.path();
        fs::create_dir_all(root.join("central")).expect("mkdir central");
        fs::create_dir_all(root.join("legacy")).expect("mkdir legacy");

        let files = [
            ("central/categories.csv", "central_categories", CATEGORIES_CSV),
            ("central/fields.csv", "central_fields", CENTRAL_FIELDS_CSV),
            ("legacy/categories.csv", "legacy_categories", CATEGORIES_CSV),
            (
                "legacy/stations.csv",
                "legacy_fields/stations",
                LEGACY_STATIONS_CSV,
            ),
            (
                "legacy/outages.csv",
                "legacy_fields/outages",
                LEGACY_OUTAGES_CSV,
            ),
        ];

        let mut manifest = String::from(
            "[manifest]\nschema = \"evreport.definitions-manifest\"\nschema_version = 1\n",
        );
        for (path, role, contents) in files {
            fs::write(root.join(path), contents).expect("write definition file");
            manifest.push_str(&format!(
                "\n[[files]]\npath = \"{path}\"\nsha256 = \"{}\"\nkind = \"csv\"\nrole = \"{role}\"\n",
                sha256_hex(contents.as_bytes())
            ));
        }
        fs::write(root.join("manifest.toml"), manifest).expect("write manifest");

        Self { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }
}

#[test]
fn loads_central_source() {
    let fixture = Fixture::write();
    let registry =
        SchemaRegistry::load(fixture.path(), SchemaSource::Central).expect("load central");

    assert_eq!(registry.len(), 2);
    let outages = registry
        .category_schema(&CategoryId::new("outages").expect("category id"))
        .expect("outages schema");
    assert_eq!(outages.cadence, Cadence::Quarterly);
    assert_eq!(
        outages.unique_key_fields,
        vec!["station_id", "port_id", "outage_start"]
    );
    assert_eq!(outages.nullable_key_fields, vec!["port_id"]);
    let outage_end = outages.field("outage_end").expect("outage_end field");
    assert!(outage_end.allow_no_data);
    assert_eq!(outage_end.datatype, FieldType::Datetime);
}

#[test]
fn legacy_source_yields_equivalent_schemas() {
    let fixture = Fixture::write();
    let central =
        SchemaRegistry::load(fixture.path(), SchemaSource::Central).expect("load central");
    let legacy = SchemaRegistry::load(fixture.path(), SchemaSource::Legacy).expect("load legacy");

    assert_eq!(central.len(), legacy.len());
    for schema in central.categories() {
        let other = legacy
            .category_schema(&schema.category)
            .expect("category present in legacy source");
        assert_eq!(schema, other, "schema mismatch for {}", schema.category);
    }
}

#[test]
fn unknown_category_lookup_fails() {
    let fixture = Fixture::write();
    let registry =
        SchemaRegistry::load(fixture.path(), SchemaSource::Central).expect("load central");
    let error = registry
        .category_schema(&CategoryId::new("sessions").expect("category id"))
        .expect_err("unknown category must fail");
    assert!(matches!(error, SchemaError::UnknownCategory { .. }));
}

#[test]
fn tampered_file_is_rejected() {
    let fixture = Fixture::write();
    fs::write(
        fixture.path().join("central/fields.csv"),
        CENTRAL_FIELDS_CSV.replace("station_name", "renamed"),
    )
    .expect("tamper with fields.csv");

    let error = SchemaRegistry::load(fixture.path(), SchemaSource::Central)
        .expect_err("sha mismatch must fail");
    assert!(matches!(error, SchemaError::Sha256Mismatch { .. }));
}

#[test]
fn unlisted_file_is_rejected() {
    let fixture = Fixture::write();
    fs::write(fixture.path().join("central/extra.csv"), "a,b\n").expect("write stray file");

    let error = SchemaRegistry::load(fixture.path(), SchemaSource::Central)
        .expect_err("unexpected file must fail");
    assert!(matches!(error, SchemaError::UnexpectedFile { .. }));
}
