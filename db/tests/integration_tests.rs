use std::path::Path;

use record_schema_core::{
    Engine, FormatOptions, Registry, Schema, SchemaError, SchemaPackage, ValidateOptions,
};
use record_schema_db::{DatabaseError, DatabaseSource, EngineConfig, SchemaDatabase};
use serde_json::{Value, json};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn user_document() -> Value {
    json!({
        "id": {"primaryKey": true},
        "name": {"type": "string", "required": true, "transforms": ["trim"]},
        "email": {"type": "string", "rules": {"isEmail": true}, "transforms": ["lowercase"]}
    })
}

fn order_schema() -> Schema {
    Schema::from_value(&json!({
        "owner": {"type": "user"},
        "items": {"type": "array", "schema": {
            "sku": {"type": "string", "required": true},
            "qty": {"type": "integer", "default": 1, "rules": {"min": 1}}
        }}
    }))
    .unwrap()
}

fn write_json(dir: &Path, name: &str, document: &Value) {
    let file = std::fs::File::create(dir.join(format!("{name}.json"))).unwrap();
    serde_json::to_writer_pretty(file, document).unwrap();
}

fn write_bundle(path: &Path) {
    let mut package = SchemaPackage::new("1.0.0", "2024-01-01T00:00:00Z");
    package.name = Some("accounts".into());
    package.insert("user", user_document());
    let file = std::fs::File::create(path).unwrap();
    serde_json::to_writer_pretty(file, &package).unwrap();
}

// ---------------------------------------------------------------------------
// Directory loading
// ---------------------------------------------------------------------------

#[test]
fn test_directory_loading() {
    let dir = tempfile::tempdir().unwrap();
    write_json(dir.path(), "user", &user_document());
    std::fs::write(
        dir.path().join("address.yml"),
        "city:\n  type: string\ncountry:\n  type: string\n  default: US\n",
    )
    .unwrap();

    let db = SchemaDatabase::from_dir(dir.path()).unwrap();
    assert_eq!(db.len(), 2);
    assert!(!db.is_empty());
    assert_eq!(db.get("user").unwrap().primary_key().unwrap(), Some("id"));
    assert!(db.get("address").unwrap().contains("country"));
}

// ---------------------------------------------------------------------------
// Resolving references through the database
// ---------------------------------------------------------------------------

#[test]
fn test_database_resolves_references() {
    let dir = tempfile::tempdir().unwrap();
    write_json(dir.path(), "user", &user_document());
    let db = SchemaDatabase::from_dir(dir.path()).unwrap();

    let registry = Registry::default();
    let engine = Engine::new(&registry).with_resolver(&db);
    let order = order_schema();

    let data = json!({
        "owner": {"name": " Zim ", "email": "ZIM@IRK.NET"},
        "items": [{"sku": "a"}, {"qty": 0}]
    });

    let result = engine.validate(&order, &data, &ValidateOptions::default()).unwrap();
    assert!(!result.valid);
    let item = result.error("items").unwrap().get("1").unwrap();
    assert_eq!(item.get("sku").unwrap().messages().unwrap(), ["Value is required"]);
    assert_eq!(item.get("qty").unwrap().messages().unwrap(), ["Failed: min"]);
    assert!(result.error("owner").is_none());

    let out = engine.format(&order, Some(&data), &FormatOptions::default()).unwrap();
    assert_eq!(out["owner"], json!({"name": "Zim", "email": "zim@irk.net"}));
    assert_eq!(out["items"][0], json!({"sku": "a", "qty": 1}));
}

#[test]
fn test_unknown_reference_is_a_schema_error() {
    let db = SchemaDatabase::from_package(&SchemaPackage::new("1.0.0", "")).unwrap();
    let registry = Registry::default();
    let err = Engine::new(&registry)
        .with_resolver(&db)
        .validate(
            &order_schema(),
            &json!({"owner": {"name": "Zim"}}),
            &ValidateOptions::default(),
        )
        .unwrap_err();
    assert!(matches!(err, SchemaError::Unresolved(ref name) if name == "user"));
}

// ---------------------------------------------------------------------------
// Bundle loading and fallback
// ---------------------------------------------------------------------------

#[test]
fn test_bundle_loading() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("schemas.json");
    write_bundle(&path);

    let db = SchemaDatabase::from_bundle(&path).unwrap();
    assert_eq!(db.names().collect::<Vec<_>>(), vec!["user"]);
    assert!(matches!(db.source(), DatabaseSource::Bundle(p) if p == &path));
}

#[test]
fn test_yaml_bundle_loading() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("schemas.yaml");
    let mut package = SchemaPackage::new("1.0.0", "2024-01-01T00:00:00Z");
    package.insert("user", user_document());
    std::fs::write(&path, serde_yaml::to_string(&package).unwrap()).unwrap();

    let db = SchemaDatabase::from_bundle(&path).unwrap();
    assert!(db.get("user").unwrap().get("name").unwrap().required);
}

#[test]
fn test_builder_fallback_to_bundle() {
    let dir = tempfile::tempdir().unwrap();
    let bundle_path = dir.path().join("schemas.json");
    write_bundle(&bundle_path);

    let db = SchemaDatabase::builder()
        .from_dir("/nonexistent/integ_test_dir/")
        .from_bundle(&bundle_path)
        .build()
        .unwrap();
    assert!(db.contains("user"));
}

#[test]
fn test_broken_directory_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let schemas = dir.path().join("schemas");
    std::fs::create_dir(&schemas).unwrap();
    write_json(&schemas, "user", &json!({"name": {"type": ["string"]}}));
    let bundle_path = dir.path().join("schemas.json");
    write_bundle(&bundle_path);

    assert!(matches!(
        SchemaDatabase::from_dir(&schemas),
        Err(DatabaseError::SchemaError(_))
    ));

    let db = SchemaDatabase::builder()
        .from_dir(&schemas)
        .from_bundle(&bundle_path)
        .build()
        .unwrap();
    assert!(db.get("user").unwrap().contains("email"));
}

// ---------------------------------------------------------------------------
// Config workflow
// ---------------------------------------------------------------------------

#[test]
fn test_config_workflow() {
    let dir = tempfile::tempdir().unwrap();
    let bundle_path = dir.path().join("schemas.json");
    write_bundle(&bundle_path);

    let yaml = format!(
        "version: \"1.0\"\nschema_dirs:\n  - {missing}\nbundles:\n  - {bundle}\nvalidate:\n  strict: true\nformat:\n  strict: true\n  mapIdFrom: _id\n",
        missing = dir.path().join("missing").display(),
        bundle = bundle_path.display(),
    );
    let config_path = dir.path().join("record-schema.yml");
    std::fs::write(&config_path, yaml).unwrap();

    let config = EngineConfig::load(&config_path).unwrap();
    let db = config.open_database().unwrap();
    assert!(matches!(db.source(), DatabaseSource::Multiple(sources) if sources.len() == 2));

    let registry = Registry::default();
    let engine = Engine::new(&registry).with_resolver(&db);
    let user = db.get("user").unwrap();

    let result = engine
        .validate(user, &json!({"name": "Zim", "planet": "Irk"}), &config.validate)
        .unwrap();
    assert!(result.error("planet").is_some());

    let out = engine
        .format(user, Some(&json!({"_id": 9, "name": " Gir ", "planet": "Irk"})), &config.format)
        .unwrap();
    assert_eq!(out, json!({"id": 9, "name": "Gir"}));
}
