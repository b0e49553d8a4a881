//! Schema database loading with builder pattern and fallback chains.
//!
//! Provides [`SchemaDatabase`] for in-memory lookup of named schemas and
//! [`DatabaseBuilder`] for constructing a database from multiple sources with
//! automatic fallback. A database is a [`SchemaResolver`], so it plugs
//! straight into an [`Engine`](record_schema_core::Engine).
//!
//! # Loading patterns
//!
//! ```no_run
//! use record_schema_db::SchemaDatabase;
//!
//! // One schema per file: schemas/user.json, schemas/order.yaml, ...
//! let db = SchemaDatabase::from_dir("schemas/").unwrap();
//! assert!(db.get("user").is_some());
//!
//! // A single SchemaPackage bundle
//! let db = SchemaDatabase::from_bundle("schemas.json").unwrap();
//!
//! // Fallback chain
//! let db = SchemaDatabase::builder()
//!     .from_dir("schemas/")
//!     .from_bundle("schemas.json")
//!     .build()
//!     .unwrap();
//! ```

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use record_schema_core::{Schema, SchemaError, SchemaPackage, SchemaResolver};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{DatabaseError, Result};

/// Describes where a [`SchemaDatabase`] was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseSource {
    /// A directory with one schema document per file.
    Directory(PathBuf),
    /// A single [`SchemaPackage`] file.
    Bundle(PathBuf),
    /// An in-memory [`SchemaPackage`].
    Package,
    /// A fallback chain of multiple sources.
    Multiple(Vec<DatabaseSource>),
}

/// Document formats recognized by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    fn of(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Some(Self::Json),
            Some("yaml" | "yml") => Some(Self::Yaml),
            _ => None,
        }
    }

    fn read(self, path: &Path) -> Result<Value> {
        let reader = BufReader::new(File::open(path)?);
        Ok(match self {
            Self::Json => serde_json::from_reader(reader)?,
            Self::Yaml => serde_yaml::from_reader(reader)?,
        })
    }
}

/// In-memory collection of named schemas.
///
/// # Examples
///
/// ```
/// use record_schema_core::{Engine, FormatOptions, Registry, SchemaPackage, Schema};
/// use record_schema_db::SchemaDatabase;
/// use serde_json::json;
///
/// let mut package = SchemaPackage::new("1.0.0", "2024-01-15T10:30:00Z");
/// package.insert("user", json!({"name": {"type": "string", "transforms": ["trim"]}}));
/// let db = SchemaDatabase::from_package(&package).unwrap();
///
/// let order = Schema::from_value(&json!({"owner": {"type": "user"}})).unwrap();
/// let registry = Registry::default();
/// let out = Engine::new(&registry)
///     .with_resolver(&db)
///     .format(&order, Some(&json!({"owner": {"name": " Zim "}})), &FormatOptions::default())
///     .unwrap();
/// assert_eq!(out, json!({"owner": {"name": "Zim"}}));
/// ```
#[derive(Debug)]
pub struct SchemaDatabase {
    schemas: HashMap<String, Arc<Schema>>,
    source: DatabaseSource,
}

impl SchemaDatabase {
    /// Returns a new [`DatabaseBuilder`] for configuring a fallback chain.
    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::new()
    }

    /// Loads every `*.json`, `*.yaml` and `*.yml` file in a directory.
    ///
    /// Each file holds one schema document, registered under the file stem
    /// (`user.yaml` becomes `user`). Other files are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::IoError`] if the directory or a file cannot be
    /// read, [`DatabaseError::JsonError`]/[`DatabaseError::YamlError`] if a
    /// file does not decode, or [`DatabaseError::SchemaError`] naming the
    /// document that is not a valid schema.
    pub fn from_dir(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut schemas = HashMap::new();

        for entry in std::fs::read_dir(path)? {
            let file_path = entry?.path();
            let Some(format) = DocumentFormat::of(&file_path) else {
                continue;
            };
            let Some(name) = file_path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let document = format.read(&file_path)?;
            let schema = parse_document(name, &document)?;
            if schemas.insert(name.to_string(), Arc::new(schema)).is_some() {
                warn!(name, path = %file_path.display(), "schema defined twice, keeping last file read");
            }
        }

        debug!(path = %path.display(), count = schemas.len(), "loaded schema directory");
        Ok(Self {
            schemas,
            source: DatabaseSource::Directory(path.to_path_buf()),
        })
    }

    /// Loads a [`SchemaPackage`] file, JSON or YAML by extension.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::IoError`] if the file cannot be read,
    /// [`DatabaseError::JsonError`]/[`DatabaseError::YamlError`] if it does
    /// not decode, [`DatabaseError::InvalidBundle`] for an empty package
    /// version, or [`DatabaseError::SchemaError`] for a bad document.
    pub fn from_bundle(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let package: SchemaPackage = match DocumentFormat::of(path) {
            Some(DocumentFormat::Yaml) => serde_yaml::from_reader(reader)?,
            _ => serde_json::from_reader(reader)?,
        };

        let mut db = Self::from_package(&package)?;
        debug!(path = %path.display(), count = db.len(), "loaded schema bundle");
        db.source = DatabaseSource::Bundle(path.to_path_buf());
        Ok(db)
    }

    /// Builds a database from an in-memory package.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::InvalidBundle`] for an empty package version,
    /// or [`DatabaseError::SchemaError`] for a bad document.
    pub fn from_package(package: &SchemaPackage) -> Result<Self> {
        if package.version.trim().is_empty() {
            return Err(DatabaseError::InvalidBundle(
                "package version cannot be empty".into(),
            ));
        }
        Ok(Self {
            schemas: package.parse_schemas()?,
            source: DatabaseSource::Package,
        })
    }

    /// Looks up a schema by name.
    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name).map(Arc::as_ref)
    }

    /// Inserts a schema, replacing any existing entry with the same name.
    ///
    /// # Examples
    ///
    /// ```
    /// use record_schema_core::{FieldSpec, Schema, SchemaPackage, TypeTag};
    /// use record_schema_db::SchemaDatabase;
    ///
    /// let mut db = SchemaDatabase::from_package(&SchemaPackage::new("1.0.0", "")).unwrap();
    /// db.insert("tag", Schema::new().field("label", FieldSpec::of_type(TypeTag::String)));
    /// assert!(db.contains("tag"));
    /// ```
    pub fn insert(&mut self, name: impl Into<String>, schema: Schema) {
        self.schemas.insert(name.into(), Arc::new(schema));
    }

    /// Returns `true` if the database contains a schema called `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Returns the number of schemas in the database.
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Returns `true` if the database contains no schemas.
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Returns an iterator over schema names, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    /// Returns a reference to the source metadata.
    pub fn source(&self) -> &DatabaseSource {
        &self.source
    }
}

impl SchemaResolver for SchemaDatabase {
    fn resolve(&self, reference: &str) -> Option<Arc<Schema>> {
        self.schemas.get(reference).cloned()
    }
}

fn parse_document(name: &str, document: &Value) -> Result<Schema> {
    Schema::from_value(document).map_err(|source| {
        DatabaseError::SchemaError(SchemaError::Document {
            name: name.to_string(),
            source: Box::new(source),
        })
    })
}

/// Builder for constructing a [`SchemaDatabase`] with a fallback chain.
///
/// Sources are tried in the order they are added. The first successful load
/// wins; if all fail, [`DatabaseError::NoSourcesAvailable`] is returned.
///
/// # Example
///
/// ```no_run
/// use record_schema_db::SchemaDatabase;
///
/// let db = SchemaDatabase::builder()
///     .from_dir("/opt/schemas/")
///     .from_bundle("/opt/schemas.json")
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Default)]
pub struct DatabaseBuilder {
    sources: Vec<DatabaseSource>,
}

impl DatabaseBuilder {
    /// Creates a new builder with no sources.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a directory of schema documents as a source.
    pub fn from_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(DatabaseSource::Directory(path.into()));
        self
    }

    /// Adds a [`SchemaPackage`] bundle file as a source.
    pub fn from_bundle(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(DatabaseSource::Bundle(path.into()));
        self
    }

    /// Attempts to load schemas from configured sources in order.
    ///
    /// Returns the first successfully loaded database. If all sources fail,
    /// returns [`DatabaseError::NoSourcesAvailable`].
    pub fn build(self) -> Result<SchemaDatabase> {
        for source in &self.sources {
            let result = match source {
                DatabaseSource::Directory(path) => SchemaDatabase::from_dir(path),
                DatabaseSource::Bundle(path) => SchemaDatabase::from_bundle(path),
                DatabaseSource::Package | DatabaseSource::Multiple(_) => continue,
            };

            match result {
                Ok(mut db) => {
                    db.source = DatabaseSource::Multiple(self.sources.clone());
                    return Ok(db);
                }
                Err(err) => warn!(source = ?source, error = %err, "schema source failed, trying next"),
            }
        }

        Err(DatabaseError::NoSourcesAvailable)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use serde_json::json;

    use super::*;

    fn write_json(dir: &Path, name: &str, document: &Value) {
        let file = File::create(dir.join(format!("{name}.json"))).unwrap();
        serde_json::to_writer_pretty(file, document).unwrap();
    }

    fn write_package(path: &Path, names: &[&str]) {
        let mut package = SchemaPackage::new("1.0.0", "2024-01-01T00:00:00Z");
        for name in names {
            package.insert(*name, json!({"id": {"primaryKey": true}}));
        }
        let file = File::create(path).unwrap();
        serde_json::to_writer_pretty(file, &package).unwrap();
    }

    #[test]
    fn test_from_dir_mixed_formats() {
        let dir = tempfile::tempdir().unwrap();
        write_json(dir.path(), "user", &json!({"name": {"type": "string"}}));
        std::fs::write(
            dir.path().join("order.yaml"),
            "total:\n  type: number\n  rules:\n    min: 0\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("README.md"), "not a schema").unwrap();

        let db = SchemaDatabase::from_dir(dir.path()).unwrap();
        assert_eq!(db.len(), 2);
        assert!(db.get("user").unwrap().contains("name"));
        assert_eq!(db.get("order").unwrap().get("total").unwrap().rules.len(), 1);
        assert_eq!(db.source(), &DatabaseSource::Directory(dir.path().to_path_buf()));
    }

    #[test]
    fn test_from_dir_names_bad_document() {
        let dir = tempfile::tempdir().unwrap();
        write_json(dir.path(), "broken", &json!({"age": {"type": 1}}));

        let err = SchemaDatabase::from_dir(dir.path()).unwrap_err();
        assert!(matches!(
            err,
            DatabaseError::SchemaError(SchemaError::Document { ref name, .. }) if name == "broken"
        ));
    }

    #[test]
    fn test_from_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.json");
        write_package(&path, &["user", "order"]);

        let db = SchemaDatabase::from_bundle(&path).unwrap();
        assert_eq!(db.len(), 2);
        assert!(db.contains("user"));
        assert!(db.contains("order"));
        assert_eq!(db.source(), &DatabaseSource::Bundle(path));
    }

    #[test]
    fn test_empty_package_version_is_rejected() {
        let package = SchemaPackage::new("", "2024-01-01T00:00:00Z");
        assert!(matches!(
            SchemaDatabase::from_package(&package),
            Err(DatabaseError::InvalidBundle(_))
        ));
    }

    #[test]
    fn test_builder_fallback_first_fails() {
        let dir = tempfile::tempdir().unwrap();
        let bundle_path = dir.path().join("bundle.json");
        write_package(&bundle_path, &["user"]);

        let db = SchemaDatabase::builder()
            .from_dir("/nonexistent/dir/")
            .from_bundle(&bundle_path)
            .build()
            .unwrap();
        assert!(db.contains("user"));
        assert!(matches!(db.source(), DatabaseSource::Multiple(sources) if sources.len() == 2));
    }

    #[test]
    fn test_builder_all_fail() {
        let result = SchemaDatabase::builder()
            .from_dir("/nonexistent/dir1/")
            .from_bundle("/nonexistent/bundle1.json")
            .build();
        assert!(matches!(result, Err(DatabaseError::NoSourcesAvailable)));
        assert!(matches!(
            DatabaseBuilder::new().build(),
            Err(DatabaseError::NoSourcesAvailable)
        ));
    }

    #[test]
    fn test_resolver_shares_schemas() {
        let mut db = SchemaDatabase::from_package(&SchemaPackage::new("1.0.0", "")).unwrap();
        db.insert("user", Schema::new());

        let first = db.resolve("user").unwrap();
        let second = db.resolve("user").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(db.resolve("order").is_none());

        let mut names: Vec<&str> = db.names().collect();
        names.sort();
        assert_eq!(names, vec!["user"]);
    }
}
