use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Schema;
use crate::error::{Result, SchemaError};

/// Version of the package document layout.
pub const SCHEMA_CONTRACT_VERSION: &str = "1.0.0";

/// Serializable bundle of named schema documents.
///
/// Documents are kept in their JSON form so a package round-trips through
/// files unchanged; [`SchemaPackage::parse_schemas`] turns them into
/// [`Schema`] values ready for a resolver.
///
/// # Examples
///
/// ```
/// use record_schema_core::SchemaPackage;
/// use serde_json::json;
///
/// let mut package = SchemaPackage::new("1.0.0", "2024-01-15T10:30:00Z");
/// package.name = Some("accounts".into());
/// package.insert("user", json!({"name": {"type": "string", "required": true}}));
/// package.insert("order", json!({"owner": {"type": "user"}}));
///
/// assert_eq!(package.schema_count(), 2);
/// let schemas = package.parse_schemas().unwrap();
/// assert!(schemas["user"].get("name").unwrap().required);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaPackage {
    /// Layout version, from [`SCHEMA_CONTRACT_VERSION`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    /// Package version (semver string).
    pub version: String,
    /// Optional package name.
    pub name: Option<String>,
    /// Optional package description.
    pub description: Option<String>,
    /// ISO-8601 creation timestamp.
    pub generated_at: String,
    /// Schema documents by reference name.
    #[serde(default)]
    pub schemas: BTreeMap<String, Value>,
}

impl SchemaPackage {
    /// Creates an empty package.
    pub fn new(version: impl Into<String>, generated_at: impl Into<String>) -> Self {
        Self {
            schema_version: Some(SCHEMA_CONTRACT_VERSION.to_string()),
            version: version.into(),
            name: None,
            description: None,
            generated_at: generated_at.into(),
            schemas: BTreeMap::new(),
        }
    }

    /// Adds or replaces a schema document.
    pub fn insert(&mut self, name: impl Into<String>, document: Value) {
        self.schemas.insert(name.into(), document);
    }

    /// Returns the number of schema documents.
    pub fn schema_count(&self) -> usize {
        self.schemas.len()
    }

    /// Parses every document.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Document`] naming the first document that
    /// fails to parse.
    pub fn parse_schemas(&self) -> Result<HashMap<String, Arc<Schema>>> {
        self.schemas
            .iter()
            .map(|(name, document)| {
                let schema = Schema::from_value(document).map_err(|source| SchemaError::Document {
                    name: name.clone(),
                    source: Box::new(source),
                })?;
                Ok((name.clone(), Arc::new(schema)))
            })
            .collect()
    }
}
