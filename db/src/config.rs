//! Engine configuration file.
//!
//! Defines the YAML-serializable configuration naming where schemas live and
//! the default options for validate and format calls.
//!
//! # Example YAML
//!
//! ```yaml
//! version: "1.0"
//! schema_dirs:
//!   - schemas/
//! bundles:
//!   - dist/schemas.json
//! validate:
//!   strict: true
//! format:
//!   generate: once
//!   strip: null
//!   mapIdFrom: _id
//! ```

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use record_schema_core::{FormatOptions, ValidateOptions};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::loader::{DatabaseBuilder, SchemaDatabase};

/// Top-level engine configuration.
///
/// Schema sources are tried as a fallback chain: every directory in
/// `schema_dirs` first, then every file in `bundles`. Relative paths are
/// taken as given, relative to the working directory.
///
/// # Examples
///
/// ```
/// use record_schema_core::GenerateMode;
/// use record_schema_db::EngineConfig;
///
/// let yaml = r#"
/// version: "1.0"
/// format:
///   generate: once
///   mapIdFrom: _id
/// "#;
/// let config: EngineConfig = serde_yaml::from_str(yaml).unwrap();
/// assert_eq!(config.format.generate, GenerateMode::Once);
/// assert_eq!(config.format.map_id_from.as_deref(), Some("_id"));
/// assert!(config.format.defaults);
/// assert!(!config.validate.strict);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Configuration format version (e.g., `"1.0"`).
    pub version: String,
    /// Directories holding one schema document per file.
    #[serde(default)]
    pub schema_dirs: Vec<PathBuf>,
    /// Schema package files.
    #[serde(default)]
    pub bundles: Vec<PathBuf>,
    /// Default options for validate calls.
    #[serde(default)]
    pub validate: ValidateOptions,
    /// Default options for format calls.
    #[serde(default)]
    pub format: FormatOptions,
}

impl EngineConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::DatabaseError::IoError) if the file cannot
    /// be read, or [`YamlError`](crate::DatabaseError::YamlError) if parsing
    /// fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::DatabaseError::IoError) if the file cannot
    /// be written, or [`YamlError`](crate::DatabaseError::YamlError) if
    /// serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// The configured sources as a builder, directories first.
    pub fn database_builder(&self) -> DatabaseBuilder {
        let builder = self
            .schema_dirs
            .iter()
            .fold(SchemaDatabase::builder(), |builder, dir| builder.from_dir(dir));
        self.bundles
            .iter()
            .fold(builder, |builder, bundle| builder.from_bundle(bundle))
    }

    /// Loads the first configured source that works.
    ///
    /// # Errors
    ///
    /// Returns [`NoSourcesAvailable`](crate::DatabaseError::NoSourcesAvailable)
    /// if no source is configured or none loads.
    pub fn open_database(&self) -> Result<SchemaDatabase> {
        self.database_builder().build()
    }
}
