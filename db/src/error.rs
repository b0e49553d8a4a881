//! Error types for schema loading.
//!
//! Covers I/O, JSON/YAML decoding, schema documents that do not parse, and
//! fallback chains with no working source.

use record_schema_core::SchemaError;
use thiserror::Error;

/// Errors that can occur while loading schemas or configuration.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// A schema document was read but does not describe a valid schema.
    #[error("schema error: {0}")]
    SchemaError(#[from] SchemaError),

    /// A bundle file is not a usable package (e.g., empty version).
    #[error("invalid bundle: {0}")]
    InvalidBundle(String),

    /// All configured loader sources failed.
    #[error("no schema sources available")]
    NoSourcesAvailable,
}

/// Convenience alias for results with [`DatabaseError`].
pub type Result<T> = std::result::Result<T, DatabaseError>;
