//! Error types for schema and engine failures.
//!
//! Only programmer-level problems surface here: malformed schemas, schema
//! references that cannot be resolved, and user-supplied callbacks that fail.
//! Data that does not satisfy a schema is never an error; it is reported
//! through [`ValidationResult`](crate::ValidationResult).

use thiserror::Error;

/// Boxed error returned by user-supplied predicates, generators and computed
/// defaults.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that abort a validate or format call.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A `type` attribute is neither a tag string nor an inline schema.
    #[error("invalid type declaration on field `{field}`: {found}")]
    InvalidType {
        /// Field carrying the bad declaration.
        field: String,
        /// JSON kind that was found instead.
        found: String,
    },

    /// Any other structural problem in a schema document.
    #[error("malformed schema: {0}")]
    Malformed(String),

    /// A string schema reference was found but no resolver is configured.
    #[error("schema reference `{0}` found but no resolver is configured")]
    NoResolver(String),

    /// The configured resolver does not know the reference.
    #[error("schema reference `{0}` could not be resolved")]
    Unresolved(String),

    /// More than one field at the same schema level is marked `primaryKey`.
    #[error("multiple primary keys declared: `{0}` and `{1}`")]
    MultiplePrimaryKeys(String, String),

    /// A custom rule predicate returned an error.
    #[error("custom rule `{rule}` failed: {source}")]
    Rule {
        /// Rule name as declared on the field.
        rule: String,
        /// Error raised by the predicate.
        #[source]
        source: BoxError,
    },

    /// A generator op or computed default returned an error.
    #[error("value generation for `{field}` failed: {source}")]
    Generator {
        /// Field being generated.
        field: String,
        /// Error raised by the callback.
        #[source]
        source: BoxError,
    },

    /// A named document in a package failed to parse.
    #[error("schema `{name}` is invalid: {source}")]
    Document {
        /// Name the document is registered under.
        name: String,
        /// The parse failure.
        #[source]
        source: Box<SchemaError>,
    },

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias for results with [`SchemaError`].
pub type Result<T> = std::result::Result<T, SchemaError>;
