//! Declarative record schemas: validation, formatting and value casting.
//!
//! A [`Schema`] maps field names to [`FieldSpec`]s. The same schema drives
//! two independent passes over JSON-shaped records:
//!
//! - [`validate`] checks declared types and rules and returns a
//!   [`ValidationResult`] whose errors mirror the shape of the data.
//! - [`format`] fills defaults, runs generators, applies transforms and strips
//!   protected or unwanted values, returning a new record.
//!
//! Rules and transforms are looked up by name in a [`Registry`]; the [`rules`],
//! [`transform`] and [`cast`] modules hold the built-ins. Named schema
//! references are resolved through a [`SchemaResolver`] handed to an
//! [`Engine`].
//!
//! # Example
//!
//! ```
//! use record_schema_core::*;
//! use serde_json::json;
//!
//! let schema = Schema::from_value(&json!({
//!     "id": {"primaryKey": true},
//!     "email": {
//!         "type": "string",
//!         "required": true,
//!         "transforms": ["trim", "lowercase"],
//!         "rules": {"isEmail": true},
//!         "errors": {"isEmail": "Not an email address"}
//!     },
//!     "role": {"type": "string", "default": "member"},
//!     "password": {"type": "string", "protect": true}
//! }))
//! .unwrap();
//!
//! let input = json!({"_id": "u1", "email": "  Zim@Irk.net ", "password": "hunter2"});
//! let options = FormatOptions {
//!     map_id_from: Some("_id".into()),
//!     ..FormatOptions::default()
//! };
//! let record = format(&schema, Some(&input), &options).unwrap();
//! assert_eq!(record, json!({"id": "u1", "email": "zim@irk.net", "role": "member"}));
//!
//! let result = validate(&schema, &json!({"email": "nope"}), &ValidateOptions::default()).unwrap();
//! assert!(!result.valid);
//! assert_eq!(result.error("email").unwrap().messages().unwrap(), ["Not an email address"]);
//! ```

pub mod cast;
mod check;
mod engine;
mod error;
mod format;
mod generate;
mod package;
mod parse;
mod registry;
mod resolve;
pub mod rules;
pub mod transform;
mod types;
mod validate;
mod value;

pub use check::{SchemaIssue, check_package, check_schema};
pub use engine::{Engine, check_value, format, format_value, validate, validate_value};
pub use error::{BoxError, Result, SchemaError};
pub use format::{FormatOptions, GenerateMode};
pub use generate::{GenerateGate, Generator, GeneratorFn, GeneratorOp};
pub use package::{SCHEMA_CONTRACT_VERSION, SchemaPackage};
pub use registry::Registry;
pub use resolve::SchemaResolver;
pub use types::{
    DefaultFn, DefaultValue, ErrorMessages, FieldSpec, FieldType, NestedDecl, Record, Schema,
    SubSchema,
};
pub use validate::{ErrorTree, ValidateOptions, ValidationResult, invalid_key_message};
pub use value::{TypeTag, UnknownTypeTag, is_empty, is_integer, matches_type, type_of};
