//! Named schema loading and engine configuration for record schemas.
//!
//! This crate loads schema documents from disk (a directory with one
//! document per file, or a single [`SchemaPackage`](record_schema_core::SchemaPackage)
//! bundle) into a [`SchemaDatabase`], which resolves named schema references
//! for the core engines. [`EngineConfig`] reads the YAML file that names those
//! sources and the default engine options.
//!
//! # Quick start
//!
//! ```no_run
//! use record_schema_core::{Engine, Registry, Schema};
//! use record_schema_db::EngineConfig;
//! use serde_json::json;
//!
//! let config = EngineConfig::load("record-schema.yml").unwrap();
//! let db = config.open_database().unwrap();
//!
//! let order = Schema::from_value(&json!({"owner": {"type": "user"}})).unwrap();
//! let registry = Registry::default();
//! let engine = Engine::new(&registry).with_resolver(&db);
//! let result = engine
//!     .validate(&order, &json!({"owner": {"name": "Zim"}}), &config.validate)
//!     .unwrap();
//! println!("valid: {}", result.valid);
//! ```

mod config;
mod error;
mod loader;

pub use config::EngineConfig;
pub use error::{DatabaseError, Result};
pub use loader::{DatabaseBuilder, DatabaseSource, SchemaDatabase};
