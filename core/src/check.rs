//! Structural checks for schemas and packages.
//!
//! The engines are lenient about schema mistakes that do not stop them
//! (an unknown transform is skipped, an unknown rule fails with
//! `Unknown: <rule>`). These checks surface such problems ahead of time,
//! typically when schemas are loaded.
//!
//! # Examples
//!
//! ```
//! use record_schema_core::*;
//! use serde_json::json;
//!
//! let registry = Registry::default();
//! let schema = Schema::new()
//!     .field("name", FieldSpec::of_type(TypeTag::String).with_transform("trim"));
//! assert!(check_schema(&schema, &registry).is_empty());
//!
//! let bad = Schema::new().field("name", FieldSpec::new().with_rule("isPrime", json!(true)));
//! let issues = check_schema(&bad, &registry);
//! assert!(matches!(&issues[0], SchemaIssue::UnknownRule { rule, .. } if rule == "isPrime"));
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::registry::Registry;
use crate::rules::{RuleConfig, compile_pattern};
use crate::types::{FieldSpec, NestedDecl, Schema};
use crate::SchemaPackage;

/// A structural problem in a schema or package.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaIssue {
    /// Package version string is empty.
    #[error("package version cannot be empty")]
    EmptyPackageVersion,
    /// A package entry has an empty name.
    #[error("schema name cannot be empty")]
    EmptySchemaName,
    /// A package document does not parse.
    #[error("schema `{name}` does not parse: {message}")]
    InvalidDocument {
        /// Package entry name.
        name: String,
        /// Parse failure.
        message: String,
    },
    /// A field name is empty or whitespace-only.
    #[error("field name cannot be empty at `{0}`")]
    EmptyFieldName(String),
    /// Two fields at the same level are marked as primary key.
    #[error("multiple primary keys at `{path}`: {first} and {second}")]
    MultiplePrimaryKeys {
        /// Path of the schema level.
        path: String,
        /// First marked field.
        first: String,
        /// Second marked field.
        second: String,
    },
    /// A primary key declares a sub-schema.
    #[error("primary key `{0}` cannot declare a sub-schema")]
    NestedPrimaryKey(String),
    /// A rule name the registry does not know, with no field-local predicate.
    #[error("unknown rule `{rule}` on `{field}`")]
    UnknownRule {
        /// Field path.
        field: String,
        /// Rule name.
        rule: String,
    },
    /// A transform name the registry does not know.
    #[error("unknown transform `{transform}` on `{field}`")]
    UnknownTransform {
        /// Field path.
        field: String,
        /// Transform name.
        transform: String,
    },
    /// A `match`/`notMatch` pattern that does not compile.
    #[error("invalid pattern for `{rule}` on `{field}`: {pattern}")]
    InvalidPattern {
        /// Field path.
        field: String,
        /// Rule name.
        rule: String,
        /// The pattern source.
        pattern: String,
    },
}

/// Checks a schema tree against `registry`.
///
/// Inline sub-schemas and element specs are checked recursively; named
/// references are not followed.
pub fn check_schema(schema: &Schema, registry: &Registry) -> Vec<SchemaIssue> {
    let mut issues = Vec::new();
    check_level(schema, registry, "", &mut issues);
    issues
}

/// Checks every document of a package.
///
/// # Examples
///
/// ```
/// use record_schema_core::*;
/// use serde_json::json;
///
/// let mut package = SchemaPackage::new("1.0.0", "2024-01-01T00:00:00Z");
/// package.insert("user", json!({"name": {"type": "string"}}));
/// assert!(check_package(&package, &Registry::default()).is_empty());
///
/// package.insert("order", json!({"total": {"type": 7}}));
/// let issues = check_package(&package, &Registry::default());
/// assert!(matches!(&issues[0], SchemaIssue::InvalidDocument { name, .. } if name == "order"));
/// ```
pub fn check_package(package: &SchemaPackage, registry: &Registry) -> Vec<SchemaIssue> {
    if package.version.trim().is_empty() {
        return vec![SchemaIssue::EmptyPackageVersion];
    }

    let mut issues = Vec::new();
    for (name, document) in &package.schemas {
        if name.trim().is_empty() {
            issues.push(SchemaIssue::EmptySchemaName);
            continue;
        }
        match Schema::from_value(document) {
            Ok(schema) => issues.extend(check_schema(&schema, registry)),
            Err(err) => issues.push(SchemaIssue::InvalidDocument {
                name: name.clone(),
                message: err.to_string(),
            }),
        }
    }
    issues
}

fn child_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn check_level(schema: &Schema, registry: &Registry, path: &str, issues: &mut Vec<SchemaIssue>) {
    let mut primary: Option<&str> = None;
    for (name, spec) in schema.fields() {
        let field = child_path(path, name);
        if name.trim().is_empty() {
            issues.push(SchemaIssue::EmptyFieldName(field.clone()));
        }
        if spec.primary_key {
            match primary {
                Some(first) => issues.push(SchemaIssue::MultiplePrimaryKeys {
                    path: path.to_string(),
                    first: first.to_string(),
                    second: name.to_string(),
                }),
                None => primary = Some(name),
            }
            if matches!(spec.nested_decl(), Some(NestedDecl::Fields(_))) {
                issues.push(SchemaIssue::NestedPrimaryKey(field.clone()));
            }
        }
        check_field(spec, registry, &field, issues);
    }
}

fn check_field(spec: &FieldSpec, registry: &Registry, field: &str, issues: &mut Vec<SchemaIssue>) {
    let mut seen = HashSet::new();
    for transform in &spec.transforms {
        if registry.transforms.get(transform).is_none() && seen.insert(transform.as_str()) {
            issues.push(SchemaIssue::UnknownTransform {
                field: field.to_string(),
                transform: transform.clone(),
            });
        }
    }

    for (rule, config) in &spec.rules {
        let RuleConfig::Args(args) = config else {
            continue;
        };
        if !registry.rules.contains(rule) {
            issues.push(SchemaIssue::UnknownRule {
                field: field.to_string(),
                rule: rule.clone(),
            });
            continue;
        }
        if rule == "match" || rule == "notMatch" {
            if let Some(pattern) = args.first().and_then(|arg| arg.as_str()) {
                let flags = args.get(1).and_then(|arg| arg.as_str()).unwrap_or("");
                if compile_pattern(pattern, flags).is_err() {
                    issues.push(SchemaIssue::InvalidPattern {
                        field: field.to_string(),
                        rule: rule.clone(),
                        pattern: pattern.to_string(),
                    });
                }
            }
        }
    }

    match spec.nested_decl() {
        Some(NestedDecl::Fields(schema)) => check_level(schema, registry, field, issues),
        Some(NestedDecl::Field(element)) => {
            check_field(element, registry, &format!("{field}[]"), issues)
        }
        Some(NestedDecl::Ref(_)) | None => {}
    }
}
