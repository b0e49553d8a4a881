//! Entry points.
//!
//! The free functions run against a snapshot of the process-wide
//! [`Registry`] and resolve no references. [`Engine`] takes both explicitly,
//! which is what tests and multi-tenant callers want.

use serde_json::Value;

use crate::error::Result;
use crate::format::{FormatOptions, Formatter};
use crate::registry::Registry;
use crate::resolve::SchemaResolver;
use crate::types::{FieldSpec, Record, Schema};
use crate::validate::{ValidateOptions, ValidationResult, Validator};

/// Validation and formatting bound to one registry and an optional
/// resolver.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use std::sync::Arc;
///
/// use record_schema_core::*;
/// use serde_json::json;
///
/// let mut schemas = HashMap::new();
/// schemas.insert(
///     "user".to_string(),
///     Arc::new(Schema::new().field("name", FieldSpec::of_type(TypeTag::String).required())),
/// );
///
/// let order = Schema::new().field("owner", FieldSpec::reference("user"));
/// let registry = Registry::default();
/// let engine = Engine::new(&registry).with_resolver(&schemas);
///
/// let result = engine
///     .validate(&order, &json!({"owner": {"name": ""}}), &ValidateOptions::default())
///     .unwrap();
/// assert!(!result.valid);
/// assert_eq!(
///     result.error("owner").unwrap().get("name").unwrap().messages().unwrap(),
///     ["Value is required"]
/// );
/// ```
#[derive(Clone, Copy)]
pub struct Engine<'a> {
    registry: &'a Registry,
    resolver: Option<&'a dyn SchemaResolver>,
}

impl<'a> Engine<'a> {
    /// An engine with no resolver.
    pub fn new(registry: &'a Registry) -> Self {
        Self {
            registry,
            resolver: None,
        }
    }

    /// Resolves named schema references through `resolver`.
    pub fn with_resolver(mut self, resolver: &'a dyn SchemaResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// The registry rules and transforms are looked up in.
    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    fn validator(&self, options: &ValidateOptions) -> Validator<'a> {
        Validator {
            registry: self.registry,
            resolver: self.resolver,
            options: *options,
        }
    }

    fn formatter<'o>(&self, options: &'o FormatOptions) -> Formatter<'o>
    where
        'a: 'o,
    {
        Formatter {
            registry: self.registry,
            resolver: self.resolver,
            options,
        }
    }

    /// Validates a record.
    pub fn validate(
        &self,
        schema: &Schema,
        data: &Value,
        options: &ValidateOptions,
    ) -> Result<ValidationResult> {
        self.validator(options).validate(schema, data)
    }

    /// Validates a standalone value against one field spec.
    pub fn validate_value(
        &self,
        spec: &FieldSpec,
        value: Option<&Value>,
        options: &ValidateOptions,
    ) -> Result<ValidationResult> {
        self.validator(options).validate_value(spec, value)
    }

    /// Runs the leaf checks for one value and returns the failure messages.
    pub fn check_value(
        &self,
        value: Option<&Value>,
        spec: &FieldSpec,
        context: Option<&Record>,
    ) -> Result<Vec<String>> {
        self.validator(&ValidateOptions::default())
            .check_value(value, spec, context)
    }

    /// Formats a record. `None` and `null` mint a fresh record.
    pub fn format(
        &self,
        schema: &Schema,
        data: Option<&Value>,
        options: &FormatOptions,
    ) -> Result<Value> {
        self.formatter(options).format(schema, data)
    }

    /// Formats a standalone value against one field spec.
    pub fn format_value(
        &self,
        spec: &FieldSpec,
        value: Option<&Value>,
        options: &FormatOptions,
    ) -> Result<Option<Value>> {
        self.formatter(options).format_value(spec, value)
    }
}

/// Validates `data` against `schema` using the global registry.
pub fn validate(schema: &Schema, data: &Value, options: &ValidateOptions) -> Result<ValidationResult> {
    let registry = Registry::snapshot();
    Engine::new(&registry).validate(schema, data, options)
}

/// Validates one value against one field spec using the global registry.
pub fn validate_value(
    spec: &FieldSpec,
    value: Option<&Value>,
    options: &ValidateOptions,
) -> Result<ValidationResult> {
    let registry = Registry::snapshot();
    Engine::new(&registry).validate_value(spec, value, options)
}

/// Leaf checks for one value using the global registry.
///
/// # Examples
///
/// ```
/// use record_schema_core::{FieldSpec, TypeTag, check_value};
/// use serde_json::json;
///
/// let spec = FieldSpec::of_type(TypeTag::String).with_rule("minLength", json!(3));
/// assert_eq!(check_value(Some(&json!("ab")), &spec, None).unwrap(), ["Failed: minLength"]);
/// assert!(check_value(Some(&json!(null)), &spec, None).unwrap().is_empty());
/// ```
pub fn check_value(value: Option<&Value>, spec: &FieldSpec, context: Option<&Record>) -> Result<Vec<String>> {
    let registry = Registry::snapshot();
    Engine::new(&registry).check_value(value, spec, context)
}

/// Formats `data` against `schema` using the global registry.
pub fn format(schema: &Schema, data: Option<&Value>, options: &FormatOptions) -> Result<Value> {
    let registry = Registry::snapshot();
    Engine::new(&registry).format(schema, data, options)
}

/// Formats one value against one field spec using the global registry.
pub fn format_value(spec: &FieldSpec, value: Option<&Value>, options: &FormatOptions) -> Result<Option<Value>> {
    let registry = Registry::snapshot();
    Engine::new(&registry).format_value(spec, value, options)
}
