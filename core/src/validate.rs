//! Record validation.
//!
//! Walks a record against a [`Schema`], checking declared types and rules on
//! every field and recursing into sub-schemas, including arrays of
//! sub-records. Data problems are collected into an [`ErrorTree`]; only
//! schema problems and failing custom callbacks abort the walk.
//!
//! # Examples
//!
//! ```
//! use record_schema_core::*;
//! use serde_json::json;
//!
//! let schema = Schema::new()
//!     .field("name", FieldSpec::of_type(TypeTag::String).required())
//!     .field("age", FieldSpec::of_type(TypeTag::Integer).with_rule("min", json!(0)));
//!
//! let ok = validate(&schema, &json!({"name": "Zim", "age": 3}), &ValidateOptions::default()).unwrap();
//! assert!(ok.valid);
//! assert!(ok.errors.is_none());
//!
//! let bad = validate(&schema, &json!({"age": -1}), &ValidateOptions::default()).unwrap();
//! assert!(!bad.valid);
//! let errors = bad.errors.unwrap();
//! assert_eq!(errors.get("name").unwrap().messages().unwrap(), ["Value is required"]);
//! assert_eq!(errors.get("age").unwrap().messages().unwrap(), ["Failed: min"]);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, SchemaError};
use crate::registry::Registry;
use crate::resolve::{Nested, SchemaResolver, resolve_nested};
use crate::rules::{self, RuleOutcome, resolve_message};
use crate::types::{FieldSpec, FieldType, Record, Schema};
use crate::value::{TypeTag, is_empty, matches_type};

/// Options for [`validate`](crate::validate).
///
/// # Examples
///
/// ```
/// use record_schema_core::ValidateOptions;
/// use serde_json::json;
///
/// let options: ValidateOptions = serde_json::from_value(json!({"keyCheckOnly": true})).unwrap();
/// assert!(options.key_check_only);
/// assert!(!options.sparse);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ValidateOptions {
    /// Only check keys present on the data.
    pub sparse: bool,
    /// Reject data keys the schema does not declare before anything else.
    pub strict: bool,
    /// Run only the unknown-key check.
    pub key_check_only: bool,
}

/// Validation failures, shaped like the data that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorTree {
    /// Messages for a leaf value.
    Messages(Vec<String>),
    /// Failures keyed by field name, or by string index for arrays.
    Fields(BTreeMap<String, ErrorTree>),
}

impl ErrorTree {
    /// The subtree for a field name or array index.
    pub fn get(&self, key: &str) -> Option<&ErrorTree> {
        match self {
            ErrorTree::Fields(map) => map.get(key),
            ErrorTree::Messages(_) => None,
        }
    }

    /// Leaf messages, if this is a leaf.
    pub fn messages(&self) -> Option<&[String]> {
        match self {
            ErrorTree::Messages(messages) => Some(messages),
            ErrorTree::Fields(_) => None,
        }
    }

    /// Keys of a keyed tree, in sorted order.
    pub fn keys(&self) -> Vec<&str> {
        match self {
            ErrorTree::Fields(map) => map.keys().map(String::as_str).collect(),
            ErrorTree::Messages(_) => Vec::new(),
        }
    }
}

/// Outcome of a validation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// `true` when nothing failed.
    pub valid: bool,
    /// `None` when nothing failed.
    pub errors: Option<ErrorTree>,
}

impl ValidationResult {
    fn from_fields(errors: BTreeMap<String, ErrorTree>) -> Self {
        Self::from_tree(fields_tree(errors))
    }

    fn from_tree(errors: Option<ErrorTree>) -> Self {
        Self {
            valid: errors.is_none(),
            errors,
        }
    }

    /// The subtree for a top-level field.
    pub fn error(&self, key: &str) -> Option<&ErrorTree> {
        self.errors.as_ref().and_then(|tree| tree.get(key))
    }
}

/// Message for a data key the schema does not declare.
pub fn invalid_key_message(key: &str) -> String {
    format!("Invalid key: {key}")
}

fn required_message() -> String {
    "Value is required".to_string()
}

fn null_message() -> String {
    "Value cannot be null".to_string()
}

fn type_message(tag: TypeTag) -> String {
    format!("Value is not of type {tag}")
}

fn fields_tree(map: BTreeMap<String, ErrorTree>) -> Option<ErrorTree> {
    (!map.is_empty()).then_some(ErrorTree::Fields(map))
}

fn messages_tree(messages: Vec<String>) -> Option<ErrorTree> {
    (!messages.is_empty()).then_some(ErrorTree::Messages(messages))
}

/// The tag a value must satisfy, given the field's `type` attribute.
fn expected_tag(spec: &FieldSpec) -> Option<TypeTag> {
    match &spec.kind {
        Some(FieldType::Primitive(tag)) => Some(*tag),
        Some(FieldType::Inline(_)) | Some(FieldType::Ref(_)) => Some(TypeTag::Object),
        None => None,
    }
}

/// Data keys that `schema` does not declare, each mapped to an invalid-key
/// message.
fn invalid_keys(schema: &Schema, record: &Record) -> BTreeMap<String, ErrorTree> {
    record
        .keys()
        .filter(|key| !schema.contains(key))
        .map(|key| {
            (
                key.clone(),
                ErrorTree::Messages(vec![invalid_key_message(key)]),
            )
        })
        .collect()
}

pub(crate) struct Validator<'a> {
    pub(crate) registry: &'a Registry,
    pub(crate) resolver: Option<&'a dyn SchemaResolver>,
    pub(crate) options: ValidateOptions,
}

impl Validator<'_> {
    /// Validates a record against a keyed schema.
    pub(crate) fn validate(&self, schema: &Schema, data: &Value) -> Result<ValidationResult> {
        let Some(record) = data.as_object() else {
            return Ok(ValidationResult::from_tree(messages_tree(vec![type_message(
                TypeTag::Object,
            )])));
        };

        if self.options.strict || self.options.key_check_only {
            let invalid = invalid_keys(schema, record);
            if !invalid.is_empty() {
                debug!(count = invalid.len(), "rejecting undeclared keys");
                return Ok(ValidationResult::from_fields(invalid));
            }
            if self.options.key_check_only {
                return Ok(ValidationResult::from_fields(BTreeMap::new()));
            }
        }

        Ok(ValidationResult::from_fields(
            self.validate_record(schema, record)?,
        ))
    }

    /// Validates a standalone value against a single field spec.
    pub(crate) fn validate_value(
        &self,
        spec: &FieldSpec,
        value: Option<&Value>,
    ) -> Result<ValidationResult> {
        Ok(ValidationResult::from_tree(
            self.validate_spec(spec, value, None)?,
        ))
    }

    fn validate_record(&self, schema: &Schema, record: &Record) -> Result<BTreeMap<String, ErrorTree>> {
        let mut errors = BTreeMap::new();
        if self.options.sparse {
            for key in record.keys() {
                if let Some(spec) = schema.get(key) {
                    if let Some(tree) = self.validate_field(key, spec, record)? {
                        errors.insert(key.clone(), tree);
                    }
                }
            }
        } else {
            for (key, spec) in schema.fields() {
                if let Some(tree) = self.validate_field(key, spec, record)? {
                    errors.insert(key.to_string(), tree);
                }
            }
        }
        Ok(errors)
    }

    fn validate_field(&self, key: &str, spec: &FieldSpec, record: &Record) -> Result<Option<ErrorTree>> {
        let value = record.get(key);
        if spec.is_optional() && is_empty(value) {
            let defaulted = match &spec.default {
                Some(default) => Some(default.resolve().map_err(|source| SchemaError::Generator {
                    field: key.to_string(),
                    source,
                })?),
                None => None,
            };
            if is_empty(defaulted.as_ref()) {
                return Ok(None);
            }
        }
        self.validate_spec(spec, value, Some(record))
    }

    /// Checks one value against one spec, recursing when the spec declares
    /// a sub-schema.
    fn validate_spec(
        &self,
        spec: &FieldSpec,
        value: Option<&Value>,
        context: Option<&Record>,
    ) -> Result<Option<ErrorTree>> {
        let Some(nested) = resolve_nested(spec, self.resolver)? else {
            return Ok(messages_tree(self.check_value(value, spec, context)?));
        };

        // An array under a `type` sub-schema is a collection of records; the
        // object check applies per element instead.
        let collection = matches!(value, Some(Value::Array(_)))
            && matches!(spec.kind, Some(FieldType::Inline(_) | FieldType::Ref(_)));
        let own = self.leaf_checks(value, spec, context, !collection)?;
        if !own.is_empty() {
            return Ok(messages_tree(own));
        }
        let Some(value) = value.filter(|v| !v.is_null()) else {
            return Ok(None);
        };

        if let Value::Array(items) = value {
            let mut per_index = BTreeMap::new();
            for (index, item) in items.iter().enumerate() {
                if let Some(tree) = self.validate_element(&nested, item)? {
                    per_index.insert(index.to_string(), tree);
                }
            }
            return Ok(fields_tree(per_index));
        }
        if spec.is_array() {
            return Ok(messages_tree(vec![type_message(TypeTag::Array)]));
        }

        match nested {
            Nested::Field(element) => self.validate_spec(element, Some(value), context),
            Nested::Fields(schema) => {
                let Some(sub) = value.as_object() else {
                    return Ok(messages_tree(vec![type_message(TypeTag::Object)]));
                };
                let invalid = invalid_keys(&schema, sub);
                if !invalid.is_empty() {
                    debug!(count = invalid.len(), "rejecting undeclared nested keys");
                    return Ok(fields_tree(invalid));
                }
                Ok(fields_tree(self.validate_record(&schema, sub)?))
            }
        }
    }

    fn validate_element(&self, nested: &Nested<'_>, item: &Value) -> Result<Option<ErrorTree>> {
        match nested {
            Nested::Field(element) => self.validate_spec(element, Some(item), None),
            Nested::Fields(schema) => match item {
                Value::Object(sub) => Ok(fields_tree(self.validate_record(schema, sub)?)),
                Value::Null => Ok(None),
                _ => Ok(messages_tree(vec![type_message(TypeTag::Object)])),
            },
        }
    }

    /// The scalar leaf check: null handling, presence, declared type, then
    /// every declared rule in order.
    pub(crate) fn check_value(
        &self,
        value: Option<&Value>,
        spec: &FieldSpec,
        context: Option<&Record>,
    ) -> Result<Vec<String>> {
        self.leaf_checks(value, spec, context, true)
    }

    fn leaf_checks(
        &self,
        value: Option<&Value>,
        spec: &FieldSpec,
        context: Option<&Record>,
        check_type: bool,
    ) -> Result<Vec<String>> {
        let errors = spec.errors.as_ref();
        let mut messages = Vec::new();

        if matches!(value, Some(Value::Null)) {
            if spec.allow_null == Some(false) {
                messages.push(resolve_message(errors, rules::ALLOW_NULL, null_message));
            }
            return Ok(messages);
        }
        if value.is_none() && spec.allow_null == Some(false) {
            messages.push(resolve_message(errors, rules::ALLOW_NULL, null_message));
            return Ok(messages);
        }
        if spec.required && is_empty(value) {
            messages.push(resolve_message(errors, rules::REQUIRED, required_message));
            return Ok(messages);
        }

        if let (Some(v), Some(tag), true) = (value, expected_tag(spec), check_type) {
            if !matches_type(v, tag) {
                messages.push(resolve_message(errors, rules::TYPE, || type_message(tag)));
            }
        }

        for (name, config) in &spec.rules {
            let outcome = self
                .registry
                .rules
                .evaluate(name, config, value, context)
                .map_err(|source| SchemaError::Rule {
                    rule: name.clone(),
                    source,
                })?;
            match outcome {
                RuleOutcome::Passed => {}
                RuleOutcome::Failed => {
                    messages.push(resolve_message(errors, name, || rules::failed_message(name)));
                }
                RuleOutcome::Unknown => {
                    messages.push(resolve_message(errors, name, || rules::unknown_message(name)));
                }
            }
        }

        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::types::SubSchema;

    fn run(schema: &Schema, data: Value, options: ValidateOptions) -> ValidationResult {
        let registry = Registry::default();
        let validator = Validator {
            registry: &registry,
            resolver: None,
            options,
        };
        validator.validate(schema, &data).unwrap()
    }

    fn check(spec: &FieldSpec, value: Option<Value>) -> Vec<String> {
        let registry = Registry::default();
        let validator = Validator {
            registry: &registry,
            resolver: None,
            options: ValidateOptions::default(),
        };
        validator.check_value(value.as_ref(), spec, None).unwrap()
    }

    #[test]
    fn test_null_bypasses_checks_unless_forbidden() {
        let spec = FieldSpec::of_type(TypeTag::String).required().with_rule("minLength", json!(3));
        assert!(check(&spec, Some(json!(null))).is_empty());

        let strict = spec.allow_null(false);
        assert_eq!(check(&strict, Some(json!(null))), vec!["Value cannot be null"]);
        assert_eq!(check(&strict, None), vec!["Value cannot be null"]);
    }

    #[test]
    fn test_required_rejects_empty_values() {
        let spec = FieldSpec::of_type(TypeTag::String).required();
        assert_eq!(check(&spec, Some(json!(""))), vec!["Value is required"]);
        assert_eq!(check(&spec, None), vec!["Value is required"]);
        assert!(check(&spec, Some(json!("x"))).is_empty());
    }

    #[test]
    fn test_type_and_rule_failures_are_collected() {
        let spec = FieldSpec::of_type(TypeTag::Integer).with_rule("min", json!(10));
        assert_eq!(
            check(&spec, Some(json!("12"))),
            vec!["Value is not of type integer", "Failed: min"]
        );
    }

    #[test]
    fn test_unknown_rule_message() {
        let spec = FieldSpec::new().with_rule("isPalindrome", json!(true));
        assert_eq!(check(&spec, Some(json!("abba"))), vec!["Unknown: isPalindrome"]);
    }

    #[test]
    fn test_error_messages_override_builtin_checks() {
        let spec = FieldSpec::of_type(TypeTag::Integer).with_error("type", "Numbers only");
        assert_eq!(check(&spec, Some(json!("x"))), vec!["Numbers only"]);
    }

    #[test]
    fn test_rules_run_on_empty_values_of_ruled_fields() {
        let spec = FieldSpec::new().with_rule("empty", json!(false));
        assert_eq!(check(&spec, None), vec!["Failed: empty"]);
    }

    #[test]
    fn test_default_keeps_optional_field_in_play() {
        let schema = Schema::new().field(
            "n",
            FieldSpec::of_type(TypeTag::Integer).with_default(json!(1)),
        );
        assert!(run(&schema, json!({}), ValidateOptions::default()).valid);
        let result = run(&schema, json!({"n": ""}), ValidateOptions::default());
        assert_eq!(
            result.error("n").and_then(ErrorTree::messages).unwrap(),
            ["Value is not of type integer"]
        );
    }

    #[test]
    fn test_non_object_data_against_keyed_schema() {
        let schema = Schema::new().field("a", FieldSpec::new());
        let result = run(&schema, json!("scalar"), ValidateOptions::default());
        assert!(!result.valid);
        assert_eq!(
            result.errors,
            Some(ErrorTree::Messages(vec!["Value is not of type object".into()]))
        );
    }

    #[test]
    fn test_key_check_only_skips_rules() {
        let schema = Schema::new().field("a", FieldSpec::new().required());
        let options = ValidateOptions {
            key_check_only: true,
            ..Default::default()
        };
        assert!(run(&schema, json!({}), options).valid);
        let result = run(&schema, json!({"b": 1}), options);
        assert_eq!(result.error("b").and_then(ErrorTree::messages).unwrap(), ["Invalid key: b"]);
    }

    #[test]
    fn test_nested_object_strict_key_check_short_circuits() {
        let schema = Schema::new().field(
            "owner",
            FieldSpec::nested(
                Schema::new().field("name", FieldSpec::of_type(TypeTag::String).required()),
            ),
        );
        let result = run(&schema, json!({"owner": {"nick": "z"}}), ValidateOptions::default());
        let owner = result.error("owner").unwrap();
        assert_eq!(owner.keys(), vec!["nick"]);
        assert!(owner.get("name").is_none());
    }

    #[test]
    fn test_array_of_scalars() {
        let schema = Schema::new().field(
            "tags",
            FieldSpec::array_of(SubSchema::Field(Box::new(
                FieldSpec::of_type(TypeTag::String).with_rule("minLength", json!(2)),
            ))),
        );
        let result = run(&schema, json!({"tags": ["ok", "x", 3]}), ValidateOptions::default());
        let tags = result.error("tags").unwrap();
        assert_eq!(tags.keys(), vec!["1", "2"]);
        assert_eq!(tags.get("1").and_then(ErrorTree::messages).unwrap(), ["Failed: minLength"]);
        assert_eq!(
            tags.get("2").and_then(ErrorTree::messages).unwrap(),
            ["Value is not of type string", "Failed: minLength"]
        );
    }

    #[test]
    fn test_declared_array_rejects_single_object() {
        let schema = Schema::new().field(
            "items",
            FieldSpec::array_of(SubSchema::Fields(Schema::new().field("a", FieldSpec::new()))),
        );
        let result = run(&schema, json!({"items": {"a": 1}}), ValidateOptions::default());
        assert_eq!(
            result.error("items").and_then(ErrorTree::messages).unwrap(),
            ["Value is not of type array"]
        );
    }

    #[test]
    fn test_field_level_rules_apply_to_whole_array() {
        let schema = Schema::new().field(
            "items",
            FieldSpec::array_of(SubSchema::Fields(Schema::new()))
                .with_rule("minLength", json!(1)),
        );
        let result = run(&schema, json!({"items": []}), ValidateOptions::default());
        assert_eq!(
            result.error("items").and_then(ErrorTree::messages).unwrap(),
            ["Failed: minLength"]
        );
    }

    #[test]
    fn test_inline_type_iterates_arrays() {
        let schema = Schema::new().field(
            "gir",
            FieldSpec::new().with_type(FieldType::Inline(
                Schema::new().field("age", FieldSpec::of_type(TypeTag::Integer)),
            )),
        );
        let result = run(
            &schema,
            json!({"gir": [{"age": 2}, {"age": "x"}]}),
            ValidateOptions::default(),
        );
        let gir = result.error("gir").unwrap();
        assert!(gir.get("0").is_none());
        assert_eq!(
            gir.get("1").and_then(|e| e.get("age")).and_then(ErrorTree::messages).unwrap(),
            ["Value is not of type integer"]
        );

        let scalar = run(&schema, json!({"gir": 5}), ValidateOptions::default());
        assert_eq!(
            scalar.error("gir").and_then(ErrorTree::messages).unwrap(),
            ["Value is not of type object"]
        );
    }
}
