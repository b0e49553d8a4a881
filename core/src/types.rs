//! Schema data model.
//!
//! A [`Schema`] is an ordered list of named [`FieldSpec`]s. Field specs are
//! plain data plus optional callbacks (computed defaults, custom rules,
//! generator ops), so they can be built in code with the chaining builders
//! below or parsed from JSON/YAML documents with
//! [`Schema::from_value`](crate::Schema::from_value).

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{BoxError, Result, SchemaError};
use crate::generate::Generator;
use crate::rules::RuleConfig;
use crate::value::TypeTag;

/// A keyed record, as seen by cross-field rules.
pub type Record = Map<String, Value>;

/// What a field's `type` attribute declares.
#[derive(Debug, Clone)]
pub enum FieldType {
    /// One of the primitive tags.
    Primitive(TypeTag),
    /// An inline sub-schema.
    Inline(Schema),
    /// A named schema looked up through a [`SchemaResolver`](crate::SchemaResolver).
    Ref(String),
}

/// What a field's `schema` attribute declares.
#[derive(Debug, Clone)]
pub enum SubSchema {
    /// A keyed sub-record (or, under `type: array`, a list of them).
    Fields(Schema),
    /// A scalar spec, used for arrays of scalars.
    Field(Box<FieldSpec>),
    /// A named schema looked up through a resolver.
    Ref(String),
}

/// Borrowed view of a field's nested declaration, whichever attribute it
/// came from.
#[derive(Debug, Clone, Copy)]
pub enum NestedDecl<'a> {
    /// Keyed sub-schema.
    Fields(&'a Schema),
    /// Scalar element spec.
    Field(&'a FieldSpec),
    /// Named reference.
    Ref(&'a str),
}

/// Shared zero-argument default producer.
pub type DefaultFn = Arc<dyn Fn() -> std::result::Result<Value, BoxError> + Send + Sync>;

/// A field's `default` attribute.
#[derive(Clone)]
pub enum DefaultValue {
    /// Used as-is.
    Static(Value),
    /// Called every time a default is needed.
    Computed(DefaultFn),
}

impl DefaultValue {
    /// Produces the default value.
    pub fn resolve(&self) -> std::result::Result<Value, BoxError> {
        match self {
            DefaultValue::Static(value) => Ok(value.clone()),
            DefaultValue::Computed(produce) => produce(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Static(value) => f.debug_tuple("Static").field(value).finish(),
            DefaultValue::Computed(_) => f.write_str("Computed(<fn>)"),
        }
    }
}

/// A field's `errors` attribute.
///
/// # Examples
///
/// ```
/// use record_schema_core::ErrorMessages;
/// use serde_json::json;
///
/// let all: ErrorMessages = serde_json::from_value(json!("Invalid name")).unwrap();
/// assert!(matches!(all, ErrorMessages::All(_)));
///
/// let per_rule: ErrorMessages =
///     serde_json::from_value(json!({"min": "Too small", "default": "Bad"})).unwrap();
/// assert!(matches!(per_rule, ErrorMessages::PerRule(_)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorMessages {
    /// One message for every failing rule.
    All(String),
    /// Messages keyed by rule name, with `default` as the catch-all.
    PerRule(BTreeMap<String, String>),
}

/// Declaration of one field.
///
/// Every attribute is optional; [`FieldSpec::new`] declares a field with no
/// constraints at all.
///
/// # Examples
///
/// ```
/// use record_schema_core::{FieldSpec, TypeTag};
/// use serde_json::json;
///
/// let age = FieldSpec::of_type(TypeTag::Integer)
///     .required()
///     .with_rule("min", json!(0))
///     .with_error("min", "Age cannot be negative");
///
/// assert!(age.required);
/// assert_eq!(age.declared_tag(), Some(TypeTag::Integer));
/// assert_eq!(age.rules.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct FieldSpec {
    /// The `type` attribute.
    pub kind: Option<FieldType>,
    /// The `default` attribute.
    pub default: Option<DefaultValue>,
    /// Empty or absent values fail validation.
    pub required: bool,
    /// `Some(false)` forbids `null` and absence; otherwise `null` skips all
    /// other checks.
    pub allow_null: Option<bool>,
    /// Strip from formatted output unless protection is disabled.
    pub protect: bool,
    /// Transform names applied in order while formatting.
    pub transforms: Vec<String>,
    /// Rules applied in order while validating.
    pub rules: Vec<(String, RuleConfig)>,
    /// The `errors` attribute.
    pub errors: Option<ErrorMessages>,
    /// The `generate` attribute.
    pub generate: Option<Generator>,
    /// The `schema` attribute.
    pub schema: Option<SubSchema>,
    /// Target of `mapIdFrom` remapping.
    pub primary_key: bool,
}

impl FieldSpec {
    /// A field with no constraints.
    pub fn new() -> Self {
        Self::default()
    }

    /// A field with a primitive type.
    pub fn of_type(tag: TypeTag) -> Self {
        Self::new().with_type(FieldType::Primitive(tag))
    }

    /// A field whose type is a named schema.
    pub fn reference(name: impl Into<String>) -> Self {
        Self::new().with_type(FieldType::Ref(name.into()))
    }

    /// A sub-record field.
    pub fn nested(schema: Schema) -> Self {
        Self::new().with_schema(SubSchema::Fields(schema))
    }

    /// An array whose elements follow `element`.
    pub fn array_of(element: SubSchema) -> Self {
        Self::of_type(TypeTag::Array).with_schema(element)
    }

    /// Sets the `type` attribute.
    pub fn with_type(mut self, kind: FieldType) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Marks the field as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets the `allowNull` attribute.
    pub fn allow_null(mut self, allow: bool) -> Self {
        self.allow_null = Some(allow);
        self
    }

    /// Marks the field as protected.
    pub fn protected(mut self) -> Self {
        self.protect = true;
        self
    }

    /// Marks the field as the schema's primary key.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Sets a static default.
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(DefaultValue::Static(value));
        self
    }

    /// Sets a computed default.
    pub fn with_default_fn<F>(mut self, produce: F) -> Self
    where
        F: Fn() -> std::result::Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.default = Some(DefaultValue::Computed(Arc::new(produce)));
        self
    }

    /// Appends a transform name.
    pub fn with_transform(mut self, name: impl Into<String>) -> Self {
        self.transforms.push(name.into());
        self
    }

    /// Appends a registry rule; `args` is normalized like a document value.
    pub fn with_rule(mut self, name: impl Into<String>, args: Value) -> Self {
        self.rules.push((name.into(), RuleConfig::from_value(args)));
        self
    }

    /// Appends a field-local predicate.
    pub fn with_custom_rule<F>(mut self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(Option<&Value>, &[Value], Option<&Record>) -> std::result::Result<bool, BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.rules.push((name.into(), RuleConfig::custom(predicate)));
        self
    }

    /// Replaces the `errors` attribute.
    pub fn with_errors(mut self, errors: ErrorMessages) -> Self {
        self.errors = Some(errors);
        self
    }

    /// Adds one per-rule message, switching to per-rule form if needed.
    pub fn with_error(mut self, rule: impl Into<String>, message: impl Into<String>) -> Self {
        let mut map = match self.errors.take() {
            Some(ErrorMessages::PerRule(map)) => map,
            Some(ErrorMessages::All(all)) => BTreeMap::from([("default".to_string(), all)]),
            None => BTreeMap::new(),
        };
        map.insert(rule.into(), message.into());
        self.errors = Some(ErrorMessages::PerRule(map));
        self
    }

    /// Sets the generator.
    pub fn with_generator(mut self, generator: Generator) -> Self {
        self.generate = Some(generator);
        self
    }

    /// Sets the `schema` attribute.
    pub fn with_schema(mut self, schema: SubSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// The primitive tag from `type`, if any.
    pub fn declared_tag(&self) -> Option<TypeTag> {
        match &self.kind {
            Some(FieldType::Primitive(tag)) => Some(*tag),
            _ => None,
        }
    }

    /// Returns `true` if `type: array` is declared.
    pub fn is_array(&self) -> bool {
        self.declared_tag() == Some(TypeTag::Array)
    }

    /// Returns `true` for fields that may be skipped when unset: not
    /// required, `null`-tolerant and carrying no rules.
    pub fn is_optional(&self) -> bool {
        !self.required && self.allow_null != Some(false) && self.rules.is_empty()
    }

    /// The nested declaration, from `schema` first and then from `type`.
    pub fn nested_decl(&self) -> Option<NestedDecl<'_>> {
        match &self.schema {
            Some(SubSchema::Fields(schema)) => return Some(NestedDecl::Fields(schema)),
            Some(SubSchema::Field(spec)) => return Some(NestedDecl::Field(spec)),
            Some(SubSchema::Ref(name)) => return Some(NestedDecl::Ref(name)),
            None => {}
        }
        match &self.kind {
            Some(FieldType::Inline(schema)) => Some(NestedDecl::Fields(schema)),
            Some(FieldType::Ref(name)) => Some(NestedDecl::Ref(name)),
            _ => None,
        }
    }
}

/// An ordered mapping from field name to [`FieldSpec`].
///
/// # Examples
///
/// ```
/// use record_schema_core::{FieldSpec, Schema, TypeTag};
///
/// let schema = Schema::new()
///     .field("id", FieldSpec::new().primary_key())
///     .field("name", FieldSpec::of_type(TypeTag::String));
///
/// assert_eq!(schema.len(), 2);
/// assert_eq!(schema.names().collect::<Vec<_>>(), vec!["id", "name"]);
/// assert_eq!(schema.primary_key().unwrap(), Some("id"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<(String, FieldSpec)>,
}

impl Schema {
    /// An empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field, replacing any earlier field of the same name in place.
    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.insert(name, spec);
        self
    }

    /// Adds a field, replacing any earlier field of the same name in place.
    pub fn insert(&mut self, name: impl Into<String>, spec: FieldSpec) {
        let name = name.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = spec,
            None => self.fields.push((name, spec)),
        }
    }

    /// Looks up a field by name.
    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, spec)| spec)
    }

    /// Returns `true` if the schema declares `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    /// Field names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Number of declared fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if no fields are declared.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The single field marked as primary key, if any.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::MultiplePrimaryKeys`] if more than one field is
    /// marked.
    pub fn primary_key(&self) -> Result<Option<&str>> {
        let mut found: Option<&str> = None;
        for (name, spec) in self.fields() {
            if !spec.primary_key {
                continue;
            }
            if let Some(first) = found {
                return Err(SchemaError::MultiplePrimaryKeys(
                    first.to_string(),
                    name.to_string(),
                ));
            }
            found = Some(name);
        }
        Ok(found)
    }
}
