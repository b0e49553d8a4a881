//! Record formatting.
//!
//! Builds a new record from a schema and optional input data. Each declared
//! field goes through a fixed pipeline:
//!
//! 1. sparse filtering (skip schema fields missing from the input),
//! 2. defaults,
//! 3. generation,
//! 4. sub-schema recursion,
//! 5. transforms,
//! 6. protected-field removal,
//! 7. sentinel stripping,
//!
//! and primary-key remapping runs once over the finished record. The input
//! is never modified.
//!
//! # Examples
//!
//! ```
//! use record_schema_core::*;
//! use serde_json::json;
//!
//! let schema = Schema::new()
//!     .field("x", FieldSpec::new()
//!         .with_generator(Generator::from_fn(|| json!("ab")))
//!         .with_transform("uppercase"));
//!
//! let out = format(&schema, Some(&json!({})), &FormatOptions::default()).unwrap();
//! assert_eq!(out, json!({"x": "AB"}));
//! ```

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, SchemaError};
use crate::generate::GenerateGate;
use crate::registry::Registry;
use crate::resolve::{Nested, SchemaResolver, resolve_nested};
use crate::types::{FieldSpec, Record, Schema};
use crate::value::is_empty;

/// Whether and which generators run during formatting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GenerateMode {
    /// No generators run.
    Off,
    /// Generators without the `once` gate run.
    #[default]
    On,
    /// All generators run, including `once`-gated ones.
    Once,
}

impl Serialize for GenerateMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            GenerateMode::Off => serializer.serialize_bool(false),
            GenerateMode::On => serializer.serialize_bool(true),
            GenerateMode::Once => serializer.serialize_str("once"),
        }
    }
}

impl<'de> Deserialize<'de> for GenerateMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Word(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Flag(false) => Ok(GenerateMode::Off),
            Raw::Flag(true) => Ok(GenerateMode::On),
            Raw::Word(word) if word == "once" => Ok(GenerateMode::Once),
            Raw::Word(word) => Err(de::Error::invalid_value(
                de::Unexpected::Str(&word),
                &"true, false or \"once\"",
            )),
        }
    }
}

/// Options for [`format`](crate::format).
///
/// # Examples
///
/// ```
/// use record_schema_core::{FormatOptions, GenerateMode};
/// use serde_json::json;
///
/// let options: FormatOptions = serde_json::from_value(json!({
///     "generate": "once",
///     "strip": null,
///     "mapIdFrom": "_id"
/// }))
/// .unwrap();
/// assert_eq!(options.generate, GenerateMode::Once);
/// assert_eq!(options.strip, vec![json!(null)]);
/// assert!(options.defaults);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FormatOptions {
    /// Drop output keys the schema does not declare.
    pub strict: bool,
    /// Only process schema fields present on the input.
    pub sparse: bool,
    /// Fill empty values from `default`.
    pub defaults: bool,
    /// Run generators.
    pub generate: GenerateMode,
    /// Also run `once`-gated generators.
    pub once: bool,
    /// Apply transform pipelines.
    pub transform: bool,
    /// Let protected fields through.
    pub protect: bool,
    /// Remove fields whose final value equals one of these.
    #[serde(deserialize_with = "one_or_many")]
    pub strip: Vec<Value>,
    /// Input key whose value is moved onto the primary-key field.
    pub map_id_from: Option<String>,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            strict: false,
            sparse: false,
            defaults: true,
            generate: GenerateMode::On,
            once: false,
            transform: true,
            protect: false,
            strip: Vec::new(),
            map_id_from: None,
        }
    }
}

impl FormatOptions {
    /// Returns `true` if `once`-gated generators should run.
    pub fn run_once(&self) -> bool {
        self.generate == GenerateMode::Once || self.once
    }
}

fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<Value>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items,
        single => vec![single],
    })
}

pub(crate) struct Formatter<'a> {
    pub(crate) registry: &'a Registry,
    pub(crate) resolver: Option<&'a dyn SchemaResolver>,
    pub(crate) options: &'a FormatOptions,
}

impl Formatter<'_> {
    /// Formats a record against a keyed schema.
    pub(crate) fn format(&self, schema: &Schema, data: Option<&Value>) -> Result<Value> {
        let input = match data {
            None | Some(Value::Null) => None,
            Some(Value::Object(record)) => Some(record),
            Some(other) => {
                debug!("non-object data passed through unformatted");
                return Ok(other.clone());
            }
        };

        let mut out = self.format_record(schema, input)?;
        if let Some(source) = &self.options.map_id_from {
            map_id(schema, input, source, !self.options.protect, &mut out)?;
        }
        Ok(Value::Object(out))
    }

    /// Runs the per-field pipeline for a standalone value.
    pub(crate) fn format_value(&self, spec: &FieldSpec, value: Option<&Value>) -> Result<Option<Value>> {
        self.format_spec("value", spec, value.cloned(), value.is_some())
    }

    fn format_record(&self, schema: &Schema, input: Option<&Record>) -> Result<Record> {
        let minting = input.is_none();
        let empty = Record::new();
        let input = input.unwrap_or(&empty);
        let mut out = if self.options.strict {
            Record::new()
        } else {
            input.clone()
        };

        for (key, spec) in schema.fields() {
            let present = input.contains_key(key);
            if self.options.sparse && !minting && !present {
                continue;
            }

            let value = self.format_spec(key, spec, input.get(key).cloned(), present)?;

            if spec.protect && !self.options.protect {
                out.shift_remove(key);
                continue;
            }
            match value {
                Some(value) if !self.options.strip.contains(&value) => {
                    out.insert(key.to_string(), value);
                }
                _ => {
                    out.shift_remove(key);
                }
            }
        }

        Ok(out)
    }

    /// Defaults, generation, recursion and transforms for one value.
    fn format_spec(
        &self,
        field: &str,
        spec: &FieldSpec,
        value: Option<Value>,
        present: bool,
    ) -> Result<Option<Value>> {
        let mut value = value;

        if self.options.defaults && is_empty(value.as_ref()) {
            if let Some(default) = &spec.default {
                let resolved = default.resolve().map_err(|source| SchemaError::Generator {
                    field: field.to_string(),
                    source,
                })?;
                value = Some(resolved);
            }
        }

        if self.options.generate != GenerateMode::Off {
            if let Some(generator) = &spec.generate {
                let gate = GenerateGate {
                    current: value.as_ref(),
                    key_present: present,
                    run_once: self.options.run_once(),
                };
                if generator.should_run(gate) {
                    value = generator.run(value).map_err(|source| SchemaError::Generator {
                        field: field.to_string(),
                        source,
                    })?;
                }
            }
        }

        if let Some(nested) = resolve_nested(spec, self.resolver)? {
            value = self.format_nested(field, &nested, value)?;
        }

        if self.options.transform && !spec.transforms.is_empty() {
            value = self.registry.transforms.apply(value, &spec.transforms);
        }

        Ok(value)
    }

    fn format_nested(
        &self,
        field: &str,
        nested: &Nested<'_>,
        value: Option<Value>,
    ) -> Result<Option<Value>> {
        match value {
            Some(Value::Array(items)) => {
                let formatted = items
                    .into_iter()
                    .map(|item| self.format_element(field, nested, item))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Some(Value::Array(formatted)))
            }
            Some(Value::Object(record)) => match nested {
                Nested::Fields(schema) => Ok(Some(Value::Object(
                    self.format_record(schema, Some(&record))?,
                ))),
                Nested::Field(element) => {
                    self.format_spec(field, element, Some(Value::Object(record)), true)
                }
            },
            Some(other) => match nested {
                Nested::Field(element) => self.format_spec(field, element, Some(other), true),
                Nested::Fields(_) => Ok(Some(other)),
            },
            None => Ok(None),
        }
    }

    fn format_element(&self, field: &str, nested: &Nested<'_>, item: Value) -> Result<Value> {
        match (nested, item) {
            (Nested::Fields(schema), Value::Object(record)) => {
                Ok(Value::Object(self.format_record(schema, Some(&record))?))
            }
            (Nested::Fields(_), other) => Ok(other),
            (Nested::Field(element), item) => Ok(self
                .format_spec(field, element, Some(item), true)?
                .unwrap_or(Value::Null)),
        }
    }
}

/// Moves `input[source]` onto the schema's primary-key field. A protected
/// primary key only loses the source key while protection is enforced.
fn map_id(
    schema: &Schema,
    input: Option<&Record>,
    source: &str,
    enforce_protect: bool,
    out: &mut Record,
) -> Result<()> {
    let Some(primary_key) = schema.primary_key()? else {
        return Ok(());
    };
    let Some(id) = input.and_then(|record| record.get(source)) else {
        return Ok(());
    };
    if primary_key != source {
        out.shift_remove(source);
    }
    let protected = schema.get(primary_key).is_some_and(|spec| spec.protect);
    if !(protected && enforce_protect) {
        out.insert(primary_key.to_string(), id.clone());
    }
    Ok(())
}
