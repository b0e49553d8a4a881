//! Building schemas from JSON/YAML documents.
//!
//! Documents carry everything except callbacks: custom predicates, computed
//! defaults and generators are attached afterwards with the builders on
//! [`FieldSpec`]. Attributes the engine does not know (descriptions, labels)
//! are ignored.

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Result, SchemaError};
use crate::rules::RuleConfig;
use crate::types::{DefaultValue, ErrorMessages, FieldSpec, FieldType, Schema, SubSchema};
use crate::value::{TypeTag, kind_name};

impl Schema {
    /// Parses a schema document.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidType`] for a `type` that is neither a
    /// string nor an object, [`SchemaError::MultiplePrimaryKeys`] when a level
    /// marks two primary keys, and [`SchemaError::Malformed`] for any other
    /// shape problem.
    ///
    /// # Examples
    ///
    /// ```
    /// use record_schema_core::{FieldType, Schema, SchemaError, TypeTag};
    /// use serde_json::json;
    ///
    /// let schema = Schema::from_value(&json!({
    ///     "name": {"type": "string", "required": true},
    ///     "owner": {"type": "user"},
    ///     "tags": {"type": "array", "schema": {"type": "string"}}
    /// }))
    /// .unwrap();
    ///
    /// assert_eq!(schema.get("name").unwrap().declared_tag(), Some(TypeTag::String));
    /// assert!(matches!(schema.get("owner").unwrap().kind, Some(FieldType::Ref(_))));
    ///
    /// let err = Schema::from_value(&json!({"age": {"type": 5}})).unwrap_err();
    /// assert!(matches!(err, SchemaError::InvalidType { .. }));
    /// ```
    pub fn from_value(value: &Value) -> Result<Schema> {
        parse_schema(value, "")
    }

    /// Parses a schema document from JSON text.
    pub fn from_json_str(json: &str) -> Result<Schema> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }
}

impl FieldSpec {
    /// Parses a single field document.
    pub fn from_value(value: &Value) -> Result<FieldSpec> {
        parse_field(value, "")
    }
}

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Schema::from_value(&value).map_err(de::Error::custom)
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn parse_schema(value: &Value, path: &str) -> Result<Schema> {
    let Some(map) = value.as_object() else {
        return Err(SchemaError::Malformed(format!(
            "schema at `{}` must be an object, found {}",
            display_path(path),
            kind_name(value)
        )));
    };
    let mut schema = Schema::new();
    for (key, field) in map {
        schema.insert(key.clone(), parse_field(field, &join(path, key))?);
    }
    schema.primary_key()?;
    Ok(schema)
}

fn parse_field(value: &Value, path: &str) -> Result<FieldSpec> {
    let Some(map) = value.as_object() else {
        return Err(SchemaError::Malformed(format!(
            "field `{}` must be an object, found {}",
            display_path(path),
            kind_name(value)
        )));
    };

    let mut spec = FieldSpec::new();
    for (attribute, raw) in map {
        match attribute.as_str() {
            "type" => spec.kind = Some(parse_type(raw, path)?),
            "default" => spec.default = Some(DefaultValue::Static(raw.clone())),
            "required" => spec.required = flag(raw, path, attribute)?,
            "allowNull" => spec.allow_null = Some(flag(raw, path, attribute)?),
            "protect" => spec.protect = flag(raw, path, attribute)?,
            "primaryKey" => spec.primary_key = flag(raw, path, attribute)?,
            "transforms" => spec.transforms = parse_transforms(raw, path)?,
            "rules" => spec.rules = parse_rules(raw, path)?,
            "errors" => {
                let errors: ErrorMessages = serde_json::from_value(raw.clone()).map_err(|_| {
                    malformed(path, "errors must be a string or a map of strings")
                })?;
                spec.errors = Some(errors);
            }
            "schema" => spec.schema = Some(parse_sub_schema(raw, path)?),
            "generate" => {
                return Err(malformed(
                    path,
                    "generators cannot be declared in documents; attach them in code",
                ));
            }
            other => debug!(field = path, attribute = other, "ignoring unknown field attribute"),
        }
    }
    Ok(spec)
}

fn parse_type(raw: &Value, path: &str) -> Result<FieldType> {
    match raw {
        Value::String(name) => Ok(match name.parse::<TypeTag>() {
            Ok(tag) => FieldType::Primitive(tag),
            Err(_) => FieldType::Ref(name.clone()),
        }),
        Value::Object(_) => Ok(FieldType::Inline(parse_schema(raw, path)?)),
        other => Err(SchemaError::InvalidType {
            field: display_path(path).to_string(),
            found: kind_name(other).to_string(),
        }),
    }
}

fn parse_sub_schema(raw: &Value, path: &str) -> Result<SubSchema> {
    match raw {
        Value::String(name) => Ok(SubSchema::Ref(name.clone())),
        Value::Object(map) if is_field_mapping(map) => Ok(SubSchema::Fields(parse_schema(raw, path)?)),
        Value::Object(_) => Ok(SubSchema::Field(Box::new(parse_field(raw, path)?))),
        other => Err(malformed(
            path,
            &format!("schema must be a string or an object, found {}", kind_name(other)),
        )),
    }
}

/// Attribute names a field document may carry.
const FIELD_ATTRIBUTES: &[&str] = &[
    "type",
    "default",
    "required",
    "allowNull",
    "protect",
    "primaryKey",
    "transforms",
    "rules",
    "errors",
    "schema",
    "generate",
];

/// A sub-schema is a field mapping when every value is an object and at
/// least one key is not a field attribute. `{"type": "string"}` and
/// `{"rules": {"minLength": 2}}` are single field specs.
fn is_field_mapping(map: &Map<String, Value>) -> bool {
    map.values().all(Value::is_object)
        && (map.is_empty() || !map.keys().all(|key| FIELD_ATTRIBUTES.contains(&key.as_str())))
}

fn parse_transforms(raw: &Value, path: &str) -> Result<Vec<String>> {
    match raw {
        Value::String(name) => Ok(vec![name.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| malformed(path, "transform names must be strings"))
            })
            .collect(),
        _ => Err(malformed(path, "transforms must be a list of names")),
    }
}

fn parse_rules(raw: &Value, path: &str) -> Result<Vec<(String, RuleConfig)>> {
    let Some(map) = raw.as_object() else {
        return Err(malformed(path, "rules must be a map of rule name to arguments"));
    };
    Ok(map
        .iter()
        .map(|(name, args)| (name.clone(), RuleConfig::from_value(args.clone())))
        .collect())
}

fn flag(raw: &Value, path: &str, attribute: &str) -> Result<bool> {
    raw.as_bool()
        .ok_or_else(|| malformed(path, &format!("{attribute} must be a boolean")))
}

fn malformed(path: &str, message: &str) -> SchemaError {
    SchemaError::Malformed(format!("field `{}`: {message}", display_path(path)))
}

fn display_path(path: &str) -> &str {
    if path.is_empty() { "<root>" } else { path }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_sub_schema_shapes() {
        let schema = Schema::from_value(&json!({
            "owner": {"schema": {"name": {"type": "string"}}},
            "tags": {"type": "array", "schema": {"type": "string"}},
            "friends": {"type": "array", "schema": "user"},
            "inline": {"type": {"id": {}}}
        }))
        .unwrap();

        assert!(matches!(schema.get("owner").unwrap().schema, Some(SubSchema::Fields(_))));
        assert!(matches!(schema.get("tags").unwrap().schema, Some(SubSchema::Field(_))));
        assert!(matches!(schema.get("friends").unwrap().schema, Some(SubSchema::Ref(_))));
        assert!(matches!(schema.get("inline").unwrap().kind, Some(FieldType::Inline(_))));
    }

    #[test]
    fn test_element_specs_with_object_attributes() {
        let schema = Schema::from_value(&json!({
            "tags": {"type": "array", "schema": {"rules": {"minLength": 2}}},
            "labels": {"type": "array", "schema": {
                "rules": {"maxLength": 8},
                "errors": {"maxLength": "Too long"}
            }},
            "points": {"type": "array", "schema": {"type": {"x": {}, "y": {}}}},
            "meta": {"schema": {"rules": {"type": "string"}, "notes": {}}}
        }))
        .unwrap();

        match &schema.get("tags").unwrap().schema {
            Some(SubSchema::Field(element)) => {
                assert_eq!(element.rules.len(), 1);
                assert_eq!(element.rules[0].0, "minLength");
            }
            other => panic!("unexpected: {other:?}"),
        }
        match &schema.get("labels").unwrap().schema {
            Some(SubSchema::Field(element)) => assert!(element.errors.is_some()),
            other => panic!("unexpected: {other:?}"),
        }
        match &schema.get("points").unwrap().schema {
            Some(SubSchema::Field(element)) => {
                assert!(matches!(element.kind, Some(FieldType::Inline(_))));
            }
            other => panic!("unexpected: {other:?}"),
        }
        match &schema.get("meta").unwrap().schema {
            Some(SubSchema::Fields(fields)) => assert!(fields.contains("rules")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_rules_and_errors() {
        let spec = FieldSpec::from_value(&json!({
            "rules": {"min": 1, "oneOf": ["a", "b"], "between": {"limits": [1, 5]}},
            "errors": {"min": "Too small", "default": "Invalid"}
        }))
        .unwrap();

        let names: Vec<_> = spec.rules.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["min", "oneOf", "between"]);
        assert_eq!(spec.rules[2].1.args(), &[json!(1), json!(5)]);
        assert!(matches!(spec.errors, Some(ErrorMessages::PerRule(_))));
    }

    #[test]
    fn test_field_order_is_preserved() {
        let schema = Schema::from_json_str(r#"{"z": {}, "a": {}, "m": {}}"#).unwrap();
        assert_eq!(schema.names().collect::<Vec<_>>(), vec!["z", "a", "m"]);
    }

    #[test]
    fn test_invalid_type_reports_path() {
        let err = Schema::from_value(&json!({"owner": {"schema": {"age": {"type": true}}}}))
            .unwrap_err();
        match err {
            SchemaError::InvalidType { field, found } => {
                assert_eq!(field, "owner.age");
                assert_eq!(found, "boolean");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_malformed_documents() {
        assert!(matches!(
            Schema::from_value(&json!(["a"])),
            Err(SchemaError::Malformed(_))
        ));
        assert!(matches!(
            Schema::from_value(&json!({"a": "string"})),
            Err(SchemaError::Malformed(_))
        ));
        assert!(matches!(
            Schema::from_value(&json!({"a": {"required": "yes"}})),
            Err(SchemaError::Malformed(_))
        ));
        assert!(matches!(
            Schema::from_value(&json!({"a": {"generate": {"ops": []}}})),
            Err(SchemaError::Malformed(_))
        ));
    }

    #[test]
    fn test_multiple_primary_keys_rejected() {
        let err = Schema::from_value(&json!({
            "id": {"primaryKey": true},
            "uid": {"primaryKey": true}
        }))
        .unwrap_err();
        assert!(matches!(err, SchemaError::MultiplePrimaryKeys(_, _)));
    }

    #[test]
    fn test_deserialize_via_serde() {
        let schema: Schema = serde_json::from_str(r#"{"a": {"type": "integer"}}"#).unwrap();
        assert_eq!(schema.get("a").unwrap().declared_tag(), Some(TypeTag::Integer));
        assert!(serde_json::from_str::<Schema>(r#"{"a": {"type": 1}}"#).is_err());
    }
}
