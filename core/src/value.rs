//! Type predicates over record values.
//!
//! Records are plain [`serde_json::Value`]s. An absent value ("undefined") is
//! modeled as `None` wherever these helpers take an `Option<&Value>`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Primitive type tags a field may declare.
///
/// # Examples
///
/// ```
/// use record_schema_core::TypeTag;
///
/// let tag: TypeTag = "integer".parse().unwrap();
/// assert_eq!(tag, TypeTag::Integer);
/// assert_eq!(tag.to_string(), "integer");
/// assert!("uuid".parse::<TypeTag>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    /// UTF-8 string.
    String,
    /// `true` / `false`.
    Boolean,
    /// Any finite number, integral or not.
    Number,
    /// A number without a fractional part.
    Integer,
    /// Ordered list.
    Array,
    /// Keyed object.
    Object,
}

impl TypeTag {
    /// Returns the tag name used in schema documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeTag::String => "string",
            TypeTag::Boolean => "boolean",
            TypeTag::Number => "number",
            TypeTag::Integer => "integer",
            TypeTag::Array => "array",
            TypeTag::Object => "object",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not a known [`TypeTag`] name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown type tag: {0}")]
pub struct UnknownTypeTag(pub String);

impl FromStr for TypeTag {
    type Err = UnknownTypeTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(TypeTag::String),
            "boolean" => Ok(TypeTag::Boolean),
            "number" => Ok(TypeTag::Number),
            "integer" => Ok(TypeTag::Integer),
            "array" => Ok(TypeTag::Array),
            "object" => Ok(TypeTag::Object),
            other => Err(UnknownTypeTag(other.to_string())),
        }
    }
}

/// Classifies a value into its most specific tag.
///
/// Integral numbers report [`TypeTag::Integer`]; `null` has no tag.
///
/// # Examples
///
/// ```
/// use record_schema_core::{type_of, TypeTag};
/// use serde_json::json;
///
/// assert_eq!(type_of(&json!(3)), Some(TypeTag::Integer));
/// assert_eq!(type_of(&json!(3.5)), Some(TypeTag::Number));
/// assert_eq!(type_of(&json!(null)), None);
/// ```
pub fn type_of(value: &Value) -> Option<TypeTag> {
    match value {
        Value::Null => None,
        Value::Bool(_) => Some(TypeTag::Boolean),
        Value::Number(_) if is_integer(value) => Some(TypeTag::Integer),
        Value::Number(_) => Some(TypeTag::Number),
        Value::String(_) => Some(TypeTag::String),
        Value::Array(_) => Some(TypeTag::Array),
        Value::Object(_) => Some(TypeTag::Object),
    }
}

/// Returns `true` if `value` satisfies the declared `tag`.
///
/// No coercion happens here: the string `"5"` is not an integer.
pub fn matches_type(value: &Value, tag: TypeTag) -> bool {
    match tag {
        TypeTag::String => value.is_string(),
        TypeTag::Boolean => value.is_boolean(),
        TypeTag::Number => value.is_number(),
        TypeTag::Integer => is_integer(value),
        TypeTag::Array => value.is_array(),
        TypeTag::Object => value.is_object(),
    }
}

/// Returns `true` for numbers with no fractional part, including `2.0`.
pub fn is_integer(value: &Value) -> bool {
    match value {
        Value::Number(n) => {
            n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0)
        }
        _ => false,
    }
}

/// Returns `true` for absent values, `null`, `""`, `[]` and `{}`.
///
/// Numbers and booleans are never empty, so `0` and `false` count as set.
///
/// # Examples
///
/// ```
/// use record_schema_core::is_empty;
/// use serde_json::json;
///
/// assert!(is_empty(None));
/// assert!(is_empty(Some(&json!(""))));
/// assert!(is_empty(Some(&json!({}))));
/// assert!(!is_empty(Some(&json!(0))));
/// assert!(!is_empty(Some(&json!(false))));
/// ```
pub fn is_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
        Some(Value::Bool(_)) | Some(Value::Number(_)) => false,
    }
}

/// Short human-readable name of a value's JSON kind.
pub(crate) fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_integer_accepts_whole_floats() {
        assert!(is_integer(&json!(2.0)));
        assert!(is_integer(&json!(-7)));
        assert!(!is_integer(&json!(2.5)));
        assert!(!is_integer(&json!("2")));
    }

    #[test]
    fn test_matches_type_does_not_coerce() {
        assert!(!matches_type(&json!("12"), TypeTag::Integer));
        assert!(!matches_type(&json!("true"), TypeTag::Boolean));
        assert!(matches_type(&json!(12), TypeTag::Number));
        assert!(matches_type(&json!([1]), TypeTag::Array));
        assert!(!matches_type(&json!(null), TypeTag::Object));
    }

    #[test]
    fn test_unknown_type_tag_error() {
        let err = "uuid".parse::<TypeTag>().unwrap_err();
        assert_eq!(err, UnknownTypeTag("uuid".to_string()));
        assert_eq!(err.to_string(), "unknown type tag: uuid");
    }

    #[test]
    fn test_type_tag_round_trips_through_serde() {
        let tag: TypeTag = serde_json::from_value(json!("boolean")).unwrap();
        assert_eq!(tag, TypeTag::Boolean);
        assert_eq!(serde_json::to_value(TypeTag::Array).unwrap(), json!("array"));
    }
}
