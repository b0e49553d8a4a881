//! Best-effort conversions between primitive value kinds.
//!
//! A caster never panics and never errors. When no sensible target value
//! exists it returns `None`, and the caller decides what that means; the
//! `to<Type>` transforms keep the original value so a later validation pass
//! reports the type mismatch.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Number, Value};

/// The primitive cast targets, one per `to<Type>` transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caster {
    /// See [`to_string`].
    String,
    /// See [`to_number`].
    Number,
    /// See [`to_float`].
    Float,
    /// See [`to_integer`].
    Integer,
    /// See [`to_boolean`].
    Boolean,
    /// See [`to_date`].
    Date,
}

impl Caster {
    /// All casters, in registration order.
    pub const ALL: [Caster; 6] = [
        Caster::String,
        Caster::Number,
        Caster::Float,
        Caster::Integer,
        Caster::Boolean,
        Caster::Date,
    ];

    /// Name under which this caster is exposed as a transform.
    pub fn transform_name(&self) -> &'static str {
        match self {
            Caster::String => "toString",
            Caster::Number => "toNumber",
            Caster::Float => "toFloat",
            Caster::Integer => "toInteger",
            Caster::Boolean => "toBoolean",
            Caster::Date => "toDate",
        }
    }

    /// Applies the cast.
    pub fn cast(&self, value: &Value) -> Option<Value> {
        match self {
            Caster::String => to_string(value),
            Caster::Number => to_number(value),
            Caster::Float => to_float(value),
            Caster::Integer => to_integer(value),
            Caster::Boolean => to_boolean(value),
            Caster::Date => to_date(value),
        }
    }
}

/// Renders scalars as text; arrays and objects become compact JSON.
///
/// # Examples
///
/// ```
/// use record_schema_core::cast;
/// use serde_json::json;
///
/// assert_eq!(cast::to_string(&json!(42)), Some(json!("42")));
/// assert_eq!(cast::to_string(&json!(true)), Some(json!("true")));
/// assert_eq!(cast::to_string(&json!(null)), None);
/// ```
pub fn to_string(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(_) => Some(value.clone()),
        Value::Bool(b) => Some(Value::String(b.to_string())),
        Value::Number(n) => Some(Value::String(n.to_string())),
        Value::Array(_) | Value::Object(_) => Some(Value::String(value.to_string())),
    }
}

/// Converts numeric strings and booleans to numbers.
///
/// Whole numbers come out as integers, everything else as floats.
///
/// # Examples
///
/// ```
/// use record_schema_core::cast;
/// use serde_json::json;
///
/// assert_eq!(cast::to_number(&json!(" 12 ")), Some(json!(12)));
/// assert_eq!(cast::to_number(&json!("1.5")), Some(json!(1.5)));
/// assert_eq!(cast::to_number(&json!("twelve")), None);
/// ```
pub fn to_number(value: &Value) -> Option<Value> {
    match value {
        Value::Number(_) => Some(value.clone()),
        Value::Bool(b) => Some(Value::from(u8::from(*b))),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                return Some(Value::from(i));
            }
            parse_finite(s).and_then(float_value)
        }
        _ => None,
    }
}

/// Like [`to_number`] but always yields a float.
pub fn to_float(value: &Value) -> Option<Value> {
    let f = match value {
        Value::Number(n) => n.as_f64()?,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::String(s) => parse_finite(s.trim())?,
        _ => return None,
    };
    float_value(f)
}

/// Converts to a whole number, truncating any fractional part.
///
/// # Examples
///
/// ```
/// use record_schema_core::cast;
/// use serde_json::json;
///
/// assert_eq!(cast::to_integer(&json!("12.7")), Some(json!(12)));
/// assert_eq!(cast::to_integer(&json!(-3.9)), Some(json!(-3)));
/// assert_eq!(cast::to_integer(&json!("")), None);
/// ```
pub fn to_integer(value: &Value) -> Option<Value> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Some(Value::from(i));
            }
            if let Some(u) = n.as_u64() {
                return Some(Value::from(u));
            }
            truncate(n.as_f64()?)
        }
        Value::Bool(b) => Some(Value::from(i64::from(*b))),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                return Some(Value::from(i));
            }
            truncate(parse_finite(s)?)
        }
        _ => None,
    }
}

/// Converts to a boolean using truthiness.
///
/// The strings `"false"`, `"0"`, `"no"`, `"off"` and `""` (any case, trimmed)
/// are false, as are `0` and `null`; every other value is true.
///
/// # Examples
///
/// ```
/// use record_schema_core::cast;
/// use serde_json::json;
///
/// assert_eq!(cast::to_boolean(&json!("yes")), Some(json!(true)));
/// assert_eq!(cast::to_boolean(&json!("Off")), Some(json!(false)));
/// assert_eq!(cast::to_boolean(&json!(0)), Some(json!(false)));
/// ```
pub fn to_boolean(value: &Value) -> Option<Value> {
    let truthy = match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "" | "false" | "0" | "no" | "off"
        ),
        Value::Array(_) | Value::Object(_) => true,
    };
    Some(Value::Bool(truthy))
}

/// Normalizes a date to an RFC 3339 UTC timestamp with millisecond precision.
///
/// Accepts RFC 3339 strings, `YYYY-MM-DD`, `YYYY-MM-DD[T ]HH:MM:SS` (read as
/// UTC), and numbers as milliseconds since the Unix epoch.
///
/// # Examples
///
/// ```
/// use record_schema_core::cast;
/// use serde_json::json;
///
/// assert_eq!(
///     cast::to_date(&json!("2024-01-15")),
///     Some(json!("2024-01-15T00:00:00.000Z"))
/// );
/// assert_eq!(cast::to_date(&json!(0)), Some(json!("1970-01-01T00:00:00.000Z")));
/// assert_eq!(cast::to_date(&json!("not a date")), None);
/// ```
pub fn to_date(value: &Value) -> Option<Value> {
    let parsed = match value {
        Value::String(s) => parse_date(s.trim())?,
        Value::Number(n) => {
            let millis = match n.as_i64() {
                Some(ms) => ms,
                None => truncate_to_i64(n.as_f64()?)?,
            };
            DateTime::from_timestamp_millis(millis)?
        }
        _ => return None,
    };
    Some(Value::String(
        parsed.to_rfc3339_opts(SecondsFormat::Millis, true),
    ))
}

fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, pattern) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn parse_finite(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|f| f.is_finite())
}

fn float_value(f: f64) -> Option<Value> {
    Number::from_f64(f).map(Value::Number)
}

fn truncate(f: f64) -> Option<Value> {
    truncate_to_i64(f).map(Value::from)
}

fn truncate_to_i64(f: f64) -> Option<i64> {
    let t = f.trunc();
    if t.is_finite() && t >= i64::MIN as f64 && t <= i64::MAX as f64 {
        Some(t as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_to_number_from_bool() {
        assert_eq!(to_number(&json!(true)), Some(json!(1)));
        assert_eq!(to_number(&json!(false)), Some(json!(0)));
    }

    #[test]
    fn test_to_number_rejects_non_finite_text() {
        assert_eq!(to_number(&json!("inf")), None);
        assert_eq!(to_number(&json!("NaN")), None);
        assert_eq!(to_number(&json!([1])), None);
    }

    #[test]
    fn test_to_float_keeps_fraction() {
        assert_eq!(to_float(&json!("3")), Some(json!(3.0)));
        assert_eq!(to_float(&json!(2)), Some(json!(2.0)));
    }

    #[test]
    fn test_to_string_serializes_collections() {
        assert_eq!(to_string(&json!([1, 2])), Some(json!("[1,2]")));
        assert_eq!(to_string(&json!({"a": 1})), Some(json!("{\"a\":1}")));
    }

    #[test]
    fn test_to_date_normalizes_offsets() {
        assert_eq!(
            to_date(&json!("2024-03-01T12:00:00+02:00")),
            Some(json!("2024-03-01T10:00:00.000Z"))
        );
        assert_eq!(
            to_date(&json!("2024-03-01 08:30:00")),
            Some(json!("2024-03-01T08:30:00.000Z"))
        );
    }

    #[test]
    fn test_caster_transform_names_are_unique() {
        let mut names: Vec<_> = Caster::ALL.iter().map(|c| c.transform_name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), Caster::ALL.len());
    }
}
