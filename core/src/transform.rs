//! Named value transforms and the ordered pipeline that applies them.
//!
//! Built-ins cover whitespace and case handling plus every caster under its
//! `to<Type>` name. Unknown transform names are skipped so a schema written
//! against a richer registry still formats with a poorer one.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::cast::Caster;
use crate::registry::Registry;

/// Shared transform function.
pub type TransformFn = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// A named collection of transforms.
///
/// # Examples
///
/// ```
/// use record_schema_core::transform::TransformSet;
/// use serde_json::json;
///
/// let transforms = TransformSet::builtin();
/// let out = transforms.apply(Some(json!("  Zim ")), &["trim", "uppercase"]);
/// assert_eq!(out, Some(json!("ZIM")));
///
/// // absent values are left alone
/// assert_eq!(transforms.apply(None, &["toString"]), None);
/// ```
#[derive(Clone)]
pub struct TransformSet {
    transforms: BTreeMap<String, TransformFn>,
}

impl TransformSet {
    /// A set with no transforms.
    pub fn empty() -> Self {
        Self {
            transforms: BTreeMap::new(),
        }
    }

    /// A set populated with every built-in transform.
    pub fn builtin() -> Self {
        let mut set = Self::empty();
        set.register("trim", |v| map_str(v, |s| s.trim().to_string()));
        set.register("trimStart", |v| map_str(v, |s| s.trim_start().to_string()));
        set.register("trimEnd", |v| map_str(v, |s| s.trim_end().to_string()));
        set.register("lowercase", |v| map_str(v, str::to_lowercase));
        set.register("uppercase", |v| map_str(v, str::to_uppercase));
        set.register("capitalize", |v| map_str(v, capitalize));
        for caster in Caster::ALL {
            set.register(caster.transform_name(), move |v| {
                caster.cast(&v).unwrap_or(v)
            });
        }
        set
    }

    /// Registers (or replaces) a transform.
    pub fn register<F>(&mut self, name: impl Into<String>, transform: F)
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.transforms.insert(name.into(), Arc::new(transform));
    }

    /// Looks up a transform by name.
    pub fn get(&self, name: &str) -> Option<&TransformFn> {
        self.transforms.get(name)
    }

    /// Names of every registered transform, sorted.
    pub fn list(&self) -> Vec<String> {
        self.transforms.keys().cloned().collect()
    }

    /// Runs `names` in order, each consuming the previous output.
    ///
    /// `None` passes through untouched and unknown names are skipped.
    pub fn apply<S: AsRef<str>>(&self, value: Option<Value>, names: &[S]) -> Option<Value> {
        let mut current = value?;
        for name in names {
            let name = name.as_ref();
            match self.transforms.get(name) {
                Some(transform) => current = transform(current),
                None => debug!(transform = name, "skipping unknown transform"),
            }
        }
        Some(current)
    }
}

impl Default for TransformSet {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for TransformSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.transforms.keys()).finish()
    }
}

/// Applies transforms from the process-wide registry.
pub fn apply<S: AsRef<str>>(value: Option<Value>, names: &[S]) -> Option<Value> {
    Registry::snapshot().transforms.apply(value, names)
}

/// Registers a transform on the process-wide registry.
pub fn register<F>(name: impl Into<String>, transform: F)
where
    F: Fn(Value) -> Value + Send + Sync + 'static,
{
    Registry::with_global_mut(|registry| registry.transforms.register(name, transform));
}

/// Names of every transform on the process-wide registry.
pub fn list() -> Vec<String> {
    Registry::snapshot().transforms.list()
}

fn map_str(value: Value, f: impl Fn(&str) -> String) -> Value {
    match value {
        Value::String(s) => Value::String(f(&s)),
        other => other,
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_pipeline_runs_in_declared_order() {
        let mut set = TransformSet::builtin();
        set.register("exclaim", |v| map_str(v, |s| format!("{s}!")));
        assert_eq!(
            set.apply(Some(json!("hi")), &["exclaim", "uppercase"]),
            Some(json!("HI!"))
        );
        assert_eq!(
            set.apply(Some(json!(" a ")), &["exclaim", "trim"]),
            Some(json!("a !"))
        );
    }

    #[test]
    fn test_unknown_names_are_skipped() {
        let set = TransformSet::builtin();
        assert_eq!(
            set.apply(Some(json!("x")), &["doesNotExist", "uppercase"]),
            Some(json!("X"))
        );
    }

    #[test]
    fn test_string_transforms_leave_other_kinds_alone() {
        let set = TransformSet::builtin();
        assert_eq!(set.apply(Some(json!(5)), &["uppercase"]), Some(json!(5)));
        assert_eq!(set.apply(Some(json!(null)), &["trim"]), Some(json!(null)));
    }

    #[test]
    fn test_cast_transforms_keep_uncastable_values() {
        let set = TransformSet::builtin();
        assert_eq!(set.apply(Some(json!("12")), &["toInteger"]), Some(json!(12)));
        assert_eq!(set.apply(Some(json!("abc")), &["toNumber"]), Some(json!("abc")));
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("zim"), "Zim");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_list_includes_casters() {
        let names = TransformSet::builtin().list();
        for caster in Caster::ALL {
            assert!(names.iter().any(|n| n == caster.transform_name()));
        }
        assert!(TransformSet::empty().list().is_empty());
    }
}
