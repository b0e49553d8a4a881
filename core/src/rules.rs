//! Named rule predicates and rule-message resolution.
//!
//! A rule is a predicate `(value, args, context) -> bool`. `value` is `None`
//! when the field is absent, `args` is the normalized argument list declared
//! on the field, and `context` is the full sibling record the field belongs
//! to (or `None` for a standalone check), which is what makes cross-field
//! rules possible.
//!
//! # Examples
//!
//! ```
//! use record_schema_core::rules::RuleSet;
//! use serde_json::json;
//!
//! let rules = RuleSet::builtin();
//! let min = rules.get("min").unwrap();
//! assert!(min(Some(&json!(7)), &[json!(5)], None).unwrap());
//! assert!(!min(Some(&json!(3)), &[json!(5)], None).unwrap());
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, LazyLock, RwLock};

use regex::{Regex, RegexBuilder};
use serde_json::Value;
use tracing::warn;

use crate::error::BoxError;
use crate::registry::Registry;
use crate::types::{ErrorMessages, Record};
use crate::value::is_empty;

/// Shared rule predicate.
pub type RuleFn =
    Arc<dyn Fn(Option<&Value>, &[Value], Option<&Record>) -> Result<bool, BoxError> + Send + Sync>;

/// Rule name used for the `required` check when resolving messages.
pub const REQUIRED: &str = "required";
/// Rule name used for the `allowNull: false` check.
pub const ALLOW_NULL: &str = "allowNull";
/// Rule name used for declared-type mismatches.
pub const TYPE: &str = "type";

/// A rule as declared on one field: its argument list, and optionally a
/// field-local predicate that takes precedence over the registry.
#[derive(Clone)]
pub enum RuleConfig {
    /// Look the rule up by name and call it with these arguments.
    Args(Vec<Value>),
    /// Call this predicate directly.
    Custom {
        /// Predicate to evaluate.
        predicate: RuleFn,
        /// Extra arguments passed after the value.
        args: Vec<Value>,
    },
}

impl RuleConfig {
    /// Builds an argument-only config from a document value.
    ///
    /// A bare scalar becomes a one-element list, an array is used as-is, and
    /// an object carrying `limits` or `args` (checked in that order) uses that
    /// member instead.
    ///
    /// # Examples
    ///
    /// ```
    /// use record_schema_core::rules::RuleConfig;
    /// use serde_json::json;
    ///
    /// assert_eq!(RuleConfig::from_value(json!(5)).args(), &[json!(5)]);
    /// assert_eq!(RuleConfig::from_value(json!([1, 2])).args(), &[json!(1), json!(2)]);
    /// assert_eq!(
    ///     RuleConfig::from_value(json!({"args": [9], "limits": [1, 3]})).args(),
    ///     &[json!(1), json!(3)]
    /// );
    /// ```
    pub fn from_value(value: Value) -> Self {
        RuleConfig::Args(normalize_args(value))
    }

    /// Wraps a predicate with no extra arguments.
    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(Option<&Value>, &[Value], Option<&Record>) -> Result<bool, BoxError>
            + Send
            + Sync
            + 'static,
    {
        RuleConfig::Custom {
            predicate: rule_fn(predicate),
            args: Vec::new(),
        }
    }

    /// Normalized argument list.
    pub fn args(&self) -> &[Value] {
        match self {
            RuleConfig::Args(args) => args,
            RuleConfig::Custom { args, .. } => args,
        }
    }
}

impl fmt::Debug for RuleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleConfig::Args(args) => f.debug_tuple("Args").field(args).finish(),
            RuleConfig::Custom { args, .. } => f
                .debug_struct("Custom")
                .field("predicate", &"<fn>")
                .field("args", args)
                .finish(),
        }
    }
}

fn rule_fn<F>(rule: F) -> RuleFn
where
    F: Fn(Option<&Value>, &[Value], Option<&Record>) -> Result<bool, BoxError>
        + Send
        + Sync
        + 'static,
{
    Arc::new(rule)
}

fn normalize_args(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(mut map) => {
            for key in ["limits", "args"] {
                if let Some(inner) = map.remove(key) {
                    return match inner {
                        Value::Array(items) => items,
                        other => vec![other],
                    };
                }
            }
            vec![Value::Object(map)]
        }
        other => vec![other],
    }
}

/// Result of evaluating one declared rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOutcome {
    /// Predicate returned `true`.
    Passed,
    /// Predicate returned `false`.
    Failed,
    /// No predicate is registered under the rule name.
    Unknown,
}

/// A named collection of rule predicates.
#[derive(Clone)]
pub struct RuleSet {
    rules: BTreeMap<String, RuleFn>,
}

impl RuleSet {
    /// A set with no rules at all.
    pub fn empty() -> Self {
        Self {
            rules: BTreeMap::new(),
        }
    }

    /// A set populated with every built-in rule.
    pub fn builtin() -> Self {
        let mut set = Self::empty();
        set.add_builtin("min", |v, a| compare(v, a, |x, bound| x >= bound));
        set.add_builtin("max", |v, a| compare(v, a, |x, bound| x <= bound));
        set.add_builtin("minLength", |v, a| {
            measure(v, a, |len, bound| len >= bound)
        });
        set.add_builtin("maxLength", |v, a| {
            measure(v, a, |len, bound| len <= bound)
        });
        set.add_builtin("eq", |v, a| v.is_some() && v == a.first());
        set.add_builtin("neq", |v, a| v.is_none() || v != a.first());
        set.add_builtin("oneOf", |v, a| v.is_some_and(|v| choices(a).contains(&v)));
        set.add_builtin("notOneOf", |v, a| v.is_none_or(|v| !choices(a).contains(&v)));
        set.add_builtin("has", |v, a| {
            v.is_some_and(|v| choices(a).iter().all(|needle| contains(v, needle)))
        });
        set.add_builtin("hasNot", |v, a| {
            v.is_none_or(|v| !choices(a).iter().any(|needle| contains(v, needle)))
        });
        set.add_builtin("match", |v, a| pattern_matches(v, a).unwrap_or(false));
        set.add_builtin("notMatch", |v, a| !pattern_matches(v, a).unwrap_or(false));
        set.add_builtin("empty", |v, a| {
            let expected = a.first().and_then(Value::as_bool).unwrap_or(true);
            is_empty(v) == expected
        });
        set.add_builtin("isEmail", |v, _| is_email(v));
        set.add_builtin("isUrl", |v, _| is_url(v));
        set
    }

    fn add_builtin(&mut self, name: &str, rule: fn(Option<&Value>, &[Value]) -> bool) {
        self.rules
            .insert(name.to_string(), rule_fn(move |v, a, _| Ok(rule(v, a))));
    }

    /// Registers (or replaces) a rule.
    pub fn add_rule<F>(&mut self, name: impl Into<String>, rule: F)
    where
        F: Fn(Option<&Value>, &[Value], Option<&Record>) -> Result<bool, BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.rules.insert(name.into(), rule_fn(rule));
    }

    /// Looks up a rule by name.
    pub fn get(&self, name: &str) -> Option<&RuleFn> {
        self.rules.get(name)
    }

    /// Returns `true` if a rule is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// Names of every registered rule, sorted.
    pub fn available(&self) -> Vec<String> {
        self.rules.keys().cloned().collect()
    }

    /// Evaluates one declared rule against `value`.
    ///
    /// Field-local predicates win over registered ones. Errors raised by a
    /// predicate are returned untouched for the caller to propagate.
    pub fn evaluate(
        &self,
        name: &str,
        config: &RuleConfig,
        value: Option<&Value>,
        context: Option<&Record>,
    ) -> Result<RuleOutcome, BoxError> {
        let passed = match config {
            RuleConfig::Custom { predicate, args } => predicate(value, args, context)?,
            RuleConfig::Args(args) => match self.rules.get(name) {
                Some(rule) => rule(value, args, context)?,
                None => return Ok(RuleOutcome::Unknown),
            },
        };
        Ok(if passed {
            RuleOutcome::Passed
        } else {
            RuleOutcome::Failed
        })
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.rules.keys()).finish()
    }
}

/// Picks the message for a failing rule.
///
/// Precedence: a per-rule entry, then the `default` entry, then a single
/// string covering every rule, then `fallback`.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
///
/// use record_schema_core::ErrorMessages;
/// use record_schema_core::rules::resolve_message;
///
/// let per_rule = ErrorMessages::PerRule(BTreeMap::from([
///     ("default".to_string(), "D".to_string()),
///     ("min".to_string(), "too small".to_string()),
/// ]));
/// assert_eq!(resolve_message(Some(&per_rule), "min", || "x".into()), "too small");
/// assert_eq!(resolve_message(Some(&per_rule), "max", || "x".into()), "D");
/// assert_eq!(resolve_message(None, "max", || "Failed: max".into()), "Failed: max");
/// ```
pub fn resolve_message(
    errors: Option<&ErrorMessages>,
    rule: &str,
    fallback: impl FnOnce() -> String,
) -> String {
    match errors {
        Some(ErrorMessages::PerRule(map)) => map
            .get(rule)
            .or_else(|| map.get("default"))
            .cloned()
            .unwrap_or_else(fallback),
        Some(ErrorMessages::All(message)) => message.clone(),
        None => fallback(),
    }
}

/// System message for a rule that returned `false`.
pub fn failed_message(rule: &str) -> String {
    format!("Failed: {rule}")
}

/// System message for a rule name with no predicate behind it.
pub fn unknown_message(rule: &str) -> String {
    format!("Unknown: {rule}")
}

/// Registers a rule on the process-wide registry.
pub fn add_rule<F>(name: impl Into<String>, rule: F)
where
    F: Fn(Option<&Value>, &[Value], Option<&Record>) -> Result<bool, BoxError>
        + Send
        + Sync
        + 'static,
{
    Registry::with_global_mut(|registry| registry.rules.add_rule(name, rule));
}

/// Names of every rule on the process-wide registry.
pub fn available() -> Vec<String> {
    Registry::snapshot().rules.available()
}

fn as_number(value: &Value) -> Option<f64> {
    value.as_f64()
}

fn compare(value: Option<&Value>, args: &[Value], op: fn(f64, f64) -> bool) -> bool {
    match (value.and_then(as_number), args.first().and_then(as_number)) {
        (Some(x), Some(bound)) => op(x, bound),
        _ => false,
    }
}

fn measure(value: Option<&Value>, args: &[Value], op: fn(u64, u64) -> bool) -> bool {
    let len = match value {
        Some(Value::String(s)) => s.chars().count(),
        Some(Value::Array(items)) => items.len(),
        _ => return false,
    };
    match args.first().and_then(Value::as_u64) {
        Some(bound) => op(len as u64, bound),
        None => false,
    }
}

/// Flattens one level of array arguments so `oneOf: ["a", "b"]` and
/// `oneOf: [["a", "b"]]` mean the same thing.
fn choices(args: &[Value]) -> Vec<&Value> {
    args.iter()
        .flat_map(|arg| match arg {
            Value::Array(items) => items.iter().collect::<Vec<_>>(),
            other => vec![other],
        })
        .collect()
}

fn contains(haystack: &Value, needle: &Value) -> bool {
    match (haystack, needle) {
        (Value::Array(items), _) => items.contains(needle),
        (Value::String(s), Value::String(sub)) => s.contains(sub.as_str()),
        (Value::Object(map), Value::String(key)) => map.contains_key(key),
        _ => false,
    }
}

fn text_of(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Compiles a `match`/`notMatch` pattern. Flags are `i`, `m`, `s` and `x`.
/// Compiled patterns are cached per `(pattern, flags)`.
pub(crate) fn compile_pattern(pattern: &str, flags: &str) -> Result<Regex, regex::Error> {
    static PATTERNS: LazyLock<RwLock<HashMap<(String, String), Regex>>> =
        LazyLock::new(Default::default);

    let key = (pattern.to_string(), flags.to_string());
    if let Ok(cache) = PATTERNS.read() {
        if let Some(regex) = cache.get(&key) {
            return Ok(regex.clone());
        }
    }

    let regex = RegexBuilder::new(pattern)
        .case_insensitive(flags.contains('i'))
        .multi_line(flags.contains('m'))
        .dot_matches_new_line(flags.contains('s'))
        .ignore_whitespace(flags.contains('x'))
        .build()?;
    if let Ok(mut cache) = PATTERNS.write() {
        cache.insert(key, regex.clone());
    }
    Ok(regex)
}

/// `None` when the value has no textual form or the pattern is unusable.
fn pattern_matches(value: Option<&Value>, args: &[Value]) -> Option<bool> {
    let text = text_of(value)?;
    let pattern = args.first()?.as_str()?;
    let flags = args.get(1).and_then(Value::as_str).unwrap_or("");
    match compile_pattern(pattern, flags) {
        Ok(regex) => Some(regex.is_match(&text)),
        Err(err) => {
            warn!(pattern, error = %err, "rule pattern does not compile");
            None
        }
    }
}

fn is_email(value: Option<&Value>) -> bool {
    static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static regex must compile")
    });
    value
        .and_then(Value::as_str)
        .is_some_and(|s| EMAIL_RE.is_match(s))
}

fn is_url(value: Option<&Value>) -> bool {
    static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^(?i)(https?|ftp)://[^\s/$.?#][^\s]*$").expect("static regex must compile")
    });
    value
        .and_then(Value::as_str)
        .is_some_and(|s| URL_RE.is_match(s))
}
