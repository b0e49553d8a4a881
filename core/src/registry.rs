//! Rule and transform registries.
//!
//! A [`Registry`] is an ordinary value: build one, register extensions on it,
//! and hand it to an [`Engine`](crate::Engine). The process-wide instance
//! behind [`Registry::global`] exists for the top-level convenience functions
//! and is meant to be populated during application setup.

use std::sync::{LazyLock, PoisonError, RwLock};

use crate::rules::RuleSet;
use crate::transform::TransformSet;

static GLOBAL: LazyLock<RwLock<Registry>> = LazyLock::new(|| RwLock::new(Registry::default()));

/// Rules and transforms available to the engines.
///
/// # Examples
///
/// ```
/// use record_schema_core::Registry;
/// use serde_json::{json, Value};
///
/// let mut registry = Registry::default();
/// registry.rules.add_rule("even", |v, _, _| {
///     Ok(v.and_then(Value::as_i64).is_some_and(|n| n % 2 == 0))
/// });
/// registry.transforms.register("double", |v| {
///     v.as_i64().map(|n| json!(n * 2)).unwrap_or(v)
/// });
///
/// assert!(registry.rules.contains("even"));
/// assert!(registry.transforms.list().contains(&"double".to_string()));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Registry {
    /// Named rule predicates.
    pub rules: RuleSet,
    /// Named transforms.
    pub transforms: TransformSet,
}

impl Registry {
    /// A registry with no rules and no transforms.
    pub fn empty() -> Self {
        Self {
            rules: RuleSet::empty(),
            transforms: TransformSet::empty(),
        }
    }

    /// The process-wide registry.
    pub fn global() -> &'static RwLock<Registry> {
        &GLOBAL
    }

    /// A copy of the process-wide registry.
    ///
    /// Engines run against a snapshot so callbacks may register extensions
    /// without deadlocking the call that invoked them.
    pub fn snapshot() -> Registry {
        GLOBAL
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Mutates the process-wide registry.
    pub fn with_global_mut<R>(f: impl FnOnce(&mut Registry) -> R) -> R {
        let mut guard = GLOBAL.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_empty_registry_has_nothing() {
        let registry = Registry::empty();
        assert!(registry.rules.available().is_empty());
        assert!(registry.transforms.list().is_empty());
    }

    #[test]
    fn test_default_registry_has_builtins() {
        let registry = Registry::default();
        assert!(registry.rules.contains("min"));
        assert!(registry.rules.contains("isEmail"));
        assert!(registry.transforms.get("trim").is_some());
    }

    #[test]
    fn test_snapshot_is_detached_from_later_registrations() {
        let before = Registry::snapshot();
        Registry::with_global_mut(|registry| {
            registry
                .transforms
                .register("registryTestMarker", |_| json!("marked"));
        });
        assert!(before.transforms.get("registryTestMarker").is_none());
        assert!(Registry::snapshot().transforms.get("registryTestMarker").is_some());
    }
}
