//! Named schema resolution.

use std::collections::HashMap;
use std::ops::Deref;
use std::sync::Arc;

use tracing::debug;

use crate::error::{Result, SchemaError};
use crate::types::{FieldSpec, NestedDecl, Schema};

/// Looks up schemas referenced by name from a field's `type` or `schema`.
///
/// Implemented for closures and for plain maps, so a resolver can be as small
/// as a `HashMap` built at startup.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use std::sync::Arc;
///
/// use record_schema_core::{FieldSpec, Schema, SchemaResolver, TypeTag};
///
/// let mut known = HashMap::new();
/// known.insert(
///     "user".to_string(),
///     Arc::new(Schema::new().field("name", FieldSpec::of_type(TypeTag::String))),
/// );
///
/// assert!(known.resolve("user").is_some());
/// assert!(known.resolve("order").is_none());
/// ```
pub trait SchemaResolver {
    /// Returns the schema registered under `reference`.
    fn resolve(&self, reference: &str) -> Option<Arc<Schema>>;
}

impl<F> SchemaResolver for F
where
    F: Fn(&str) -> Option<Arc<Schema>>,
{
    fn resolve(&self, reference: &str) -> Option<Arc<Schema>> {
        self(reference)
    }
}

impl SchemaResolver for HashMap<String, Arc<Schema>> {
    fn resolve(&self, reference: &str) -> Option<Arc<Schema>> {
        self.get(reference).cloned()
    }
}

/// A keyed schema that is either borrowed from the caller's tree or owned
/// through a resolver.
#[derive(Debug, Clone)]
pub(crate) enum SchemaHandle<'a> {
    Borrowed(&'a Schema),
    Shared(Arc<Schema>),
}

impl Deref for SchemaHandle<'_> {
    type Target = Schema;

    fn deref(&self) -> &Schema {
        match self {
            SchemaHandle::Borrowed(schema) => schema,
            SchemaHandle::Shared(schema) => schema,
        }
    }
}

/// A nested declaration after reference resolution.
#[derive(Debug, Clone)]
pub(crate) enum Nested<'a> {
    Fields(SchemaHandle<'a>),
    Field(&'a FieldSpec),
}

/// Resolves a field's nested declaration, if it has one.
pub(crate) fn resolve_nested<'a>(
    spec: &'a FieldSpec,
    resolver: Option<&dyn SchemaResolver>,
) -> Result<Option<Nested<'a>>> {
    let nested = match spec.nested_decl() {
        None => return Ok(None),
        Some(NestedDecl::Fields(schema)) => Nested::Fields(SchemaHandle::Borrowed(schema)),
        Some(NestedDecl::Field(element)) => Nested::Field(element),
        Some(NestedDecl::Ref(reference)) => {
            let resolver = resolver.ok_or_else(|| SchemaError::NoResolver(reference.to_string()))?;
            let schema = resolver
                .resolve(reference)
                .ok_or_else(|| SchemaError::Unresolved(reference.to_string()))?;
            debug!(reference, fields = schema.len(), "resolved schema reference");
            Nested::Fields(SchemaHandle::Shared(schema))
        }
    };
    Ok(Some(nested))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SubSchema;
    use crate::value::TypeTag;

    #[test]
    fn test_reference_without_resolver_is_an_error() {
        let spec = FieldSpec::reference("user");
        let err = resolve_nested(&spec, None).unwrap_err();
        assert!(matches!(err, SchemaError::NoResolver(name) if name == "user"));
    }

    #[test]
    fn test_unknown_reference_is_an_error() {
        let resolver = |_: &str| -> Option<Arc<Schema>> { None };
        let spec = FieldSpec::new().with_schema(SubSchema::Ref("user".into()));
        let err = resolve_nested(&spec, Some(&resolver)).unwrap_err();
        assert!(matches!(err, SchemaError::Unresolved(name) if name == "user"));
    }

    #[test]
    fn test_closure_resolver() {
        let user = Arc::new(Schema::new().field("name", FieldSpec::of_type(TypeTag::String)));
        let resolver = move |name: &str| (name == "user").then(|| user.clone());
        let spec = FieldSpec::reference("user");
        let nested = resolve_nested(&spec, Some(&resolver)).unwrap();
        match nested {
            Some(Nested::Fields(schema)) => assert!(schema.contains("name")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_plain_fields_have_no_nested_declaration() {
        let spec = FieldSpec::of_type(TypeTag::String);
        assert!(resolve_nested(&spec, None).unwrap().is_none());
    }
}
