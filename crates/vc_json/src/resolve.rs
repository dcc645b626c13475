//! Type resolver: runtime type → discriminator and back.

use vc_schema::{Polymorphism, SchemaRegistry, TypeDescriptor};

/// The discriminator written for an instance of `runtime` under the
/// polymorphism declaration `poly`.
///
/// Prefers the explicit name of the subtype table entry, else the runtime
/// type's own `type_name` alias, else its declared name.
pub fn type_id_of<'a>(poly: &'a Polymorphism, runtime: &'a TypeDescriptor) -> &'a str {
    poly.subtypes
        .iter()
        .find(|s| s.type_name == runtime.name())
        .and_then(|s| s.name.as_deref())
        .unwrap_or_else(|| runtime.type_id_name())
}

/// The descriptor a discriminator names, among the subtypes of `base`.
///
/// Looks for an exact match in the subtype table first (explicit names,
/// then the subtypes' own type ids), then for any registered type with that
/// type id or name which is assignable to `base`. Returns `None` when
/// nothing matches; the caller decides on the tolerant fallback.
pub fn type_from_id<'r, R: SchemaRegistry + ?Sized>(
    registry: &'r R,
    base: &'r TypeDescriptor,
    poly: &Polymorphism,
    id: &str,
) -> Option<&'r TypeDescriptor> {
    for subtype in &poly.subtypes {
        if subtype.name.as_deref() == Some(id) {
            return registry.describe(&subtype.type_name);
        }
    }
    for subtype in poly.subtypes.iter().filter(|s| s.name.is_none()) {
        if let Some(desc) = registry.describe(&subtype.type_name)
            && desc.type_id_name() == id
        {
            return Some(desc);
        }
    }
    if base.type_id_name() == id {
        return Some(base);
    }
    registry
        .describe_type_id(id)
        .filter(|desc| registry.is_assignable(desc.name(), base.name()))
}

/// The type used when the discriminator is missing or unknown and the
/// failure is tolerated: the declared default implementation, else `base`.
pub fn fallback_type<'r, R: SchemaRegistry + ?Sized>(
    registry: &'r R,
    base: &'r TypeDescriptor,
    poly: &Polymorphism,
) -> &'r TypeDescriptor {
    poly.default_impl
        .as_deref()
        .and_then(|name| registry.describe(name))
        .unwrap_or(base)
}

// -----------------------------------------------------------------------------
// Tests
