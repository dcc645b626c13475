//! Reference pairing resolver.

use alloc::format;
use alloc::string::String;

use vc_graph::{ObjectGraph, ObjectKey, Value};
use vc_schema::{PropertyDescriptor, Role, SchemaRegistry};

/// The back-reference property of `child_type` paired with `pair`.
///
/// Registration guarantees there is at most one per type.
pub fn back_reference<'r, R: SchemaRegistry + ?Sized>(
    registry: &'r R,
    child_type: &str,
    pair: &str,
) -> Option<&'r PropertyDescriptor> {
    registry.describe(child_type)?.back_references(pair).next()
}

/// Points the back reference of every object held by the forward reference
/// `forward` at `owner`.
///
/// `value` is the materialized value of the forward property: an object or
/// a list or map of objects. Returns the number of children linked.
pub fn link<R: SchemaRegistry + ?Sized>(
    graph: &mut ObjectGraph,
    registry: &R,
    owner: ObjectKey,
    forward: &PropertyDescriptor,
    value: &Value,
) -> Result<usize, String> {
    let Role::ForwardReference(pair) = forward.role() else {
        return Ok(0);
    };
    let mut linked = 0;
    for child in value.objects() {
        let Some(child_type) = graph.type_of(child) else {
            continue;
        };
        let back = back_reference(registry, child_type, pair).ok_or_else(|| {
            format!("type `{child_type}` has no back reference paired with `{pair}`")
        })?;
        graph.set_field(child, back.name(), Value::Object(owner));
        linked += 1;
    }
    Ok(linked)
}

// -----------------------------------------------------------------------------
// Tests
