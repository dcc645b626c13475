// -----------------------------------------------------------------------------
// Modules

mod driver;
mod object;

// -----------------------------------------------------------------------------
// Exports

pub use driver::SerializeDriver;

use serde_json::Value as Json;
use vc_graph::{ObjectGraph, Value};
use vc_schema::{PropertyType, SchemaRegistry};

use crate::{Error, SerializeOptions};

/// Writes `value` from `graph` as a plain JSON value tree.
///
/// Shorthand for [`SerializeDriver::new`] followed by
/// [`SerializeDriver::serialize`].
#[inline]
pub fn serialize<R: SchemaRegistry + ?Sized>(
    graph: &ObjectGraph,
    value: &Value,
    hint: &PropertyType,
    registry: &R,
    options: &SerializeOptions,
) -> Result<Json, Error> {
    SerializeDriver::new(graph, registry, options).serialize(value, hint)
}
