// -----------------------------------------------------------------------------
// Modules

mod driver;
mod object;
mod property;

// -----------------------------------------------------------------------------
// Exports

pub use driver::DeserializeDriver;

use serde_json::Value as Json;
use vc_graph::{ObjectGraph, Value};
use vc_schema::{PropertyType, SchemaRegistry};

use crate::{DeserializeOptions, Error};

/// Reads `json` as a value of type `ty`, materializing objects into `graph`.
///
/// Shorthand for [`DeserializeDriver::new`] followed by
/// [`DeserializeDriver::deserialize`].
#[inline]
pub fn deserialize<R: SchemaRegistry + ?Sized>(
    graph: &mut ObjectGraph,
    json: &Json,
    ty: &PropertyType,
    registry: &R,
    options: &DeserializeOptions,
) -> Result<Value, Error> {
    DeserializeDriver::new(graph, registry, options).deserialize(json, ty)
}
