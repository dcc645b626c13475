//! Scenario tests running whole documents through both drivers.

mod creators;
mod identity;

use serde_json::Value as Json;
use vc_graph::{ObjectGraph, Value};
use vc_schema::{PropertyType, TypeDescriptor, TypeRegistry};

use crate::{DeserializeOptions, Error, SerializeOptions};

fn registry(types: impl IntoIterator<Item = TypeDescriptor>) -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    for desc in types {
        registry.register(desc).unwrap();
    }
    registry.validate().unwrap();
    registry
}

fn write(
    registry: &TypeRegistry,
    graph: &ObjectGraph,
    value: &Value,
    ty: &PropertyType,
    options: &SerializeOptions,
) -> Result<Json, Error> {
    crate::serialize(graph, value, ty, registry, options)
}

fn read(
    registry: &TypeRegistry,
    graph: &mut ObjectGraph,
    json: &Json,
    ty: &PropertyType,
    options: &DeserializeOptions,
) -> Result<Value, Error> {
    crate::deserialize(graph, json, ty, registry, options)
}
