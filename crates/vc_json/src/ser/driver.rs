use alloc::borrow::Cow;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use serde_json::{Map, Number, Value as Json};
use vc_graph::{ObjectGraph, Value};
use vc_schema::{Conversion, ConvertError, PropertyType, SchemaRegistry, SerializeFn, TypeRegistry};

use super::object::Layout;
use crate::context::Branch;
use crate::format::{date_to_text, special_case};
use crate::identity::SerializeIdentities;
use crate::{Error, ErrorKind, SerializeFeatures, SerializeOptions};

#[cfg(all(debug_assertions, feature = "debug"))]
use crate::context::TypeStack;

pub(super) static ANY: PropertyType = PropertyType::Any;

// -----------------------------------------------------------------------------
// SerializeDriver

/// Writes an object graph into a plain JSON value tree.
///
/// A driver carries the state of exactly one call: the identity map and the
/// id sequences. [`serialize`](Self::serialize) consumes it, so ids never
/// leak into another call; the graph, registry and options are only read
/// and may be shared between concurrent drivers.
///
/// # Processing order
///
/// For every value:
///
/// 1. Non-finite floats and dates are rewritten per the enabled features.
/// 2. Global serializers are consulted in ascending order; one may replace
///    the value or produce the final output.
/// 3. An object already written in this call is written as its id.
/// 4. Objects of an ignored type are written as `null`.
/// 5. A value property replaces the whole object.
/// 6. Properties are written in resolved order, skipping those excluded by
///    access, back-reference role, view, filter group or inclusion policy.
/// 7. The id of an identity-declared object is written first.
/// 8. The discriminator is added per the polymorphism strategy.
/// 9. The top-level result is wrapped in the root name if enabled.
///
/// An object met again on the path that is writing it, without an id to
/// break the loop, fails with [`ErrorKind::Cycle`] unless
/// [`SerializeFeatures::WRITE_SELF_REFERENCES_AS_NULL`] is set.
///
/// # Examples
///
/// ```
/// use vc_graph::{Instance, ObjectGraph, Value};
/// use vc_json::{SerializeDriver, SerializeOptions};
/// use vc_schema::{PropertyDescriptor, PropertyType, TypeDescriptor, TypeRegistry};
///
/// let mut registry = TypeRegistry::new();
/// registry
///     .register(
///         TypeDescriptor::builder("Book")
///             .property(PropertyDescriptor::new("title", PropertyType::String))
///             .property(PropertyDescriptor::new("pages", PropertyType::Int))
///             .build(),
///     )
///     .unwrap();
///
/// let mut graph = ObjectGraph::new();
/// let book = graph.insert(Instance::new("Book").with("title", "Dune").with("pages", 412));
///
/// let options = SerializeOptions::new();
/// let json = SerializeDriver::new(&graph, &registry, &options)
///     .serialize(&Value::Object(book), &PropertyType::object("Book"))
///     .unwrap();
///
/// assert_eq!(json.to_string(), r#"{"title":"Dune","pages":412}"#);
/// ```
pub struct SerializeDriver<'a, R: SchemaRegistry + ?Sized = TypeRegistry> {
    pub(super) graph: &'a ObjectGraph,
    pub(super) registry: &'a R,
    pub(super) options: &'a SerializeOptions,
    pub(super) identities: SerializeIdentities,
    #[cfg(all(debug_assertions, feature = "debug"))]
    pub(super) stack: TypeStack,
}

impl<'a, R: SchemaRegistry + ?Sized> SerializeDriver<'a, R> {
    /// Creates a driver for one call.
    pub fn new(graph: &'a ObjectGraph, registry: &'a R, options: &'a SerializeOptions) -> Self {
        Self {
            graph,
            registry,
            options,
            identities: SerializeIdentities::default(),
            #[cfg(all(debug_assertions, feature = "debug"))]
            stack: TypeStack::default(),
        }
    }

    /// Writes `value`, statically typed as `hint`.
    ///
    /// `PropertyType::Any` writes objects by their runtime type.
    pub fn serialize(mut self, value: &Value, hint: &PropertyType) -> Result<Json, Error> {
        log::debug!("serialize {} as `{hint}`", value.kind());

        let result = self.write_value(value, hint, &Branch::root());
        #[cfg(all(debug_assertions, feature = "debug"))]
        let result = result.map_err(|e| self.stack.annotate(e));
        let json = result?;

        if !self
            .options
            .features()
            .contains(SerializeFeatures::WRAP_ROOT_VALUE)
        {
            return Ok(json);
        }
        let name = self.root_name(value, hint).ok_or_else(|| {
            Error::new(
                ErrorKind::Shape,
                hint.to_string(),
                &crate::KeyPath::root(),
                format!("no root name for a {} value", value.kind()),
            )
        })?;
        let mut root = Map::new();
        root.insert(name, json);
        Ok(Json::Object(root))
    }

    fn root_name(&self, value: &Value, hint: &PropertyType) -> Option<String> {
        if let Some(name) = self.options.root_name() {
            return Some(name.into());
        }
        let type_name = match value {
            Value::Object(key) => self.graph.type_of(*key),
            _ => hint.object_name(),
        }?;
        self.registry
            .describe(type_name)
            .map(|desc| desc.root_name().into())
    }

    // -------------------------------------------------------------------------
    // Values

    pub(super) fn write_value(
        &mut self,
        value: &Value,
        ty: &PropertyType,
        branch: &Branch<'a>,
    ) -> Result<Json, Error> {
        self.write_value_as(value, ty, branch, Layout::Keyed)
    }

    /// Writes `value`; an object among it is written in `layout`.
    pub(super) fn write_value_as(
        &mut self,
        value: &Value,
        ty: &PropertyType,
        branch: &Branch<'a>,
        layout: Layout,
    ) -> Result<Json, Error> {
        let options = self.options;
        let graph = self.graph;

        let mut value: Cow<'_, Value> = match special_case(value, options.features()) {
            Some(rewritten) => Cow::Owned(rewritten),
            None => Cow::Borrowed(value),
        };
        for (matcher, serializer) in options.converters().serializers() {
            if !matcher.matches_value(&value, graph) {
                continue;
            }
            match serializer
                .call(&value, graph)
                .map_err(|e| self.convert_error(ty, branch, e))?
            {
                Conversion::Pass => {}
                Conversion::Replace(replaced) => value = Cow::Owned(replaced),
                Conversion::Done(json) => return Ok(json),
            }
        }

        match &*value {
            Value::Null => Ok(Json::Null),
            Value::Bool(b) => Ok(Json::Bool(*b)),
            Value::Int(i) => Ok(Json::from(*i)),
            // Non-finite floats left by `special_case` have no JSON form.
            Value::Float(f) => Ok(Number::from_f64(*f).map_or(Json::Null, Json::Number)),
            Value::String(s) => Ok(Json::String(s.clone())),
            Value::Date(ms) => date_to_text(*ms)
                .map(Json::String)
                .map_err(|m| self.error(ErrorKind::Conversion, &ty.to_string(), branch, m)),
            Value::List(items) => self.write_list(items, ty.element().unwrap_or(&ANY), None, branch),
            Value::Map(entries) => {
                self.write_map(entries, ty.element().unwrap_or(&ANY), None, branch)
            }
            Value::Object(key) => self.write_object(*key, ty, branch, layout),
        }
    }

    pub(super) fn write_list(
        &mut self,
        items: &[Value],
        element: &PropertyType,
        each: Option<&SerializeFn>,
        branch: &Branch<'a>,
    ) -> Result<Json, Error> {
        let mut out = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let child = branch.index(index);
            out.push(match each {
                Some(f) => f
                    .call(item, self.graph)
                    .map_err(|e| self.convert_error(element, &child, e))?,
                None => self.write_value(item, element, &child)?,
            });
        }
        Ok(Json::Array(out))
    }

    pub(super) fn write_map(
        &mut self,
        entries: &[(Value, Value)],
        element: &PropertyType,
        each: Option<&SerializeFn>,
        branch: &Branch<'a>,
    ) -> Result<Json, Error> {
        let mut out: Vec<(String, Json)> = Vec::with_capacity(entries.len());
        for (key, item) in entries {
            let Some(key) = key.as_key() else {
                return Err(self.error(
                    ErrorKind::Shape,
                    &element.to_string(),
                    branch,
                    format!("a {} cannot be a map key", key.kind()),
                ));
            };
            let child = branch.key(&key);
            let json = match each {
                Some(f) => f
                    .call(item, self.graph)
                    .map_err(|e| self.convert_error(element, &child, e))?,
                None => self.write_value(item, element, &child.with_filter(branch.filter()))?,
            };
            out.push((key, json));
        }
        if self
            .options
            .features()
            .contains(SerializeFeatures::ORDER_MAP_ENTRIES_BY_KEYS)
        {
            out.sort_by(|a, b| a.0.cmp(&b.0));
        }
        Ok(Json::Object(out.into_iter().collect()))
    }

    // -------------------------------------------------------------------------
    // Errors

    pub(super) fn error(
        &mut self,
        kind: ErrorKind,
        type_name: &str,
        branch: &Branch<'_>,
        message: impl Into<String>,
    ) -> Error {
        #[cfg(all(debug_assertions, feature = "debug"))]
        self.stack.record_failure();
        Error::new(kind, type_name, &branch.path, message)
    }

    fn convert_error(&mut self, ty: &PropertyType, branch: &Branch<'_>, err: ConvertError) -> Error {
        self.error(ErrorKind::Conversion, &ty.to_string(), branch, err.message())
    }
}
