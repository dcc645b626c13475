use alloc::borrow::Cow;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;

use serde_json::{Map, Value as Json};
use vc_graph::{Instance, ObjectGraph, ObjectKey, Value};
use vc_schema::{Conversion, ConvertError, DeserializeFn, PropertyType, SchemaRegistry};
use vc_schema::{TypeDescriptor, TypeRegistry};

use crate::format::date_from_text;
use crate::identity::DeserializeIdentities;
use crate::{DeserializeFeatures, DeserializeOptions, Error, ErrorKind, KeyPath};

#[cfg(all(debug_assertions, feature = "debug"))]
use crate::context::TypeStack;

pub(super) static ANY: PropertyType = PropertyType::Any;

// -----------------------------------------------------------------------------
// DeserializeDriver

/// Materializes a plain JSON value tree into an object graph.
///
/// Like [`SerializeDriver`](crate::SerializeDriver), a driver holds the
/// state of exactly one call and is consumed by
/// [`deserialize`](Self::deserialize).
///
/// # Processing order
///
/// For every object:
///
/// 1. Global deserializers targeting the type are consulted in ascending
///    order.
/// 2. A scalar input for an identity-declared type is a reference to an
///    object materialized elsewhere in the document, before or after.
/// 3. The discriminator is extracted per the polymorphism strategy and the
///    subtype it names becomes the target type.
/// 4. An object input whose id is already materialized is that object.
/// 5. Ignored types become `null`.
/// 6. Flattened keys are folded back into their unwrapped property.
/// 7. Input names are mapped to properties; read-only, ignored and
///    out-of-view keys are dropped, injected values are applied and
///    required properties are checked.
/// 8. The creator builds the instance, which is recorded under its id
///    before any property value is read.
/// 9. Remaining keys are set, collected by the any-property or rejected.
/// 10. Forward references set the paired back reference on every child.
///
/// An error aborts the call; objects it allocated are removed from the
/// graph again.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use vc_graph::ObjectGraph;
/// use vc_json::{DeserializeDriver, DeserializeOptions};
/// use vc_schema::{PropertyDescriptor, PropertyType, TypeDescriptor, TypeRegistry};
///
/// let mut registry = TypeRegistry::new();
/// registry
///     .register(
///         TypeDescriptor::builder("Book")
///             .property(PropertyDescriptor::new("title", PropertyType::String))
///             .build(),
///     )
///     .unwrap();
///
/// let mut graph = ObjectGraph::new();
/// let options = DeserializeOptions::new();
/// let book = DeserializeDriver::new(&mut graph, &registry, &options)
///     .deserialize(&json!({"title": "Dune"}), &PropertyType::object("Book"))
///     .unwrap();
///
/// let instance = graph.resolve(&book).unwrap();
/// assert_eq!(instance.type_name(), "Book");
/// assert_eq!(instance.get("title").and_then(|v| v.as_str()), Some("Dune"));
/// ```
pub struct DeserializeDriver<'a, R: SchemaRegistry + ?Sized = TypeRegistry> {
    pub(super) graph: &'a mut ObjectGraph,
    pub(super) registry: &'a R,
    pub(super) options: &'a DeserializeOptions,
    pub(super) identities: DeserializeIdentities,
    created: Vec<ObjectKey>,
    #[cfg(all(debug_assertions, feature = "debug"))]
    pub(super) stack: TypeStack,
}

impl<'a, R: SchemaRegistry + ?Sized> DeserializeDriver<'a, R> {
    /// Creates a driver for one call, materializing into `graph`.
    pub fn new(graph: &'a mut ObjectGraph, registry: &'a R, options: &'a DeserializeOptions) -> Self {
        Self {
            graph,
            registry,
            options,
            identities: DeserializeIdentities::default(),
            created: Vec::new(),
            #[cfg(all(debug_assertions, feature = "debug"))]
            stack: TypeStack::default(),
        }
    }

    /// Reads `json` as a value of type `ty`.
    ///
    /// `PropertyType::Any` keeps the JSON structure: objects become string
    /// keyed maps.
    pub fn deserialize(mut self, json: &Json, ty: &PropertyType) -> Result<Value, Error> {
        log::debug!("deserialize `{ty}`");

        let result = self.read_root(json, ty);
        #[cfg(all(debug_assertions, feature = "debug"))]
        let result = result.map_err(|e| self.stack.annotate(e));

        if result.is_err() {
            for key in self.created.drain(..) {
                self.graph.remove(key);
            }
        }
        result
    }

    fn read_root(&mut self, json: &Json, ty: &PropertyType) -> Result<Value, Error> {
        let body = if self
            .options
            .features()
            .contains(DeserializeFeatures::UNWRAP_ROOT_VALUE)
        {
            self.unwrap_root(json, ty)?
        } else {
            json
        };

        let value = self.read_value(body, ty, &KeyPath::root())?;

        if let Some((id, type_name)) = self.identities.first_unresolved() {
            return Err(Error::new(
                ErrorKind::UnresolvedId,
                type_name,
                &KeyPath::root(),
                format!("id `{id}` is referenced but never defined"),
            ));
        }
        Ok(value)
    }

    fn unwrap_root<'j>(&mut self, json: &'j Json, ty: &PropertyType) -> Result<&'j Json, Error> {
        let registry = self.registry;
        let options = self.options;
        let expected = options.root_name().or_else(|| {
            ty.object_name()
                .and_then(|name| registry.describe(name))
                .map(TypeDescriptor::root_name)
        });
        let root = KeyPath::root();
        let Some(name) = expected else {
            return Err(self.error(
                ErrorKind::Shape,
                &ty.to_string(),
                &root,
                "no root name is known for this type",
            ));
        };
        match json.as_object() {
            Some(map) if map.len() == 1 => map.get(name).ok_or_else(|| {
                self.error(
                    ErrorKind::Shape,
                    &ty.to_string(),
                    &root,
                    format!("root wrapper is not named `{name}`"),
                )
            }),
            _ => Err(self.error(
                ErrorKind::Shape,
                &ty.to_string(),
                &root,
                format!("expected a single-key root wrapper `{name}`"),
            )),
        }
    }

    // -------------------------------------------------------------------------
    // Allocation

    pub(super) fn allocate(&mut self, instance: Instance) -> ObjectKey {
        let key = self.graph.insert(instance);
        self.created.push(key);
        key
    }

    pub(super) fn reserve(&mut self, type_name: &str) -> ObjectKey {
        let key = self.graph.reserve(type_name);
        self.created.push(key);
        key
    }

    // -------------------------------------------------------------------------
    // Values

    pub(super) fn read_value(
        &mut self,
        json: &Json,
        ty: &PropertyType,
        path: &KeyPath,
    ) -> Result<Value, Error> {
        let options = self.options;

        let mut json: Cow<'_, Json> = Cow::Borrowed(json);
        for (matcher, deserializer) in options.converters().deserializers() {
            if !matcher.matches_target(ty) {
                continue;
            }
            match deserializer
                .call(&json, self.graph)
                .map_err(|e| self.convert_error(ty, path, e))?
            {
                Conversion::Pass => {}
                Conversion::Replace(replaced) => json = Cow::Owned(replaced),
                Conversion::Done(value) => return Ok(value),
            }
        }
        let json = &*json;

        match (ty, json) {
            (PropertyType::Any, json) => Ok(plain(json)),
            (ty, Json::Null) if ty.is_primitive() => {
                if options
                    .features()
                    .contains(DeserializeFeatures::FAIL_ON_NULL_FOR_PRIMITIVES)
                {
                    return Err(self.error(
                        ErrorKind::RequiredValue,
                        &ty.to_string(),
                        path,
                        "null is not accepted for a primitive",
                    ));
                }
                Ok(Value::Null)
            }
            (PropertyType::Object(name), json) => self.read_object(json, name, path),
            (_, Json::Null) => Ok(Value::Null),
            (PropertyType::Bool, Json::Bool(b)) => Ok(Value::Bool(*b)),
            (PropertyType::Bool, Json::String(s)) if s == "true" || s == "false" => {
                Ok(Value::Bool(s == "true"))
            }
            (PropertyType::Int, Json::Number(n)) => match n.as_i64() {
                Some(i) => Ok(Value::Int(i)),
                None => match n.as_f64() {
                    Some(f) if (-9.2e18..=9.2e18).contains(&f) && (f as i64) as f64 == f => {
                        Ok(Value::Int(f as i64))
                    }
                    _ => Err(self.mismatch(ty, json, path)),
                },
            },
            (PropertyType::Int, Json::String(s)) => match s.trim().parse::<i64>() {
                Ok(i) => Ok(Value::Int(i)),
                Err(_) => Err(self.mismatch(ty, json, path)),
            },
            (PropertyType::Float, Json::Number(n)) => match n.as_f64() {
                Some(f) => Ok(Value::Float(f)),
                None => Err(self.mismatch(ty, json, path)),
            },
            (PropertyType::Float, Json::String(s)) => match s.trim().parse::<f64>() {
                Ok(f) => Ok(Value::Float(f)),
                Err(_) => Err(self.mismatch(ty, json, path)),
            },
            (PropertyType::String, Json::String(s)) => Ok(Value::String(s.clone())),
            (PropertyType::String, Json::Number(n)) => Ok(Value::String(n.to_string())),
            (PropertyType::String, Json::Bool(b)) => Ok(Value::String(b.to_string())),
            (PropertyType::Date, Json::Number(n)) => match n.as_i64() {
                Some(ms) => Ok(Value::Date(ms)),
                None => Err(self.mismatch(ty, json, path)),
            },
            (PropertyType::Date, Json::String(s)) => date_from_text(s, None)
                .map(Value::Date)
                .map_err(|m| self.error(ErrorKind::Conversion, "Date", path, m)),
            (PropertyType::List(element), Json::Array(items)) => {
                self.read_list(items, element, None, path)
            }
            (PropertyType::List(element), json) => {
                if !options
                    .features()
                    .contains(DeserializeFeatures::ACCEPT_SINGLE_VALUE_AS_ARRAY)
                {
                    return Err(self.mismatch(ty, json, path));
                }
                let item = self.read_value(json, element, &path.index(0))?;
                Ok(Value::List(vec![item]))
            }
            (PropertyType::Map(key, value), Json::Object(map)) => {
                self.read_map(map, key, value, None, path)
            }
            (ty, json) => Err(self.mismatch(ty, json, path)),
        }
    }

    pub(super) fn read_list(
        &mut self,
        items: &[Json],
        element: &PropertyType,
        each: Option<&DeserializeFn>,
        path: &KeyPath,
    ) -> Result<Value, Error> {
        let mut out = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let child = path.index(index);
            out.push(match each {
                Some(f) => f
                    .call(item, self.graph)
                    .map_err(|e| self.convert_error(element, &child, e))?,
                None => self.read_value(item, element, &child)?,
            });
        }
        Ok(Value::List(out))
    }

    pub(super) fn read_map(
        &mut self,
        map: &Map<String, Json>,
        key_ty: &PropertyType,
        element: &PropertyType,
        each: Option<&DeserializeFn>,
        path: &KeyPath,
    ) -> Result<Value, Error> {
        let mut out = Vec::with_capacity(map.len());
        for (key, item) in map {
            let child = path.key(key);
            let key = self.read_key(key, key_ty, &child)?;
            let value = match each {
                Some(f) => f
                    .call(item, self.graph)
                    .map_err(|e| self.convert_error(element, &child, e))?,
                None => self.read_value(item, element, &child)?,
            };
            out.push((key, value));
        }
        Ok(Value::Map(out))
    }

    fn read_key(&mut self, text: &str, ty: &PropertyType, path: &KeyPath) -> Result<Value, Error> {
        let parsed = match ty {
            PropertyType::Any | PropertyType::String => Some(Value::String(text.into())),
            PropertyType::Bool => text.parse().ok().map(Value::Bool),
            PropertyType::Int => text.parse().ok().map(Value::Int),
            PropertyType::Float => text.parse().ok().map(Value::Float),
            PropertyType::Date => text
                .parse()
                .ok()
                .or_else(|| date_from_text(text, None).ok())
                .map(Value::Date),
            _ => None,
        };
        parsed.ok_or_else(|| {
            self.error(
                ErrorKind::Shape,
                &ty.to_string(),
                path,
                format!("map key `{text}` is not a valid {ty}"),
            )
        })
    }

    // -------------------------------------------------------------------------
    // Errors

    pub(super) fn error(
        &mut self,
        kind: ErrorKind,
        type_name: &str,
        path: &KeyPath,
        message: impl Into<String>,
    ) -> Error {
        #[cfg(all(debug_assertions, feature = "debug"))]
        self.stack.record_failure();
        Error::new(kind, type_name, path, message)
    }

    pub(super) fn convert_error(
        &mut self,
        ty: &PropertyType,
        path: &KeyPath,
        err: ConvertError,
    ) -> Error {
        self.error(ErrorKind::Conversion, &ty.to_string(), path, err.message())
    }

    fn mismatch(&mut self, ty: &PropertyType, json: &Json, path: &KeyPath) -> Error {
        self.error(
            ErrorKind::Shape,
            &ty.to_string(),
            path,
            format!("expected {ty}, found {}", json_kind(json)),
        )
    }
}

// -----------------------------------------------------------------------------
// Helpers

pub(super) fn json_kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "a boolean",
        Json::Number(_) => "a number",
        Json::String(_) => "a string",
        Json::Array(_) => "an array",
        Json::Object(_) => "an object",
    }
}

/// Structural conversion used for `PropertyType::Any`.
pub(super) fn plain(json: &Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Json::String(s) => Value::String(s.clone()),
        Json::Array(items) => Value::List(items.iter().map(plain).collect()),
        Json::Object(map) => Value::Map(
            map.iter()
                .map(|(k, v)| (Value::String(k.clone()), plain(v)))
                .collect(),
        ),
    }
}
