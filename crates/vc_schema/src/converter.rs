use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use serde_json::Value as Json;
use thiserror::Error;
use vc_graph::{ObjectGraph, Value, ValueKind};

use crate::PropertyType;

// -----------------------------------------------------------------------------
// ConvertError

/// Failure reported by a user supplied converter, creator or predicate.
///
/// The engine wraps it with the type name and key path where it happened.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ConvertError {
    message: String,
}

impl ConvertError {
    #[inline]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

// -----------------------------------------------------------------------------
// Conversion

/// Result of a global converter.
///
/// - **`Pass`** → the converter does not handle this value.
/// - **`Replace(r)`** → processing continues with `r` in place of the input.
/// - **`Done(d)`** → `d` is final; the engine skips its own processing.
#[derive(Debug, Clone, PartialEq)]
pub enum Conversion<R, D> {
    Pass,
    Replace(R),
    Done(D),
}

/// A global serializer result: replace the graph value or emit final JSON.
pub type SerializeConversion = Conversion<Value, Json>;

/// A global deserializer result: replace the JSON input or emit a final value.
pub type DeserializeConversion = Conversion<Json, Value>;

// -----------------------------------------------------------------------------
// Function wrappers

macro_rules! define_fn {
    ($(#[$meta:meta])* $name:ident: Fn($($arg:ident: $ty:ty),*) -> $ret:ty) => {
        $(#[$meta])*
        #[derive(Clone)]
        pub struct $name(Arc<dyn Fn($($ty),*) -> $ret + Send + Sync>);

        impl $name {
            #[inline]
            pub fn new(f: impl Fn($($ty),*) -> $ret + Send + Sync + 'static) -> Self {
                Self(Arc::new(f))
            }

            #[inline]
            pub fn call(&self, $($arg: $ty),*) -> $ret {
                (self.0)($($arg),*)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(concat!(stringify!($name), "(..)"))
            }
        }
    };
}

define_fn! {
    /// Per-property serializer producing the final JSON for a value.
    SerializeFn: Fn(value: &Value, graph: &ObjectGraph) -> Result<Json, ConvertError>
}

define_fn! {
    /// Per-property deserializer producing the final value from JSON.
    DeserializeFn: Fn(json: &Json, graph: &mut ObjectGraph) -> Result<Value, ConvertError>
}

define_fn! {
    /// Global serializer consulted before any schema logic.
    GlobalSerializeFn: Fn(value: &Value, graph: &ObjectGraph) -> Result<SerializeConversion, ConvertError>
}

define_fn! {
    /// Global deserializer consulted before any schema logic.
    GlobalDeserializeFn: Fn(json: &Json, graph: &mut ObjectGraph) -> Result<DeserializeConversion, ConvertError>
}

define_fn! {
    /// Predicate of `Inclusion::Custom`; returns `true` to omit the value.
    ExcludeFn: Fn(value: &Value) -> bool
}

// -----------------------------------------------------------------------------
// TypeMatch

/// Which values a global converter applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeMatch {
    /// Every value.
    Any,
    /// Values of a kind, e.g. every `Date`.
    Kind(ValueKind),
    /// Objects whose runtime (serialization) or target (deserialization)
    /// type is the named one.
    Type(String),
}

impl TypeMatch {
    /// Matches a value about to be serialized.
    pub fn matches_value(&self, value: &Value, graph: &ObjectGraph) -> bool {
        match self {
            TypeMatch::Any => true,
            TypeMatch::Kind(kind) => value.kind() == *kind,
            TypeMatch::Type(name) => value
                .as_object()
                .and_then(|key| graph.type_of(key))
                .is_some_and(|ty| ty == name.as_str()),
        }
    }

    /// Matches the target type of a value about to be deserialized.
    pub fn matches_target(&self, target: &PropertyType) -> bool {
        match self {
            TypeMatch::Any => true,
            TypeMatch::Kind(kind) => target.kind() == Some(*kind),
            TypeMatch::Type(name) => target.object_name() == Some(name.as_str()),
        }
    }
}

// -----------------------------------------------------------------------------
// Converters

#[derive(Debug, Clone)]
struct Entry<F> {
    matcher: TypeMatch,
    order: i32,
    func: F,
}

/// Ordered lists of global serializers and deserializers.
///
/// Entries are consulted in ascending `order`; entries with the same order
/// keep their registration order. The lists are shared read-only between
/// calls once built.
///
/// # Examples
///
/// ```
/// use vc_graph::{Value, ValueKind};
/// use vc_schema::{Conversion, Converters, TypeMatch};
///
/// let mut converters = Converters::new();
/// converters.add_serializer(TypeMatch::Kind(ValueKind::String), 0, |value, _| {
///     let text = value.as_str().unwrap_or_default().to_uppercase();
///     Ok(Conversion::Replace(Value::String(text)))
/// });
/// assert_eq!(converters.serializers().count(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Converters {
    serializers: Vec<Entry<GlobalSerializeFn>>,
    deserializers: Vec<Entry<GlobalDeserializeFn>>,
}

impl Converters {
    #[inline]
    pub const fn new() -> Self {
        Self {
            serializers: Vec::new(),
            deserializers: Vec::new(),
        }
    }

    /// Registers a global serializer.
    pub fn add_serializer(
        &mut self,
        matcher: TypeMatch,
        order: i32,
        func: impl Fn(&Value, &ObjectGraph) -> Result<SerializeConversion, ConvertError>
        + Send
        + Sync
        + 'static,
    ) -> &mut Self {
        let index = self.serializers.partition_point(|e| e.order <= order);
        self.serializers.insert(
            index,
            Entry {
                matcher,
                order,
                func: GlobalSerializeFn::new(func),
            },
        );
        self
    }

    /// Registers a global deserializer.
    pub fn add_deserializer(
        &mut self,
        matcher: TypeMatch,
        order: i32,
        func: impl Fn(&Json, &mut ObjectGraph) -> Result<DeserializeConversion, ConvertError>
        + Send
        + Sync
        + 'static,
    ) -> &mut Self {
        let index = self.deserializers.partition_point(|e| e.order <= order);
        self.deserializers.insert(
            index,
            Entry {
                matcher,
                order,
                func: GlobalDeserializeFn::new(func),
            },
        );
        self
    }

    /// Serializers in consultation order.
    pub fn serializers(&self) -> impl Iterator<Item = (&TypeMatch, &GlobalSerializeFn)> {
        self.serializers.iter().map(|e| (&e.matcher, &e.func))
    }

    /// Deserializers in consultation order.
    pub fn deserializers(&self) -> impl Iterator<Item = (&TypeMatch, &GlobalDeserializeFn)> {
        self.deserializers.iter().map(|e| (&e.matcher, &e.func))
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.serializers.is_empty() && self.deserializers.is_empty()
    }
}

// -----------------------------------------------------------------------------
// Tests
