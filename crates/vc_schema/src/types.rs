use alloc::boxed::Box;
use alloc::string::String;
use core::fmt;

use vc_graph::ValueKind;

// -----------------------------------------------------------------------------
// PropertyType

/// The declared type of a property, creator parameter or top-level value.
///
/// `Object` names a type registered in the schema registry. Containers carry
/// their element type (and, for maps, their key type) so the engine can
/// recurse with the right descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum PropertyType {
    /// No static knowledge; serialization uses the runtime value and
    /// deserialization keeps the JSON structure.
    #[default]
    Any,
    Bool,
    Int,
    Float,
    String,
    Date,
    Object(String),
    List(Box<PropertyType>),
    Map(Box<PropertyType>, Box<PropertyType>),
}

impl PropertyType {
    /// `Object(name)`.
    #[inline]
    pub fn object(name: impl Into<String>) -> Self {
        PropertyType::Object(name.into())
    }

    /// `List(element)`.
    #[inline]
    pub fn list(element: PropertyType) -> Self {
        PropertyType::List(Box::new(element))
    }

    /// `Map(key, value)`.
    #[inline]
    pub fn map(key: PropertyType, value: PropertyType) -> Self {
        PropertyType::Map(Box::new(key), Box::new(value))
    }

    /// `Map(String, value)`.
    #[inline]
    pub fn dict(value: PropertyType) -> Self {
        Self::map(PropertyType::String, value)
    }

    /// The type name for `Object`.
    #[inline]
    pub fn object_name(&self) -> Option<&str> {
        match self {
            PropertyType::Object(name) => Some(name),
            _ => None,
        }
    }

    /// The object type reached through containers, e.g. `Item` for
    /// `List<Item>` or `Map<String, Item>`.
    pub fn referenced_object(&self) -> Option<&str> {
        match self {
            PropertyType::Object(name) => Some(name),
            PropertyType::List(element) => element.referenced_object(),
            PropertyType::Map(_, value) => value.referenced_object(),
            _ => None,
        }
    }

    /// Element type of a list, value type of a map.
    #[inline]
    pub fn element(&self) -> Option<&PropertyType> {
        match self {
            PropertyType::List(element) => Some(element),
            PropertyType::Map(_, value) => Some(value),
            _ => None,
        }
    }

    #[inline]
    pub const fn is_container(&self) -> bool {
        matches!(self, PropertyType::List(_) | PropertyType::Map(..))
    }

    /// `Bool`, `Int` and `Float`, which have no meaningful `null`.
    #[inline]
    pub const fn is_primitive(&self) -> bool {
        matches!(
            self,
            PropertyType::Bool | PropertyType::Int | PropertyType::Float
        )
    }

    /// The value kind produced by this type, `None` for `Any`.
    pub const fn kind(&self) -> Option<ValueKind> {
        match self {
            PropertyType::Any => None,
            PropertyType::Bool => Some(ValueKind::Bool),
            PropertyType::Int => Some(ValueKind::Int),
            PropertyType::Float => Some(ValueKind::Float),
            PropertyType::String => Some(ValueKind::String),
            PropertyType::Date => Some(ValueKind::Date),
            PropertyType::Object(_) => Some(ValueKind::Object),
            PropertyType::List(_) => Some(ValueKind::List),
            PropertyType::Map(..) => Some(ValueKind::Map),
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyType::Any => f.write_str("Any"),
            PropertyType::Bool => f.write_str("Bool"),
            PropertyType::Int => f.write_str("Int"),
            PropertyType::Float => f.write_str("Float"),
            PropertyType::String => f.write_str("String"),
            PropertyType::Date => f.write_str("Date"),
            PropertyType::Object(name) => f.write_str(name),
            PropertyType::List(element) => write!(f, "List<{element}>"),
            PropertyType::Map(key, value) => write!(f, "Map<{key}, {value}>"),
        }
    }
}

// -----------------------------------------------------------------------------
// Tests
