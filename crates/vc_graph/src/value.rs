use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::ObjectKey;

// -----------------------------------------------------------------------------
// ValueKind

/// The shape of a [`Value`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    Float,
    String,
    Date,
    List,
    Map,
    Object,
}

impl ValueKind {
    /// Returns a lowercase name, used in error messages.
    pub const fn name(self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "boolean",
            ValueKind::Int => "integer",
            ValueKind::Float => "float",
            ValueKind::String => "string",
            ValueKind::Date => "date",
            ValueKind::List => "list",
            ValueKind::Map => "map",
            ValueKind::Object => "object",
        }
    }
}

impl fmt::Display for ValueKind {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// -----------------------------------------------------------------------------
// Value

/// A node of the object graph.
///
/// `Null` stands for both `null` and an absent value. Objects are never held
/// by value: [`Value::Object`] is a handle into an [`ObjectGraph`], which is
/// what allows a child to point back at its owner.
///
/// `Map` keeps its entries in insertion order. Keys are usually strings but
/// any scalar is accepted; they are written as their textual form.
///
/// [`ObjectGraph`]: crate::ObjectGraph
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Milliseconds since the Unix epoch.
    Date(i64),
    List(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Object(ObjectKey),
}

impl Value {
    /// Returns the [`ValueKind`] of this value.
    pub const fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::String(_) => ValueKind::String,
            Value::Date(_) => ValueKind::Date,
            Value::List(_) => ValueKind::List,
            Value::Map(_) => ValueKind::Map,
            Value::Object(_) => ValueKind::Object,
        }
    }

    #[inline]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// `null`, an empty string, an empty list or an empty map.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            Value::List(items) => items.is_empty(),
            Value::Map(entries) => entries.is_empty(),
            _ => false,
        }
    }

    /// Whether this is the zero value of its kind.
    ///
    /// Objects are never default; `NaN` is treated as default like `0.0`.
    pub fn is_default(&self) -> bool {
        match self {
            Value::Bool(b) => !*b,
            Value::Int(i) => *i == 0,
            Value::Float(f) => *f == 0.0 || f.is_nan(),
            Value::Date(ms) => *ms == 0,
            Value::Object(_) => false,
            _ => self.is_empty(),
        }
    }

    #[inline]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[inline]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the value as `f64`, widening integers.
    #[inline]
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    #[inline]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    #[inline]
    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Value::Map(entries) => Some(entries.as_slice()),
            _ => None,
        }
    }

    #[inline]
    pub const fn as_object(&self) -> Option<ObjectKey> {
        match self {
            Value::Object(key) => Some(*key),
            _ => None,
        }
    }

    /// Looks up a map entry by its textual key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map()?
            .iter()
            .find(|(k, _)| k.as_key().as_deref() == Some(key))
            .map(|(_, v)| v)
    }

    /// The textual form of a scalar used as a map key.
    ///
    /// Returns `None` for lists, maps, objects and `null`.
    pub fn as_key(&self) -> Option<String> {
        use alloc::string::ToString;

        match self {
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::String(s) => Some(s.clone()),
            Value::Date(ms) => Some(ms.to_string()),
            _ => None,
        }
    }

    /// Every object handle reachable from this value without crossing
    /// into another object, in order.
    pub fn objects(&self) -> Vec<ObjectKey> {
        let mut out = Vec::new();
        self.collect_objects(&mut out);
        out
    }

    fn collect_objects(&self, out: &mut Vec<ObjectKey>) {
        match self {
            Value::Object(key) => out.push(*key),
            Value::List(items) => items.iter().for_each(|v| v.collect_objects(out)),
            Value::Map(entries) => entries.iter().for_each(|(_, v)| v.collect_objects(out)),
            _ => {}
        }
    }
}

// -----------------------------------------------------------------------------
// Conversions

macro_rules! impl_from {
    ($($ty:ty => $variant:ident $(as $cast:ty)?),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                #[inline]
                fn from(value: $ty) -> Self {
                    Value::$variant(value $(as $cast)?)
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i8 => Int as i64,
    i16 => Int as i64,
    i32 => Int as i64,
    i64 => Int,
    u8 => Int as i64,
    u16 => Int as i64,
    u32 => Int as i64,
    f32 => Float as f64,
    f64 => Float,
    String => String,
    ObjectKey => Object,
}

impl From<&str> for Value {
    #[inline]
    fn from(value: &str) -> Self {
        Value::String(String::from(value))
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::List(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

// -----------------------------------------------------------------------------
// Tests
