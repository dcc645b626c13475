use alloc::string::String;
use alloc::vec::Vec;

use crate::Value;

// -----------------------------------------------------------------------------
// Instance

/// One object of the graph: its runtime type name and named slots.
///
/// Slots keep their insertion order. Setting an existing slot replaces the
/// value in place.
///
/// # Examples
///
/// ```
/// use vc_graph::{Instance, Value};
///
/// let mut dog = Instance::new("Dog").with("name", "Arthur");
/// dog.set("age", 3);
///
/// assert_eq!(dog.type_name(), "Dog");
/// assert_eq!(dog.get("name"), Some(&Value::from("Arthur")));
/// assert_eq!(dog.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Instance {
    type_name: String,
    slots: Vec<(String, Value)>,
}

impl Instance {
    /// Creates an instance of `type_name` with no slots.
    #[inline]
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            slots: Vec::new(),
        }
    }

    /// Sets a slot, returning `self`.
    #[inline]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Returns the runtime type name.
    #[inline]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Changes the runtime type name.
    ///
    /// Used when a placeholder reserved for a forward reference is later
    /// materialized as a more specific subtype.
    #[inline]
    pub fn set_type_name(&mut self, type_name: impl Into<String>) {
        self.type_name = type_name.into();
    }

    /// Returns the value of the slot `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.slots.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Returns the value of the slot `name` mutably.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.slots
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Sets the slot `name`, returning the previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let name = name.into();
        let value = value.into();
        match self.get_mut(&name) {
            Some(slot) => Some(core::mem::replace(slot, value)),
            None => {
                self.slots.push((name, value));
                None
            }
        }
    }

    /// Removes the slot `name`.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let index = self.slots.iter().position(|(n, _)| n == name)?;
        Some(self.slots.remove(index).1)
    }

    /// Whether the slot `name` exists.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.slots.iter().any(|(n, _)| n == name)
    }

    /// Iterates the slots in insertion order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&str, &Value)> {
        self.slots.iter().map(|(n, v)| (n.as_str(), v))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
