use alloc::collections::BTreeSet;
use core::fmt;

use slotmap::SlotMap;

use crate::{Instance, Value};

slotmap::new_key_type! {
    /// A handle to an [`Instance`] stored in an [`ObjectGraph`].
    ///
    /// Handles are only meaningful for the graph that issued them.
    pub struct ObjectKey;
}

// -----------------------------------------------------------------------------
// ObjectGraph

/// Arena owning every object of a graph.
///
/// References between objects are [`ObjectKey`] handles stored as
/// [`Value::Object`], so the same instance may be referenced from many places
/// (including from its own descendants) without reference counting.
#[derive(Default, Clone)]
pub struct ObjectGraph {
    objects: SlotMap<ObjectKey, Instance>,
}

impl ObjectGraph {
    /// Creates an empty graph.
    #[inline]
    pub fn new() -> Self {
        Self {
            objects: SlotMap::with_key(),
        }
    }

    /// Moves `instance` into the graph.
    #[inline]
    pub fn insert(&mut self, instance: Instance) -> ObjectKey {
        self.objects.insert(instance)
    }

    /// Reserves a slot holding an empty instance of `type_name`.
    ///
    /// The slot can be filled later with [`replace`](Self::replace), while
    /// the returned key is already usable as a reference.
    #[inline]
    pub fn reserve(&mut self, type_name: &str) -> ObjectKey {
        self.objects.insert(Instance::new(type_name))
    }

    /// Replaces the instance behind `key`, returning the previous one.
    pub fn replace(&mut self, key: ObjectKey, instance: Instance) -> Option<Instance> {
        self.objects
            .get_mut(key)
            .map(|slot| core::mem::replace(slot, instance))
    }

    #[inline]
    pub fn get(&self, key: ObjectKey) -> Option<&Instance> {
        self.objects.get(key)
    }

    #[inline]
    pub fn get_mut(&mut self, key: ObjectKey) -> Option<&mut Instance> {
        self.objects.get_mut(key)
    }

    #[inline]
    pub fn remove(&mut self, key: ObjectKey) -> Option<Instance> {
        self.objects.remove(key)
    }

    #[inline]
    pub fn contains(&self, key: ObjectKey) -> bool {
        self.objects.contains_key(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Iterates all objects in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectKey, &Instance)> {
        self.objects.iter()
    }

    /// Returns the runtime type name of the object behind `key`.
    #[inline]
    pub fn type_of(&self, key: ObjectKey) -> Option<&str> {
        self.get(key).map(Instance::type_name)
    }

    /// Returns the slot `name` of the object behind `key`.
    #[inline]
    pub fn field(&self, key: ObjectKey, name: &str) -> Option<&Value> {
        self.get(key)?.get(name)
    }

    /// Sets the slot `name` of the object behind `key`.
    ///
    /// Returns `false` if `key` is not part of this graph.
    pub fn set_field(&mut self, key: ObjectKey, name: &str, value: impl Into<Value>) -> bool {
        match self.get_mut(key) {
            Some(instance) => {
                instance.set(name, value);
                true
            }
            None => false,
        }
    }

    /// Dereferences an object value.
    #[inline]
    pub fn resolve(&self, value: &Value) -> Option<&Instance> {
        self.get(value.as_object()?)
    }

    /// Structural equality of `left` in `self` and `right` in `other`.
    ///
    /// Objects compare by type name and slot set (slot order is ignored),
    /// recursively. A pair of objects already under comparison is assumed
    /// equal, which makes the check terminate on cyclic graphs.
    pub fn same_shape(&self, left: &Value, other: &ObjectGraph, right: &Value) -> bool {
        let mut visiting = BTreeSet::new();
        self.same_shape_inner(left, other, right, &mut visiting)
    }

    fn same_shape_inner(
        &self,
        left: &Value,
        other: &ObjectGraph,
        right: &Value,
        visiting: &mut BTreeSet<(ObjectKey, ObjectKey)>,
    ) -> bool {
        match (left, right) {
            (Value::Object(a), Value::Object(b)) => {
                if !visiting.insert((*a, *b)) {
                    return true;
                }
                let (Some(a), Some(b)) = (self.get(*a), other.get(*b)) else {
                    return false;
                };
                a.type_name() == b.type_name()
                    && a.len() == b.len()
                    && a.iter().all(|(name, value)| {
                        b.get(name).is_some_and(|right| {
                            self.same_shape_inner(value, other, right, visiting)
                        })
                    })
            }
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|(a, b)| self.same_shape_inner(a, other, b, visiting))
            }
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len()
                    && a.iter().zip(b).all(|((ka, va), (kb, vb))| {
                        ka.as_key() == kb.as_key()
                            && self.same_shape_inner(va, other, vb, visiting)
                    })
            }
            (a, b) => a == b,
        }
    }
}

impl fmt::Debug for ObjectGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.objects.iter()).finish()
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::ObjectGraph;
    use crate::{Instance, Value};

    #[test]
    fn reserve_then_fill() {
        let mut graph = ObjectGraph::new();
        let key = graph.reserve("Animal");
        assert_eq!(graph.type_of(key), Some("Animal"));

        graph.replace(key, Instance::new("Dog").with("name", "Arthur"));
        assert_eq!(graph.type_of(key), Some("Dog"));
        assert_eq!(graph.field(key, "name"), Some(&Value::from("Arthur")));
    }

    #[test]
    fn same_shape_handles_cycles() {
        let mut left = ObjectGraph::new();
        let user = left.insert(Instance::new("User").with("name", "John"));
        let item = left.insert(Instance::new("Item").with("owner", user));
        left.set_field(user, "items", Value::List(vec![Value::Object(item)]));

        let mut right = ObjectGraph::new();
        let r_item = right.insert(Instance::new("Item"));
        let r_user = right.insert(
            Instance::new("User")
                .with("items", Value::List(vec![Value::Object(r_item)]))
                .with("name", "John"),
        );
        right.set_field(r_item, "owner", r_user);

        assert!(left.same_shape(&Value::Object(user), &right, &Value::Object(r_user)));

        right.set_field(r_user, "name", "Jane");
        assert!(!left.same_shape(&Value::Object(user), &right, &Value::Object(r_user)));
    }
}
