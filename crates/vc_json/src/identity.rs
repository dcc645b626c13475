//! Call-scoped identity maps.
//!
//! Both maps are append-only and live exactly as long as one driver, so no
//! identity leaks from one call into the next.

use alloc::string::String;

use hashbrown::HashMap;
use serde_json::Value as Json;
use vc_graph::ObjectKey;
use vc_schema::{IdGenerator, IdentityDecl};

/// The textual form of an id, used as map key on input.
///
/// Only strings and numbers can be ids.
pub(crate) fn id_text(json: &Json) -> Option<String> {
    use alloc::string::ToString;

    match json {
        Json::String(s) => Some(s.clone()),
        Json::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// -----------------------------------------------------------------------------
// Serialization

/// Object → assigned id.
#[derive(Debug, Default)]
pub(crate) struct SerializeIdentities {
    assigned: HashMap<ObjectKey, Json>,
    sequences: HashMap<String, i64>,
}

impl SerializeIdentities {
    /// The id recorded for `key`, if it was already written in this call.
    #[inline]
    pub fn lookup(&self, key: ObjectKey) -> Option<&Json> {
        self.assigned.get(&key)
    }

    /// Generates and records the id of `key`.
    ///
    /// `own` is the object's own id property, used by `IdGenerator::Property`.
    pub fn assign(
        &mut self,
        key: ObjectKey,
        decl: &IdentityDecl,
        own: Option<Json>,
    ) -> Result<Json, &'static str> {
        let id = match decl.generator {
            IdGenerator::Property => match own {
                Some(id) if id_text(&id).is_some() => id,
                _ => return Err("identity property must hold a string or a number"),
            },
            IdGenerator::IntSequence => {
                let next = self.sequences.entry_ref(decl.scope_name()).or_insert(0);
                *next += 1;
                Json::from(*next)
            }
            IdGenerator::Uuid => Self::uuid()?,
        };
        self.assigned.insert(key, id.clone());
        Ok(id)
    }

    #[cfg(feature = "uuid")]
    fn uuid() -> Result<Json, &'static str> {
        use alloc::string::ToString;

        Ok(Json::String(uuid::Uuid::new_v4().to_string()))
    }

    #[cfg(not(feature = "uuid"))]
    fn uuid() -> Result<Json, &'static str> {
        Err("UUID identities require the `uuid` feature")
    }
}

// -----------------------------------------------------------------------------
// Deserialization

#[derive(Debug)]
pub(crate) struct IdEntry {
    pub key: ObjectKey,
    pub type_name: String,
    /// `false` while the key is a placeholder reserved by a reference that
    /// preceded the definition.
    pub resolved: bool,
}

/// `(scope, id)` → materialized object.
#[derive(Debug, Default)]
pub(crate) struct DeserializeIdentities {
    entries: HashMap<(String, String), IdEntry>,
}

impl DeserializeIdentities {
    pub fn lookup(&self, scope: &str, id: &str) -> Option<&IdEntry> {
        self.entries.get(&(String::from(scope), String::from(id)))
    }

    /// Records a placeholder for an id referenced before its definition.
    pub fn reserve(&mut self, scope: &str, id: &str, key: ObjectKey, type_name: &str) {
        self.entries.insert(
            (scope.into(), id.into()),
            IdEntry {
                key,
                type_name: type_name.into(),
                resolved: false,
            },
        );
    }

    /// Records a materialized object, filling a placeholder if one exists.
    pub fn resolve(&mut self, scope: &str, id: &str, key: ObjectKey, type_name: &str) {
        let entry = self
            .entries
            .entry((scope.into(), id.into()))
            .or_insert_with(|| IdEntry {
                key,
                type_name: type_name.into(),
                resolved: true,
            });
        entry.key = key;
        entry.type_name = type_name.into();
        entry.resolved = true;
    }

    /// The first placeholder never filled, as `(id, type)`.
    pub fn first_unresolved(&self) -> Option<(&str, &str)> {
        let mut open: alloc::vec::Vec<_> = self
            .entries
            .iter()
            .filter(|(_, e)| !e.resolved)
            .map(|((_, id), e)| (id.as_str(), e.type_name.as_str()))
            .collect();
        open.sort_unstable();
        open.first().copied()
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use serde_json::json;
    use vc_graph::{Instance, ObjectGraph};
    use vc_schema::{IdGenerator, IdentityDecl};

    use super::{DeserializeIdentities, SerializeIdentities};

    #[test]
    fn sequences_per_scope() {
        let mut graph = ObjectGraph::new();
        let keys: alloc::vec::Vec<_> = (0..3).map(|_| graph.insert(Instance::new("T"))).collect();

        let users = IdentityDecl::new(IdGenerator::IntSequence).scope("users");
        let items = IdentityDecl::new(IdGenerator::IntSequence).scope("items");

        let mut ids = SerializeIdentities::default();
        assert_eq!(ids.assign(keys[0], &users, None), Ok(json!(1)));
        assert_eq!(ids.assign(keys[1], &users, None), Ok(json!(2)));
        assert_eq!(ids.assign(keys[2], &items, None), Ok(json!(1)));
        assert_eq!(ids.lookup(keys[1]), Some(&json!(2)));
    }

    #[test]
    fn property_generator_needs_scalar() {
        let mut graph = ObjectGraph::new();
        let key = graph.insert(Instance::new("T"));
        let decl = IdentityDecl::new(IdGenerator::Property).property("id");

        let mut ids = SerializeIdentities::default();
        assert!(ids.assign(key, &decl, Some(json!([1]))).is_err());
        assert_eq!(ids.assign(key, &decl, Some(json!("u-1"))), Ok(json!("u-1")));
    }

    #[test]
    fn placeholder_resolution() {
        let mut graph = ObjectGraph::new();
        let key = graph.reserve("User");

        let mut ids = DeserializeIdentities::default();
        ids.reserve("", "1", key, "User");
        assert_eq!(ids.first_unresolved(), Some(("1", "User")));

        ids.resolve("", "1", key, "User");
        assert!(ids.first_unresolved().is_none());
        assert!(ids.lookup("", "1").is_some_and(|e| e.resolved && e.key == key));
        assert!(ids.lookup("other", "1").is_none());
    }
}
