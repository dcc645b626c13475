use alloc::string::{String, ToString};
use alloc::vec::Vec;

use hashbrown::{HashMap, HashSet};

use crate::{CreatorMode, PropertyDescriptor, PropertyType, Role, SchemaError, TypeDescriptor};

// -----------------------------------------------------------------------------
// SchemaRegistry

/// Query interface the engine reads schema facts through.
///
/// Implementations must be idempotent and free of side effects; the engine
/// may call them any number of times during one call and from several
/// threads at once.
pub trait SchemaRegistry {
    /// The descriptor of the type declared as `type_name`.
    fn describe(&self, type_name: &str) -> Option<&TypeDescriptor>;

    /// The descriptor of the property `property` (internal name) of `type_name`.
    fn describe_property(&self, type_name: &str, property: &str) -> Option<&PropertyDescriptor> {
        self.describe(type_name)?.property(property)
    }

    /// Looks up a type by its discriminator alias (`type_name`), falling
    /// back to its declared name.
    fn describe_type_id(&self, type_id: &str) -> Option<&TypeDescriptor> {
        self.describe(type_id)
    }

    /// Whether values of `sub` may stand where `base` is expected:
    /// `sub == base`, or `sub` is reachable through the subtype tables
    /// starting at `base`.
    fn is_assignable(&self, sub: &str, base: &str) -> bool {
        if sub == base {
            return true;
        }
        let mut pending: Vec<&str> = alloc::vec![base];
        let mut seen: Vec<&str> = Vec::new();
        while let Some(name) = pending.pop() {
            if seen.contains(&name) {
                continue;
            }
            seen.push(name);
            let Some(poly) = self.describe(name).and_then(TypeDescriptor::polymorphism) else {
                continue;
            };
            for subtype in &poly.subtypes {
                if subtype.type_name == sub {
                    return true;
                }
                pending.push(&subtype.type_name);
            }
        }
        false
    }
}

// -----------------------------------------------------------------------------
// TypeRegistry

/// The default [`SchemaRegistry`]: a table of [`TypeDescriptor`]s keyed by
/// declared type name.
///
/// Per-type declarations are checked by [`register`](Self::register);
/// relations between types (subtype tables, reference pairs, referenced
/// types) are checked by [`validate`](Self::validate) once every type is in.
///
/// # Examples
///
/// ```
/// use vc_schema::{PropertyDescriptor, PropertyType, SchemaRegistry, TypeDescriptor, TypeRegistry};
///
/// let mut registry = TypeRegistry::new();
/// registry
///     .register(
///         TypeDescriptor::builder("User")
///             .property(PropertyDescriptor::new("name", PropertyType::String))
///             .build(),
///     )
///     .unwrap();
///
/// assert!(registry.validate().is_ok());
/// assert!(registry.describe_property("User", "name").is_some());
/// ```
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: HashMap<String, TypeDescriptor>,
    type_id_to_name: HashMap<String, String>,
    ambiguous_ids: HashSet<String>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    // An alias already claimed by another type becomes ambiguous and
    // resolves to nothing.
    fn add_type_id_index(
        desc: &TypeDescriptor,
        type_id_to_name: &mut HashMap<String, String>,
        ambiguous_ids: &mut HashSet<String>,
    ) {
        let type_id = desc.type_id_name();
        if type_id == desc.name() || ambiguous_ids.contains(type_id) {
            return;
        }
        if type_id_to_name.contains_key(type_id) {
            type_id_to_name.remove(type_id);
            ambiguous_ids.insert(type_id.into());
        } else {
            type_id_to_name.insert(type_id.into(), desc.name().into());
        }
    }

    /// Checks and adds a descriptor.
    ///
    /// Fails with [`SchemaError::DuplicateType`] when the name is taken, or
    /// with the first per-type inconsistency found.
    pub fn register(&mut self, desc: TypeDescriptor) -> Result<(), SchemaError> {
        if self.types.contains_key(desc.name()) {
            return Err(SchemaError::DuplicateType(desc.name().into()));
        }
        desc.validate()?;
        log::debug!("register type `{}`", desc.name());
        Self::add_type_id_index(&desc, &mut self.type_id_to_name, &mut self.ambiguous_ids);
        self.types.insert(desc.name().into(), desc);
        Ok(())
    }

    /// Checks and adds or **overwrites** a descriptor.
    pub fn insert(&mut self, desc: TypeDescriptor) -> Result<(), SchemaError> {
        desc.validate()?;
        if !self.types.contains_key(desc.name()) {
            Self::add_type_id_index(&desc, &mut self.type_id_to_name, &mut self.ambiguous_ids);
        }
        self.types.insert(desc.name().into(), desc);
        Ok(())
    }

    #[inline]
    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    #[inline]
    pub fn get(&self, type_name: &str) -> Option<&TypeDescriptor> {
        self.types.get(type_name)
    }

    /// Returns `true` if the discriminator alias is claimed by several types.
    #[inline]
    pub fn is_ambiguous(&self, type_id: &str) -> bool {
        self.ambiguous_ids.contains(type_id)
    }

    /// Iterates the registered descriptors in arbitrary order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.types.values()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Checks declarations that involve more than one type.
    ///
    /// - every referenced type (property, subtype, default implementation,
    ///   creator argument) is registered;
    /// - subtype discriminators are unique within a subtype table;
    /// - every forward reference has exactly one back reference with the
    ///   same pair name on the referenced type, and that back reference
    ///   points at the owner (or a base of it);
    /// - every back reference has a forward counterpart.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();

        for name in names {
            let desc = &self.types[name];
            self.validate_references(desc)?;
            self.validate_subtypes(desc)?;
            for prop in desc.properties() {
                match prop.role() {
                    Role::ForwardReference(pair) => self.validate_forward(desc, prop, pair)?,
                    Role::BackReference(pair) => self.validate_back(desc, prop, pair)?,
                    Role::Plain => {}
                }
            }
        }
        Ok(())
    }

    fn require_type(&self, referrer: &str, type_name: &str) -> Result<(), SchemaError> {
        if self.types.contains_key(type_name) {
            Ok(())
        } else {
            Err(SchemaError::UnknownType {
                referrer: referrer.into(),
                type_name: type_name.into(),
            })
        }
    }

    fn require_property_type(&self, referrer: &str, ty: &PropertyType) -> Result<(), SchemaError> {
        match ty {
            PropertyType::Object(name) => self.require_type(referrer, name),
            PropertyType::List(elem) => self.require_property_type(referrer, elem),
            PropertyType::Map(key, value) => {
                self.require_property_type(referrer, key)?;
                self.require_property_type(referrer, value)
            }
            _ => Ok(()),
        }
    }

    fn validate_references(&self, desc: &TypeDescriptor) -> Result<(), SchemaError> {
        for prop in desc.properties() {
            self.require_property_type(desc.name(), prop.ty())?;
        }
        for creator in desc.creators() {
            match creator.mode() {
                CreatorMode::Properties(params) => {
                    for param in params {
                        self.require_property_type(desc.name(), &param.ty)?;
                    }
                }
                CreatorMode::Delegating(ty) => self.require_property_type(desc.name(), ty)?,
            }
        }
        Ok(())
    }

    fn validate_subtypes(&self, desc: &TypeDescriptor) -> Result<(), SchemaError> {
        let Some(poly) = desc.polymorphism() else {
            return Ok(());
        };
        let mut seen: HashSet<&str> = HashSet::new();
        for subtype in &poly.subtypes {
            self.require_type(desc.name(), &subtype.type_name)?;
            let id = match &subtype.name {
                Some(name) => name.as_str(),
                None => self.types[subtype.type_name.as_str()].type_id_name(),
            };
            if !seen.insert(id) {
                return Err(SchemaError::InvalidType {
                    type_name: desc.name().into(),
                    reason: alloc::format!("discriminator `{id}` names two subtypes"),
                });
            }
        }
        if let Some(default_impl) = &poly.default_impl {
            self.require_type(desc.name(), default_impl)?;
        }
        Ok(())
    }

    fn validate_forward(
        &self,
        owner: &TypeDescriptor,
        prop: &PropertyDescriptor,
        pair: &str,
    ) -> Result<(), SchemaError> {
        let unpaired = |target: &str| SchemaError::UnpairedReference {
            type_name: owner.name().into(),
            property: prop.name().into(),
            pair: pair.into(),
            target: target.into(),
        };
        let target_name = prop.ty().referenced_object().ok_or_else(|| unpaired("?"))?;
        let target = self
            .types
            .get(target_name)
            .ok_or_else(|| unpaired(target_name))?;
        let mut back = target.back_references(pair);
        let back_prop = back.next().ok_or_else(|| unpaired(target_name))?;

        let points_at = back_prop.ty().object_name();
        if !points_at.is_some_and(|base| self.is_assignable(owner.name(), base)) {
            return Err(SchemaError::IncompatibleReference {
                type_name: target_name.into(),
                property: back_prop.name().into(),
                pair: pair.into(),
                expected: owner.name().into(),
            });
        }
        Ok(())
    }

    fn validate_back(
        &self,
        desc: &TypeDescriptor,
        prop: &PropertyDescriptor,
        pair: &str,
    ) -> Result<(), SchemaError> {
        let paired = self.types.values().any(|owner| {
            owner.properties().iter().any(|p| {
                matches!(p.role(), Role::ForwardReference(x) if x == pair)
                    && p.ty()
                        .referenced_object()
                        .is_some_and(|target| self.is_assignable(desc.name(), target))
            })
        });
        if paired {
            Ok(())
        } else {
            Err(SchemaError::UnpairedReference {
                type_name: desc.name().into(),
                property: prop.name().into(),
                pair: pair.into(),
                target: prop.ty().to_string(),
            })
        }
    }
}

impl SchemaRegistry for TypeRegistry {
    #[inline]
    fn describe(&self, type_name: &str) -> Option<&TypeDescriptor> {
        self.types.get(type_name)
    }

    fn describe_type_id(&self, type_id: &str) -> Option<&TypeDescriptor> {
        match self.type_id_to_name.get(type_id) {
            Some(name) => self.types.get(name),
            None => self.types.get(type_id),
        }
    }
}

// -----------------------------------------------------------------------------
// Tests
