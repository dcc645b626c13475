use alloc::string::String;
use alloc::vec::Vec;

use hashbrown::HashMap;

use crate::{Creator, Inclusion, NamingStrategy, PropertyDescriptor, PropertyType};
use crate::{Role, SchemaError};

// -----------------------------------------------------------------------------
// Polymorphism

/// Where the discriminator lives on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TypeIdStrategy {
    /// `{"@type": "Dog", ...fields}`, discriminator appended.
    #[default]
    Property,
    /// Like `Property`, but the discriminator is a regular property of the
    /// type and is not written a second time.
    ExistingProperty,
    /// `{"Dog": {...fields}}`
    WrapperObject,
    /// `["Dog", {...fields}]`
    WrapperArray,
}

/// An entry of the known-subtype table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subtype {
    pub type_name: String,
    /// The discriminator written for this subtype; the type's own name
    /// (or its `type_name` alias) when absent.
    pub name: Option<String>,
}

/// Polymorphism declaration of a base type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Polymorphism {
    pub strategy: TypeIdStrategy,
    pub property: String,
    pub subtypes: Vec<Subtype>,
    /// Type used when the discriminator is missing or unknown and the
    /// corresponding failure is disabled.
    pub default_impl: Option<String>,
}

impl Polymorphism {
    /// A declaration with the default discriminator property `@type`.
    pub fn new(strategy: TypeIdStrategy) -> Self {
        Self {
            strategy,
            property: String::from("@type"),
            subtypes: Vec::new(),
            default_impl: None,
        }
    }

    pub fn property(mut self, property: impl Into<String>) -> Self {
        self.property = property.into();
        self
    }

    /// Adds a subtype written under its own type name.
    pub fn subtype(mut self, type_name: impl Into<String>) -> Self {
        self.subtypes.push(Subtype {
            type_name: type_name.into(),
            name: None,
        });
        self
    }

    /// Adds a subtype written under an explicit discriminator.
    pub fn named_subtype(mut self, type_name: impl Into<String>, name: impl Into<String>) -> Self {
        self.subtypes.push(Subtype {
            type_name: type_name.into(),
            name: Some(name.into()),
        });
        self
    }

    pub fn default_impl(mut self, type_name: impl Into<String>) -> Self {
        self.default_impl = Some(type_name.into());
        self
    }
}

// -----------------------------------------------------------------------------
// Identity

/// How identities are generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdGenerator {
    /// The object's own property (named by the declaration) is its id.
    Property,
    /// `1, 2, 3, ...` per scope and call.
    IntSequence,
    /// Random v4 UUID text.
    Uuid,
}

/// Identity declaration of a type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityDecl {
    pub generator: IdGenerator,
    pub property: String,
    pub scope: Option<String>,
}

impl IdentityDecl {
    /// A declaration with the default id property `@id`.
    pub fn new(generator: IdGenerator) -> Self {
        Self {
            generator,
            property: String::from("@id"),
            scope: None,
        }
    }

    pub fn property(mut self, property: impl Into<String>) -> Self {
        self.property = property.into();
        self
    }

    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// The scope identities live in; unscoped declarations share `""`.
    #[inline]
    pub fn scope_name(&self) -> &str {
        self.scope.as_deref().unwrap_or("")
    }
}

// -----------------------------------------------------------------------------
// AppendAttr

/// A synthetic property written from the caller's attribute bag.
#[derive(Debug, Clone)]
pub struct AppendAttr {
    /// Key in the attribute bag.
    pub value: String,
    /// Output name, `value` when absent.
    pub prop_name: Option<String>,
    pub required: bool,
    pub inclusion: Inclusion,
}

impl AppendAttr {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            prop_name: None,
            required: false,
            inclusion: Inclusion::Always,
        }
    }

    pub fn prop_name(mut self, name: impl Into<String>) -> Self {
        self.prop_name = Some(name.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn inclusion(mut self, inclusion: Inclusion) -> Self {
        self.inclusion = inclusion;
        self
    }

    #[inline]
    pub fn output_name(&self) -> &str {
        self.prop_name.as_deref().unwrap_or(&self.value)
    }
}

// -----------------------------------------------------------------------------
// TypeDescriptor

/// Static schema of one type.
///
/// Descriptors are read-only facts: the engine queries them through
/// [`SchemaRegistry`](crate::SchemaRegistry) and never mutates them.
/// Build them with [`TypeDescriptor::builder`].
///
/// # Examples
///
/// ```
/// use vc_schema::{Polymorphism, PropertyDescriptor, PropertyType, TypeDescriptor, TypeIdStrategy};
///
/// let animal = TypeDescriptor::builder("Animal")
///     .property(PropertyDescriptor::new("name", PropertyType::String))
///     .polymorphism(
///         Polymorphism::new(TypeIdStrategy::Property)
///             .subtype("Dog")
///             .subtype("Cat"),
///     )
///     .build();
///
/// let dog = TypeDescriptor::builder("Dog").extend(&animal).build();
///
/// assert_eq!(dog.property("name").unwrap().output_name(), "name");
/// assert!(dog.polymorphism().is_some());
/// ```
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    name: String,
    type_name: Option<String>,
    properties: Vec<PropertyDescriptor>,
    value_property: Option<String>,
    polymorphism: Option<Polymorphism>,
    identity: Option<IdentityDecl>,
    inclusion: Inclusion,
    naming: Option<NamingStrategy>,
    ignore_unknown: bool,
    order: Vec<String>,
    alphabetic: bool,
    append: Vec<AppendAttr>,
    prepend: bool,
    creators: Vec<Creator>,
    ignored: bool,
    root_name: Option<String>,
    filter: Option<String>,
    any_property: Option<String>,
}

impl TypeDescriptor {
    /// Starts a descriptor for the type `name`.
    #[inline]
    pub fn builder(name: impl Into<String>) -> TypeBuilder {
        TypeBuilder::new(name)
    }

    /// The declared type name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The name written as discriminator when no subtype entry names it.
    #[inline]
    pub fn type_id_name(&self) -> &str {
        self.type_name.as_deref().unwrap_or(&self.name)
    }

    /// Properties in declaration order.
    #[inline]
    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    /// Looks up a property by internal name.
    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name() == name)
    }

    /// Looks up a property by any input name (output name or alias).
    pub fn property_by_input(&self, key: &str) -> Option<&PropertyDescriptor> {
        self.properties
            .iter()
            .find(|p| p.input_names().any(|n| n == key))
    }

    /// Properties in output order.
    ///
    /// Explicitly ordered properties come first (matched by internal or
    /// output name), then the rest alphabetically by output name when
    /// `alphabetic` or the type's own flag is set, else in declaration order.
    pub fn ordered_properties(&self, alphabetic: bool) -> Vec<&PropertyDescriptor> {
        let mut out: Vec<&PropertyDescriptor> = Vec::with_capacity(self.properties.len());
        for key in &self.order {
            if let Some(p) = self
                .properties
                .iter()
                .find(|p| p.name() == key || p.output_name() == key)
                && !out.iter().any(|q| q.name() == p.name())
            {
                out.push(p);
            }
        }
        let explicit = out.len();
        out.extend(
            self.properties
                .iter()
                .filter(|p| !self.order.iter().any(|k| k == p.name() || k == p.output_name())),
        );
        if alphabetic || self.alphabetic {
            out[explicit..].sort_by(|a, b| a.output_name().cmp(b.output_name()));
        }
        out
    }

    #[inline]
    pub fn value_property(&self) -> Option<&str> {
        self.value_property.as_deref()
    }

    #[inline]
    pub fn polymorphism(&self) -> Option<&Polymorphism> {
        self.polymorphism.as_ref()
    }

    #[inline]
    pub fn identity(&self) -> Option<&IdentityDecl> {
        self.identity.as_ref()
    }

    /// Default inclusion of the type's properties.
    #[inline]
    pub fn inclusion(&self) -> &Inclusion {
        &self.inclusion
    }

    /// The effective inclusion of `property` on this type.
    #[inline]
    pub fn inclusion_of<'a>(&'a self, property: &'a PropertyDescriptor) -> &'a Inclusion {
        property.inclusion_policy().unwrap_or(&self.inclusion)
    }

    #[inline]
    pub fn naming(&self) -> Option<NamingStrategy> {
        self.naming
    }

    #[inline]
    pub fn ignores_unknown(&self) -> bool {
        self.ignore_unknown
    }

    #[inline]
    pub fn append_attrs(&self) -> &[AppendAttr] {
        &self.append
    }

    /// Whether the append attributes go before the properties.
    #[inline]
    pub fn prepends(&self) -> bool {
        self.prepend
    }

    #[inline]
    pub fn creators(&self) -> &[Creator] {
        &self.creators
    }

    /// The creator named `name`, or the default one for `None`.
    pub fn creator(&self, name: Option<&str>) -> Option<&Creator> {
        self.creators.iter().find(|c| c.name() == name)
    }

    #[inline]
    pub fn is_ignored(&self) -> bool {
        self.ignored
    }

    /// The root wrapper name: explicit root name, else the type name.
    #[inline]
    pub fn root_name(&self) -> &str {
        self.root_name.as_deref().unwrap_or(&self.name)
    }

    #[inline]
    pub fn filter_id(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    #[inline]
    pub fn any_property(&self) -> Option<&str> {
        self.any_property.as_deref()
    }

    /// Back-reference properties with the pair name `pair`.
    pub fn back_references<'a, 'p>(
        &'a self,
        pair: &'p str,
    ) -> impl Iterator<Item = &'a PropertyDescriptor> + use<'a, 'p> {
        self.properties
            .iter()
            .filter(move |p| matches!(p.role(), Role::BackReference(x) if x == pair))
    }

    /// Checks the declarations of this type in isolation.
    ///
    /// Run by [`TypeRegistry::register`](crate::TypeRegistry::register).
    pub fn validate(&self) -> Result<(), SchemaError> {
        let mut outputs: HashMap<&str, &str> = HashMap::new();
        let mut inputs: HashMap<&str, &str> = HashMap::new();
        let mut back_refs: HashMap<&str, &str> = HashMap::new();

        for prop in &self.properties {
            if prop.is_ignored() {
                continue;
            }
            if prop.access_mode().readable()
                && prop.unwrap_info().is_none()
                && let Some(first) = outputs.insert(prop.output_name(), prop.name())
            {
                return Err(SchemaError::DuplicateOutputName {
                    type_name: self.name.clone(),
                    name: prop.output_name().into(),
                    first: first.into(),
                    second: prop.name().into(),
                });
            }
            for input in prop.input_names() {
                if let Some(first) = inputs.insert(input, prop.name())
                    && first != prop.name()
                {
                    return Err(SchemaError::DuplicateInputName {
                        type_name: self.name.clone(),
                        name: input.into(),
                        first: first.into(),
                        second: prop.name().into(),
                    });
                }
            }
            if let Role::BackReference(pair) = prop.role()
                && let Some(first) = back_refs.insert(pair, prop.name())
            {
                return Err(SchemaError::DuplicateBackReference {
                    type_name: self.name.clone(),
                    pair: pair.clone(),
                    first: first.into(),
                    second: prop.name().into(),
                });
            }
            if prop.unwrap_info().is_some() && prop.ty().object_name().is_none() {
                return Err(self.invalid_property(prop.name(), "is unwrapped but not an object"));
            }
            if prop.is_raw() && !matches!(prop.ty(), PropertyType::String | PropertyType::Any) {
                return Err(self.invalid_property(prop.name(), "is raw but not a string"));
            }
            if matches!(prop.role(), Role::ForwardReference(_))
                && prop.ty().referenced_object().is_none()
            {
                return Err(self.invalid_property(prop.name(), "is a forward reference to a non-object"));
            }
        }

        if let Some(value) = &self.value_property
            && self.property(value).is_none()
        {
            return Err(self.invalid_type(alloc::format!("value property `{value}` is not declared")));
        }
        if let Some(any) = &self.any_property {
            match self.property(any) {
                Some(p) if matches!(p.ty(), PropertyType::Map(..) | PropertyType::Any) => {}
                _ => {
                    return Err(self.invalid_type(alloc::format!(
                        "any-property `{any}` must be a declared map property"
                    )));
                }
            }
        }
        if let Some(identity) = &self.identity
            && identity.generator == IdGenerator::Property
            && self.property(&identity.property).is_none()
        {
            return Err(self.invalid_type(alloc::format!(
                "identity property `{}` is not declared",
                identity.property
            )));
        }
        for (index, creator) in self.creators.iter().enumerate() {
            if self.creators[..index].iter().any(|c| c.name() == creator.name()) {
                return Err(self.invalid_type(alloc::format!(
                    "creator `{}` is declared twice",
                    creator.name().unwrap_or("<default>")
                )));
            }
        }
        Ok(())
    }

    fn invalid_property(&self, property: &str, reason: &str) -> SchemaError {
        SchemaError::InvalidProperty {
            type_name: self.name.clone(),
            property: property.into(),
            reason: reason.into(),
        }
    }

    fn invalid_type(&self, reason: String) -> SchemaError {
        SchemaError::InvalidType {
            type_name: self.name.clone(),
            reason,
        }
    }
}

// -----------------------------------------------------------------------------
// TypeBuilder

/// Builder of [`TypeDescriptor`].
#[derive(Debug, Clone)]
pub struct TypeBuilder {
    inner: TypeDescriptor,
}

impl TypeBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            inner: TypeDescriptor {
                name: name.into(),
                type_name: None,
                properties: Vec::new(),
                value_property: None,
                polymorphism: None,
                identity: None,
                inclusion: Inclusion::Always,
                naming: None,
                ignore_unknown: false,
                order: Vec::new(),
                alphabetic: false,
                append: Vec::new(),
                prepend: false,
                creators: Vec::new(),
                ignored: false,
                root_name: None,
                filter: None,
                any_property: None,
            },
        }
    }

    /// Copies the parent's properties and its type-level declarations that
    /// subtypes inherit (polymorphism, identity, inclusion, naming, unknown
    /// property policy, ordering, filter).
    ///
    /// Properties added afterwards with an existing internal name replace
    /// the inherited ones.
    pub fn extend(mut self, parent: &TypeDescriptor) -> Self {
        let d = &mut self.inner;
        for prop in &parent.properties {
            if !d.properties.iter().any(|p| p.name() == prop.name()) {
                d.properties.push(prop.clone());
            }
        }
        d.polymorphism = d.polymorphism.take().or_else(|| parent.polymorphism.clone());
        d.identity = d.identity.take().or_else(|| parent.identity.clone());
        d.inclusion = parent.inclusion.clone();
        d.naming = d.naming.or(parent.naming);
        d.ignore_unknown |= parent.ignore_unknown;
        if d.order.is_empty() {
            d.order.clone_from(&parent.order);
        }
        d.alphabetic |= parent.alphabetic;
        d.filter = d.filter.take().or_else(|| parent.filter.clone());
        self
    }

    /// The discriminator written for this type when the base's subtype
    /// table does not name it.
    pub fn type_name(mut self, name: impl Into<String>) -> Self {
        self.inner.type_name = Some(name.into());
        self
    }

    /// Adds a property; replaces an existing one with the same internal name.
    pub fn property(mut self, property: PropertyDescriptor) -> Self {
        let props = &mut self.inner.properties;
        match props.iter_mut().find(|p| p.name() == property.name()) {
            Some(slot) => *slot = property,
            None => props.push(property),
        }
        self
    }

    /// The property whose value replaces the whole object on output.
    pub fn value_property(mut self, name: impl Into<String>) -> Self {
        self.inner.value_property = Some(name.into());
        self
    }

    pub fn polymorphism(mut self, polymorphism: Polymorphism) -> Self {
        self.inner.polymorphism = Some(polymorphism);
        self
    }

    pub fn identity(mut self, identity: IdentityDecl) -> Self {
        self.inner.identity = Some(identity);
        self
    }

    /// Default inclusion of the type's properties.
    pub fn inclusion(mut self, inclusion: Inclusion) -> Self {
        self.inner.inclusion = inclusion;
        self
    }

    pub fn naming(mut self, naming: NamingStrategy) -> Self {
        self.inner.naming = Some(naming);
        self
    }

    pub fn ignore_unknown(mut self) -> Self {
        self.inner.ignore_unknown = true;
        self
    }

    /// Explicit output order; unlisted properties follow.
    pub fn order<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.inner.order = names.into_iter().map(Into::into).collect();
        self
    }

    /// Unlisted properties sorted by output name.
    pub fn alphabetic(mut self) -> Self {
        self.inner.alphabetic = true;
        self
    }

    /// Appends a synthetic attribute after the properties.
    pub fn append(mut self, attr: AppendAttr) -> Self {
        self.inner.append.push(attr);
        self
    }

    /// Writes the synthetic attributes before the properties instead.
    pub fn prepend(mut self) -> Self {
        self.inner.prepend = true;
        self
    }

    pub fn creator(mut self, creator: Creator) -> Self {
        self.inner.creators.push(creator);
        self
    }

    /// Instances of this type are written as `null` and read as `null`.
    pub fn ignored(mut self) -> Self {
        self.inner.ignored = true;
        self
    }

    pub fn root_name(mut self, name: impl Into<String>) -> Self {
        self.inner.root_name = Some(name.into());
        self
    }

    /// Filters this type's properties through the filter group `id`.
    pub fn filter(mut self, id: impl Into<String>) -> Self {
        self.inner.filter = Some(id.into());
        self
    }

    /// The map property spliced into the output and receiving unknown keys.
    pub fn any_property(mut self, name: impl Into<String>) -> Self {
        self.inner.any_property = Some(name.into());
        self
    }

    /// Resolves external names and finishes the descriptor.
    ///
    /// Declarations are checked when the descriptor is registered.
    pub fn build(mut self) -> TypeDescriptor {
        let naming = self.inner.naming;
        self.inner
            .properties
            .iter_mut()
            .for_each(|p| p.resolve_output_name(naming));
        self.inner
    }
}

// -----------------------------------------------------------------------------
// Tests
