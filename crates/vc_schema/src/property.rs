use alloc::string::String;
use alloc::vec::Vec;

use serde_json::Value as Json;
use vc_graph::{ObjectGraph, Value};

use crate::converter::{DeserializeFn, ExcludeFn, SerializeFn};
use crate::{ConvertError, PropertyType};

// -----------------------------------------------------------------------------
// Access

/// Which directions a property takes part in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Access {
    /// Written on output, dropped from input.
    ReadOnly,
    /// Accepted on input, never written on output.
    WriteOnly,
    #[default]
    ReadWrite,
}

impl Access {
    #[inline]
    pub const fn readable(self) -> bool {
        !matches!(self, Access::WriteOnly)
    }

    #[inline]
    pub const fn writable(self) -> bool {
        !matches!(self, Access::ReadOnly)
    }
}

// -----------------------------------------------------------------------------
// Inclusion

/// When a property is written on output.
#[derive(Debug, Clone, Default)]
pub enum Inclusion {
    #[default]
    Always,
    /// Omitted when `null`.
    NonNull,
    /// Omitted when `null`, an empty string, an empty list or an empty map.
    NonEmpty,
    /// Omitted when the zero value of its kind, see [`Value::is_default`].
    NonDefault,
    /// Omitted when the predicate returns `true`.
    Custom(ExcludeFn),
}

impl Inclusion {
    /// `Inclusion::Custom` from a closure.
    #[inline]
    pub fn custom(exclude: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        Inclusion::Custom(ExcludeFn::new(exclude))
    }

    /// Whether `value` is written under this policy.
    pub fn includes(&self, value: &Value) -> bool {
        match self {
            Inclusion::Always => true,
            Inclusion::NonNull => !value.is_null(),
            Inclusion::NonEmpty => !value.is_empty(),
            Inclusion::NonDefault => !value.is_default(),
            Inclusion::Custom(exclude) => !exclude.call(value),
        }
    }
}

// -----------------------------------------------------------------------------
// Role

/// Structural role in a bidirectional relationship.
///
/// The forward side is written; the back side is never written and is
/// restored on input from the owner of the forward side. Both sides share a
/// pair name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Role {
    #[default]
    Plain,
    ForwardReference(String),
    BackReference(String),
}

impl Role {
    /// The pair name of either side.
    #[inline]
    pub fn pair(&self) -> Option<&str> {
        match self {
            Role::Plain => None,
            Role::ForwardReference(pair) | Role::BackReference(pair) => Some(pair),
        }
    }
}

// -----------------------------------------------------------------------------
// Format

/// Target shape of a format directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// Objects as the array of their property values, in output order.
    Array,
    /// Truthiness of the value.
    Boolean,
    /// Numbers; dates become epoch milliseconds, booleans `0`/`1`.
    Number,
    /// Text; dates use the directive's pattern.
    String,
    /// Lists as objects keyed by index.
    Object,
    /// Single-element lists as their only element.
    Scalar,
}

/// A format directive reshaping a property value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Format {
    pub shape: Shape,
    /// A `chrono` strftime pattern used for dates under `Shape::String`.
    pub pattern: Option<String>,
}

impl Format {
    #[inline]
    pub const fn new(shape: Shape) -> Self {
        Self {
            shape,
            pattern: None,
        }
    }

    #[inline]
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }
}

// -----------------------------------------------------------------------------
// Unwrap / Inject

/// Flattening of a nested object into its parent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Unwrap {
    pub prefix: String,
    pub suffix: String,
}

impl Unwrap {
    /// The flattened name of a nested key.
    pub fn wrap_key(&self, key: &str) -> String {
        let mut out = String::with_capacity(self.prefix.len() + key.len() + self.suffix.len());
        out.push_str(&self.prefix);
        out.push_str(key);
        out.push_str(&self.suffix);
        out
    }

    /// The nested key of a flattened name, if it carries prefix and suffix.
    pub fn unwrap_key<'a>(&self, key: &'a str) -> Option<&'a str> {
        let rest = key.strip_prefix(self.prefix.as_str())?;
        let inner = rest.strip_suffix(self.suffix.as_str())?;
        (!inner.is_empty()).then_some(inner)
    }
}

/// A property whose value is supplied by the caller instead of the document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Inject {
    pub key: String,
    /// When `true` a value present in the document wins over the injected one.
    pub use_input: bool,
}

// -----------------------------------------------------------------------------
// PropertyDescriptor

/// Static schema of one property of a type.
///
/// Created with [`PropertyDescriptor::new`] and refined with the builder-style
/// methods; the external name is resolved against the owning type's naming
/// strategy when the type is built.
///
/// # Examples
///
/// ```
/// use vc_schema::{Access, Inclusion, PropertyDescriptor, PropertyType};
///
/// let prop = PropertyDescriptor::new("firstName", PropertyType::String)
///     .rename("first_name")
///     .alias("fname")
///     .inclusion(Inclusion::NonEmpty)
///     .access(Access::ReadWrite);
///
/// assert_eq!(prop.name(), "firstName");
/// assert_eq!(prop.output_name(), "first_name");
/// assert!(prop.input_names().any(|n| n == "fname"));
/// ```
#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    name: String,
    external: Option<String>,
    output_name: String,
    aliases: Vec<String>,
    access: Access,
    ty: PropertyType,
    inclusion: Option<Inclusion>,
    required: bool,
    ignored: bool,
    raw: bool,
    default_value: Option<Value>,
    role: Role,
    format: Option<Format>,
    filter: Option<String>,
    views: Vec<String>,
    unwrapped: Option<Unwrap>,
    inject: Option<Inject>,
    serialize_with: Option<SerializeFn>,
    deserialize_with: Option<DeserializeFn>,
    serialize_elements_with: Option<SerializeFn>,
    deserialize_elements_with: Option<DeserializeFn>,
}

impl PropertyDescriptor {
    /// Creates a read-write property `name` of type `ty`.
    pub fn new(name: impl Into<String>, ty: PropertyType) -> Self {
        let name = name.into();
        Self {
            output_name: name.clone(),
            name,
            external: None,
            aliases: Vec::new(),
            access: Access::ReadWrite,
            ty,
            inclusion: None,
            required: false,
            ignored: false,
            raw: false,
            default_value: None,
            role: Role::Plain,
            format: None,
            filter: None,
            views: Vec::new(),
            unwrapped: None,
            inject: None,
            serialize_with: None,
            deserialize_with: None,
            serialize_elements_with: None,
            deserialize_elements_with: None,
        }
    }

    // ------------------------------------------------------------------
    // Builder

    /// Sets the explicit external name; disables the naming strategy.
    pub fn rename(mut self, external: impl Into<String>) -> Self {
        let external = external.into();
        self.output_name.clone_from(&external);
        self.external = Some(external);
        self
    }

    /// Adds a name accepted on input only.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    #[inline]
    pub fn read_only(self) -> Self {
        self.access(Access::ReadOnly)
    }

    #[inline]
    pub fn write_only(self) -> Self {
        self.access(Access::WriteOnly)
    }

    /// Overrides the owning type's inclusion default.
    pub fn inclusion(mut self, inclusion: Inclusion) -> Self {
        self.inclusion = Some(inclusion);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Ignored in both directions.
    pub fn ignored(mut self) -> Self {
        self.ignored = true;
        self
    }

    /// Treats a string value as pre-formatted JSON on output and
    /// re-stringifies the JSON on input.
    pub fn raw(mut self) -> Self {
        self.raw = true;
        self
    }

    /// Value used on input when the document has none.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Marks the written side of the relationship `pair`.
    pub fn forward_reference(mut self, pair: impl Into<String>) -> Self {
        self.role = Role::ForwardReference(pair.into());
        self
    }

    /// Marks the restored side of the relationship `pair`.
    pub fn back_reference(mut self, pair: impl Into<String>) -> Self {
        self.role = Role::BackReference(pair.into());
        self
    }

    pub fn format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    /// Filters the nested value's properties through the filter group `id`.
    pub fn filter(mut self, id: impl Into<String>) -> Self {
        self.filter = Some(id.into());
        self
    }

    /// Adds membership in view `view`.
    pub fn view(mut self, view: impl Into<String>) -> Self {
        self.views.push(view.into());
        self
    }

    /// Splices the nested object's properties into the parent.
    pub fn unwrapped(mut self, prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        self.unwrapped = Some(Unwrap {
            prefix: prefix.into(),
            suffix: suffix.into(),
        });
        self
    }

    /// Takes the value from the caller's injectables under `key`.
    pub fn inject(mut self, key: impl Into<String>, use_input: bool) -> Self {
        self.inject = Some(Inject {
            key: key.into(),
            use_input,
        });
        self
    }

    pub fn serialize_with(
        mut self,
        f: impl Fn(&Value, &ObjectGraph) -> Result<Json, ConvertError> + Send + Sync + 'static,
    ) -> Self {
        self.serialize_with = Some(SerializeFn::new(f));
        self
    }

    pub fn deserialize_with(
        mut self,
        f: impl Fn(&Json, &mut ObjectGraph) -> Result<Value, ConvertError> + Send + Sync + 'static,
    ) -> Self {
        self.deserialize_with = Some(DeserializeFn::new(f));
        self
    }

    /// Per-element serializer for list and map values.
    pub fn serialize_elements_with(
        mut self,
        f: impl Fn(&Value, &ObjectGraph) -> Result<Json, ConvertError> + Send + Sync + 'static,
    ) -> Self {
        self.serialize_elements_with = Some(SerializeFn::new(f));
        self
    }

    /// Per-element deserializer for list and map values.
    pub fn deserialize_elements_with(
        mut self,
        f: impl Fn(&Json, &mut ObjectGraph) -> Result<Value, ConvertError> + Send + Sync + 'static,
    ) -> Self {
        self.deserialize_elements_with = Some(DeserializeFn::new(f));
        self
    }

    // Resolves the output name once the owning type's strategy is known.
    pub(crate) fn resolve_output_name(&mut self, naming: Option<crate::NamingStrategy>) {
        self.output_name = match (&self.external, naming) {
            (Some(external), _) => external.clone(),
            (None, Some(naming)) => naming.apply(&self.name),
            (None, None) => self.name.clone(),
        };
    }

    // ------------------------------------------------------------------
    // Accessors

    /// The internal name, i.e. the instance slot.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The name written on output.
    #[inline]
    pub fn output_name(&self) -> &str {
        &self.output_name
    }

    /// Every name accepted on input: the output name, then the aliases.
    pub fn input_names(&self) -> impl Iterator<Item = &str> {
        core::iter::once(self.output_name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    #[inline]
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    #[inline]
    pub fn access_mode(&self) -> Access {
        self.access
    }

    #[inline]
    pub fn ty(&self) -> &PropertyType {
        &self.ty
    }

    /// The explicit inclusion policy, `None` to use the type default.
    #[inline]
    pub fn inclusion_policy(&self) -> Option<&Inclusion> {
        self.inclusion.as_ref()
    }

    #[inline]
    pub fn is_required(&self) -> bool {
        self.required
    }

    #[inline]
    pub fn is_ignored(&self) -> bool {
        self.ignored
    }

    #[inline]
    pub fn is_raw(&self) -> bool {
        self.raw
    }

    #[inline]
    pub fn default(&self) -> Option<&Value> {
        self.default_value.as_ref()
    }

    #[inline]
    pub fn role(&self) -> &Role {
        &self.role
    }

    #[inline]
    pub fn format_directive(&self) -> Option<&Format> {
        self.format.as_ref()
    }

    #[inline]
    pub fn filter_id(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    #[inline]
    pub fn views(&self) -> &[String] {
        &self.views
    }

    #[inline]
    pub fn unwrap_info(&self) -> Option<&Unwrap> {
        self.unwrapped.as_ref()
    }

    #[inline]
    pub fn injection(&self) -> Option<&Inject> {
        self.inject.as_ref()
    }

    #[inline]
    pub fn serializer(&self) -> Option<&SerializeFn> {
        self.serialize_with.as_ref()
    }

    #[inline]
    pub fn deserializer(&self) -> Option<&DeserializeFn> {
        self.deserialize_with.as_ref()
    }

    #[inline]
    pub fn element_serializer(&self) -> Option<&SerializeFn> {
        self.serialize_elements_with.as_ref()
    }

    #[inline]
    pub fn element_deserializer(&self) -> Option<&DeserializeFn> {
        self.deserialize_elements_with.as_ref()
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use alloc::borrow::ToOwned;
    use alloc::string::String;
    use alloc::vec;
    use alloc::vec::Vec;

    use vc_graph::Value;

    use super::{Inclusion, PropertyDescriptor, Unwrap};
    use crate::{NamingStrategy, PropertyType};

    #[test]
    fn non_empty_boundaries() {
        let policy = Inclusion::NonEmpty;
        assert!(!policy.includes(&Value::Null));
        assert!(!policy.includes(&Value::List(vec![])));
        assert!(!policy.includes(&Value::from("")));
        assert!(policy.includes(&Value::from("x")));
        assert!(policy.includes(&Value::List(vec![Value::Int(1)])));
    }

    #[test]
    fn custom_inclusion() {
        let policy = Inclusion::custom(|v| v.as_int().is_some_and(|i| i < 0));
        assert!(policy.includes(&Value::Int(3)));
        assert!(!policy.includes(&Value::Int(-3)));
    }

    #[test]
    fn naming_applies_without_rename() {
        let mut plain = PropertyDescriptor::new("createdAt", PropertyType::Date);
        plain.resolve_output_name(Some(NamingStrategy::SnakeCase));
        assert_eq!(plain.output_name(), "created_at");

        let mut renamed = PropertyDescriptor::new("createdAt", PropertyType::Date).rename("ts");
        renamed.resolve_output_name(Some(NamingStrategy::SnakeCase));
        assert_eq!(renamed.output_name(), "ts");

        let names: Vec<_> = renamed.alias("time").input_names().map(str::to_owned).collect();
        assert_eq!(names, ["ts", "time"]);
    }

    #[test]
    fn unwrap_keys() {
        let unwrap = Unwrap {
            prefix: "addr_".into(),
            suffix: String::new(),
        };
        assert_eq!(unwrap.wrap_key("city"), "addr_city");
        assert_eq!(unwrap.unwrap_key("addr_city"), Some("city"));
        assert_eq!(unwrap.unwrap_key("city"), None);
        assert_eq!(unwrap.unwrap_key("addr_"), None);
    }
}
