use alloc::string::String;
use alloc::vec::Vec;

use hashbrown::{HashMap, HashSet};
use vc_graph::Value;
use vc_schema::{Converters, PropertyDescriptor};

use crate::{DeserializeFeatures, SerializeFeatures};

// -----------------------------------------------------------------------------
// PropertyFilter

/// A filter group rule, looked up by the filter id of a type or property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyFilter {
    /// Writes every property except the listed ones.
    SerializeAllExcept(HashSet<String>),
    /// Writes only the listed properties.
    FilterOutAllExcept(HashSet<String>),
}

impl PropertyFilter {
    pub fn serialize_all_except<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        PropertyFilter::SerializeAllExcept(names.into_iter().map(Into::into).collect())
    }

    pub fn filter_out_all_except<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        PropertyFilter::FilterOutAllExcept(names.into_iter().map(Into::into).collect())
    }

    /// Whether `prop` is written; names match either the internal or the
    /// output name.
    pub fn includes(&self, prop: &PropertyDescriptor) -> bool {
        let listed = |names: &HashSet<String>| {
            names.contains(prop.name()) || names.contains(prop.output_name())
        };
        match self {
            PropertyFilter::SerializeAllExcept(names) => !listed(names),
            PropertyFilter::FilterOutAllExcept(names) => listed(names),
        }
    }
}

// -----------------------------------------------------------------------------
// Views

fn in_views(prop: &PropertyDescriptor, active: &[String], default_inclusion: bool) -> bool {
    if active.is_empty() {
        return true;
    }
    if prop.views().is_empty() {
        return default_inclusion;
    }
    prop.views().iter().any(|v| active.contains(v))
}

// -----------------------------------------------------------------------------
// SerializeOptions

/// Configuration of one or more serialization calls.
///
/// Options are only read during a call, so one instance can be shared by
/// concurrent calls.
///
/// # Examples
///
/// ```
/// use vc_json::{PropertyFilter, SerializeFeatures, SerializeOptions};
///
/// let options = SerializeOptions::new()
///     .enable(SerializeFeatures::WRAP_ROOT_VALUE)
///     .with_view("public")
///     .with_filter("userFilter", PropertyFilter::filter_out_all_except(["name"]));
///
/// assert!(options.features().contains(SerializeFeatures::WRAP_ROOT_VALUE));
/// ```
#[derive(Debug, Clone, Default)]
pub struct SerializeOptions {
    features: SerializeFeatures,
    views: Vec<String>,
    filters: HashMap<String, PropertyFilter>,
    attributes: HashMap<String, Value>,
    converters: Converters,
    root_name: Option<String>,
}

impl SerializeOptions {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole feature set.
    pub fn with_features(mut self, features: SerializeFeatures) -> Self {
        self.features = features;
        self
    }

    pub fn enable(mut self, features: SerializeFeatures) -> Self {
        self.features.insert(features);
        self
    }

    pub fn disable(mut self, features: SerializeFeatures) -> Self {
        self.features.remove(features);
        self
    }

    /// Activates a view; several views may be active at once.
    pub fn with_view(mut self, view: impl Into<String>) -> Self {
        self.views.push(view.into());
        self
    }

    pub fn with_filter(mut self, id: impl Into<String>, filter: PropertyFilter) -> Self {
        self.filters.insert(id.into(), filter);
        self
    }

    /// Adds an entry of the attribute bag read by appended attributes.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_converters(mut self, converters: Converters) -> Self {
        self.converters = converters;
        self
    }

    /// Overrides the root wrapper name.
    pub fn with_root_name(mut self, name: impl Into<String>) -> Self {
        self.root_name = Some(name.into());
        self
    }

    #[inline]
    pub fn features(&self) -> SerializeFeatures {
        self.features
    }

    #[inline]
    pub fn views(&self) -> &[String] {
        &self.views
    }

    #[inline]
    pub fn filter(&self, id: &str) -> Option<&PropertyFilter> {
        self.filters.get(id)
    }

    #[inline]
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    #[inline]
    pub fn converters(&self) -> &Converters {
        &self.converters
    }

    #[inline]
    pub fn root_name(&self) -> Option<&str> {
        self.root_name.as_deref()
    }

    #[inline]
    pub(crate) fn in_view(&self, prop: &PropertyDescriptor) -> bool {
        in_views(
            prop,
            &self.views,
            self.features.contains(SerializeFeatures::DEFAULT_VIEW_INCLUSION),
        )
    }
}

// -----------------------------------------------------------------------------
// DeserializeOptions

/// Configuration of one or more deserialization calls.
#[derive(Debug, Clone, Default)]
pub struct DeserializeOptions {
    features: DeserializeFeatures,
    views: Vec<String>,
    injectables: HashMap<String, Value>,
    converters: Converters,
    root_name: Option<String>,
    creator: Option<String>,
}

impl DeserializeOptions {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole feature set.
    pub fn with_features(mut self, features: DeserializeFeatures) -> Self {
        self.features = features;
        self
    }

    pub fn enable(mut self, features: DeserializeFeatures) -> Self {
        self.features.insert(features);
        self
    }

    pub fn disable(mut self, features: DeserializeFeatures) -> Self {
        self.features.remove(features);
        self
    }

    /// Activates a view; input keys of properties outside it are dropped.
    pub fn with_view(mut self, view: impl Into<String>) -> Self {
        self.views.push(view.into());
        self
    }

    /// Supplies the value of injected properties and creator arguments
    /// declared with `key`.
    pub fn inject(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.injectables.insert(key.into(), value.into());
        self
    }

    pub fn with_converters(mut self, converters: Converters) -> Self {
        self.converters = converters;
        self
    }

    /// Overrides the expected root wrapper name.
    pub fn with_root_name(mut self, name: impl Into<String>) -> Self {
        self.root_name = Some(name.into());
        self
    }

    /// Uses the creator named `name` instead of the default one on types
    /// that declare it.
    pub fn with_creator(mut self, name: impl Into<String>) -> Self {
        self.creator = Some(name.into());
        self
    }

    #[inline]
    pub fn features(&self) -> DeserializeFeatures {
        self.features
    }

    #[inline]
    pub fn views(&self) -> &[String] {
        &self.views
    }

    #[inline]
    pub fn injectable(&self, key: &str) -> Option<&Value> {
        self.injectables.get(key)
    }

    #[inline]
    pub fn converters(&self) -> &Converters {
        &self.converters
    }

    #[inline]
    pub fn root_name(&self) -> Option<&str> {
        self.root_name.as_deref()
    }

    #[inline]
    pub fn creator(&self) -> Option<&str> {
        self.creator.as_deref()
    }

    #[inline]
    pub(crate) fn in_view(&self, prop: &PropertyDescriptor) -> bool {
        in_views(
            prop,
            &self.views,
            self.features.contains(DeserializeFeatures::DEFAULT_VIEW_INCLUSION),
        )
    }
}

// -----------------------------------------------------------------------------
// Tests
