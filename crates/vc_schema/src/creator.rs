use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use vc_graph::{Instance, Value};

use crate::{ConvertError, PropertyType};

// -----------------------------------------------------------------------------
// CreatorParam

/// One argument of a property-binding creator.
///
/// The binding is explicit: `property` is the external name read from the
/// input, or the injection key when `inject` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatorParam {
    pub property: String,
    pub ty: PropertyType,
    pub required: bool,
    pub inject: Option<String>,
}

impl CreatorParam {
    /// An optional argument bound to the input key `property`.
    pub fn new(property: impl Into<String>, ty: PropertyType) -> Self {
        Self {
            property: property.into(),
            ty,
            required: false,
            inject: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Takes the argument from the caller's injectables under `key`.
    pub fn injected(mut self, key: impl Into<String>) -> Self {
        self.inject = Some(key.into());
        self
    }
}

// -----------------------------------------------------------------------------
// Creator

/// How a creator receives its input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreatorMode {
    /// Arguments bound one by one to input keys.
    Properties(Vec<CreatorParam>),
    /// The whole remaining input, deserialized as the given type, is the
    /// single argument.
    Delegating(PropertyType),
}

type Factory = dyn Fn(Vec<Value>) -> Result<Instance, ConvertError> + Send + Sync;

/// A named alternative constructor.
///
/// The unnamed creator is the default; named creators are picked through the
/// deserialization options. Keys consumed by a `Properties` creator are not
/// set again on the created instance.
///
/// # Examples
///
/// ```
/// use vc_graph::{Instance, Value};
/// use vc_schema::{Creator, CreatorParam, PropertyType};
///
/// let creator = Creator::properties(
///     [
///         CreatorParam::new("first", PropertyType::String).required(),
///         CreatorParam::new("last", PropertyType::String),
///     ],
///     |args| {
///         let mut args = args.into_iter();
///         let first = args.next().unwrap_or_default();
///         let last = args.next().unwrap_or_default();
///         Ok(Instance::new("Person").with("first", first).with("last", last))
///     },
/// );
///
/// let person = creator.create(vec![Value::from("Ada"), Value::Null]).unwrap();
/// assert_eq!(person.get("first"), Some(&Value::from("Ada")));
/// ```
#[derive(Clone)]
pub struct Creator {
    name: Option<String>,
    mode: CreatorMode,
    factory: Arc<Factory>,
}

impl Creator {
    /// A creator binding each argument to an input key.
    pub fn properties(
        params: impl IntoIterator<Item = CreatorParam>,
        factory: impl Fn(Vec<Value>) -> Result<Instance, ConvertError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: None,
            mode: CreatorMode::Properties(params.into_iter().collect()),
            factory: Arc::new(factory),
        }
    }

    /// A creator receiving the whole input as one argument of type `ty`.
    pub fn delegating(
        ty: PropertyType,
        factory: impl Fn(Vec<Value>) -> Result<Instance, ConvertError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: None,
            mode: CreatorMode::Delegating(ty),
            factory: Arc::new(factory),
        }
    }

    /// Names this creator; only the unnamed one is the default.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[inline]
    pub fn mode(&self) -> &CreatorMode {
        &self.mode
    }

    /// Input keys bound by this creator.
    pub fn bound_keys(&self) -> impl Iterator<Item = &str> {
        let params: &[CreatorParam] = match &self.mode {
            CreatorMode::Properties(params) => params,
            CreatorMode::Delegating(_) => &[],
        };
        params
            .iter()
            .filter(|p| p.inject.is_none())
            .map(|p| p.property.as_str())
    }

    /// Runs the factory.
    #[inline]
    pub fn create(&self, args: Vec<Value>) -> Result<Instance, ConvertError> {
        (self.factory)(args)
    }
}

impl fmt::Debug for Creator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Creator")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}
