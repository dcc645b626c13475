#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod converter;
mod creator;
mod descriptor;
mod error;
mod naming;
mod property;
mod registry;
mod types;

#[cfg(feature = "auto_register")]
mod auto_register;

// -----------------------------------------------------------------------------
// Top-Level exports

pub use converter::{Conversion, ConvertError, Converters, TypeMatch};
pub use converter::{DeserializeConversion, SerializeConversion};
pub use converter::{DeserializeFn, ExcludeFn, GlobalDeserializeFn, GlobalSerializeFn, SerializeFn};
pub use creator::{Creator, CreatorMode, CreatorParam};
pub use descriptor::{AppendAttr, IdGenerator, IdentityDecl, Polymorphism, Subtype};
pub use descriptor::{TypeBuilder, TypeDescriptor, TypeIdStrategy};
pub use error::SchemaError;
pub use naming::NamingStrategy;
pub use property::{Access, Format, Inclusion, Inject, PropertyDescriptor, Role, Shape, Unwrap};
pub use registry::{SchemaRegistry, TypeRegistry};
pub use types::PropertyType;

#[cfg(feature = "auto_register")]
pub use auto_register::AutoRegistration;

#[doc(hidden)]
pub mod __macro_exports {
    #[cfg(feature = "auto_register")]
    pub use inventory;
}
