#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod context;
mod error;
mod features;
mod format;
mod identity;
mod options;

pub mod de;
pub mod pairing;
pub mod resolve;
pub mod ser;

#[cfg(test)]
mod tests;

// -----------------------------------------------------------------------------
// Top-Level exports

pub use de::{DeserializeDriver, deserialize};
pub use error::{Error, ErrorKind, KeyPath};
pub use features::{DeserializeFeatures, SerializeFeatures};
pub use format::{MAX_SAFE_INTEGER, MIN_SAFE_INTEGER};
pub use options::{DeserializeOptions, PropertyFilter, SerializeOptions};
pub use ser::{SerializeDriver, serialize};
