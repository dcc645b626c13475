#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod graph;
mod instance;
mod value;

// -----------------------------------------------------------------------------
// Top-Level exports

pub use graph::{ObjectGraph, ObjectKey};
pub use instance::Instance;
pub use value::{Value, ValueKind};
