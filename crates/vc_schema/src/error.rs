use alloc::string::String;

use thiserror::Error;

// -----------------------------------------------------------------------------
// SchemaError

/// Inconsistent annotation metadata, detected when types are registered or
/// when the registry is validated as a whole.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SchemaError {
    #[error("type `{0}` is already registered")]
    DuplicateType(String),

    #[error("type `{type_name}`: output name `{name}` is used by both `{first}` and `{second}`")]
    DuplicateOutputName {
        type_name: String,
        name: String,
        first: String,
        second: String,
    },

    #[error("type `{type_name}`: input name `{name}` is accepted by both `{first}` and `{second}`")]
    DuplicateInputName {
        type_name: String,
        name: String,
        first: String,
        second: String,
    },

    #[error("type `{type_name}`: back reference `{pair}` is declared by both `{first}` and `{second}`")]
    DuplicateBackReference {
        type_name: String,
        pair: String,
        first: String,
        second: String,
    },

    #[error("type `{type_name}`: property `{property}` {reason}")]
    InvalidProperty {
        type_name: String,
        property: String,
        reason: String,
    },

    #[error("type `{type_name}`: {reason}")]
    InvalidType { type_name: String, reason: String },

    #[error("type `{referrer}` refers to unregistered type `{type_name}`")]
    UnknownType { referrer: String, type_name: String },

    #[error("type `{type_name}`: reference `{pair}` of `{property}` has no counterpart on `{target}`")]
    UnpairedReference {
        type_name: String,
        property: String,
        pair: String,
        target: String,
    },

    #[error(
        "type `{type_name}`: back reference `{property}` of `{pair}` does not point at `{expected}`"
    )]
    IncompatibleReference {
        type_name: String,
        property: String,
        pair: String,
        expected: String,
    },
}
