use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use thiserror::Error;

// -----------------------------------------------------------------------------
// KeyPath

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
}

/// Location of a node in the document, rendered as `$.items[0].owner`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyPath {
    segments: Vec<Segment>,
}

impl KeyPath {
    /// The document root, `$`.
    #[inline]
    pub const fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// This path extended by an object key.
    pub fn key(&self, key: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Key(key.into()));
        Self { segments }
    }

    /// This path extended by an array index.
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Index(index));
        Self { segments }
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for segment in &self.segments {
            match segment {
                Segment::Key(key) => write!(f, ".{key}")?,
                Segment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Error

/// Category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Missing or inconsistent schema facts met during traversal.
    Schema,
    /// An object reached twice on one path without an identity.
    Cycle,
    /// Unknown or missing discriminator, or an identity bound to another type.
    TypeResolution,
    /// A required property or creator argument is absent.
    RequiredValue,
    /// A wrapper or format convention is violated.
    Shape,
    /// An input key no property accepts.
    UnknownProperty,
    /// A scalar could not be converted, or a user converter failed.
    Conversion,
    /// An identity referenced but never defined in the document.
    UnresolvedId,
}

impl ErrorKind {
    pub const fn name(self) -> &'static str {
        match self {
            ErrorKind::Schema => "schema",
            ErrorKind::Cycle => "cycle",
            ErrorKind::TypeResolution => "type resolution",
            ErrorKind::RequiredValue => "required value",
            ErrorKind::Shape => "shape",
            ErrorKind::UnknownProperty => "unknown property",
            ErrorKind::Conversion => "conversion",
            ErrorKind::UnresolvedId => "unresolved id",
        }
    }
}

impl fmt::Display for ErrorKind {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The single fatal error of a serialization or deserialization call.
///
/// Carries the declaring type and the key path of the offending node.
/// A call that fails returns no partial result.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{kind} error in `{type_name}` at {path}: {message}")]
pub struct Error {
    kind: ErrorKind,
    type_name: String,
    path: String,
    message: String,
}

impl Error {
    pub fn new(
        kind: ErrorKind,
        type_name: impl Into<String>,
        path: &KeyPath,
        message: impl Into<String>,
    ) -> Self {
        use alloc::string::ToString;

        Self {
            kind,
            type_name: type_name.into(),
            path: path.to_string(),
            message: message.into(),
        }
    }

    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The type declaring the offending property, or the type being
    /// processed.
    #[inline]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The rendered key path, e.g. `$.items[0].owner`.
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[cfg(all(debug_assertions, feature = "debug"))]
    pub(crate) fn append_message(mut self, extra: &str) -> Self {
        self.message.push_str(extra);
        self
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::{Error, ErrorKind, KeyPath};

    #[test]
    fn key_path_rendering() {
        let path = KeyPath::root().key("items").index(0).key("owner");
        assert_eq!(path.to_string(), "$.items[0].owner");
        assert_eq!(KeyPath::root().to_string(), "$");
    }

    #[test]
    fn message_names_type_and_path() {
        let path = KeyPath::root().key("pets").index(1);
        let err = Error::new(ErrorKind::TypeResolution, "Animal", &path, "unknown subtype `Fish`");
        assert_eq!(
            err.to_string(),
            "type resolution error in `Animal` at $.pets[1]: unknown subtype `Fish`"
        );
        assert_eq!(err.kind(), ErrorKind::TypeResolution);
    }
}
