use hashbrown::HashSet;
use vc_graph::ObjectKey;

use crate::KeyPath;

// -----------------------------------------------------------------------------
// Branch

/// Per-descent part of the traversal context.
///
/// Forked at every property or element descent: the fork gets its own copy
/// of the on-path set, so objects visited by sibling branches are never
/// mistaken for cycles. Sets are never merged back.
#[derive(Debug, Clone, Default)]
pub(crate) struct Branch<'a> {
    pub path: KeyPath,
    on_path: HashSet<ObjectKey>,
    filter: Option<&'a str>,
}

impl<'a> Branch<'a> {
    #[inline]
    pub fn root() -> Self {
        Self::default()
    }

    /// Fork for the property `key`; the filter group is not inherited.
    pub fn key(&self, key: &str) -> Self {
        Self {
            path: self.path.key(key),
            on_path: self.on_path.clone(),
            filter: None,
        }
    }

    /// Fork for the element `index`; keeps the filter group of the
    /// container property.
    pub fn index(&self, index: usize) -> Self {
        Self {
            path: self.path.index(index),
            on_path: self.on_path.clone(),
            filter: self.filter,
        }
    }

    #[inline]
    pub fn with_filter(mut self, filter: Option<&'a str>) -> Self {
        self.filter = filter;
        self
    }

    /// The filter group set by the enclosing property.
    #[inline]
    pub fn filter(&self) -> Option<&'a str> {
        self.filter
    }

    #[inline]
    pub fn is_on_path(&self, key: ObjectKey) -> bool {
        self.on_path.contains(&key)
    }

    /// Marks `key` as being on the current path.
    #[inline]
    pub fn enter(&mut self, key: ObjectKey) {
        self.on_path.insert(key);
    }
}

// -----------------------------------------------------------------------------
// TypeStack

/// The chain of types being processed, captured at the first failure and
/// appended to the error message when the `debug` feature is enabled.
#[cfg(all(debug_assertions, feature = "debug"))]
#[derive(Default, Clone)]
pub(crate) struct TypeStack {
    stack: alloc::vec::Vec<alloc::string::String>,
    failed_at: Option<alloc::string::String>,
}

#[cfg(all(debug_assertions, feature = "debug"))]
impl TypeStack {
    pub fn push(&mut self, type_name: &str) {
        self.stack.push(type_name.into());
    }

    pub fn pop(&mut self) {
        self.stack.pop();
    }

    /// Remembers the current stack; only the innermost failure is kept.
    pub fn record_failure(&mut self) {
        if self.failed_at.is_none() {
            self.failed_at = Some(alloc::format!("{self:?}"));
        }
    }

    pub fn annotate(&self, err: crate::Error) -> crate::Error {
        match &self.failed_at {
            Some(stack) => err.append_message(&alloc::format!(" (stack: {stack})")),
            None => err,
        }
    }
}

#[cfg(all(debug_assertions, feature = "debug"))]
impl core::fmt::Debug for TypeStack {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut iter = self.stack.iter();
        if let Some(first) = iter.next() {
            write!(f, "`{first}`")?;
        }
        for name in iter {
            write!(f, " -> `{name}`")?;
        }
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Tests
