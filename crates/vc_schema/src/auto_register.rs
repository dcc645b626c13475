//! Static collection of type descriptors.
//!
//! Descriptors submitted with [`auto_register!`](crate::auto_register) are
//! gathered at link time by [`inventory`] and added by
//! [`TypeRegistry::auto_register`]. Not every platform supports this; on
//! those the collection is simply empty.

use crate::{SchemaError, TypeDescriptor, TypeRegistry};

/// A descriptor factory submitted for automatic registration.
pub struct AutoRegistration {
    build: fn() -> TypeDescriptor,
}

impl AutoRegistration {
    #[inline]
    pub const fn new(build: fn() -> TypeDescriptor) -> Self {
        Self { build }
    }
}

inventory::collect!(AutoRegistration);

/// Submits a descriptor factory for [`TypeRegistry::auto_register`].
///
/// # Examples
///
/// ```
/// use vc_schema::{PropertyDescriptor, PropertyType, TypeDescriptor, TypeRegistry};
///
/// fn point() -> TypeDescriptor {
///     TypeDescriptor::builder("Point")
///         .property(PropertyDescriptor::new("x", PropertyType::Int))
///         .property(PropertyDescriptor::new("y", PropertyType::Int))
///         .build()
/// }
///
/// vc_schema::auto_register!(point);
///
/// fn main() {
///     let mut registry = TypeRegistry::new();
///     registry.auto_register().unwrap();
///     assert!(registry.contains("Point"));
/// }
/// ```
#[macro_export]
macro_rules! auto_register {
    ($build:path) => {
        $crate::__macro_exports::inventory::submit! {
            $crate::AutoRegistration::new($build)
        }
    };
}

impl TypeRegistry {
    /// Registers every descriptor submitted with
    /// [`auto_register!`](crate::auto_register) that is not registered yet.
    ///
    /// Returns the number of newly added types. Repeated calls add nothing.
    pub fn auto_register(&mut self) -> Result<usize, SchemaError> {
        let mut added = 0;
        for entry in inventory::iter::<AutoRegistration> {
            let desc = (entry.build)();
            if self.contains(desc.name()) {
                continue;
            }
            self.register(desc)?;
            added += 1;
        }
        log::debug!("auto registered {added} types");
        Ok(added)
    }
}

// -----------------------------------------------------------------------------
// Tests
