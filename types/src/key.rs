//! Type-erased keys and values for value scopes.

use std::any::{self, Any};
use std::fmt;
use std::sync::Arc;

/// A value attached to a scope. Retrieve the concrete type with
/// [`Arc::downcast`].
pub type Value = Arc<dyn Any + Send + Sync>;

/// A lookup key.
///
/// Blanket-implemented for every `'static` type with equality, so any
/// comparable value can be used as a key. Keys of different types never
/// compare equal, which makes a private unit struct an unforgeable key.
pub trait Key: Any + Send + Sync + fmt::Debug {
    fn as_any(&self) -> &dyn Any;

    /// Equality across the type-erased boundary.
    fn key_eq(&self, other: &dyn Key) -> bool;

    fn type_name(&self) -> &'static str;
}

impl<T> Key for T
where
    T: Any + PartialEq + Send + Sync + fmt::Debug,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn key_eq(&self, other: &dyn Key) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| other == self)
    }

    fn type_name(&self) -> &'static str {
        any::type_name::<T>()
    }
}
