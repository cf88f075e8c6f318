//! Utilites around shared values with erased type informations.

use std::any::{Any, type_name};
use std::sync::Arc;

/// [`Erased`] is a shared handle to a value of an arbitrary type, as long as it implements
/// [`Send`] and [`Sync`] and is `'static`.
///
/// Cloning an `Erased` clones the handle, not the value: every clone points to the same
/// allocation, and downcasting any of them yields pointer-equal [`Arc`]s.
#[derive(Clone)]
pub struct Erased {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Erased {
    /// Creates a new `Erased` that shares ownership of `value`.
    #[must_use]
    pub fn new<T>(value: Arc<T>) -> Self
    where
        T: Send + Sync + 'static,
    {
        Self {
            value,
            type_name: type_name::<T>(),
        }
    }

    /// Returns the type name of the underlying value.
    #[inline]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Tries to downcast `self` into an [`Arc<T>`].
    ///
    /// # Errors
    ///
    /// If the underlying value is not of type `T`, this method will return
    /// itself as error.
    pub fn downcast<T>(self) -> Result<Arc<T>, Self>
    where
        T: Send + Sync + 'static,
    {
        let type_name = self.type_name;
        self.value
            .downcast::<T>()
            .map_err(|value| Self { value, type_name })
    }
}

impl std::fmt::Debug for Erased {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Erased")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}
