//! Request-scoped overrides.

use std::collections::HashMap;
use std::sync::Arc;

use ioc_core::{Erased, Key, Result};

use crate::container::Container;
use crate::store::downcast;

/// A short-lived overlay on top of a [`Container`].
///
/// Values [`set`](Self::set) on a scope shadow the container for their key, for this scope only.
/// Every other request falls through to the container, with its usual lazy construction and
/// caching. Nothing set on a scope is ever written to the container, and the values are dropped
/// with the scope.
///
/// A scope is meant to live for one call or request on one thread, so it carries no locking.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use ioc::container::Container;
///
/// #[derive(Debug, PartialEq)]
/// struct User(&'static str);
///
/// let container = Container::new();
/// container.provide(|| User("anonymous")).unwrap();
///
/// let mut scope = container.scope();
/// scope.set(Arc::new(User("alice")));
/// assert_eq!(*scope.get::<User>().unwrap(), User("alice"));
///
/// // Other scopes and the container itself are unaffected.
/// assert_eq!(*container.scope().get::<User>().unwrap(), User("anonymous"));
/// assert_eq!(*container.get::<User>().unwrap(), User("anonymous"));
/// ```
#[derive(Debug)]
pub struct Scope<'a> {
    parent: &'a Container,
    values: HashMap<Key, Erased>,
}

impl<'a> Scope<'a> {
    /// Creates an empty scope over `parent`.
    pub fn new(parent: &'a Container) -> Self {
        Self {
            parent,
            values: HashMap::new(),
        }
    }

    /// Returns the container this scope falls back to.
    #[inline]
    pub const fn parent(&self) -> &'a Container {
        self.parent
    }

    /// Sets the value of type `T` for this scope, under [`Key::of::<T>()`](Key::of).
    pub fn set<T>(&mut self, value: Arc<T>)
    where
        T: Send + Sync + 'static,
    {
        self.set_as(Key::of::<T>(), value);
    }

    /// Sets a value for this scope under an explicit key, replacing any previous one.
    pub fn set_as<T>(&mut self, key: impl Into<Key>, value: Arc<T>)
    where
        T: Send + Sync + 'static,
    {
        self.values.insert(key.into(), Erased::new(value));
    }

    /// Returns `true` if this scope itself holds a value for `key`.
    pub fn contains(&self, key: &Key) -> bool {
        self.values.contains_key(key)
    }

    /// Returns the value of type `T`, from this scope if set, otherwise from the container.
    ///
    /// # Errors
    ///
    /// See [`Container::get`].
    #[inline]
    pub fn get<T>(&self) -> Result<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        self.get_as(&Key::of::<T>())
    }

    /// Returns the value under `key`, from this scope if set, otherwise from the container.
    ///
    /// # Errors
    ///
    /// See [`Container::get`].
    pub fn get_as<T>(&self, key: &Key) -> Result<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        match self.values.get(key) {
            Some(value) => downcast(key, value.clone()),
            None => self.parent.get_as(key),
        }
    }

    /// Writes the value of type `T` into `target`.
    ///
    /// `target` is left untouched if resolution fails.
    ///
    /// # Errors
    ///
    /// See [`Container::get`].
    pub fn get_into<T>(&self, target: &mut Option<Arc<T>>) -> Result<()>
    where
        T: Send + Sync + 'static,
    {
        *target = Some(self.get()?);
        Ok(())
    }
}
