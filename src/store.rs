//! Instance cache.

use std::collections::HashMap;
use std::sync::Arc;

use ioc_core::{Erased, Error, Key, Result};

/// [`Instances`] holds the singleton built for each identity.
///
/// Each key maps to at most one value. Values are shared handles, so every lookup of the same
/// key observes the same allocation until the entry is replaced.
#[derive(Debug, Default)]
pub struct Instances(HashMap<Key, Erased>);

impl Instances {
    /// Creates an empty cache.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// Stores `value` under `key`, returning the value it displaced, if any.
    #[inline]
    pub fn insert(&mut self, key: Key, value: Erased) -> Option<Erased> {
        self.0.insert(key, value)
    }

    /// Returns the value stored under `key`.
    #[inline]
    pub fn get(&self, key: &Key) -> Option<&Erased> {
        self.0.get(key)
    }

    /// Returns `true` if a value is stored under `key`.
    #[inline]
    pub fn contains(&self, key: &Key) -> bool {
        self.0.contains_key(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Downcasts a value found under `key` into the type of the requesting slot.
pub(crate) fn downcast<T>(key: &Key, value: Erased) -> Result<Arc<T>>
where
    T: Send + Sync + 'static,
{
    value.downcast().map_err(|value| Error::TypeMismatch {
        key: key.clone(),
        expected: std::any::type_name::<T>(),
        found: value.type_name(),
    })
}
