//! Detection of constructors that request their own identity.

use std::cell::RefCell;

use ioc_core::{Error, Key, Result};

thread_local! {
    // Keys under construction on this thread, tagged with the id of their container.
    static CONSTRUCTING: RefCell<Vec<(u64, Key)>> = const { RefCell::new(Vec::new()) };
}

/// Marks a key as under construction on the current thread until dropped.
#[derive(Debug)]
pub(crate) struct ConstructionGuard(());

impl ConstructionGuard {
    /// Enters the construction of `key` in the container identified by `container`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CircularDependency`] if the current thread is already constructing the
    /// same key of the same container.
    pub(crate) fn enter(container: u64, key: &Key) -> Result<Self> {
        CONSTRUCTING.with_borrow_mut(|stack| {
            if stack.iter().any(|(id, k)| *id == container && k == key) {
                return Err(Error::CircularDependency(key.clone()));
            }
            stack.push((container, key.clone()));
            Ok(Self(()))
        })
    }
}

impl Drop for ConstructionGuard {
    fn drop(&mut self) {
        CONSTRUCTING.with_borrow_mut(|stack| {
            stack.pop();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reentry_is_rejected() {
        let key = Key::new("a");
        let _outer = ConstructionGuard::enter(1, &key).unwrap();
        let err = ConstructionGuard::enter(1, &key).unwrap_err();
        assert!(err.is_circular_dependency());
    }

    #[test]
    fn test_other_container_is_allowed() {
        let key = Key::new("a");
        let _outer = ConstructionGuard::enter(1, &key).unwrap();
        let _inner = ConstructionGuard::enter(2, &key).unwrap();
    }

    #[test]
    fn test_drop_releases_key() {
        let key = Key::new("a");
        drop(ConstructionGuard::enter(1, &key).unwrap());
        let _again = ConstructionGuard::enter(1, &key).unwrap();
    }
}
