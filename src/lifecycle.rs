//! Bulk start/stop of managed services.

use std::sync::Arc;

use ioc_core::{Key, Lifecycle, LifecycleErrors, LifecycleFailure, Phase};

/// [`Lifecycles`] keeps every lifecycle-capable instance of a container, in the order the
/// instances were constructed.
///
/// There is at most one entry per key.
#[derive(Clone, Default)]
pub struct Lifecycles {
    entries: Vec<(Key, Arc<dyn Lifecycle>)>,
}

impl Lifecycles {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Records the lifecycle handle of the instance built for `key`.
    ///
    /// A new key is appended at the end. A key that is already present keeps its position and
    /// has its handle replaced, so the list always refers to the instance that is cached.
    pub fn record(&mut self, key: Key, lifecycle: Arc<dyn Lifecycle>) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = lifecycle,
            None => self.entries.push((key, lifecycle)),
        }
    }

    /// Returns the keys in start order.
    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.entries.iter().map(|(key, _)| key)
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Runs the hook of `phase` on every entry, in construction order.
    ///
    /// A failing hook does not stop the remaining ones.
    ///
    /// # Errors
    ///
    /// Returns every failure collected along the way.
    pub fn run(&self, phase: Phase) -> Result<(), LifecycleErrors> {
        let mut errors = LifecycleErrors::new();

        for (key, lifecycle) in &self.entries {
            info!(key = %key, %phase, "running lifecycle hook");
            if let Err(source) = phase.run(&**lifecycle) {
                error!(key = %key, %phase, error = %source, "lifecycle hook failed");
                errors.push(LifecycleFailure {
                    key: key.clone(),
                    phase,
                    source,
                });
            }
        }

        errors.into_result()
    }
}

impl std::fmt::Debug for Lifecycles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.keys()).finish()
    }
}
