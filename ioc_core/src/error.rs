//! Error types.

use std::error::Error as StdError;
use std::fmt;

use crate::key::Key;
use crate::lifecycle::Phase;

/// A boxed error returned by lifecycle hooks.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// [`Error`] is an error that can be raised by functions and methods from this library.
///
/// All variants describe wiring defects: they are deterministic and will occur again on retry.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// No instance is cached and no provider is registered for the key.
    NoProvider(Key),
    /// The value stored under the key is not of the requested type.
    TypeMismatch {
        key: Key,
        expected: &'static str,
        found: &'static str,
    },
    /// Constructing the value for the key requires the value itself.
    CircularDependency(Key),
    /// The provider registered for the key returns `()`.
    InvalidConstructor(Key),
}

impl Error {
    pub const fn key(&self) -> &Key {
        match self {
            Self::NoProvider(key)
            | Self::TypeMismatch { key, .. }
            | Self::CircularDependency(key)
            | Self::InvalidConstructor(key) => key,
        }
    }

    pub const fn is_no_provider(&self) -> bool {
        matches!(self, Self::NoProvider(_))
    }

    pub fn is_no_provider_for(&self, key: &Key) -> bool {
        matches!(self, Self::NoProvider(k) if k == key)
    }

    pub const fn is_type_mismatch(&self) -> bool {
        matches!(self, Self::TypeMismatch { .. })
    }

    pub const fn is_circular_dependency(&self) -> bool {
        matches!(self, Self::CircularDependency(_))
    }

    pub const fn is_invalid_constructor(&self) -> bool {
        matches!(self, Self::InvalidConstructor(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoProvider(key) => write!(f, "no provider found for `{key}`"),
            Self::TypeMismatch {
                key,
                expected,
                found,
            } => write!(
                f,
                "`{key}` holds a value of type `{found}`, but `{expected}` was requested"
            ),
            Self::CircularDependency(key) => {
                write!(f, "circular dependency while constructing `{key}`")
            }
            Self::InvalidConstructor(key) => {
                write!(f, "provider for `{key}` does not return a value")
            }
        }
    }
}

impl StdError for Error {}

/// A single failed lifecycle hook.
#[derive(Debug)]
pub struct LifecycleFailure {
    pub key: Key,
    pub phase: Phase,
    pub source: BoxError,
}

impl fmt::Display for LifecycleFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to {} `{}`: {}", self.phase, self.key, self.source)
    }
}

impl StdError for LifecycleFailure {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&*self.source)
    }
}

/// [`LifecycleErrors`] collects every hook that failed during a bulk start or stop.
///
/// Bulk operations keep going after a failure, so there may be more than one.
#[derive(Debug, Default)]
pub struct LifecycleErrors {
    failures: Vec<LifecycleFailure>,
}

impl LifecycleErrors {
    pub const fn new() -> Self {
        Self {
            failures: Vec::new(),
        }
    }

    pub fn push(&mut self, failure: LifecycleFailure) {
        self.failures.push(failure);
    }

    pub fn failures(&self) -> &[LifecycleFailure] {
        &self.failures
    }

    pub const fn len(&self) -> usize {
        self.failures.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Returns `Ok(())` if nothing failed, or `Err(self)` otherwise.
    ///
    /// # Errors
    ///
    /// Returns `self` if at least one failure was collected.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl IntoIterator for LifecycleErrors {
    type Item = LifecycleFailure;
    type IntoIter = std::vec::IntoIter<LifecycleFailure>;

    fn into_iter(self) -> Self::IntoIter {
        self.failures.into_iter()
    }
}

impl fmt::Display for LifecycleErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} lifecycle hook(s) failed", self.failures.len())?;
        for failure in &self.failures {
            write!(f, "; {failure}")?;
        }
        Ok(())
    }
}

impl StdError for LifecycleErrors {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.failures
            .first()
            .map(|failure| failure as &(dyn StdError + 'static))
    }
}

/// [`Result`] is an alias to [`core::result::Result`] with [`Error`] as the
/// default error type.
pub type Result<T, E = Error> = core::result::Result<T, E>;
