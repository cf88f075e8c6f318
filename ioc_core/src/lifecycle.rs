//! Start/stop hooks for managed services.

use std::fmt;
use std::sync::Arc;

use crate::error::BoxError;

/// A service that can be started and stopped together with every other managed service of a
/// container.
///
/// Both hooks take `&self` because the container hands out shared [`Arc`] handles; use interior
/// mutability for any state the hooks change. Either hook may fail independently.
pub trait Lifecycle: Send + Sync + 'static {
    /// Brings the service up.
    ///
    /// # Errors
    ///
    /// Returns an error if the service could not be started.
    fn start(&self) -> Result<(), BoxError>;

    /// Shuts the service down.
    ///
    /// # Errors
    ///
    /// Returns an error if the service could not be stopped cleanly.
    fn stop(&self) -> Result<(), BoxError>;
}

impl<L> Lifecycle for Arc<L>
where
    L: ?Sized + Lifecycle,
{
    #[inline]
    fn start(&self) -> Result<(), BoxError> {
        (**self).start()
    }

    #[inline]
    fn stop(&self) -> Result<(), BoxError> {
        (**self).stop()
    }
}

/// The lifecycle hook being run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Start,
    Stop,
}

impl Phase {
    /// Runs the hook of this phase on `target`.
    ///
    /// # Errors
    ///
    /// Forwards the error of the hook.
    pub fn run<L>(self, target: &L) -> Result<(), BoxError>
    where
        L: ?Sized + Lifecycle,
    {
        match self {
            Self::Start => target.start(),
            Self::Stop => target.stop(),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => f.write_str("start"),
            Self::Stop => f.write_str("stop"),
        }
    }
}
