//! Constructor functions and types.

use std::any::{TypeId, type_name};
use std::sync::Arc;

use ioc_core::{Erased, Lifecycle};

/// [`Provider`] is a trait to describe how to construct a service.
///
/// A provider takes no arguments and returns one value. In most cases, you don't need to
/// implement this trait manually, as it is implemented on every `Fn() -> T` closure or function
/// that is [`Send`], [`Sync`], and `'static`. A tuple is a single value, stored and requested as
/// the tuple type.
///
/// Constructors that take parameters do not implement this trait:
///
/// ```compile_fail
/// use ioc::Container;
///
/// let container = Container::new();
/// container.provide(|port: u16| port).unwrap();
/// ```
///
/// Neither do constructors that cannot be shared across threads:
///
/// ```compile_fail
/// use std::rc::Rc;
///
/// use ioc::Container;
///
/// let name = Rc::new(String::from("ioc"));
/// let container = Container::new();
/// container.provide(move || name.len()).unwrap();
/// ```
///
/// A constructor returning `()` satisfies the trait but produces nothing to inject, so the
/// container refuses it at registration with [`InvalidConstructor`].
///
/// [`InvalidConstructor`]: ioc_core::Error::InvalidConstructor
pub trait Provider<T>: Send + Sync + 'static {
    /// Builds a new value.
    fn provide(&self) -> T;
}

impl<F, T> Provider<T> for F
where
    F: Fn() -> T + Send + Sync + 'static,
{
    #[inline]
    fn provide(&self) -> T {
        self()
    }
}

type LifecycleAdapter = fn(&Erased) -> Option<Arc<dyn Lifecycle>>;

/// A type-erased [`Provider`].
///
/// Cloning a `ProviderObject` is cheap; clones call the same underlying provider.
#[derive(Clone)]
pub struct ProviderObject {
    construct: Arc<dyn Fn() -> Erased + Send + Sync>,
    lifecycle: Option<LifecycleAdapter>,
    type_id: TypeId,
    type_name: &'static str,
}

impl ProviderObject {
    /// Creates a new `ProviderObject` from a concrete provider.
    pub fn new<T, P>(provider: P) -> Self
    where
        T: Send + Sync + 'static,
        P: Provider<T>,
    {
        Self {
            construct: Arc::new(move || Erased::new(Arc::new(provider.provide()))),
            lifecycle: None,
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        }
    }

    /// Creates a new `ProviderObject` whose values are started and stopped by the container.
    pub fn with_lifecycle<T, P>(provider: P) -> Self
    where
        T: Lifecycle,
        P: Provider<T>,
    {
        Self {
            lifecycle: Some(lifecycle_of::<T>),
            ..Self::new::<T, P>(provider)
        }
    }

    /// Calls the provider.
    #[inline]
    pub fn construct(&self) -> Erased {
        (self.construct)()
    }

    /// Returns the lifecycle handle of a value built by this provider, if the provider was
    /// registered as lifecycle-capable.
    pub fn lifecycle_of(&self, value: &Erased) -> Option<Arc<dyn Lifecycle>> {
        self.lifecycle.and_then(|adapter| adapter(value))
    }

    /// Returns `true` if values built by this provider are lifecycle-capable.
    #[inline]
    pub const fn is_lifecycle(&self) -> bool {
        self.lifecycle.is_some()
    }

    /// Returns the [`TypeId`] of the values built by this provider.
    #[inline]
    pub const fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the type name of the values built by this provider.
    #[inline]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }
}

fn lifecycle_of<T>(value: &Erased) -> Option<Arc<dyn Lifecycle>>
where
    T: Lifecycle,
{
    value
        .clone()
        .downcast::<T>()
        .ok()
        .map(|value| value as Arc<dyn Lifecycle>)
}

impl std::fmt::Debug for ProviderObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderObject")
            .field("type_name", &self.type_name)
            .field("lifecycle", &self.is_lifecycle())
            .finish_non_exhaustive()
    }
}
