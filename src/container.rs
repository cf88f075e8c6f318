use std::any::TypeId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
};

use ioc_core::{Erased, Error, Key, Lifecycle, LifecycleErrors, Phase, Result};

use crate::guard::ConstructionGuard;
use crate::lifecycle::Lifecycles;
use crate::provider::{Provider, ProviderObject};
use crate::scope::Scope;
use crate::store::{Instances, downcast};

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// How a container behaves when several callers request an identity that has not been built yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Construction {
    /// First-time construction of an identity is serialized: the provider runs exactly once,
    /// and every concurrent caller receives the same instance.
    #[default]
    SingleFlight,
    /// Concurrent first-time callers may each run the provider. Each caller receives the value
    /// it built, and the last one stored stays in the cache.
    LastWriteWins,
}

#[derive(Default)]
struct Tables {
    providers: HashMap<Key, ProviderObject>,
    instances: Instances,
    lifecycles: Lifecycles,
    in_flight: HashMap<Key, Arc<Mutex<()>>>,
}

/// A registry of lazily constructed singletons.
///
/// Providers are registered per [`Key`] and run at most once, the first time their key is
/// requested. The built instance is cached and handed out as a shared [`Arc`] from then on.
/// Instances registered as lifecycle-capable are started and stopped in bulk with
/// [`init_all`](Self::init_all) and [`stop_all`](Self::stop_all).
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// use ioc::container::Container;
/// use ioc::{BoxError, Lifecycle};
///
/// #[derive(Debug, Default)]
/// struct Logger {
///     running: AtomicBool,
/// }
///
/// impl Lifecycle for Logger {
///     fn start(&self) -> Result<(), BoxError> {
///         self.running.store(true, Ordering::SeqCst);
///         Ok(())
///     }
///
///     fn stop(&self) -> Result<(), BoxError> {
///         self.running.store(false, Ordering::SeqCst);
///         Ok(())
///     }
/// }
///
/// # fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
/// let container = Container::new();
/// container.provide_lifecycle(Logger::default)?;
///
/// let logger = container.get::<Logger>()?;
/// assert!(Arc::ptr_eq(&logger, &container.get::<Logger>()?));
///
/// container.init_all()?;
/// assert!(logger.running.load(Ordering::SeqCst));
///
/// container.stop_all()?;
/// assert!(!logger.running.load(Ordering::SeqCst));
/// # Ok(())
/// # }
/// ```
pub struct Container {
    tables: RwLock<Tables>,
    construction: Construction,
    id: u64,
}

/// A builder for [`Container`].
#[derive(Debug, Default)]
pub struct ContainerBuilder {
    construction: Construction,
    providers: Vec<(Key, ProviderObject)>,
}

impl Container {
    /// Creates an empty container with the default [`Construction`] policy.
    #[must_use]
    pub fn new() -> Self {
        Self::with_construction(Construction::default())
    }

    /// Creates an empty container with the given [`Construction`] policy.
    #[must_use]
    pub fn with_construction(construction: Construction) -> Self {
        Self {
            tables: RwLock::default(),
            construction,
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Returns a new builder for `Container`.
    #[must_use]
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::default()
    }

    /// Returns the [`Construction`] policy of this container.
    #[inline]
    pub const fn construction(&self) -> Construction {
        self.construction
    }

    /// Registers a provider for values of type `T`, under [`Key::of::<T>()`](Key::of).
    ///
    /// The provider is not called until the first request. Registering again for the same key
    /// replaces the previous provider.
    ///
    /// Instances built by a provider registered here are never started or stopped, even if `T`
    /// implements [`Lifecycle`]. Use [`provide_lifecycle`](Self::provide_lifecycle) for those.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConstructor`] if the provider returns `()`.
    ///
    /// ```
    /// use ioc::{Container, Key};
    ///
    /// let container = Container::new();
    /// let err = container.provide(|| {}).unwrap_err();
    /// assert!(err.is_invalid_constructor());
    /// assert!(!container.is_provided(&Key::of::<()>()));
    /// ```
    pub fn provide<T, P>(&self, provider: P) -> Result<()>
    where
        T: Send + Sync + 'static,
        P: Provider<T>,
    {
        self.register(Key::of::<T>(), ProviderObject::new(provider))
    }

    /// Registers a provider for values of type `T` under an explicit key.
    ///
    /// # Errors
    ///
    /// See [`provide`](Self::provide).
    pub fn provide_as<T, P>(&self, key: impl Into<Key>, provider: P) -> Result<()>
    where
        T: Send + Sync + 'static,
        P: Provider<T>,
    {
        self.register(key.into(), ProviderObject::new(provider))
    }

    /// Registers a provider for lifecycle-capable values of type `T`.
    ///
    /// Once built, the instance takes part in [`init_all`](Self::init_all) and
    /// [`stop_all`](Self::stop_all).
    ///
    /// # Errors
    ///
    /// See [`provide`](Self::provide).
    pub fn provide_lifecycle<T, P>(&self, provider: P) -> Result<()>
    where
        T: Lifecycle,
        P: Provider<T>,
    {
        self.register(Key::of::<T>(), ProviderObject::with_lifecycle(provider))
    }

    /// Registers a provider for lifecycle-capable values of type `T` under an explicit key.
    ///
    /// # Errors
    ///
    /// See [`provide`](Self::provide).
    pub fn provide_lifecycle_as<T, P>(&self, key: impl Into<Key>, provider: P) -> Result<()>
    where
        T: Lifecycle,
        P: Provider<T>,
    {
        self.register(key.into(), ProviderObject::with_lifecycle(provider))
    }

    /// Registers a type-erased provider under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConstructor`] if the provider returns `()`. Nothing is registered
    /// in that case.
    pub fn register(&self, key: Key, provider: ProviderObject) -> Result<()> {
        if provider.type_id() == TypeId::of::<()>() {
            error!(key = %key, "provider does not return a value");
            return Err(Error::InvalidConstructor(key));
        }

        debug!(key = %key, ty = provider.type_name(), "registering provider");
        if self.write().providers.insert(key, provider).is_some() {
            debug!("replaced previously registered provider");
        }
        Ok(())
    }

    /// Returns `true` if a provider is registered under `key`.
    pub fn is_provided(&self, key: &Key) -> bool {
        self.read().providers.contains_key(key)
    }

    /// Returns `true` if an instance has already been built for `key`.
    pub fn contains(&self, key: &Key) -> bool {
        self.read().instances.contains(key)
    }

    /// Returns the singleton of type `T`, building it on first request.
    ///
    /// # Errors
    ///
    /// - [`Error::NoProvider`] if nothing is cached or registered for `T`.
    /// - [`Error::TypeMismatch`] if the value under `T`'s key is of another type.
    /// - [`Error::CircularDependency`] if the provider of `T` requests `T` itself.
    #[inline]
    pub fn get<T>(&self) -> Result<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        self.get_as(&Key::of::<T>())
    }

    /// Returns the singleton stored under `key`, building it on first request.
    ///
    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub fn get_as<T>(&self, key: &Key) -> Result<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let value = match self.cached(key) {
            Some(value) => value,
            None => self.construct(key)?,
        };

        downcast(key, value)
    }

    /// Writes the singleton of type `T` into `target`.
    ///
    /// `target` is left untouched if resolution fails.
    ///
    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub fn get_into<T>(&self, target: &mut Option<Arc<T>>) -> Result<()>
    where
        T: Send + Sync + 'static,
    {
        *target = Some(self.get()?);
        Ok(())
    }

    /// Starts every lifecycle-capable instance built so far, in construction order.
    ///
    /// All hooks run even if some fail. Hooks run without any lock held, so they may use the
    /// container.
    ///
    /// # Errors
    ///
    /// Returns every hook failure.
    pub fn init_all(&self) -> Result<(), LifecycleErrors> {
        let lifecycles = self.read().lifecycles.clone();
        lifecycles.run(Phase::Start)
    }

    /// Stops every lifecycle-capable instance built so far, in construction order.
    ///
    /// # Errors
    ///
    /// Returns every hook failure.
    pub fn stop_all(&self) -> Result<(), LifecycleErrors> {
        let lifecycles = self.read().lifecycles.clone();
        lifecycles.run(Phase::Stop)
    }

    /// Returns the keys of the lifecycle-capable instances built so far, in construction order.
    pub fn lifecycle_keys(&self) -> Vec<Key> {
        self.read().lifecycles.keys().cloned().collect()
    }

    /// Creates a request-scoped overlay on top of this container.
    #[inline]
    pub fn scope(&self) -> Scope<'_> {
        Scope::new(self)
    }

    fn cached(&self, key: &Key) -> Option<Erased> {
        self.read().instances.get(key).cloned()
    }

    fn construct(&self, key: &Key) -> Result<Erased> {
        let Some(provider) = self.read().providers.get(key).cloned() else {
            error!(key = %key, "no provider found");
            return Err(Error::NoProvider(key.clone()));
        };

        let _guard = ConstructionGuard::enter(self.id, key).inspect_err(|_| {
            error!(key = %key, "circular dependency detected");
        })?;

        match self.construction {
            Construction::LastWriteWins => Ok(self.build(key, &provider)),
            Construction::SingleFlight => {
                let flight = Flight::join(self, key);
                let _turn = flight.lock();

                // Another caller may have finished building while we were waiting.
                if let Some(value) = self.cached(key) {
                    return Ok(value);
                }

                Ok(self.build(key, &provider))
            }
        }
    }

    fn build(&self, key: &Key, provider: &ProviderObject) -> Erased {
        debug!(key = %key, ty = provider.type_name(), "constructing instance");
        let value = provider.construct();
        let lifecycle = provider.lifecycle_of(&value);

        let mut tables = self.write();
        if tables.instances.insert(key.clone(), value.clone()).is_some() {
            warn!(key = %key, "replaced an instance built by a concurrent caller");
        }
        if let Some(lifecycle) = lifecycle {
            tables.lifecycles.record(key.clone(), lifecycle);
        }

        value
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A caller's share of the per-key construction lock.
///
/// The map entry is removed when the last participant leaves, whether the provider returned or
/// panicked.
struct Flight<'a> {
    container: &'a Container,
    key: &'a Key,
    lock: Arc<Mutex<()>>,
}

impl<'a> Flight<'a> {
    fn join(container: &'a Container, key: &'a Key) -> Self {
        let lock = Arc::clone(container.write().in_flight.entry(key.clone()).or_default());
        Self {
            container,
            key,
            lock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        let lock = std::mem::take(&mut self.lock);
        let mut tables = self.container.write();
        // Shares of the lock are only cloned and released under the table lock.
        let last = tables
            .in_flight
            .get(self.key)
            .is_some_and(|entry| Arc::ptr_eq(entry, &lock) && Arc::strong_count(entry) == 2);
        if last {
            tables.in_flight.remove(self.key);
        }
        drop(lock);
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tables = self.read();
        f.debug_struct("Container")
            .field("construction", &self.construction)
            .field("providers", &tables.providers.len())
            .field("instances", &tables.instances.len())
            .field("lifecycles", &tables.lifecycles)
            .finish_non_exhaustive()
    }
}

impl ContainerBuilder {
    /// Sets the [`Construction`] policy of the container.
    #[must_use]
    pub const fn construction(mut self, construction: Construction) -> Self {
        self.construction = construction;
        self
    }

    /// Registers a provider for values of type `T`.
    ///
    /// As with [`Container::provide`], the instance is not started or stopped even if `T`
    /// implements [`Lifecycle`]; use [`with_lifecycle`](Self::with_lifecycle) for that.
    #[must_use]
    pub fn with_provider<T, P>(self, provider: P) -> Self
    where
        T: Send + Sync + 'static,
        P: Provider<T>,
    {
        self.with_provider_object(Key::of::<T>(), ProviderObject::new(provider))
    }

    /// Registers a provider for values of type `T` under an explicit key.
    #[must_use]
    pub fn with_provider_as<T, P>(self, key: impl Into<Key>, provider: P) -> Self
    where
        T: Send + Sync + 'static,
        P: Provider<T>,
    {
        self.with_provider_object(key.into(), ProviderObject::new(provider))
    }

    /// Registers a provider for lifecycle-capable values of type `T`.
    #[must_use]
    pub fn with_lifecycle<T, P>(self, provider: P) -> Self
    where
        T: Lifecycle,
        P: Provider<T>,
    {
        self.with_provider_object(Key::of::<T>(), ProviderObject::with_lifecycle(provider))
    }

    /// Registers a provider for lifecycle-capable values of type `T` under an explicit key.
    #[must_use]
    pub fn with_lifecycle_as<T, P>(self, key: impl Into<Key>, provider: P) -> Self
    where
        T: Lifecycle,
        P: Provider<T>,
    {
        self.with_provider_object(key.into(), ProviderObject::with_lifecycle(provider))
    }

    /// Registers a type-erased provider under `key`.
    #[must_use]
    pub fn with_provider_object(mut self, key: Key, provider: ProviderObject) -> Self {
        self.providers.push((key, provider));
        self
    }

    /// Finalizes the building process and returns the built container.
    ///
    /// Providers are registered in the order they were added, so a later provider for the same
    /// key wins.
    ///
    /// # Errors
    ///
    /// Returns the first registration error, see [`Container::register`].
    pub fn build(self) -> Result<Container> {
        let Self {
            construction,
            providers,
        } = self;

        let container = Container::with_construction(construction);
        for (key, provider) in providers {
            container.register(key, provider)?;
        }

        Ok(container)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use ioc_core::BoxError;

    use super::*;

    #[derive(Debug)]
    struct Logger {
        id: usize,
        started: AtomicUsize,
    }

    impl Lifecycle for Logger {
        fn start(&self) -> Result<(), BoxError> {
            self.started.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn stop(&self) -> Result<(), BoxError> {
            Ok(())
        }
    }

    type Journal = Arc<Mutex<Vec<String>>>;

    struct Service {
        name: &'static str,
        journal: Journal,
    }

    impl Lifecycle for Service {
        fn start(&self) -> Result<(), BoxError> {
            self.journal.lock().unwrap().push(format!("start {}", self.name));
            Ok(())
        }

        fn stop(&self) -> Result<(), BoxError> {
            self.journal.lock().unwrap().push(format!("stop {}", self.name));
            if self.name == "cache" {
                return Err("cache is busy".into());
            }
            Ok(())
        }
    }

    struct Database;
    struct Cache;

    fn counter() -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (Arc::clone(&calls), calls)
    }

    #[test]
    fn test_logger_end_to_end() {
        let (calls, counted) = counter();
        let container = Container::new();
        container
            .provide_lifecycle_as("Logger", move || Logger {
                id: counted.fetch_add(1, Ordering::SeqCst),
                started: AtomicUsize::new(0),
            })
            .unwrap();

        let key = Key::new("Logger");
        let first = container.get_as::<Logger>(&key).unwrap();
        let second = container.get_as::<Logger>(&key).unwrap();
        let third = container.get_as::<Logger>(&key).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&second, &third));
        assert_eq!(first.id, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        container.init_all().unwrap();
        assert_eq!(first.started.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_provider_is_lazy() {
        let (calls, counted) = counter();
        let container = Container::new();
        container
            .provide(move || {
                counted.fetch_add(1, Ordering::SeqCst);
                Database
            })
            .unwrap();

        assert!(container.is_provided(&Key::of::<Database>()));
        assert!(!container.contains(&Key::of::<Database>()));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        container.get::<Database>().unwrap();
        assert!(container.contains(&Key::of::<Database>()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reregistration_last_wins() {
        let container = Container::new();
        container.provide(|| 1_u32).unwrap();
        container.provide(|| 2_u32).unwrap();
        assert_eq!(*container.get::<u32>().unwrap(), 2);
    }

    #[test]
    fn test_unit_provider_is_rejected() {
        let container = Container::new();
        container.provide(|| 1_u32).unwrap();

        let err = container.provide(|| {}).unwrap_err();
        assert_eq!(err, Error::InvalidConstructor(Key::of::<()>()));
        let err = container.provide_as("noop", || ()).unwrap_err();
        assert!(err.is_invalid_constructor());
        let err = container
            .register(Key::of::<u32>(), ProviderObject::new(|| ()))
            .unwrap_err();
        assert_eq!(err.key(), &Key::of::<u32>());

        assert!(!container.is_provided(&Key::of::<()>()));
        assert!(!container.is_provided(&Key::new("noop")));
        assert_eq!(*container.get::<u32>().unwrap(), 1);
    }

    #[test]
    fn test_builder_rejects_unit_provider() {
        let err = Container::builder()
            .with_provider(|| 1_u8)
            .with_provider_as("noop", || ())
            .build()
            .unwrap_err();
        assert_eq!(err, Error::InvalidConstructor(Key::new("noop")));
    }

    #[test]
    fn test_missing_provider_leaves_target() {
        let container = Container::new();
        let mut target: Option<Arc<Database>> = None;

        let err = container.get_into(&mut target).unwrap_err();
        assert!(err.is_no_provider_for(&Key::of::<Database>()));
        assert!(target.is_none());

        container.provide(|| Database).unwrap();
        container.get_into(&mut target).unwrap();
        assert!(target.is_some());
    }

    #[test]
    fn test_type_mismatch() {
        let container = Container::new();
        container.provide_as("port", || 8080_u16).unwrap();
        let err = container.get_as::<String>(&Key::new("port")).unwrap_err();
        assert!(err.is_type_mismatch());
        assert_eq!(*container.get_as::<u16>(&Key::new("port")).unwrap(), 8080);
    }

    #[test]
    fn test_provider_may_use_container() {
        let container = Arc::new(Container::new());
        let inner = Arc::clone(&container);
        container.provide(|| 5_432_u16).unwrap();
        container
            .provide(move || {
                let port = inner.get::<u16>().unwrap();
                format!("localhost:{port}")
            })
            .unwrap();

        assert_eq!(*container.get::<String>().unwrap(), "localhost:5432");
    }

    #[test]
    fn test_circular_dependency() {
        let container = Arc::new(Container::new());
        let inner = Arc::clone(&container);
        container
            .provide(move || inner.get::<Database>().map(|_| 0_u8))
            .unwrap();
        let inner = Arc::clone(&container);
        container
            .provide(move || {
                let _ = inner.get::<Result<u8>>();
                Database
            })
            .unwrap();

        // `Database` -> `Result<u8>` -> `Database`.
        container.get::<Database>().unwrap();
        let nested = container.get::<Result<u8>>().unwrap();
        assert!(matches!(&*nested, Err(err) if err.is_circular_dependency()));
    }

    #[test]
    fn test_lifecycle_order() {
        let journal = Journal::default();
        let container = Container::new();
        for name in ["database", "cache", "server"] {
            let journal = Arc::clone(&journal);
            container
                .provide_lifecycle_as(name, move || Service {
                    name,
                    journal: Arc::clone(&journal),
                })
                .unwrap();
        }
        container.provide(|| Cache).unwrap();

        container.get_as::<Service>(&Key::new("server")).unwrap();
        container.get::<Cache>().unwrap();
        container.get_as::<Service>(&Key::new("database")).unwrap();
        container.get_as::<Service>(&Key::new("cache")).unwrap();
        container.get_as::<Service>(&Key::new("server")).unwrap();

        assert_eq!(
            container.lifecycle_keys(),
            [Key::new("server"), Key::new("database"), Key::new("cache")]
        );

        container.init_all().unwrap();
        let errors = container.stop_all().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.failures()[0].key, Key::new("cache"));
        assert_eq!(errors.failures()[0].phase, Phase::Stop);

        assert_eq!(
            *journal.lock().unwrap(),
            [
                "start server",
                "start database",
                "start cache",
                "stop server",
                "stop database",
                "stop cache",
            ]
        );
    }

    #[test]
    fn test_plain_provider_is_not_managed() {
        let container = Container::new();
        container
            .provide(|| Logger {
                id: 0,
                started: AtomicUsize::new(0),
            })
            .unwrap();

        let logger = container.get::<Logger>().unwrap();
        container.init_all().unwrap();
        assert!(container.lifecycle_keys().is_empty());
        assert_eq!(logger.started.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_builder() {
        let container = Container::builder()
            .construction(Construction::LastWriteWins)
            .with_provider(|| 1_u8)
            .with_provider_as("name", || String::from("ioc"))
            .with_lifecycle(|| Logger {
                id: 7,
                started: AtomicUsize::new(0),
            })
            .with_lifecycle_as("audit", || Logger {
                id: 9,
                started: AtomicUsize::new(0),
            })
            .build()
            .unwrap();

        assert_eq!(container.construction(), Construction::LastWriteWins);
        assert_eq!(*container.get::<u8>().unwrap(), 1);
        assert_eq!(*container.get_as::<String>(&Key::new("name")).unwrap(), "ioc");
        assert_eq!(container.get::<Logger>().unwrap().id, 7);
        let audit = container.get_as::<Logger>(&Key::new("audit")).unwrap();
        assert_eq!(audit.id, 9);
        assert_eq!(
            container.lifecycle_keys(),
            [Key::of::<Logger>(), Key::new("audit")]
        );

        container.init_all().unwrap();
        assert_eq!(audit.started.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_provider_does_not_poison() {
        let container = Arc::new(Container::new());
        container.provide(|| -> u8 { panic!("boom") }).unwrap();
        container.provide(|| 1_u16).unwrap();

        let cloned = Arc::clone(&container);
        let joined = std::thread::spawn(move || cloned.get::<u8>()).join();
        assert!(joined.is_err());
        assert!(container.read().in_flight.is_empty());

        assert_eq!(*container.get::<u16>().unwrap(), 1);
        assert!(!container.contains(&Key::of::<u8>()));
    }

    #[test]
    fn test_panicking_provider_can_be_replaced() {
        let container = Arc::new(Container::new());
        container.provide(|| -> u8 { panic!("boom") }).unwrap();

        let cloned = Arc::clone(&container);
        assert!(std::thread::spawn(move || cloned.get::<u8>()).join().is_err());

        container.provide(|| 3_u8).unwrap();
        assert_eq!(*container.get::<u8>().unwrap(), 3);
        assert!(container.read().in_flight.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_single_flight_constructs_once() {
        const CALLERS: usize = 8;

        let (calls, counted) = counter();
        let container = Arc::new(Container::new());
        container
            .provide_lifecycle(move || {
                std::thread::sleep(Duration::from_millis(20));
                Logger {
                    id: counted.fetch_add(1, Ordering::SeqCst),
                    started: AtomicUsize::new(0),
                }
            })
            .unwrap();

        let barrier = Arc::new(Barrier::new(CALLERS));
        let tasks: Vec<_> = (0..CALLERS)
            .map(|_| {
                let container = Arc::clone(&container);
                let barrier = Arc::clone(&barrier);
                tokio::task::spawn_blocking(move || {
                    barrier.wait();
                    container.get::<Logger>().unwrap()
                })
            })
            .collect();

        let mut loggers = Vec::new();
        for task in tasks {
            loggers.push(task.await.unwrap());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(loggers.iter().all(|l| Arc::ptr_eq(l, &loggers[0])));
        assert_eq!(container.lifecycle_keys().len(), 1);
        assert!(container.read().in_flight.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_last_write_wins_may_construct_twice() {
        let (calls, counted) = counter();
        let container = Arc::new(Container::with_construction(Construction::LastWriteWins));

        // Both callers must be inside the provider at the same time to get past this barrier,
        // which can only happen if construction is not serialized.
        let inside = Arc::new(Barrier::new(2));
        container
            .provide_lifecycle(move || {
                inside.wait();
                Logger {
                    id: counted.fetch_add(1, Ordering::SeqCst),
                    started: AtomicUsize::new(0),
                }
            })
            .unwrap();

        let tasks: Vec<_> = (0..2)
            .map(|_| {
                let container = Arc::clone(&container);
                tokio::task::spawn_blocking(move || container.get::<Logger>().unwrap())
            })
            .collect();

        let mut built = Vec::new();
        for task in tasks {
            built.push(task.await.unwrap());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(!Arc::ptr_eq(&built[0], &built[1]));

        let cached = container.get::<Logger>().unwrap();
        assert!(built.iter().any(|l| Arc::ptr_eq(l, &cached)));
        assert_eq!(container.lifecycle_keys(), [Key::of::<Logger>()]);

        container.init_all().unwrap();
        assert_eq!(cached.started.load(Ordering::SeqCst), 1);
    }
}
