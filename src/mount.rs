//! Deferred registration against a host value.
//!
//! Modules that want to attach themselves to something the application builds later (a router,
//! an RPC server) register a mount function up front. Once the host exists, the bootstrap code
//! applies every mount function to it, handing each one the container.

use crate::container::Container;

type MountFn<S> = Box<dyn Fn(&mut S, &Container) + Send + Sync>;

/// An ordered list of mount functions for hosts of type `S`.
///
/// # Example
///
/// ```
/// use ioc::container::Container;
/// use ioc::mount::Mounts;
///
/// #[derive(Default)]
/// struct Router {
///     routes: Vec<String>,
/// }
///
/// let mut mounts = Mounts::<Router>::new();
/// mounts.register(|router, container| {
///     let prefix = container.get::<String>().unwrap();
///     router.routes.push(format!("{prefix}/ping"));
/// });
///
/// let container = Container::new();
/// container.provide(|| String::from("/api")).unwrap();
///
/// let mut router = Router::default();
/// mounts.apply(&mut router, &container);
/// assert_eq!(router.routes, ["/api/ping"]);
/// ```
pub struct Mounts<S> {
    mounts: Vec<MountFn<S>>,
}

impl<S> Mounts<S> {
    #[must_use]
    pub const fn new() -> Self {
        Self { mounts: Vec::new() }
    }

    /// Adds a mount function. Functions are applied in the order they were registered.
    pub fn register<F>(&mut self, mount: F)
    where
        F: Fn(&mut S, &Container) + Send + Sync + 'static,
    {
        self.mounts.push(Box::new(mount));
    }

    /// Applies every mount function to `host`.
    pub fn apply(&self, host: &mut S, container: &Container) {
        debug!(mounts = self.mounts.len(), "applying mount functions");
        for mount in &self.mounts {
            mount(host, container);
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.mounts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }
}

impl<S> Default for Mounts<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> std::fmt::Debug for Mounts<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mounts")
            .field("len", &self.mounts.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    struct Server {
        services: Vec<String>,
    }

    struct Greeter {
        greeting: &'static str,
    }

    #[test]
    fn test_apply_in_order() {
        let mut mounts = Mounts::<Server>::new();
        assert!(mounts.is_empty());

        mounts.register(|server, _| server.services.push("health".into()));
        mounts.register(|server, container| {
            let greeter: Arc<Greeter> = container.get().unwrap();
            server.services.push(greeter.greeting.into());
        });
        assert_eq!(mounts.len(), 2);

        let container = Container::new();
        container.provide(|| Greeter { greeting: "hello" }).unwrap();

        let mut server = Server {
            services: Vec::new(),
        };
        mounts.apply(&mut server, &container);
        assert_eq!(server.services, ["health", "hello"]);
    }

    #[test]
    fn test_apply_is_repeatable() {
        let mut mounts = Mounts::<Vec<u8>>::new();
        mounts.register(|host, _| host.push(1));

        let container = Container::new();
        let mut first = Vec::new();
        let mut second = Vec::new();
        mounts.apply(&mut first, &container);
        mounts.apply(&mut second, &container);
        assert_eq!((first, second), (vec![1], vec![1]));
    }
}
