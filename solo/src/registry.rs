//! The injectable lazy singleton registry.
//!
//! [`Registry`] owns one [`Provider`] and one type-erased
//! [`InstanceCell`](crate::cell::InstanceCell) per registered type. Instances
//! are constructed on first resolution, exactly once, regardless of how many
//! threads resolve concurrently; every caller receives a handle to the same
//! underlying value.
//!
//! The registry is an explicit object: construct it once at a defined point,
//! then pass it by reference (or `Shared<Registry>`) to consumers. There is no
//! hidden global state in this crate.
//!
//! # Examples
//!
//! ```
//! use solo::registry::Registry;
//! use solo::runtime::Shared;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! struct UserService {
//!     db: Shared<Database>,
//! }
//!
//! let registry = Registry::new();
//! registry
//!     .provide_value(|_r| Database {
//!         url: "postgresql://localhost:5432/app".to_string(),
//!     })
//!     .provide_value(|r| UserService {
//!         db: r.get::<Database>(),
//!     });
//!
//! let users = registry.get::<UserService>();
//! assert!(users.db.url.starts_with("postgresql"));
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::cell::InstanceCell;
use crate::error::Error;
use crate::provider::{Erased, Provider};
use crate::resolve_guard::ResolveGuard;
use crate::runtime::{Shared, Store};

#[cfg(feature = "tracing")]
use tracing::debug;

struct Entry {
    provider: Provider,
    cell: InstanceCell<Erased>,
}

/// A collection of lazily constructed, process-wide shared singletons.
///
/// Each registered type gets its own initialization cell, so constructing one
/// singleton never serializes access to the others. Resolution of an already
/// constructed instance is a map lookup plus the cell's lock-free fast path.
pub struct Registry {
    entries: Store<HashMap<TypeId, Shared<Entry>>>,
}

#[cfg(feature = "debug")]
impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("entries", &self.entries.read().unwrap().len())
            .finish()
    }
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            entries: Store::new(HashMap::new()),
        }
    }

    /// Registers a fallible singleton factory for `T`.
    ///
    /// The factory receives the registry, so it can resolve the singletons it
    /// depends on. It runs lazily, on the first [`try_get`](Self::try_get) for
    /// `T`, and at most once per successful lifetime.
    pub fn try_provide<T, E, F>(&self, factory: F) -> Result<(), Error>
    where
        T: Any + Send + Sync + 'static,
        E: fmt::Display,
        F: Fn(&Registry) -> Result<T, E> + Send + Sync + 'static,
    {
        self.store_provider::<T>(Provider::new(factory))
    }

    /// Panicking variant of [`try_provide`](Self::try_provide), chainable.
    pub fn provide<T, E, F>(&self, factory: F) -> &Self
    where
        T: Any + Send + Sync + 'static,
        E: fmt::Display,
        F: Fn(&Registry) -> Result<T, E> + Send + Sync + 'static,
    {
        self.try_provide::<T, E, F>(factory).unwrap();
        self
    }

    /// Registers an infallible singleton factory for `T`.
    pub fn try_provide_value<T, F>(&self, factory: F) -> Result<(), Error>
    where
        T: Any + Send + Sync + 'static,
        F: Fn(&Registry) -> T + Send + Sync + 'static,
    {
        self.store_provider::<T>(Provider::value(factory))
    }

    /// Panicking variant of [`try_provide_value`](Self::try_provide_value), chainable.
    pub fn provide_value<T, F>(&self, factory: F) -> &Self
    where
        T: Any + Send + Sync + 'static,
        F: Fn(&Registry) -> T + Send + Sync + 'static,
    {
        self.try_provide_value::<T, F>(factory).unwrap();
        self
    }

    /// Resolves the shared instance of `T`, constructing it on first access.
    ///
    /// All callers, across all threads, observe the same underlying instance;
    /// construction side effects occur exactly once. A failed factory reverts
    /// the cell, the error propagates to this caller and to every caller that
    /// was waiting on the attempt, and a later call retries fresh.
    pub fn try_get<T>(&self) -> Result<Shared<T>, Error>
    where
        T: Any + Send + Sync,
    {
        let type_name = std::any::type_name::<T>();

        // Detect same-thread factory cycles before they wedge a cell.
        let _guard = ResolveGuard::push(type_name)?;

        let entry = self.lookup::<T>()?;
        let erased = entry
            .cell
            .get_or_init_shared(|| (entry.provider.factory)(self))?;

        erased
            .downcast::<T>()
            .map_err(|_| Error::type_mismatch(type_name))
    }

    /// Panicking variant of [`try_get`](Self::try_get).
    pub fn get<T>(&self) -> Shared<T>
    where
        T: Any + Send + Sync,
    {
        self.try_get::<T>().unwrap()
    }

    /// Like [`try_get`](Self::try_get), but gives up with
    /// [`ErrorKind::InitializationTimeout`](crate::error::ErrorKind) after
    /// waiting `bound` on another thread's in-flight construction. The cell's
    /// state is unaffected by a timeout; the caller may retry.
    pub fn try_get_timeout<T>(&self, bound: Duration) -> Result<Shared<T>, Error>
    where
        T: Any + Send + Sync,
    {
        let type_name = std::any::type_name::<T>();

        let _guard = ResolveGuard::push(type_name)?;

        let entry = self.lookup::<T>()?;
        let erased = entry
            .cell
            .get_or_init_shared_timeout(|| (entry.provider.factory)(self), bound)?;

        erased
            .downcast::<T>()
            .map_err(|_| Error::type_mismatch(type_name))
    }

    /// Whether a provider is registered for `T`.
    pub fn has<T: Any>(&self) -> bool {
        self.entries
            .read()
            .unwrap()
            .contains_key(&TypeId::of::<T>())
    }

    /// Whether the instance of `T` has already been constructed.
    pub fn is_ready<T: Any>(&self) -> bool {
        self.entries
            .read()
            .unwrap()
            .get(&TypeId::of::<T>())
            .map(|entry| entry.cell.is_ready())
            .unwrap_or(false)
    }

    /// How many times the init lock of `T`'s cell has been acquired.
    ///
    /// Stays put once the instance is ready; useful for asserting that reads
    /// go through the lock-free fast path.
    pub fn init_lock_acquisitions<T: Any>(&self) -> usize {
        self.entries
            .read()
            .unwrap()
            .get(&TypeId::of::<T>())
            .map(|entry| entry.cell.init_lock_acquisitions())
            .unwrap_or(0)
    }

    /// Test hook: returns `T`'s cell to `Uninitialized` so the next resolution
    /// constructs fresh. Returns `false` when `T` is unknown or its entry is
    /// still borrowed by an in-flight resolution.
    ///
    /// Single-threaded-test-only: the exclusive borrow keeps this sound, but
    /// production code must treat `Ready` as terminal.
    pub fn force_reset<T: Any>(&mut self) -> bool {
        let entries = self.entries.get_mut().unwrap();
        match entries.get_mut(&TypeId::of::<T>()) {
            Some(entry) => match Shared::get_mut(entry) {
                Some(entry) => {
                    entry.cell.force_reset();
                    true
                }
                None => false,
            },
            None => false,
        }
    }

    fn store_provider<T: Any + Send + Sync>(&self, provider: Provider) -> Result<(), Error> {
        let type_id = TypeId::of::<T>();
        let mut entries = self.entries.write().unwrap();

        if entries.contains_key(&type_id) {
            return Err(Error::provider_already_registered(provider.type_name()));
        }

        #[cfg(feature = "tracing")]
        debug!("registered provider for {}", provider.type_name());

        let cell = InstanceCell::with_name(provider.type_name());
        entries.insert(type_id, Shared::new(Entry { provider, cell }));

        Ok(())
    }

    fn lookup<T: Any>(&self) -> Result<Shared<Entry>, Error> {
        self.entries
            .read()
            .unwrap()
            .get(&TypeId::of::<T>())
            .cloned()
            .ok_or_else(|| Error::service_not_provided(std::any::type_name::<T>()))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[derive(Debug)]
    struct Config {
        workers: usize,
    }

    #[test]
    fn resolves_the_same_instance() {
        let registry = Registry::new();
        registry.provide_value(|_| Config { workers: 4 });

        assert!(registry.has::<Config>());
        assert!(!registry.is_ready::<Config>());

        let a = registry.get::<Config>();
        let b = registry.get::<Config>();

        assert!(registry.is_ready::<Config>());
        assert_eq!(a.workers, 4);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn unknown_type_is_not_provided() {
        let registry = Registry::new();
        let err = registry.try_get::<Config>().unwrap_err();
        assert!(err.kind == ErrorKind::ServiceNotProvided);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let registry = Registry::new();
        registry.try_provide_value(|_| Config { workers: 1 }).unwrap();

        let err = registry
            .try_provide_value(|_| Config { workers: 2 })
            .unwrap_err();
        assert!(err.kind == ErrorKind::ProviderAlreadyRegistered);

        // The original registration is untouched.
        assert_eq!(registry.get::<Config>().workers, 1);
    }

    #[test]
    fn singletons_can_depend_on_singletons() {
        struct Database {
            url: String,
        }
        struct UserService {
            db: Shared<Database>,
        }

        let registry = Registry::new();
        registry
            .provide_value(|_| Database {
                url: "sqlite::memory:".to_string(),
            })
            .provide_value(|r| UserService {
                db: r.get::<Database>(),
            });

        let users = registry.get::<UserService>();
        let db = registry.get::<Database>();

        assert!(Arc::ptr_eq(&users.db, &db));
        assert_eq!(db.url, "sqlite::memory:");
    }

    #[test]
    #[should_panic]
    fn circular_panicking_factories_do_not_deadlock() {
        struct A;
        struct B;

        let registry = Registry::new();
        registry
            .provide_value(|r| {
                r.get::<B>();
                A
            })
            .provide_value(|r| {
                r.get::<A>();
                B
            });

        // The innermost resolution detects the cycle; `get` unwraps it into a
        // panic instead of wedging the initializing cells.
        registry.get::<A>();
    }

    #[test]
    fn circular_fallible_factories_propagate_the_chain() {
        #[derive(Debug)]
        struct A;
        struct B;

        let registry = Registry::new();
        registry
            .provide(|r| r.try_get::<B>().map(|_| A))
            .provide(|r| r.try_get::<A>().map(|_| B));

        let err = registry.try_get::<A>().unwrap_err();
        // The cycle error travels back out wrapped by each factory on the way.
        assert!(err.kind == ErrorKind::Construction);
        assert!(err.message.contains("Circular dependency detected"));
    }

    #[test]
    fn concurrent_resolution_constructs_once() {
        let constructions = Arc::new(AtomicUsize::new(0));

        let registry = Arc::new(Registry::new());
        {
            let constructions = constructions.clone();
            registry.provide_value(move |_| {
                constructions.fetch_add(1, Ordering::SeqCst);
                Config { workers: 8 }
            });
        }

        let barrier = Arc::new(Barrier::new(10));
        let handles: Vec<_> = (0..10)
            .map(|_| {
                let registry = registry.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    registry.get::<Config>()
                })
            })
            .collect();

        let instances: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(constructions.load(Ordering::SeqCst), 1);
        for instance in &instances {
            assert!(Arc::ptr_eq(instance, &instances[0]));
        }
    }

    #[test]
    fn fast_path_after_readiness() {
        let registry = Registry::new();
        registry.provide_value(|_| Config { workers: 2 });

        registry.get::<Config>();
        assert_eq!(registry.init_lock_acquisitions::<Config>(), 1);

        for _ in 0..500 {
            registry.get::<Config>();
        }
        assert_eq!(registry.init_lock_acquisitions::<Config>(), 1);
    }

    #[test]
    fn failed_factory_allows_retry() {
        let attempts = Arc::new(AtomicUsize::new(0));

        let registry = Registry::new();
        {
            let attempts = attempts.clone();
            registry.provide(move |_| {
                if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err("transient outage")
                } else {
                    Ok(Config { workers: 16 })
                }
            });
        }

        let err = registry.try_get::<Config>().unwrap_err();
        assert!(err.kind == ErrorKind::Construction);
        assert!(err.message.contains("transient outage"));
        assert!(!registry.is_ready::<Config>());

        let config = registry.try_get::<Config>().unwrap();
        assert_eq!(config.workers, 16);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn timeout_while_another_thread_constructs() {
        let registry = Arc::new(Registry::new());
        let in_ctor = Arc::new(Barrier::new(2));

        {
            let in_ctor = in_ctor.clone();
            registry.provide_value(move |_| {
                in_ctor.wait();
                thread::sleep(Duration::from_millis(300));
                Config { workers: 1 }
            });
        }

        let initiator = {
            let registry = registry.clone();
            thread::spawn(move || registry.get::<Config>())
        };

        in_ctor.wait();
        let err = registry
            .try_get_timeout::<Config>(Duration::from_millis(10))
            .unwrap_err();
        assert!(err.kind == ErrorKind::InitializationTimeout);
        assert!(err.message.contains("Config"));

        // The in-flight construction still completes normally.
        assert_eq!(initiator.join().unwrap().workers, 1);
        assert!(registry.is_ready::<Config>());
    }

    #[test]
    fn mutation_is_shared_not_copied() {
        struct Settings {
            brightness: Store<u32>,
        }

        let registry = Arc::new(Registry::new());
        registry.provide_value(|_| Settings {
            brightness: Store::new(75),
        });

        let first = registry.get::<Settings>();
        *first.brightness.write().unwrap() = 400;

        let registry2 = registry.clone();
        let observed = thread::spawn(move || {
            let second = registry2.get::<Settings>();
            *second.brightness.read().unwrap()
        })
        .join()
        .unwrap();

        assert_eq!(observed, 400);
    }

    #[test]
    fn force_reset_reconstructs_on_next_get() {
        let constructions = Arc::new(AtomicUsize::new(0));

        let mut registry = Registry::new();
        {
            let constructions = constructions.clone();
            registry.provide_value(move |_| {
                constructions.fetch_add(1, Ordering::SeqCst);
                Config { workers: 3 }
            });
        }

        let first = registry.get::<Config>();
        drop(first);
        assert!(registry.force_reset::<Config>());
        assert!(!registry.is_ready::<Config>());

        registry.get::<Config>();
        assert_eq!(constructions.load(Ordering::SeqCst), 2);

        // Unknown types report false.
        struct Unknown;
        assert!(!registry.force_reset::<Unknown>());
    }
}
