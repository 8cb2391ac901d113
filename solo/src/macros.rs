//! Macros for ergonomic provider registration and registry setup.
//!
//! - [`provide!`]: shorthand for registering a singleton factory.
//! - [`registry!`]: compose a registry with multiple `provide!` statements in
//!   one block.
//!
//! # Example
//! ```
//! use solo::registry;
//!
//! struct Config {
//!     workers: usize,
//! }
//!
//! struct Database;
//!
//! impl Database {
//!     fn connect() -> Result<Self, String> {
//!         Ok(Database)
//!     }
//! }
//!
//! let r = registry! {
//!     provide(Config => |_r| Config { workers: 4 })
//!     provide(try Database => |_r| Database::connect())
//! };
//!
//! assert_eq!(r.get::<Config>().workers, 4);
//! assert!(r.try_get::<Database>().is_ok());
//! ```

/// Shorthand for registering a singleton factory in a registry.
///
/// - `Type => factory`: register an infallible factory.
/// - `try Type => factory`: register a fallible factory returning `Result`.
#[macro_export]
macro_rules! provide {
    // Register a fallible singleton factory
    ($registry:expr, try $token:ty => $factory:expr) => {{
        $registry.provide::<$token, _, _>($factory);
    }};

    // Register an infallible singleton factory
    ($registry:expr, $token:ty => $factory:expr) => {{
        $registry.provide_value::<$token, _>($factory);
    }};
}

/// Compose a registry with multiple `provide!` statements in one block.
///
/// # Example
/// ```ignore
/// let r = registry! {
///     provide(Config => |_r| Config::default())
///     provide(try Database => |r| Database::connect(&r.get::<Config>()))
/// };
/// ```
#[macro_export]
macro_rules! registry {
    (
        $(
            provide( $($stmt:tt)* )
        )*
    ) => {{
        let registry = $crate::Registry::new();

        $(
            $crate::provide!(registry, $($stmt)*);
        )*

        registry
    }};
}

#[cfg(test)]
mod tests {
    use crate::runtime::Shared;

    struct Config {
        workers: usize,
    }

    struct Pool {
        config: Shared<Config>,
    }

    #[test]
    fn macro_registry_and_provide() {
        let r = registry! {
            provide(Config => |_r| Config { workers: 2 })
            provide(Pool => |r| Pool { config: r.get::<Config>() })
        };

        let pool = r.get::<Pool>();
        assert_eq!(pool.config.workers, 2);
        assert!(Shared::ptr_eq(&pool.config, &r.get::<Config>()));
    }

    #[test]
    fn macro_fallible_provide() {
        #[derive(Debug)]
        struct Flaky;

        let r = registry! {
            provide(try Flaky => |_r| Err::<Flaky, _>("down for maintenance"))
        };

        let err = r.try_get::<Flaky>().unwrap_err();
        assert!(err.message.contains("down for maintenance"));
    }
}
