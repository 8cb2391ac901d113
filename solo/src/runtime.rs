//! Runtime type definitions for shared ownership and interior mutability.
//!
//! Concurrent first access is the whole point of this crate, so unlike
//! libraries that offer an `Rc`/`RefCell` single-threaded mode behind a
//! feature flag, these aliases are unconditionally the thread-safe types.
//!
//! # Type Aliases
//!
//! - [`Shared<T>`]: smart pointer for shared ownership (`Arc<T>`)
//! - [`Store<T>`]: container providing interior mutability (`RwLock<T>`)
//!
//! # Examples
//!
//! ```
//! use solo::runtime::{Shared, Store};
//!
//! let value = Store::new(42);
//! let shared = Shared::new(value);
//! assert_eq!(*shared.read().unwrap(), 42);
//! ```

use std::sync::{Arc, RwLock};

/// Type alias for shared ownership of data.
///
/// Instances handed out by the cells and the registry are `Shared<T>`; every
/// caller receives a handle to the same underlying allocation.
pub type Shared<T> = Arc<T>;

/// Type alias for interior mutability with reader/writer locking.
pub type Store<T> = RwLock<T>;
