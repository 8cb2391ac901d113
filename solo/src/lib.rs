//! # SoLo - Safe Lazy Objects
//!
//! A small library for race-free lazy initialization of process-wide shared
//! instances. SoLo provides two layers:
//!
//! - [`InstanceCell<T>`](cell::InstanceCell): a double-checked lazy cell that
//!   constructs its value exactly once, no matter how many threads race on the
//!   first access, and serves every later access through a lock-free fast path.
//! - [`Registry`](registry::Registry): an explicit, injectable collection of
//!   lazy singletons keyed by type, for programs that want "exactly one
//!   instance" semantics without hidden global statics.
//!
//! ## Features
//!
//! - **Exactly-once construction**: duplicate construction is impossible, even
//!   when many threads observe the empty cell simultaneously
//! - **Lock-free fast path**: once ready, reads take no lock
//! - **Failure recovery**: a failed constructor reverts the cell so a later
//!   call can retry; waiters of the failed attempt receive the error
//! - **Bounded waits**: optional timeout on waiting for an in-flight
//!   initialization
//! - **Circular detection**: registry factories that resolve their own type
//!   fail fast instead of deadlocking
//! - **Optional logging**: tracing integration with feature gates
//!
//! ## Basic Usage
//!
//! ```rust
//! use solo::registry;
//!
//! struct Config {
//!     workers: usize,
//! }
//!
//! let registry = registry! {
//!     provide(Config => |_registry| Config { workers: 4 })
//! };
//!
//! // Constructed on first access, shared afterwards.
//! let a = registry.get::<Config>();
//! let b = registry.get::<Config>();
//! assert!(std::sync::Arc::ptr_eq(&a, &b));
//! assert_eq!(a.workers, 4);
//! ```

pub mod cell;
pub mod error;
pub mod phase;
pub mod provider;
pub mod registry;
pub mod resolve_guard;
pub mod runtime;

mod macros;

pub use cell::*;
pub use error::*;
pub use phase::*;
pub use provider::*;
pub use registry::*;
pub use resolve_guard::*;
pub use runtime::*;
