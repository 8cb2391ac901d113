//! Thread-local chain guard for circular factory dependencies.
//!
//! This module provides [`ResolveGuard`], which tracks the chain of singleton
//! factories currently executing on this thread. A factory that (transitively)
//! resolves its own type would otherwise end up waiting on the very cell it is
//! initializing and wedge forever; the guard turns that into an immediate
//! [`ErrorKind::CircularDependency`](crate::ErrorKind) with the full chain.
//!
//! The stack is thread-local, so a cycle split across threads (A's factory on
//! one thread blocking on B while B's factory blocks on A elsewhere) is not
//! detectable here; keep factory dependency graphs acyclic.
//!
//! # Example
//! ```
//! use solo::{ErrorKind, ResolveGuard};
//!
//! // Push a type name onto the stack
//! let _g1 = ResolveGuard::push("A").unwrap();
//! // Pushing a different type is fine
//! let _g2 = ResolveGuard::push("B").unwrap();
//! // Pushing the same type again reports a circular dependency
//! let err = ResolveGuard::push("A").unwrap_err();
//! assert!(matches!(err.kind, ErrorKind::CircularDependency));
//! ```

use std::cell::RefCell;

use crate::Error;

thread_local! {
    // Every name pushed here comes from std::any::type_name, so the stack
    // borrows the 'static strings instead of owning copies.
    static RESOLVE_STACK: RefCell<Vec<&'static str>> = const { RefCell::new(Vec::new()) };
}

/// Guard that pops the last pushed type name from the thread-local stack on drop.
///
/// Held by the registry for the duration of each resolution.
#[derive(Debug)]
pub struct ResolveGuard(());

impl ResolveGuard {
    /// Try to push a type name onto the thread-local stack.
    ///
    /// Returns `Err(Error::circular_dependency(..))` if the type is already on
    /// the stack. Otherwise, returns a guard that will pop the type on drop.
    pub fn push(type_name: &'static str) -> Result<Self, Error> {
        RESOLVE_STACK.with(|stack| {
            let mut chain = stack.borrow_mut();
            if chain.contains(&type_name) {
                // The reported chain is the stack plus the type that closed
                // the cycle.
                let mut cycle = chain.clone();
                cycle.push(type_name);
                return Err(Error::circular_dependency(&cycle));
            }
            chain.push(type_name);
            Ok(ResolveGuard(()))
        })
    }
}

impl Drop for ResolveGuard {
    fn drop(&mut self) {
        RESOLVE_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}
