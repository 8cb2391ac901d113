//! Error types for the SoLo lazy singleton registry.
//!
//! This module defines a lightweight error model used across the crate to
//! describe failures that can occur during provider registration, lazy
//! construction, and instance resolution.
//!
//! # Design
//!
//! - `ErrorKind` captures the error category.
//! - `Error` stores the category and a human-readable message.
//!
//! The helpers in `Error` are provided to keep call sites concise and to
//! maintain consistent error messages.
//!
//! # Feature Flags
//!
//! - `tracing`: logs errors when they are created.
//! - `debug`: enables extra diagnostic formatting in `Display`.
//!
//! # Examples
//!
//! ```
//! use solo::error::Error;
//!
//! let err = Error::service_not_provided("MyService");
//! assert!(err.message.contains("MyService"));
//! ```

use core::fmt;

#[cfg(feature = "tracing")]
use tracing::error;

/// Error categories for the registry and its cells.
///
/// These variants are intentionally coarse-grained to keep error handling
/// straightforward while still expressive enough for diagnostics.
#[derive(Clone, PartialEq)]
#[cfg_attr(feature = "debug", derive(Debug))]
pub enum ErrorKind {
    /// The constructor of the requested instance failed (or panicked).
    /// The owning cell has reverted to `Uninitialized`; a later call may retry.
    Construction,
    /// Waiting on an in-flight initialization exceeded the caller's bound.
    /// The cell's state is unaffected.
    InitializationTimeout,
    /// No provider registered for the requested type.
    ServiceNotProvided,
    /// A provider is already registered for this type.
    ProviderAlreadyRegistered,
    /// Type mismatch during downcast of a resolved instance.
    TypeMismatch,
    /// Circular dependency detected between singleton factories.
    CircularDependency,
}

/// Registry error structure.
///
/// `kind` enables programmatic handling, while `message` is human-readable.
#[derive(Clone)]
#[cfg_attr(feature = "debug", derive(Debug))]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
}

impl Error {
    /// Creates a new error with the given kind and message.
    ///
    /// If the `tracing` feature is enabled, the error is automatically logged.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let error = Self {
            kind: kind.clone(),
            message: message.into(),
        };

        #[cfg(feature = "tracing")]
        error!("{}", error);

        error
    }

    /// The constructor of the requested instance returned an error.
    pub fn construction_failed(type_name: &str, reason: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::Construction,
            format!("Construction of {} failed: {}", type_name, reason),
        )
    }

    /// The constructor of the requested instance panicked.
    ///
    /// The panic itself keeps unwinding through the initiating caller; this
    /// error is what threads waiting on that attempt receive.
    pub fn construction_panicked(type_name: &str) -> Self {
        Self::new(
            ErrorKind::Construction,
            format!("Construction of {} panicked", type_name),
        )
    }

    /// Waiting on an in-flight initialization exceeded the caller's bound.
    pub fn initialization_timeout(type_name: &str) -> Self {
        Self::new(
            ErrorKind::InitializationTimeout,
            format!("Timed out waiting for initialization of {}", type_name),
        )
    }

    /// No provider registered for the requested type.
    pub fn service_not_provided(type_name: &str) -> Self {
        Self::new(
            ErrorKind::ServiceNotProvided,
            format!("No provider registered for type: {}", type_name),
        )
    }

    /// A provider is already registered for this type.
    pub fn provider_already_registered(type_name: &str) -> Self {
        Self::new(
            ErrorKind::ProviderAlreadyRegistered,
            format!("Provider already registered for type: {}", type_name),
        )
    }

    /// Type mismatch during downcast of a resolved instance.
    pub fn type_mismatch(type_name: &str) -> Self {
        Self::new(
            ErrorKind::TypeMismatch,
            format!("Type mismatch when resolving: {}", type_name),
        )
    }

    /// Circular dependency detected between singleton factories.
    pub fn circular_dependency(dependency_chain: &[&str]) -> Self {
        Self::new(
            ErrorKind::CircularDependency,
            format!(
                "Circular dependency detected: {}",
                dependency_chain.join(" -> ")
            ),
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        #[cfg(feature = "debug")]
        {
            write!(f, "({:?}) - {}", self.kind, self.message)
        }
        #[cfg(not(feature = "debug"))]
        {
            write!(f, "{}", self.message)
        }
    }
}

#[cfg(feature = "debug")]
impl std::error::Error for Error {}
