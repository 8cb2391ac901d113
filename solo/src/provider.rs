//! Singleton provider definitions for the registry.
//!
//! This module defines the [`Provider`] struct, which wraps a factory function
//! behind a type-erased, fallible signature the registry can store uniformly.
//!
//! # Overview
//!
//! A provider knows how to build one shared instance of one type. The factory
//! receives the [`Registry`] so a singleton can resolve the singletons it
//! depends on. Every provider is a singleton provider: the registry pairs it
//! with an [`InstanceCell`](crate::cell::InstanceCell) that runs the factory
//! at most once per successful lifetime.
//!
//! # Examples
//!
//! ```
//! use solo::provider::Provider;
//!
//! // Infallible factory
//! let provider = Provider::value(|_registry| 42u32);
//!
//! // Fallible factory
//! let provider = Provider::new(|_registry| {
//!     "config contents".parse::<String>()
//! });
//! ```

use std::any::Any;
use std::convert::Infallible;
use std::fmt;

use crate::error::Error;
use crate::registry::Registry;
use crate::runtime::Shared;

#[cfg(feature = "tracing")]
use tracing::{debug, info};

/// Type-erased payload shared between the providers and the registry's cells.
pub type Erased = dyn Any + Send + Sync;

/// A factory function wrapper producing one type-erased shared instance.
///
/// The concrete type is captured at construction time; failures of the inner
/// factory are wrapped as [`ErrorKind::Construction`](crate::error::ErrorKind)
/// with the type's name in the message.
pub struct Provider {
    type_name: &'static str,
    pub(crate) factory:
        Box<dyn Fn(&Registry) -> Result<Shared<Erased>, Error> + Send + Sync + 'static>,
}

impl Provider {
    /// Creates a provider from a fallible factory.
    ///
    /// The factory runs at most once per successful lifetime of the owning
    /// cell; its error is converted with
    /// [`Error::construction_failed`](crate::error::Error::construction_failed).
    pub fn new<T, E, F>(factory: F) -> Self
    where
        T: Any + Send + Sync + 'static,
        E: fmt::Display,
        F: Fn(&Registry) -> Result<T, E> + Send + Sync + 'static,
    {
        let type_name = std::any::type_name::<T>();

        #[cfg(feature = "tracing")]
        info!("creating singleton provider for {}", type_name);

        Self {
            type_name,
            factory: Box::new(move |registry| {
                #[cfg(feature = "tracing")]
                debug!("executing factory for {}", type_name);

                match factory(registry) {
                    Ok(value) => Ok(Shared::new(value) as Shared<Erased>),
                    Err(reason) => Err(Error::construction_failed(type_name, reason)),
                }
            }),
        }
    }

    /// Creates a provider from an infallible factory.
    pub fn value<T, F>(factory: F) -> Self
    where
        T: Any + Send + Sync + 'static,
        F: Fn(&Registry) -> T + Send + Sync + 'static,
    {
        Self::new(move |registry| Ok::<T, Infallible>(factory(registry)))
    }

    /// Name of the concrete type this provider builds.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn factory_produces_the_value() {
        let provider = Provider::value(|_| 100u32);
        let registry = Registry::new();

        let value = (provider.factory)(&registry).unwrap();
        let value = value.downcast_ref::<u32>().unwrap();
        assert_eq!(*value, 100);
    }

    #[test]
    fn fallible_factory_error_becomes_construction() {
        let provider = Provider::new(|_| Err::<u32, _>("backend offline"));
        let registry = Registry::new();

        let err = (provider.factory)(&registry).unwrap_err();
        assert!(err.kind == ErrorKind::Construction);
        assert!(err.message.contains("backend offline"));
        assert!(err.message.contains("u32"));
    }

    #[test]
    fn provider_records_the_type_name() {
        struct Service;
        let provider = Provider::value(|_| Service);
        assert!(provider.type_name().contains("Service"));
    }

    #[test]
    fn factory_builds_complex_types() {
        struct Service {
            id: usize,
            name: String,
        }

        let provider = Provider::value(|_| Service {
            id: 123,
            name: "test".to_string(),
        });

        let registry = Registry::new();
        let value = (provider.factory)(&registry).unwrap();
        let service = value.downcast_ref::<Service>().unwrap();

        assert_eq!(service.id, 123);
        assert_eq!(service.name, "test");
    }
}
