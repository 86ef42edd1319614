// ============================================
// File: crates/gameshard-server/src/runtime/registry.rs
// ============================================
//! # Service Registry
//!
//! ## Creation Reason
//! Maps service ids to factory functions. Nothing is built while
//! registering; the `ServiceManager` calls a factory the first time the
//! service is needed.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Factories run synchronously and may resolve other services through
//!   the manager they receive; keep them cheap (no I/O, that belongs in
//!   `start`)
//! - Registering the same id twice replaces the earlier factory
//!
//! ## Last Modified
//! v0.1.0 - Initial registry implementation

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::manager::ServiceManager;
use super::service::{NamedService, Service, ServiceId};
use crate::error::ServiceError;

// ============================================
// Instance
// ============================================

/// A built service, kept both as trait object and as `Any` for typed lookup.
#[derive(Clone)]
pub(crate) struct Instance {
    pub(crate) service: Arc<dyn Service>,
    pub(crate) any: Arc<dyn Any + Send + Sync>,
}

impl Instance {
    fn new<T: NamedService>(instance: Arc<T>) -> Self {
        Self {
            service: instance.clone(),
            any: instance,
        }
    }
}

pub(crate) type Factory =
    Box<dyn Fn(&ServiceManager) -> Result<Instance, ServiceError> + Send + Sync>;

// ============================================
// ServiceRegistry
// ============================================

/// Typed table of service factories.
///
/// # Example
/// ```ignore
/// let mut registry = ServiceRegistry::new();
/// registry
///     .register(|_| Ok(Arc::new(WorldService::new())))
///     .register(|manager| {
///         Ok(Arc::new(ItemService::new(
///             manager.resolve::<WorldService>()?,
///             manager.resolve::<DatabaseService>()?,
///         )))
///     });
/// let manager = ServiceManager::new(registry);
/// ```
#[derive(Default)]
pub struct ServiceRegistry {
    factories: HashMap<ServiceId, Factory>,
}

impl ServiceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the factory for `T` under `T::ID`.
    pub fn register<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: NamedService,
        F: Fn(&ServiceManager) -> Result<Arc<T>, ServiceError> + Send + Sync + 'static,
    {
        let factory: Factory = Box::new(move |manager| factory(manager).map(Instance::new));
        if self.factories.insert(T::ID, factory).is_some() {
            debug!(service = %T::ID, "Replaced service factory");
        }
        self
    }

    /// Registers an already built instance under `T::ID`.
    pub fn register_instance<T: NamedService>(&mut self, instance: Arc<T>) -> &mut Self {
        self.register(move |_| Ok(Arc::clone(&instance)))
    }

    /// Returns `true` if a factory exists for `id`.
    #[must_use]
    pub fn contains(&self, id: ServiceId) -> bool {
        self.factories.contains_key(&id)
    }

    /// Returns the number of registered services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    pub(crate) fn into_factories(self) -> HashMap<ServiceId, Factory> {
        self.factories
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.factories.keys().collect();
        ids.sort();
        f.debug_struct("ServiceRegistry")
            .field("services", &ids)
            .finish()
    }
}
