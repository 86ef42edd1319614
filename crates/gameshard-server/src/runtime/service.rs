// ============================================
// File: crates/gameshard-server/src/runtime/service.rs
// ============================================
//! # Service Trait
//!
//! ## Creation Reason
//! Every subsystem of the server (keygen, database, world, items,
//! network) is a service with start/stop hooks and declared
//! dependencies. The runtime drives them through this trait.
//!
//! ## Main Functionality
//! - `ServiceId`: Static name a service is registered and logged under
//! - `Service`: Lifecycle hooks and dependency declaration
//! - `NamedService`: Ties a concrete type to its id for typed lookup
//! - `ServiceState`: Lifecycle state tracked by the runtime
//!
//! ## ⚠️ Important Note for Next Developer
//! - Hooks are only ever called by the `ServiceManager`, and never
//!   concurrently for the same service
//! - Do not track started/stopped inside the service; the manager owns it
//!
//! ## Last Modified
//! v0.1.0 - Initial service abstraction

use std::fmt;

use async_trait::async_trait;

// ============================================
// ServiceId
// ============================================

/// Name of a service in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServiceId(&'static str);

impl ServiceId {
    /// Creates a service id.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// Returns the service name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

// ============================================
// Service
// ============================================

/// A startable and stoppable subsystem.
///
/// # Example
/// ```ignore
/// struct Cache;
///
/// #[async_trait]
/// impl Service for Cache {
///     fn dependencies(&self) -> &[ServiceId] {
///         &[DatabaseService::ID]
///     }
///
///     async fn start(&self) -> anyhow::Result<()> { Ok(()) }
///     async fn stop(&self) -> anyhow::Result<()> { Ok(()) }
/// }
/// ```
#[async_trait]
pub trait Service: Send + Sync + 'static {
    /// Services that must be started before this one.
    fn dependencies(&self) -> &[ServiceId] {
        &[]
    }

    /// Brings the service up.
    ///
    /// # Errors
    /// Any error leaves the service stopped.
    async fn start(&self) -> anyhow::Result<()>;

    /// Shuts the service down.
    ///
    /// # Errors
    /// Any error leaves the service started.
    async fn stop(&self) -> anyhow::Result<()>;
}

/// A service type with a fixed registry id.
pub trait NamedService: Service {
    /// Id this type is registered under.
    const ID: ServiceId;
}

// ============================================
// ServiceState
// ============================================

/// Lifecycle state of a service instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServiceState {
    /// Not running. Initial state.
    #[default]
    Stopped,
    /// Start hook in progress.
    Starting,
    /// Running.
    Started,
    /// Stop hook in progress.
    Stopping,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "Stopped"),
            Self::Starting => write!(f, "Starting"),
            Self::Started => write!(f, "Started"),
            Self::Stopping => write!(f, "Stopping"),
        }
    }
}
