// ============================================
// File: crates/gameshard-server/src/error.rs
// ============================================
//! # Server Error Types
//!
//! ## Creation Reason
//! Error types for the server crate: configuration and connection
//! failures, service runtime failures and item rule violations.
//!
//! ## Error Categories
//! 1. **`ServerError`**: Configuration, sessions, wrapped lower-layer errors
//! 2. **`ServiceError`**: Service graph runtime (registry, start/stop/restart)
//! 3. **`ItemError`**: Item pickup, drop, split and stack rules
//!
//! ## ⚠️ Important Note for Next Developer
//! - Service hooks return `anyhow::Result`; the runtime boxes hook
//!   failures into `StartFailed` / `StopFailed` so callers still get the
//!   service name and the cause
//! - Item errors are expected gameplay outcomes, log them at debug
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

use gameshard_common::error::CommonError;
use gameshard_common::types::{ConnectionId, ObjectId};
use gameshard_core::error::CoreError;
use gameshard_transport::error::TransportError;

use crate::runtime::ServiceId;

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Boxed cause of a failed service hook.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// ============================================
// ServerError
// ============================================

/// Server error types.
#[derive(Error, Debug)]
pub enum ServerError {
    // ========================================
    // Configuration Errors
    // ========================================

    /// Configuration file could not be read or parsed.
    #[error("Failed to load configuration from '{path}': {reason}")]
    ConfigLoad {
        /// Path of the configuration source
        path: String,
        /// Why loading failed
        reason: String,
    },

    /// Configuration value out of range.
    #[error("Invalid configuration: {field} - {reason}")]
    ConfigInvalid {
        /// Offending field, dotted path
        field: String,
        /// What is wrong with it
        reason: String,
    },

    // ========================================
    // Connection Errors
    // ========================================

    /// Too many concurrent connections.
    #[error("Connection limit reached: max {limit} connections")]
    ConnectionLimitReached {
        /// Configured limit
        limit: usize,
    },

    /// Connection is not known to the session manager.
    #[error("Session not found: {0}")]
    SessionNotFound(ConnectionId),

    /// Packet requires a character attached to the session.
    #[error("Connection {connection} has no character attached")]
    NotAuthenticated {
        /// Connection that sent the packet
        connection: ConnectionId,
    },

    /// Packet arrived in a stage that does not accept it.
    #[error("Unexpected packet on {connection}: {reason}")]
    UnexpectedPacket {
        /// Connection that sent the packet
        connection: ConnectionId,
        /// Why it is unexpected
        reason: String,
    },

    /// Server failed to start.
    #[error("Server failed to start: {reason}")]
    StartupFailed {
        /// Why startup failed
        reason: String,
    },

    // ========================================
    // Wrapped Errors
    // ========================================

    /// Service runtime error.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Item rule violation.
    #[error(transparent)]
    Item(#[from] ItemError),

    /// Error from common crate.
    #[error(transparent)]
    Common(#[from] CommonError),

    /// Error from core crate.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Error from transport crate.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    // ========================================
    // Convenience Constructors
    // ========================================

    /// Creates a `ConfigLoad` error.
    pub fn config_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `ConfigInvalid` error.
    pub fn config_invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates an `UnexpectedPacket` error.
    pub fn unexpected_packet(connection: ConnectionId, reason: impl Into<String>) -> Self {
        Self::UnexpectedPacket {
            connection,
            reason: reason.into(),
        }
    }

    /// Creates a `StartupFailed` error.
    pub fn startup_failed(reason: impl Into<String>) -> Self {
        Self::StartupFailed {
            reason: reason.into(),
        }
    }

    // ========================================
    // Error Classification
    // ========================================

    /// Returns `true` for configuration errors.
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::ConfigLoad { .. } | Self::ConfigInvalid { .. })
    }

    /// Returns `true` if the connection that caused this error must be closed.
    #[must_use]
    pub fn closes_connection(&self) -> bool {
        match self {
            Self::Core(e) => e.is_protocol_error(),
            Self::Transport(e) => e.is_connection_lost(),
            Self::UnexpectedPacket { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if the process cannot continue.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConfigLoad { .. } | Self::ConfigInvalid { .. } | Self::StartupFailed { .. }
        )
    }
}

// ============================================
// ServiceError
// ============================================

/// Service graph runtime errors.
///
/// Every variant names the service it concerns.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// No factory is registered under this id.
    #[error("Service '{service}' is not registered")]
    NotRegistered {
        /// Requested service
        service: ServiceId,
    },

    /// The factory failed to build the instance.
    #[error("Failed to construct service '{service}': {reason}")]
    Construction {
        /// Service being built
        service: ServiceId,
        /// Why construction failed
        reason: String,
    },

    /// The dependency graph loops back on itself.
    #[error("Dependency cycle while resolving '{service}': {path}")]
    DependencyCycle {
        /// Service whose resolution closed the loop
        service: ServiceId,
        /// Cycle, rendered as `a -> b -> a`
        path: String,
    },

    /// The start hook failed. The service is left stopped.
    #[error("Service '{service}' failed to start: {source}")]
    StartFailed {
        /// Service that failed
        service: ServiceId,
        /// Hook failure
        source: BoxError,
    },

    /// The stop hook failed. The service is left started.
    #[error("Service '{service}' failed to stop: {source}")]
    StopFailed {
        /// Service that failed
        service: ServiceId,
        /// Hook failure
        source: BoxError,
    },

    /// Restart requested for a service that is not running.
    #[error("Service '{service}' is already stopped")]
    NotRunning {
        /// Requested service
        service: ServiceId,
    },
}

impl ServiceError {
    /// Creates a `Construction` error.
    pub fn construction(service: ServiceId, reason: impl Into<String>) -> Self {
        Self::Construction {
            service,
            reason: reason.into(),
        }
    }

    /// Creates a `DependencyCycle` error from the resolution path.
    #[must_use]
    pub fn cycle(service: ServiceId, path: &[ServiceId]) -> Self {
        let path = path
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" -> ");
        Self::DependencyCycle { service, path }
    }

    /// Returns the service this error is about.
    #[must_use]
    pub const fn service(&self) -> ServiceId {
        match self {
            Self::NotRegistered { service }
            | Self::Construction { service, .. }
            | Self::DependencyCycle { service, .. }
            | Self::StartFailed { service, .. }
            | Self::StopFailed { service, .. }
            | Self::NotRunning { service } => *service,
        }
    }

    /// Returns `true` if a lifecycle hook failed.
    #[must_use]
    pub const fn is_hook_failure(&self) -> bool {
        matches!(self, Self::StartFailed { .. } | Self::StopFailed { .. })
    }
}

// ============================================
// ItemError
// ============================================

/// Item rule violations.
#[derive(Error, Debug)]
pub enum ItemError {
    /// Pickup of an item that is not lying on the ground.
    #[error("Item {item} is not on the ground")]
    NotOnGround {
        /// Item involved
        item: ObjectId,
    },

    /// Drop of an item that is already on the ground.
    #[error("Item {item} is already on the ground")]
    AlreadyOnGround {
        /// Item involved
        item: ObjectId,
    },

    /// Split or drop of more items than the stack holds.
    #[error("Item {item} holds {available}, {requested} requested")]
    NotEnoughItems {
        /// Item involved
        item: ObjectId,
        /// Requested count
        requested: i64,
        /// Count in the stack
        available: i64,
    },

    /// Items cannot be merged.
    #[error("Items cannot be stacked: {reason}")]
    NonStackable {
        /// Why they cannot be merged
        reason: String,
    },

    /// Unspawn of an object that is not in the world.
    #[error("Object {object} is not spawned")]
    NotSpawned {
        /// Object involved
        object: ObjectId,
    },

    /// Spawn of an object that is already in the world.
    #[error("Object {object} is already spawned")]
    AlreadySpawned {
        /// Object involved
        object: ObjectId,
    },

    /// The item store failed.
    #[error("Item persistence failed: {0}")]
    Persistence(#[from] CommonError),
}

impl ItemError {
    /// Creates a `NonStackable` error.
    pub fn non_stackable(reason: impl Into<String>) -> Self {
        Self::NonStackable {
            reason: reason.into(),
        }
    }

    /// Returns `true` if the error is a rule violation rather than a failure.
    #[must_use]
    pub const fn is_rule_violation(&self) -> bool {
        !matches!(self, Self::Persistence(_))
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    const WORLD: ServiceId = ServiceId::new("world");
    const ITEM: ServiceId = ServiceId::new("item");

    #[test]
    fn test_error_display() {
        let err = ServerError::config_load("/etc/gameshard.toml", "file not found");
        assert!(err.to_string().contains("/etc/gameshard.toml"));

        let err = ServiceError::cycle(ITEM, &[ITEM, WORLD, ITEM]);
        assert_eq!(
            err.to_string(),
            "Dependency cycle while resolving 'item': item -> world -> item"
        );

        let err = ServiceError::StartFailed {
            service: WORLD,
            source: anyhow::anyhow!("map files missing").into(),
        };
        assert!(err.to_string().contains("world"));
        assert!(err.to_string().contains("map files missing"));
    }

    #[test]
    fn test_error_classification() {
        let config_err = ServerError::config_invalid("network.max_connections", "must be > 0");
        assert!(config_err.is_config_error());
        assert!(config_err.is_fatal());

        let malformed: ServerError = CoreError::MalformedFrame { declared: 1, minimum: 3 }.into();
        assert!(malformed.closes_connection());

        let item: ServerError = ItemError::NotOnGround { item: ObjectId::new(1) }.into();
        assert!(!item.closes_connection());
        assert!(ItemError::NotOnGround { item: ObjectId::new(1) }.is_rule_violation());

        let stop = ServiceError::StopFailed {
            service: ITEM,
            source: "boom".into(),
        };
        assert!(stop.is_hook_failure());
        assert_eq!(stop.service(), ITEM);
    }

    #[test]
    fn test_source_chain() {
        use std::error::Error as _;

        let err = ServiceError::StartFailed {
            service: WORLD,
            source: anyhow::anyhow!("disk full").into(),
        };
        assert_eq!(err.source().map(ToString::to_string).as_deref(), Some("disk full"));
    }
}
