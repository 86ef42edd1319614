// ============================================
// File: crates/gameshard-transport/src/error.rs
// ============================================
//! # Transport Error Types
//!
//! ## Creation Reason
//! Defines error types for connection-level I/O: binding the listener,
//! accepting clients, writing frames and closing connections.
//!
//! ## Error Categories
//! 1. **Listener Errors**: Bind and accept failures
//! 2. **Connection Errors**: Write failures, writes after close
//! 3. **System Errors**: Raw I/O with context
//!
//! ## ⚠️ Important Note for Next Developer
//! - A write error means the connection is gone; callers close the
//!   session instead of retrying
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

use gameshard_common::error::CommonError;

// ============================================
// Result Type Alias
// ============================================

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

// ============================================
// TransportError
// ============================================

/// Transport layer error types.
#[derive(Error, Debug)]
pub enum TransportError {
    // ========================================
    // Listener Errors
    // ========================================

    /// Failed to bind to address.
    #[error("Failed to bind to {addr}: {reason}")]
    BindFailed {
        /// Address we tried to bind to
        addr: SocketAddr,
        /// Why binding failed
        reason: String,
    },

    /// Address already in use.
    #[error("Address {addr} already in use")]
    AddressInUse {
        /// The address that's in use
        addr: SocketAddr,
    },

    /// Accepting a client connection failed.
    #[error("Failed to accept connection: {reason}")]
    AcceptFailed {
        /// Why accept failed
        reason: String,
    },

    // ========================================
    // Connection Errors
    // ========================================

    /// Writing a frame to the peer failed.
    #[error("Failed to write to {peer}: {reason}")]
    WriteFailed {
        /// Peer address
        peer: SocketAddr,
        /// Why the write failed
        reason: String,
    },

    /// The connection was already closed.
    #[error("Connection closed")]
    Closed,

    // ========================================
    // Wrapped Errors
    // ========================================

    /// I/O error from the system.
    #[error("I/O error: {context}")]
    Io {
        /// What was happening when the error occurred
        context: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Error from common crate.
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl TransportError {
    // ========================================
    // Convenience Constructors
    // ========================================

    /// Creates a `BindFailed` error.
    pub fn bind_failed(addr: SocketAddr, reason: impl Into<String>) -> Self {
        Self::BindFailed {
            addr,
            reason: reason.into(),
        }
    }

    /// Creates a `WriteFailed` error.
    pub fn write_failed(peer: SocketAddr, reason: impl Into<String>) -> Self {
        Self::WriteFailed {
            peer,
            reason: reason.into(),
        }
    }

    /// Creates an `Io` error with context.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    // ========================================
    // Error Classification
    // ========================================

    /// Returns `true` if this error is transient and retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::AcceptFailed { .. } => true,
            Self::Io { source, .. } => matches!(
                source.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted | io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }

    /// Returns `true` if the connection this error came from is unusable.
    #[must_use]
    pub const fn is_connection_lost(&self) -> bool {
        matches!(self, Self::WriteFailed { .. } | Self::Closed)
    }
}

// ============================================
// Error Conversions
// ============================================

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        Self::Io {
            context: "unspecified I/O operation".into(),
            source: err,
        }
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TransportError::bind_failed("127.0.0.1:7777".parse().unwrap(), "denied");
        assert!(err.to_string().contains("127.0.0.1:7777"));
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_error_classification() {
        let err = TransportError::write_failed("127.0.0.1:7777".parse().unwrap(), "reset");
        assert!(err.is_connection_lost());
        assert!(!err.is_retryable());

        assert!(TransportError::Closed.is_connection_lost());
        assert!(TransportError::AcceptFailed { reason: "EMFILE".into() }.is_retryable());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::Interrupted, "interrupted");
        let err: TransportError = io_err.into();
        assert!(err.is_retryable());
    }
}
