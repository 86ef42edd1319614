// ============================================
// File: crates/gameshard-common/src/error.rs
// ============================================
//! # Common Error Types
//!
//! ## Creation Reason
//! Base error type shared by every gameshard crate. Crate-specific
//! errors wrap it with `#[from]` so `?` works across crate boundaries.
//!
//! ## Main Functionality
//! - `CommonError`: Base error enum
//! - `Result<T>`: Alias using `CommonError`
//!
//! ## ⚠️ Important Note for Next Developer
//! - Never put key material or raw packet bytes in error messages
//! - The persistence collaborator reports failures through this type
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use std::fmt;

use thiserror::Error;

// ============================================
// Result Type Alias
// ============================================

/// Common result type for operations that may fail.
pub type Result<T> = std::result::Result<T, CommonError>;

// ============================================
// CommonError
// ============================================

/// Common error types shared across gameshard crates.
///
/// # Example
/// ```
/// use gameshard_common::error::{CommonError, Result};
///
/// fn validate_count(count: u64) -> Result<()> {
///     if count == 0 {
///         return Err(CommonError::invalid_input("count", "must be positive"));
///     }
///     Ok(())
/// }
///
/// assert!(validate_count(0).is_err());
/// ```
#[derive(Error, Debug)]
pub enum CommonError {
    // ========================================
    // Validation Errors
    // ========================================

    /// Invalid input data provided.
    #[error("Invalid input for '{field}': {reason}")]
    InvalidInput {
        /// Name of the field or parameter
        field: String,
        /// Description of what's wrong
        reason: String,
    },

    /// Data length doesn't match expected size.
    #[error("Invalid length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected length in bytes
        expected: usize,
        /// Actual length received
        actual: usize,
    },

    // ========================================
    // Resource Errors
    // ========================================

    /// Requested resource was not found.
    #[error("Resource not found: {resource_type} with id '{id}'")]
    NotFound {
        /// Type of resource (e.g., "item", "character")
        resource_type: String,
        /// Identifier that wasn't found
        id: String,
    },

    /// Resource limit exceeded.
    #[error("Resource exhausted: {resource} (limit: {limit})")]
    ResourceExhausted {
        /// Name of the resource
        resource: String,
        /// The limit that was exceeded
        limit: String,
    },

    // ========================================
    // IO Errors
    // ========================================

    /// System I/O error occurred.
    #[error("I/O error: {context}")]
    Io {
        /// What operation was being performed
        context: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    // ========================================
    // Storage Errors
    // ========================================

    /// Persistent storage rejected or failed an operation.
    #[error("Storage error during {operation}: {reason}")]
    Storage {
        /// What was being stored or loaded
        operation: String,
        /// Why it failed
        reason: String,
    },

    // ========================================
    // Internal Errors
    // ========================================

    /// Internal error (bug or unexpected condition).
    #[error("Internal error: {message}")]
    Internal {
        /// Description of what went wrong
        message: String,
    },
}

impl CommonError {
    // ========================================
    // Convenience Constructors
    // ========================================

    /// Creates an `InvalidInput` error.
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates an `InvalidLength` error.
    #[must_use]
    pub const fn invalid_length(expected: usize, actual: usize) -> Self {
        Self::InvalidLength { expected, actual }
    }

    /// Creates a `NotFound` error.
    pub fn not_found(resource_type: impl Into<String>, id: impl fmt::Display) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            id: id.to_string(),
        }
    }

    /// Creates a `ResourceExhausted` error.
    pub fn resource_exhausted(resource: impl Into<String>, limit: impl fmt::Display) -> Self {
        Self::ResourceExhausted {
            resource: resource.into(),
            limit: limit.to_string(),
        }
    }

    /// Creates an `Io` error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Creates a `Storage` error.
    pub fn storage(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Storage {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Creates an `Internal` error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    // ========================================
    // Error Classification
    // ========================================

    /// Returns `true` if this error is transient and the operation may
    /// succeed when attempted again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Io { .. } | Self::Storage { .. } | Self::ResourceExhausted { .. }
        )
    }

    /// Returns `true` if this error was caused by bad caller input.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput { .. } | Self::InvalidLength { .. } | Self::NotFound { .. }
        )
    }
}

// ============================================
// Error Conversions
// ============================================

impl From<std::io::Error> for CommonError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            context: "unspecified I/O operation".into(),
            source: err,
        }
    }
}

// ============================================
// Tests
// ============================================
