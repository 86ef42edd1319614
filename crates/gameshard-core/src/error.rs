// ============================================
// File: crates/gameshard-core/src/error.rs
// ============================================
//! # Core Error Types
//!
//! ## Creation Reason
//! Errors raised by the wire protocol and frame cryptography layers.
//!
//! ## Error Categories
//! 1. **Crypto Errors**: Key generation and key material problems
//! 2. **Protocol Errors**: Framing violations, truncated or invalid packet bodies
//!
//! ## ⚠️ Important Note for Next Developer
//! - NEVER include key material in error messages
//! - Protocol errors are fatal to the connection that produced them,
//!   the network layer closes it when it sees one
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

use gameshard_common::error::CommonError;

// ============================================
// Result Type Alias
// ============================================

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

// ============================================
// CoreError
// ============================================

/// Core error types for protocol and cryptographic operations.
#[derive(Error, Debug)]
pub enum CoreError {
    // ========================================
    // Cryptographic Errors
    // ========================================

    /// Failed to generate key material.
    #[error("Key generation failed: {context}")]
    KeyGeneration {
        /// What was being generated
        context: String,
    },

    /// Requested or supplied key size is not usable.
    #[error("Invalid key length: {bits} bits")]
    InvalidKeyLength {
        /// Key length in bits
        bits: usize,
    },

    // ========================================
    // Protocol Errors
    // ========================================

    /// Frame header declares a length that cannot hold an opcode.
    #[error("Malformed frame: declared length {declared} is below the minimum of {minimum}")]
    MalformedFrame {
        /// Length found in the frame header
        declared: usize,
        /// Smallest acceptable frame length
        minimum: usize,
    },

    /// Payload does not fit into a single frame.
    #[error("Frame too large: max {max} bytes, got {actual}")]
    FrameTooLarge {
        /// Maximum frame size
        max: usize,
        /// Size that was requested
        actual: usize,
    },

    /// Packet body is shorter than its fixed layout.
    #[error("Message too short: expected at least {expected} bytes, got {actual}")]
    MessageTooShort {
        /// Minimum expected length
        expected: usize,
        /// Actual length received
        actual: usize,
    },

    /// A packet field holds a value outside its domain.
    #[error("Invalid value for '{field}': {reason}")]
    InvalidField {
        /// Name of the offending field
        field: String,
        /// What is wrong with it
        reason: String,
    },

    // ========================================
    // Wrapped Errors
    // ========================================

    /// Error from common crate.
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl CoreError {
    // ========================================
    // Convenience Constructors
    // ========================================

    /// Creates a `KeyGeneration` error.
    pub fn key_generation(context: impl Into<String>) -> Self {
        Self::KeyGeneration {
            context: context.into(),
        }
    }

    /// Creates a `MessageTooShort` error.
    #[must_use]
    pub const fn too_short(expected: usize, actual: usize) -> Self {
        Self::MessageTooShort { expected, actual }
    }

    /// Creates an `InvalidField` error.
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    // ========================================
    // Error Classification
    // ========================================

    /// Returns `true` if this is a cryptographic error.
    #[must_use]
    pub const fn is_crypto_error(&self) -> bool {
        matches!(
            self,
            Self::KeyGeneration { .. } | Self::InvalidKeyLength { .. }
        )
    }

    /// Returns `true` if the peer violated the wire protocol.
    #[must_use]
    pub const fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedFrame { .. }
                | Self::FrameTooLarge { .. }
                | Self::MessageTooShort { .. }
                | Self::InvalidField { .. }
        )
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
        let err = CoreError::too_short(2, 1);
        assert!(err.to_string().contains('2'));
        assert!(err.to_string().contains('1'));

        let err = CoreError::MalformedFrame { declared: 2, minimum: 3 };
        assert!(err.to_string().contains("declared length 2"));
    }

    #[test]
    fn test_error_classification() {
        assert!(CoreError::key_generation("rng").is_crypto_error());
        assert!(!CoreError::key_generation("rng").is_protocol_error());

        let malformed = CoreError::MalformedFrame { declared: 0, minimum: 3 };
        assert!(malformed.is_protocol_error());
        assert!(CoreError::invalid_field("action", "unknown").is_protocol_error());
    }

    #[test]
    fn test_common_error_conversion() {
        let common = CommonError::invalid_input("field", "bad value");
        let core: CoreError = common.into();
        assert!(matches!(core, CoreError::Common(_)));
    }
}
