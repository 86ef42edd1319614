// ============================================
// File: crates/gameshard-core/src/protocol/version.rs
// ============================================
//! # Protocol Versioning
//!
//! ## Creation Reason
//! The first frame a client sends declares its protocol revision. The
//! server accepts exactly one revision; everything else is answered with
//! a rejected key announcement and the connection is closed.
//!
//! ## Version History
//! | Version | Client release |
//! |---------|----------------|
//! | 216     | Freya (default supported revision) |
//!
//! ## Last Modified
//! v0.1.0 - Initial version definitions

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================
// Constants
// ============================================

/// Protocol revision spoken by the Freya client.
pub const FREYA_PROTOCOL_VERSION: u16 = 216;

/// Revision accepted when configuration does not say otherwise.
pub const DEFAULT_SUPPORTED_VERSION: ProtocolVersion = ProtocolVersion::new(FREYA_PROTOCOL_VERSION);

// ============================================
// ProtocolVersion
// ============================================

/// Client protocol revision, as carried by the version frame.
///
/// # Example
/// ```
/// use gameshard_core::protocol::{ProtocolVersion, DEFAULT_SUPPORTED_VERSION};
///
/// let declared = ProtocolVersion::new(216);
/// assert!(declared.is_compatible_with(&DEFAULT_SUPPORTED_VERSION));
/// assert!(!ProtocolVersion::new(152).is_compatible_with(&DEFAULT_SUPPORTED_VERSION));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProtocolVersion(u16);

impl ProtocolVersion {
    /// Creates a protocol version.
    #[must_use]
    pub const fn new(version: u16) -> Self {
        Self(version)
    }

    /// Returns the raw revision number.
    #[must_use]
    pub const fn as_u16(&self) -> u16 {
        self.0
    }

    /// Versions are compatible only when identical; there is no negotiation.
    #[must_use]
    pub const fn is_compatible_with(&self, supported: &Self) -> bool {
        self.0 == supported.0
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        DEFAULT_SUPPORTED_VERSION
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            FREYA_PROTOCOL_VERSION => write!(f, "{} (Freya)", self.0),
            other => write!(f, "{other}"),
        }
    }
}

impl From<u16> for ProtocolVersion {
    fn from(version: u16) -> Self {
        Self(version)
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compatibility_is_exact() {
        let supported = ProtocolVersion::new(216);
        assert!(ProtocolVersion::new(216).is_compatible_with(&supported));
        assert!(!ProtocolVersion::new(215).is_compatible_with(&supported));
        assert!(!ProtocolVersion::new(217).is_compatible_with(&supported));
    }

    #[test]
    fn test_display() {
        assert_eq!(ProtocolVersion::new(216).to_string(), "216 (Freya)");
        assert_eq!(ProtocolVersion::new(12).to_string(), "12");
    }
}
