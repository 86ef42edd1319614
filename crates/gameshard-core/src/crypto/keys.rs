// ============================================
// File: crates/gameshard-core/src/crypto/keys.rs
// ============================================
//! # Cryptographic Key Type
//!
//! ## Creation Reason
//! A dedicated type for the 128-bit connection key so it is zeroized on
//! drop and never shows up in logs.
//!
//! ## Key Lifecycle
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  CryptographyKey (per connection)                          │
//! │  ├─ Generated fresh when the client declares its version   │
//! │  ├─ Sent once, in the clear, inside the key announcement   │
//! │  ├─ Copied: one instance per direction                     │
//! │  └─ Mutated by the frame cipher after every frame          │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - `Debug` is redacted on purpose; keep it that way
//! - Use [`CryptographyKey::copy`] when a second direction needs the key
//!
//! ## Last Modified
//! v0.1.0 - Initial key type definitions

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use super::keygen::Keygen;
use super::{KEY_BITS, KEY_SIZE};
use crate::error::{CoreError, Result};

// ============================================
// CryptographyKey
// ============================================

/// Symmetric 128-bit connection key.
///
/// # Security
/// - Zeroed on drop
/// - Never logged
///
/// # Example
/// ```
/// use gameshard_core::crypto::{CryptographyKey, SeededKeygen};
///
/// let keygen = SeededKeygen::from_seed(7);
/// let key = CryptographyKey::generate(&keygen).unwrap();
/// let copy = key.copy();
/// assert_eq!(key, copy);
/// ```
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct CryptographyKey([u8; KEY_SIZE]);

impl CryptographyKey {
    /// Creates a key from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Creates a key from a slice that must be exactly [`KEY_SIZE`] bytes.
    ///
    /// # Errors
    /// Returns `InvalidKeyLength` for any other length.
    pub fn try_from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; KEY_SIZE] = bytes
            .try_into()
            .map_err(|_| CoreError::InvalidKeyLength { bits: bytes.len() * 8 })?;
        Ok(Self(array))
    }

    /// Generates a fresh key through the keygen collaborator.
    ///
    /// # Errors
    /// Propagates keygen failures.
    pub fn generate(keygen: &dyn Keygen) -> Result<Self> {
        let material = keygen.generate(KEY_BITS)?;
        Self::try_from_slice(&material)
    }

    /// Returns an independent copy of this key.
    ///
    /// The copy evolves separately once handed to a cipher.
    #[must_use]
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Returns the raw key bytes.
    ///
    /// # Security Warning
    /// Only the key announcement packet should ever serialize these.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    pub(crate) fn as_bytes_mut(&mut self) -> &mut [u8; KEY_SIZE] {
        &mut self.0
    }
}

impl fmt::Debug for CryptographyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print key material
        write!(f, "CryptographyKey([REDACTED])")
    }
}

impl PartialEq for CryptographyKey {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for CryptographyKey {}

// ============================================
// Tests
// ============================================
