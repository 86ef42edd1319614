// ============================================
// File: crates/gameshard-core/src/crypto/keygen.rs
// ============================================
//! # Key Generation
//!
//! ## Creation Reason
//! The handshake needs fresh key material for every connection. The
//! source is a collaborator behind a trait so production uses the OS RNG
//! while tests and local debugging can run reproducibly.
//!
//! ## Main Functionality
//! - `Keygen`: `generate(bits)` returning zeroizing key bytes
//! - `SecureKeygen`: `OsRng`-backed implementation
//! - `SeededKeygen`: `StdRng` seeded from a fixed value or from entropy
//!
//! ## ⚠️ Important Note for Next Developer
//! - `SeededKeygen` is predictable by construction; production configs
//!   should keep the secure mode
//!
//! ## Last Modified
//! v0.1.0 - Initial keygen implementations

use std::fmt;

use parking_lot::Mutex;
use rand::rngs::{OsRng, StdRng};
use rand::{RngCore, SeedableRng};
use zeroize::Zeroizing;

use crate::error::{CoreError, Result};

/// Largest key the keygen will produce, in bits.
pub const MAX_KEY_BITS: usize = 4096;

// ============================================
// Keygen Trait
// ============================================

/// Source of raw symmetric key material.
pub trait Keygen: Send + Sync {
    /// Generates `bits` bits of key material.
    ///
    /// # Errors
    /// - `InvalidKeyLength`: `bits` is zero, not byte aligned or above [`MAX_KEY_BITS`]
    /// - `KeyGeneration`: the underlying RNG failed
    fn generate(&self, bits: usize) -> Result<Zeroizing<Vec<u8>>>;
}

/// Converts a bit length into a byte count, rejecting unusable sizes.
fn byte_len(bits: usize) -> Result<usize> {
    if bits == 0 || bits % 8 != 0 || bits > MAX_KEY_BITS {
        return Err(CoreError::InvalidKeyLength { bits });
    }
    Ok(bits / 8)
}

// ============================================
// SecureKeygen
// ============================================

/// Keygen backed by the operating system RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct SecureKeygen;

impl SecureKeygen {
    /// Creates a new secure keygen.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Keygen for SecureKeygen {
    fn generate(&self, bits: usize) -> Result<Zeroizing<Vec<u8>>> {
        let mut key = Zeroizing::new(vec![0u8; byte_len(bits)?]);
        OsRng
            .try_fill_bytes(&mut key)
            .map_err(|e| CoreError::key_generation(format!("OS RNG failure: {e}")))?;
        Ok(key)
    }
}

// ============================================
// SeededKeygen
// ============================================

/// Keygen backed by a seeded pseudo-random generator.
pub struct SeededKeygen {
    rng: Mutex<StdRng>,
}

impl SeededKeygen {
    /// Creates a reproducible keygen from a fixed seed.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Creates a keygen seeded once from OS entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }
}

impl Keygen for SeededKeygen {
    fn generate(&self, bits: usize) -> Result<Zeroizing<Vec<u8>>> {
        let mut key = Zeroizing::new(vec![0u8; byte_len(bits)?]);
        self.rng.lock().fill_bytes(&mut key);
        Ok(key)
    }
}

impl fmt::Debug for SeededKeygen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeededKeygen").finish_non_exhaustive()
    }
}

// ============================================
// Tests
// ============================================
