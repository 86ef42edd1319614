// ============================================
// File: crates/gameshard-server/src/services/keygen.rs
// ============================================
//! # Keygen Service
//!
//! ## Creation Reason
//! Puts the configured key generator into the service graph so the
//! network layer can depend on it like any other service.
//!
//! ## ⚠️ Important Note for Next Developer
//! - `pseudo` mode is reproducible when a seed is configured; never use
//!   it on a public server
//!
//! ## Last Modified
//! v0.1.0 - Initial keygen service

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};
use zeroize::Zeroizing;

use gameshard_core::crypto::keygen::{Keygen, SecureKeygen, SeededKeygen};
use gameshard_core::crypto::KEY_BITS;
use gameshard_core::CryptographyKey;

use crate::config::{KeygenConfig, KeygenMode};
use crate::runtime::{NamedService, Service, ServiceId};

/// Service owning the key generator.
pub struct KeygenService {
    keygen: Arc<dyn Keygen>,
    mode: KeygenMode,
}

impl KeygenService {
    /// Wraps an existing generator.
    pub fn new(keygen: Arc<dyn Keygen>, mode: KeygenMode) -> Self {
        Self { keygen, mode }
    }

    /// Builds the generator selected by `config`.
    #[must_use]
    pub fn from_config(config: &KeygenConfig) -> Self {
        let keygen: Arc<dyn Keygen> = match (config.mode, config.seed) {
            (KeygenMode::Secure, _) => Arc::new(SecureKeygen::new()),
            (KeygenMode::Pseudo, Some(seed)) => Arc::new(SeededKeygen::from_seed(seed)),
            (KeygenMode::Pseudo, None) => Arc::new(SeededKeygen::from_entropy()),
        };
        Self::new(keygen, config.mode)
    }

    /// Returns the configured mode.
    #[must_use]
    pub const fn mode(&self) -> KeygenMode {
        self.mode
    }

    /// Generates raw key material.
    ///
    /// # Errors
    /// See [`Keygen::generate`].
    pub fn generate(&self, bits: usize) -> gameshard_core::Result<Zeroizing<Vec<u8>>> {
        self.keygen.generate(bits)
    }

    /// Generates a fresh 128-bit connection key.
    ///
    /// # Errors
    /// Returns `KeyGeneration` if the generator fails.
    pub fn connection_key(&self) -> gameshard_core::Result<CryptographyKey> {
        CryptographyKey::generate(self.keygen.as_ref())
    }
}

#[async_trait]
impl Service for KeygenService {
    async fn start(&self) -> anyhow::Result<()> {
        // Fails early on a broken RNG instead of on the first connection
        self.keygen.generate(KEY_BITS)?;
        if self.mode == KeygenMode::Pseudo {
            warn!("Pseudo-random keygen active, connection keys are predictable");
        }
        info!(mode = %self.mode, "Keygen ready");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

impl NamedService for KeygenService {
    const ID: ServiceId = ServiceId::new("keygen");
}

impl fmt::Debug for KeygenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeygenService")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_mode_is_reproducible() {
        let config = KeygenConfig {
            mode: KeygenMode::Pseudo,
            seed: Some(42),
        };
        let a = KeygenService::from_config(&config).connection_key().unwrap();
        let b = KeygenService::from_config(&config).connection_key().unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[tokio::test]
    async fn test_secure_mode_starts() {
        let service = KeygenService::from_config(&KeygenConfig::default());
        assert_eq!(service.mode(), KeygenMode::Secure);
        service.start().await.unwrap();
        assert!(service.generate(12).is_err());
    }
}
