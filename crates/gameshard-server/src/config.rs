// ============================================
// File: crates/gameshard-server/src/config.rs
// ============================================
//! # Server Configuration
//!
//! ## Creation Reason
//! Provides configuration management for the game server, loaded from
//! a TOML file.
//!
//! ## Main Functionality
//! - `ServerConfig`: Main configuration structure
//! - TOML file loading and parsing
//! - Configuration validation
//! - Default values for every field
//!
//! ## Configuration Sections
//! - `network`: TCP listen address, connection limits, idle reaping
//! - `protocol`: Accepted client protocol version
//! - `keygen`: Connection key generator
//! - `logging`: Log level
//!
//! ## Example Configuration
//! ```toml
//! [network]
//! listen_addr = "0.0.0.0:7777"
//! max_connections = 1000
//! idle_timeout_secs = 300
//! reap_interval_secs = 30
//!
//! [protocol]
//! supported_version = 216
//!
//! [keygen]
//! mode = "secure"
//!
//! [logging]
//! level = "info"
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - All config changes require server restart
//! - Port 0 is allowed and binds an ephemeral port (tests rely on it)
//!
//! ## Last Modified
//! v0.1.0 - Initial configuration implementation

use std::fmt;
use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use gameshard_core::protocol::{ProtocolVersion, DEFAULT_SUPPORTED_VERSION};

use crate::error::{Result, ServerError};

/// Accepted values for `logging.level`.
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

// ============================================
// ServerConfig
// ============================================

/// Main server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Network configuration.
    #[serde(default)]
    pub network: NetworkConfig,

    /// Protocol configuration.
    #[serde(default)]
    pub protocol: ProtocolConfig,

    /// Key generator configuration.
    #[serde(default)]
    pub keygen: KeygenConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ServerConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    /// Returns error if file cannot be read, parsed or validated.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        info!("Loading configuration from: {}", path_str);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ServerError::config_load(&path_str, e.to_string()))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ServerError::config_load(&path_str, e.to_string()))?;

        config.validate()?;

        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Loads configuration from a string (useful for testing).
    ///
    /// # Errors
    /// Returns error if the content cannot be parsed or validated.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ServerError::config_load("<string>", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns `ConfigInvalid` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        self.network.validate()?;
        self.protocol.validate()?;
        self.keygen.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Serializes configuration to TOML string.
    #[must_use]
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

// ============================================
// NetworkConfig
// ============================================

/// Network configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// TCP listen address.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Maximum concurrent client connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Seconds of silence after which a connection is closed.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Seconds between idle connection sweeps.
    #[serde(default = "default_reap_interval")]
    pub reap_interval_secs: u64,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 7777))
}

fn default_max_connections() -> usize {
    1000
}

fn default_idle_timeout() -> u64 {
    300
}

fn default_reap_interval() -> u64 {
    30
}

impl NetworkConfig {
    fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(ServerError::config_invalid(
                "network.max_connections",
                "must be greater than 0",
            ));
        }

        if self.idle_timeout_secs == 0 {
            return Err(ServerError::config_invalid(
                "network.idle_timeout_secs",
                "must be greater than 0",
            ));
        }

        if self.reap_interval_secs == 0 {
            return Err(ServerError::config_invalid(
                "network.reap_interval_secs",
                "must be greater than 0",
            ));
        }

        Ok(())
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            max_connections: default_max_connections(),
            idle_timeout_secs: default_idle_timeout(),
            reap_interval_secs: default_reap_interval(),
        }
    }
}

// ============================================
// ProtocolConfig
// ============================================

/// Protocol configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// The only client protocol version accepted.
    #[serde(default = "default_supported_version")]
    pub supported_version: ProtocolVersion,
}

fn default_supported_version() -> ProtocolVersion {
    DEFAULT_SUPPORTED_VERSION
}

impl ProtocolConfig {
    fn validate(&self) -> Result<()> {
        if self.supported_version.as_u16() == 0 {
            return Err(ServerError::config_invalid(
                "protocol.supported_version",
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            supported_version: default_supported_version(),
        }
    }
}

// ============================================
// KeygenConfig
// ============================================

/// Key generator selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeygenMode {
    /// Operating system RNG.
    #[default]
    Secure,
    /// Seeded pseudo-random generator.
    Pseudo,
}

impl fmt::Display for KeygenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Secure => write!(f, "secure"),
            Self::Pseudo => write!(f, "pseudo"),
        }
    }
}

/// Key generator configuration section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeygenConfig {
    /// Generator to use.
    #[serde(default)]
    pub mode: KeygenMode,

    /// Fixed seed for `pseudo` mode; drawn from OS entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl KeygenConfig {
    fn validate(&self) -> Result<()> {
        if self.mode == KeygenMode::Secure && self.seed.is_some() {
            return Err(ServerError::config_invalid(
                "keygen.seed",
                "only allowed with mode = \"pseudo\"",
            ));
        }
        Ok(())
    }
}

// ============================================
// LoggingConfig
// ============================================

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl LoggingConfig {
    fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.level.to_ascii_lowercase().as_str()) {
            return Err(ServerError::config_invalid(
                "logging.level",
                format!("must be one of {}", LOG_LEVELS.join(", ")),
            ));
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ============================================
// Tests
// ============================================
