// ============================================
// File: crates/gameshard-server/src/main.rs
// ============================================
//! # Gameshard Server Entry Point
//!
//! ## Creation Reason
//! Main entry point for the game server binary.
//! Handles CLI parsing, logging setup, and server initialization.
//!
//! ## Usage
//! ```bash
//! gameshard-server start --config /etc/gameshard/server.toml
//! gameshard-server validate --config /etc/gameshard/server.toml
//! gameshard-server default-config > server.toml
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - `RUST_LOG` overrides `logging.level`
//! - A missing config file is not an error, defaults are used
//!
//! ## Last Modified
//! v0.1.0 - Initial CLI implementation

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gameshard_server::{Server, ServerConfig};

// ============================================
// CLI Definition
// ============================================

/// Gameshard game server
#[derive(Parser, Debug)]
#[command(name = "gameshard-server")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the server
    Start {
        /// Path to configuration file
        #[arg(short, long, default_value = "/etc/gameshard/server.toml")]
        config: PathBuf,
    },

    /// Validate configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long, default_value = "/etc/gameshard/server.toml")]
        config: PathBuf,
    },

    /// Print the default configuration
    DefaultConfig,
}

// ============================================
// Main
// ============================================

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Start { config } => cmd_start(config).await,
        Commands::Validate { config } => {
            init_logging("info");
            cmd_validate(&config).await
        }
        Commands::DefaultConfig => {
            print!("{}", ServerConfig::default().to_toml());
            Ok(())
        }
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

// ============================================
// Commands
// ============================================

/// Starts the server.
async fn cmd_start(config_path: PathBuf) -> anyhow::Result<()> {
    // Logging is set up once; the config level is only known after loading
    let config = if config_path.exists() {
        let config = ServerConfig::load(&config_path).await;
        init_logging(config.as_ref().map_or("info", |c| c.logging.level.as_str()));
        config?
    } else {
        init_logging("info");
        info!("Config file not found, using defaults");
        ServerConfig::default()
    };

    info!("════════════════════════════════════════");
    info!("Listen:     {}", config.network.listen_addr);
    info!("Protocol:   {}", config.protocol.supported_version);
    info!("Keygen:     {}", config.keygen.mode);
    info!("════════════════════════════════════════");

    let server = Server::new(config);
    server.run().await?;

    Ok(())
}

/// Validates configuration file.
async fn cmd_validate(config_path: &Path) -> anyhow::Result<()> {
    if !config_path.exists() {
        println!("⚠️  Config file not found: {}", config_path.display());
        println!("   Server will use default values.");
        return Ok(());
    }

    let config = ServerConfig::load(config_path).await?;

    println!("✅ Configuration is valid");
    println!();
    println!("Network:");
    println!("   Listen:           {}", config.network.listen_addr);
    println!("   Max Connections:  {}", config.network.max_connections);
    println!("   Idle Timeout:     {}s", config.network.idle_timeout_secs);
    println!();
    println!("Protocol:");
    println!("   Version:          {}", config.protocol.supported_version);
    println!();
    println!("Keygen:");
    println!("   Mode:             {}", config.keygen.mode);
    println!();

    Ok(())
}

// ============================================
// Helper Functions
// ============================================

/// Initializes the tracing subscriber.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .try_init()
        .ok();
}
