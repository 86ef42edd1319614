// ============================================
// File: crates/gameshard-server/src/lib.rs
// ============================================
//! # Gameshard Server Library
//!
//! ## Creation Reason
//! The game server core: a dependency-ordered service graph, client
//! connection sessions with the key-announcement handshake, and the item
//! rules that have to hold under concurrent players.
//!
//! ## Main Functionality
//!
//! ### Modules
//! - [`config`]: Server configuration management
//! - [`runtime`]: Service registry and lifecycle manager
//! - [`server`]: Main server orchestration
//! - [`services`]: Game services
//!   - [`services::session`]: Connection sessions
//!   - [`services::network`]: TCP listener
//!   - [`services::item`]: Item pickup, drop, split and stack
//! - [`handlers`]: Packet dispatch and handlers
//! - [`model`]: Characters and items
//! - [`error`]: Server-specific error types
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Gameshard Server                         │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌─────────────┐     ┌──────────────┐     ┌─────────────────┐  │
//! │  │   Config    │────►│    Server    │────►│ ServiceManager  │  │
//! │  └─────────────┘     └──────────────┘     └────────┬────────┘  │
//! │                                                    │           │
//! │         ┌──────────────────┬──────────────┬────────┘           │
//! │         ▼                  ▼              ▼                    │
//! │  ┌─────────────┐    ┌────────────┐  ┌────────────┐            │
//! │  │   Network   │───►│  Handlers  │─►│ Item/World │            │
//! │  │  Sessions   │    │  Dispatch  │  │  Database  │            │
//! │  └─────────────┘    └────────────┘  └────────────┘            │
//! │                                                                 │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                     Transport Layer (TCP)                       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Data Flow
//! ```text
//! Client → TCP → Frame → Decrypt → Dispatch → Handler
//! Client ← TCP ← Frame ← Encrypt ← Writer   ← Session.write
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - There is no global service locator; pass the `ServiceManager`
//! - Configuration changes require restart (no hot-reload)
//!
//! ## Last Modified
//! v0.1.0 - Initial server library

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod model;
pub mod runtime;
pub mod server;
pub mod services;

// Re-export primary types
pub use config::ServerConfig;
pub use error::{ItemError, Result, ServerError, ServiceError};
pub use runtime::{NamedService, Service, ServiceId, ServiceManager, ServiceRegistry, ServiceState};
pub use server::{build_registry, Server};
