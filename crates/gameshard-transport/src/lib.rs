// ============================================
// File: crates/gameshard-transport/src/lib.rs
// ============================================
//! # Gameshard Transport - Network I/O Layer
//!
//! ## Creation Reason
//! Provides the connection abstraction the session layer writes to,
//! with a TCP implementation for production and an in-memory one for
//! tests.
//!
//! ## Main Functionality
//!
//! ### Modules
//! - [`traits`]: `Transport` trait definition
//! - [`tcp`]: TCP listener binding and per-connection transport
//! - `mock`: In-memory transport (`mock` feature)
//! - [`error`]: Transport-specific error types
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              gameshard-server                       │
//! │                    │                                │
//! │         ┌──────────┴──────────┐                     │
//! │         ▼                     ▼                     │
//! │   gameshard-core       gameshard-transport          │
//! │                        You are here ◄──             │
//! │         │                     │                     │
//! │         └──────────┬──────────┘                     │
//! │                    ▼                                │
//! │            gameshard-common                         │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Always go through the `Transport` trait for testability
//! - Mock implementation available with `mock` feature
//!
//! ## Last Modified
//! v0.1.0 - Initial transport layer implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod tcp;
pub mod traits;

// Re-export primary types
pub use error::{Result, TransportError};
#[cfg(any(test, feature = "mock"))]
pub use mock::MockTransport;
pub use tcp::{bind_listener, TcpTransport};
pub use traits::Transport;
