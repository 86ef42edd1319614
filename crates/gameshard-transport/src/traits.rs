// ============================================
// File: crates/gameshard-transport/src/traits.rs
// ============================================
//! # Transport Traits
//!
//! ## Creation Reason
//! The session layer writes frames and closes connections through this
//! trait, so the handshake and dispatch logic can be tested against an
//! in-memory transport.
//!
//! ## Main Functionality
//! - `Transport`: Outbound half of one client connection
//!
//! ## ⚠️ Important Note for Next Developer
//! - `write` resolving `Ok` IS the write acknowledgement; the session
//!   chains key activation and close on it
//! - Implementations must be Send + Sync for use in async contexts
//!
//! ## Last Modified
//! v0.1.0 - Initial trait definitions

use std::net::SocketAddr;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

// ============================================
// Transport Trait
// ============================================

/// Outbound side of a single client connection.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to allow sharing across
/// async tasks.
///
/// # Example
/// ```ignore
/// async fn send_all<T: Transport>(transport: &T, frames: Vec<Bytes>) -> Result<()> {
///     for frame in frames {
///         transport.write(frame).await?;
///     }
///     transport.close().await
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync {
    /// Writes one complete, already framed buffer.
    ///
    /// Resolves once the bytes are handed to the operating system.
    ///
    /// # Errors
    /// - `Closed`: the connection was closed before
    /// - `WriteFailed`: the peer is gone
    async fn write(&self, frame: Bytes) -> Result<()>;

    /// Closes the connection. Closing twice is a no-op.
    ///
    /// # Errors
    /// Returns error if shutting down the socket fails.
    async fn close(&self) -> Result<()>;

    /// Returns the remote address.
    fn peer_addr(&self) -> SocketAddr;

    /// Returns `true` until the connection is closed.
    fn is_open(&self) -> bool;
}
