// ============================================
// File: crates/gameshard-transport/src/mock.rs
// ============================================
//! # Mock Transport Implementation
//!
//! ## Creation Reason
//! Provides an in-memory transport so sessions, the handshake and packet
//! dispatch can be tested without sockets.
//!
//! ## Main Functionality
//! - Captures every written frame for verification
//! - Counts `close` calls
//! - Can fail writes or delay write acknowledgements
//!
//! ## Usage in Tests
//! ```
//! use bytes::Bytes;
//! use gameshard_transport::{MockTransport, Transport};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = MockTransport::new();
//! transport.write(Bytes::from_static(b"\x03\x00\x2e")).await?;
//!
//! let written = transport.wait_for_writes(1).await;
//! assert_eq!(&written[0][..], b"\x03\x00\x2e");
//! # Ok(())
//! # }
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - This is for testing only - do not use in production
//! - Unlike `TcpTransport`, `close` is counted on every call so tests can
//!   assert the session closes exactly once
//!
//! ## Last Modified
//! v0.1.0 - Initial mock implementation

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// Peer address reported when none is configured.
const DEFAULT_PEER: ([u8; 4], u16) = ([127, 0, 0, 1], 40_000);

// ============================================
// MockTransport
// ============================================

/// In-memory transport for testing.
pub struct MockTransport {
    /// Reported remote address
    peer_addr: SocketAddr,
    /// Frames written so far, in order
    written: Mutex<Vec<Bytes>>,
    /// Number of `close` calls
    close_calls: AtomicUsize,
    /// Cleared by the first `close`
    open: AtomicBool,
    /// When set, every write fails
    fail_writes: AtomicBool,
    /// Delay before a write is acknowledged
    write_delay: Mutex<Option<Duration>>,
    /// Woken on every write and close
    activity: Notify,
}

impl MockTransport {
    /// Creates a mock transport with a loopback peer address.
    #[must_use]
    pub fn new() -> Self {
        Self::with_peer(SocketAddr::from(DEFAULT_PEER))
    }

    /// Creates a mock transport reporting `peer_addr`.
    #[must_use]
    pub fn with_peer(peer_addr: SocketAddr) -> Self {
        Self {
            peer_addr,
            written: Mutex::new(Vec::new()),
            close_calls: AtomicUsize::new(0),
            open: AtomicBool::new(true),
            fail_writes: AtomicBool::new(false),
            write_delay: Mutex::new(None),
            activity: Notify::new(),
        }
    }

    /// Makes every following write fail with `WriteFailed`.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Release);
    }

    /// Holds back write acknowledgements for `delay`.
    ///
    /// Frames are recorded only after the delay, like bytes that have not
    /// reached the socket yet.
    pub fn set_write_delay(&self, delay: Option<Duration>) {
        *self.write_delay.lock() = delay;
    }

    /// Returns a snapshot of the frames written so far.
    #[must_use]
    pub fn written(&self) -> Vec<Bytes> {
        self.written.lock().clone()
    }

    /// Returns the number of frames written so far.
    #[must_use]
    pub fn written_count(&self) -> usize {
        self.written.lock().len()
    }

    /// Returns how many times `close` was called.
    #[must_use]
    pub fn close_count(&self) -> usize {
        self.close_calls.load(Ordering::Acquire)
    }

    /// Waits until at least `count` frames were written and returns them.
    pub async fn wait_for_writes(&self, count: usize) -> Vec<Bytes> {
        loop {
            let notified = self.activity.notified();
            {
                let written = self.written.lock();
                if written.len() >= count {
                    return written.clone();
                }
            }
            notified.await;
        }
    }

    /// Waits until `close` was called at least once.
    pub async fn wait_for_close(&self) {
        loop {
            let notified = self.activity.notified();
            if self.close_count() > 0 {
                return;
            }
            notified.await;
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn write(&self, frame: Bytes) -> Result<()> {
        if !self.is_open() {
            return Err(TransportError::Closed);
        }

        let delay = *self.write_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_writes.load(Ordering::Acquire) {
            return Err(TransportError::write_failed(self.peer_addr, "mock write failure"));
        }

        self.written.lock().push(frame);
        self.activity.notify_waiters();
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.close_calls.fetch_add(1, Ordering::AcqRel);
        self.open.store(false, Ordering::Release);
        self.activity.notify_waiters();
        Ok(())
    }

    fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("peer_addr", &self.peer_addr)
            .field("written", &self.written_count())
            .field("close_calls", &self.close_count())
            .finish_non_exhaustive()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_writes_in_order() {
        let transport = MockTransport::new();
        transport.write(Bytes::from_static(b"one")).await.unwrap();
        transport.write(Bytes::from_static(b"two")).await.unwrap();

        let written = transport.written();
        assert_eq!(written, vec![Bytes::from_static(b"one"), Bytes::from_static(b"two")]);
    }

    #[tokio::test]
    async fn test_write_after_close_fails() {
        let transport = MockTransport::new();
        transport.close().await.unwrap();
        transport.close().await.unwrap();

        assert_eq!(transport.close_count(), 2);
        assert!(matches!(
            transport.write(Bytes::from_static(b"late")).await,
            Err(TransportError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_failing_writes() {
        let transport = MockTransport::new();
        transport.fail_writes(true);
        let err = transport.write(Bytes::from_static(b"x")).await.unwrap_err();
        assert!(err.is_connection_lost());
        assert_eq!(transport.written_count(), 0);
    }

    #[tokio::test]
    async fn test_wait_for_writes() {
        let transport = std::sync::Arc::new(MockTransport::new());
        let writer = transport.clone();
        tokio::spawn(async move {
            writer.write(Bytes::from_static(b"late")).await.unwrap();
        });

        let written = tokio::time::timeout(Duration::from_secs(1), transport.wait_for_writes(1))
            .await
            .unwrap();
        assert_eq!(&written[0][..], b"late");
    }
}
