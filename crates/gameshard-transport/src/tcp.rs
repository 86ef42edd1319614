// ============================================
// File: crates/gameshard-transport/src/tcp.rs
// ============================================
//! # TCP Transport Implementation
//!
//! ## Creation Reason
//! Game clients connect over TCP. This module binds the listening
//! socket and wraps the write half of each accepted stream in the
//! `Transport` trait.
//!
//! ## Main Functionality
//! - `bind_listener`: Listener binding with address reuse
//! - `TcpTransport`: Write half of one client connection
//!
//! ## Design Choices
//! - Uses SO_REUSEADDR for quick rebinding after restart
//! - TCP_NODELAY on every accepted stream; frames are small
//! - The read half is returned to the caller, who owns the read loop
//!
//! ## ⚠️ Important Note for Next Developer
//! - Only the session's writer task should call `write`, otherwise frame
//!   order and cipher state drift apart
//!
//! ## Last Modified
//! v0.1.0 - Initial TCP transport implementation

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tracing::{debug, info, trace};

use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// Pending connection backlog passed to `listen`.
const LISTEN_BACKLOG: i32 = 1024;

// ============================================
// Listener
// ============================================

/// Binds a TCP listener on `addr`.
///
/// # Socket Options
/// - `SO_REUSEADDR`: Enabled for quick rebinding
/// - Non-blocking: Required for async operations
///
/// # Errors
/// - `AddressInUse`: another process owns the address
/// - `BindFailed`: any other bind failure
pub fn bind_listener(addr: SocketAddr) -> Result<TcpListener> {
    info!("Binding TCP listener to {}", addr);

    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))
        .map_err(|e| TransportError::io("creating TCP socket", e))?;

    socket
        .set_reuse_address(true)
        .map_err(|e| TransportError::io("setting SO_REUSEADDR", e))?;

    socket
        .set_nonblocking(true)
        .map_err(|e| TransportError::io("setting non-blocking", e))?;

    socket.bind(&addr.into()).map_err(|e| {
        if e.kind() == std::io::ErrorKind::AddrInUse {
            TransportError::AddressInUse { addr }
        } else {
            TransportError::bind_failed(addr, e.to_string())
        }
    })?;

    socket
        .listen(LISTEN_BACKLOG)
        .map_err(|e| TransportError::bind_failed(addr, e.to_string()))?;

    let std_listener: std::net::TcpListener = socket.into();
    let listener = TcpListener::from_std(std_listener)
        .map_err(|e| TransportError::io("converting to Tokio listener", e))?;

    if let Ok(local) = listener.local_addr() {
        info!("TCP listener bound to {}", local);
    }

    Ok(listener)
}

// ============================================
// TcpTransport
// ============================================

/// Write half of an accepted client connection.
///
/// # Example
/// ```ignore
/// let (stream, _) = listener.accept().await?;
/// let (transport, mut reader) = TcpTransport::split(stream)?;
/// transport.write(frame).await?;
/// ```
pub struct TcpTransport {
    /// Write half; `None` once closed
    writer: Mutex<Option<OwnedWriteHalf>>,
    /// Remote address
    peer_addr: SocketAddr,
    /// Cleared on close
    open: AtomicBool,
}

impl TcpTransport {
    /// Splits an accepted stream into a transport and the read half.
    ///
    /// # Errors
    /// Returns error if the peer address cannot be determined.
    pub fn split(stream: TcpStream) -> Result<(Self, OwnedReadHalf)> {
        let peer_addr = stream
            .peer_addr()
            .map_err(|e| TransportError::io("getting peer address", e))?;

        if let Err(e) = stream.set_nodelay(true) {
            debug!("Failed to set TCP_NODELAY for {}: {}", peer_addr, e);
        }

        let (reader, writer) = stream.into_split();
        let transport = Self {
            writer: Mutex::new(Some(writer)),
            peer_addr,
            open: AtomicBool::new(true),
        };
        Ok((transport, reader))
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn write(&self, frame: Bytes) -> Result<()> {
        if !self.is_open() {
            return Err(TransportError::Closed);
        }

        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(TransportError::Closed)?;

        writer
            .write_all(&frame)
            .await
            .map_err(|e| TransportError::write_failed(self.peer_addr, e.to_string()))?;
        writer
            .flush()
            .await
            .map_err(|e| TransportError::write_failed(self.peer_addr, e.to_string()))?;

        trace!("Wrote {} bytes to {}", frame.len(), self.peer_addr);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if !self.open.swap(false, Ordering::AcqRel) {
            return Ok(());
        }

        let writer = self.writer.lock().await.take();
        if let Some(mut writer) = writer {
            // Peer may already be gone
            if let Err(e) = writer.shutdown().await {
                debug!("Shutdown of {} failed: {}", self.peer_addr, e);
            }
        }

        debug!("Closed TCP connection to {}", self.peer_addr);
        Ok(())
    }

    fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpTransport")
            .field("peer_addr", &self.peer_addr)
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}

// ============================================
// Tests
// ============================================
