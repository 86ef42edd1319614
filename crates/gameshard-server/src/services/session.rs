// ============================================
// File: crates/gameshard-server/src/services/session.rs
// ============================================
//! # Connection Sessions
//!
//! ## Creation Reason
//! Per-connection state: handshake stage, negotiated protocol version,
//! inbound and outbound ciphers, the attached character and traffic
//! statistics. Also owns the ordered outbound write path.
//!
//! ## Main Functionality
//! - `Session`: One client connection
//! - `SessionStage`: Forward-only connection stage
//! - `AfterWrite`: Action applied once a frame has been written
//! - `WriteCompletion`: Resolves when the transport acknowledged a frame
//! - `SessionManager`: Registry of live sessions, idle reaping
//!
//! ## Session Lifecycle
//! ```text
//! Connected ──► Versioned ──► Keyed ──► Authenticated
//!     │             │           │             │
//!     └─────────────┴───────────┴─────────────┴──► Closed
//! ```
//!
//! ## Outbound Path
//! ```text
//! write(packet) ─► frame ─► [unbounded queue] ─► writer task
//!                                                  │ encrypt (if enabled)
//!                                                  │ transport.write().await
//!                                                  │ apply AfterWrite
//!                                                  └ resolve WriteCompletion
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Only the writer task touches the outbound cipher; frames are
//!   encrypted in queue order so the rolling key stays in sync
//! - `AfterWrite` runs before the writer takes the next frame
//! - The transport is closed at most once, whoever asks first
//! - Sessions must be created inside a tokio runtime (the writer task
//!   is spawned on creation)
//!
//! ## Last Modified
//! v0.1.0 - Initial session implementation

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::BytesMut;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, oneshot, Notify};
use tracing::{debug, info, trace, warn};

use gameshard_common::time::AtomicInstant;
use gameshard_common::types::{ConnectionId, ObjectId};
use gameshard_core::protocol::frame::LENGTH_FIELD_SIZE;
use gameshard_core::protocol::{encode_frame, ProtocolVersion, ServerPacket};
use gameshard_core::{CryptographyKey, FrameCipher};
use gameshard_transport::{Transport, TransportError};

use crate::error::{Result, ServerError};

// ============================================
// Session Stage
// ============================================

/// Connection stage. Stages only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionStage {
    /// TCP connection accepted.
    Connected,
    /// Client declared its protocol version.
    Versioned,
    /// Connection key generated, inbound decryption active.
    Keyed,
    /// A character is attached.
    Authenticated,
    /// Connection closed.
    Closed,
}

impl fmt::Display for SessionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected => write!(f, "Connected"),
            Self::Versioned => write!(f, "Versioned"),
            Self::Keyed => write!(f, "Keyed"),
            Self::Authenticated => write!(f, "Authenticated"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

// ============================================
// Session Statistics
// ============================================

/// Per-session traffic counters.
#[derive(Debug, Default)]
pub struct SessionStats {
    pub frames_rx: AtomicU64,
    pub bytes_rx: AtomicU64,
    pub frames_tx: AtomicU64,
    pub bytes_tx: AtomicU64,
    pub unknown_opcodes: AtomicU64,
}

impl SessionStats {
    pub fn record_rx(&self, bytes: u64) {
        self.bytes_rx.fetch_add(bytes, Ordering::Relaxed);
        self.frames_rx.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tx(&self, bytes: u64) {
        self.bytes_tx.fetch_add(bytes, Ordering::Relaxed);
        self.frames_tx.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unknown_opcode(&self) {
        self.unknown_opcodes.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_rx: self.frames_rx.load(Ordering::Relaxed),
            bytes_rx: self.bytes_rx.load(Ordering::Relaxed),
            frames_tx: self.frames_tx.load(Ordering::Relaxed),
            bytes_tx: self.bytes_tx.load(Ordering::Relaxed),
            unknown_opcodes: self.unknown_opcodes.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub frames_rx: u64,
    pub bytes_rx: u64,
    pub frames_tx: u64,
    pub bytes_tx: u64,
    pub unknown_opcodes: u64,
}

// ============================================
// Outbound Types
// ============================================

/// Action the writer applies right after a frame was written.
pub enum AfterWrite {
    /// Nothing to do.
    Nothing,
    /// Encrypt every following frame with this key.
    EnableEncrypter(CryptographyKey),
    /// Close the connection; later frames are discarded.
    Close,
}

impl fmt::Debug for AfterWrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nothing => write!(f, "Nothing"),
            Self::EnableEncrypter(_) => write!(f, "EnableEncrypter(<redacted>)"),
            Self::Close => write!(f, "Close"),
        }
    }
}

/// Resolves once the frame was written (or failed to be).
#[must_use = "dropping the completion does not cancel the write"]
#[derive(Debug)]
pub struct WriteCompletion {
    rx: oneshot::Receiver<Result<()>>,
}

impl WriteCompletion {
    fn ready(result: Result<()>) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(result);
        Self { rx }
    }

    /// Waits for the transport acknowledgement.
    ///
    /// # Errors
    /// - `Transport(Closed)`: the session closed before the frame was written
    /// - `Transport(WriteFailed)`: the transport rejected the frame
    /// - `Core`: the payload cannot be framed
    pub async fn wait(self) -> Result<()> {
        self.rx
            .await
            .unwrap_or_else(|_| Err(TransportError::Closed.into()))
    }
}

struct Outbound {
    frame: BytesMut,
    after: AfterWrite,
    ack: oneshot::Sender<Result<()>>,
}

/// State shared between a session and its writer task.
struct Link {
    id: ConnectionId,
    transport: Arc<dyn Transport>,
    closed: AtomicBool,
    closed_notify: Notify,
    encrypter_enabled: AtomicBool,
    stage: RwLock<SessionStage>,
    stats: SessionStats,
}

impl Link {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        *self.stage.write() = SessionStage::Closed;
        if let Err(e) = self.transport.close().await {
            debug!(connection = %self.id, error = %e, "Transport close failed");
        }
        self.closed_notify.notify_waiters();
        debug!(connection = %self.id, "Connection closed");
    }
}

async fn run_writer(link: Arc<Link>, mut queue: mpsc::UnboundedReceiver<Outbound>) {
    let mut encrypter: Option<FrameCipher> = None;

    while let Some(Outbound { mut frame, after, ack }) = queue.recv().await {
        if link.is_closed() {
            let _ = ack.send(Err(TransportError::Closed.into()));
            break;
        }

        if let Some(cipher) = encrypter.as_mut() {
            cipher.encrypt(&mut frame[LENGTH_FIELD_SIZE..]);
        }

        let len = frame.len() as u64;
        if let Err(e) = link.transport.write(frame.freeze()).await {
            warn!(connection = %link.id, error = %e, "Write failed, closing connection");
            let _ = ack.send(Err(e.into()));
            link.close().await;
            break;
        }
        link.stats.record_tx(len);

        let closing = match after {
            AfterWrite::Nothing => false,
            AfterWrite::EnableEncrypter(key) => {
                encrypter = Some(FrameCipher::new(key));
                link.encrypter_enabled.store(true, Ordering::SeqCst);
                debug!(connection = %link.id, "Encrypter enabled");
                false
            }
            AfterWrite::Close => {
                link.close().await;
                true
            }
        };

        let _ = ack.send(Ok(()));
        if closing {
            break;
        }
    }

    trace!(connection = %link.id, "Writer finished");
}

// ============================================
// Session
// ============================================

/// A client connection.
pub struct Session {
    link: Arc<Link>,
    peer_addr: SocketAddr,
    created_at: Instant,
    last_activity: AtomicInstant,
    version: RwLock<Option<ProtocolVersion>>,
    decrypter: Mutex<Option<FrameCipher>>,
    character: RwLock<Option<ObjectId>>,
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl Session {
    /// Creates a session over `transport` and spawns its writer task.
    #[must_use]
    pub fn new(id: ConnectionId, transport: Arc<dyn Transport>) -> Arc<Self> {
        let peer_addr = transport.peer_addr();
        let link = Arc::new(Link {
            id,
            transport,
            closed: AtomicBool::new(false),
            closed_notify: Notify::new(),
            encrypter_enabled: AtomicBool::new(false),
            stage: RwLock::new(SessionStage::Connected),
            stats: SessionStats::default(),
        });

        let (outbound, queue) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(Arc::clone(&link), queue));

        let now = Instant::now();
        Arc::new(Self {
            link,
            peer_addr,
            created_at: now,
            last_activity: AtomicInstant::from_instant(now),
            version: RwLock::new(None),
            decrypter: Mutex::new(None),
            character: RwLock::new(None),
            outbound,
        })
    }

    /// Returns the connection id.
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.link.id
    }

    /// Returns the remote address.
    #[must_use]
    pub const fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Returns the traffic counters.
    #[must_use]
    pub fn stats(&self) -> &SessionStats {
        &self.link.stats
    }

    // ========================================
    // Stage
    // ========================================

    /// Returns the current stage.
    #[must_use]
    pub fn stage(&self) -> SessionStage {
        *self.link.stage.read()
    }

    /// Moves to `stage` if it is ahead of the current one.
    ///
    /// Returns `true` if the stage changed.
    pub fn advance(&self, stage: SessionStage) -> bool {
        let mut current = self.link.stage.write();
        if stage <= *current {
            return false;
        }
        let previous = std::mem::replace(&mut *current, stage);
        trace!(connection = %self.link.id, from = %previous, to = %stage, "Stage advanced");
        true
    }

    /// Records the client's protocol version.
    pub fn set_version(&self, version: ProtocolVersion) {
        *self.version.write() = Some(version);
        self.advance(SessionStage::Versioned);
    }

    /// Returns the declared protocol version.
    #[must_use]
    pub fn version(&self) -> Option<ProtocolVersion> {
        *self.version.read()
    }

    /// Attaches the logged-in character.
    pub fn attach_character(&self, character: ObjectId) {
        *self.character.write() = Some(character);
        self.advance(SessionStage::Authenticated);
    }

    /// Returns the attached character.
    #[must_use]
    pub fn character(&self) -> Option<ObjectId> {
        *self.character.read()
    }

    // ========================================
    // Ciphers
    // ========================================

    /// Decrypts every following inbound frame with `key`.
    pub fn enable_decrypter(&self, key: CryptographyKey) {
        *self.decrypter.lock() = Some(FrameCipher::new(key));
        self.advance(SessionStage::Keyed);
        debug!(connection = %self.link.id, "Decrypter enabled");
    }

    /// Returns `true` once inbound frames are decrypted.
    #[must_use]
    pub fn is_decrypting(&self) -> bool {
        self.decrypter.lock().is_some()
    }

    /// Returns `true` once outbound frames are encrypted.
    #[must_use]
    pub fn is_encrypting(&self) -> bool {
        self.link.encrypter_enabled.load(Ordering::SeqCst)
    }

    /// Decrypts an inbound payload in place if decryption is active.
    pub fn decrypt_inbound(&self, payload: &mut [u8]) {
        if let Some(cipher) = self.decrypter.lock().as_mut() {
            cipher.decrypt(payload);
        }
    }

    // ========================================
    // Outbound
    // ========================================

    /// Queues `packet` for writing.
    pub fn write<P: ServerPacket>(&self, packet: &P) -> WriteCompletion {
        self.write_then(packet, AfterWrite::Nothing)
    }

    /// Queues `packet` and applies `after` once it was written.
    pub fn write_then<P: ServerPacket>(&self, packet: &P, after: AfterWrite) -> WriteCompletion {
        self.send_payload(&packet.to_payload(), after)
    }

    /// Queues a raw payload (opcode included).
    pub fn send_payload(&self, payload: &[u8], after: AfterWrite) -> WriteCompletion {
        if self.is_closed() {
            return WriteCompletion::ready(Err(TransportError::Closed.into()));
        }
        let frame = match encode_frame(payload) {
            Ok(frame) => frame,
            Err(e) => return WriteCompletion::ready(Err(e.into())),
        };

        let (ack, rx) = oneshot::channel();
        if let Err(mpsc::error::SendError(rejected)) = self.outbound.send(Outbound { frame, after, ack }) {
            let _ = rejected.ack.send(Err(TransportError::Closed.into()));
        }
        WriteCompletion { rx }
    }

    // ========================================
    // Lifetime
    // ========================================

    /// Closes the connection. Later calls do nothing.
    pub async fn close(&self) {
        self.link.close().await;
    }

    /// Returns `true` once the connection is closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.link.is_closed()
    }

    /// Waits until the connection is closed.
    pub async fn closed(&self) {
        loop {
            let notified = self.link.closed_notify.notified();
            if self.is_closed() {
                return;
            }
            notified.await;
        }
    }

    /// Marks the session active now.
    pub fn touch(&self) {
        self.last_activity.touch();
    }

    /// Returns how long the session has been silent.
    #[must_use]
    pub fn idle_time(&self) -> Duration {
        self.last_activity.elapsed()
    }

    /// Returns `true` if the session was silent for longer than `timeout`.
    #[must_use]
    pub fn is_expired(&self, timeout: Duration) -> bool {
        self.last_activity.has_elapsed(timeout)
    }

    /// Returns the session age.
    #[must_use]
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.link.id)
            .field("peer_addr", &self.peer_addr)
            .field("stage", &self.stage())
            .field("version", &self.version())
            .field("idle_time", &self.idle_time())
            .finish_non_exhaustive()
    }
}

// ============================================
// Session Manager
// ============================================

/// Registry of live sessions.
pub struct SessionManager {
    sessions: DashMap<ConnectionId, Arc<Session>>,
    max_connections: usize,
    idle_timeout: Duration,
}

impl SessionManager {
    #[must_use]
    pub fn new(max_connections: usize, idle_timeout: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            max_connections,
            idle_timeout,
        }
    }

    /// Creates and registers a session for a freshly accepted connection.
    ///
    /// # Errors
    /// Returns `ConnectionLimitReached` if the server is full.
    pub fn create(&self, transport: Arc<dyn Transport>) -> Result<Arc<Session>> {
        if self.sessions.len() >= self.max_connections {
            return Err(ServerError::ConnectionLimitReached {
                limit: self.max_connections,
            });
        }

        let session = Session::new(ConnectionId::next(), transport);
        self.sessions.insert(session.id(), Arc::clone(&session));

        info!(
            connection = %session.id(),
            peer = %session.peer_addr(),
            "Session created"
        );

        Ok(session)
    }

    #[must_use]
    pub fn get(&self, id: ConnectionId) -> Option<Arc<Session>> {
        self.sessions.get(&id).map(|r| Arc::clone(r.value()))
    }

    pub fn get_or_error(&self, id: ConnectionId) -> Result<Arc<Session>> {
        self.get(id).ok_or(ServerError::SessionNotFound(id))
    }

    pub fn remove(&self, id: ConnectionId) -> Option<Arc<Session>> {
        let removed = self.sessions.remove(&id).map(|(_, s)| s);

        if let Some(ref session) = removed {
            let stats = session.stats().snapshot();
            info!(
                connection = %id,
                peer = %session.peer_addr(),
                stage = %session.stage(),
                frames_rx = stats.frames_rx,
                frames_tx = stats.frames_tx,
                bytes_rx = stats.bytes_rx,
                bytes_tx = stats.bytes_tx,
                unknown_opcodes = stats.unknown_opcodes,
                "Session removed"
            );
        }

        removed
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    #[must_use]
    pub fn all_sessions(&self) -> Vec<Arc<Session>> {
        self.sessions.iter().map(|r| Arc::clone(r.value())).collect()
    }

    /// Closes and removes sessions silent for longer than the idle timeout.
    pub async fn reap_idle(&self) -> Vec<ConnectionId> {
        let expired: Vec<_> = self
            .sessions
            .iter()
            .filter(|entry| entry.value().is_expired(self.idle_timeout))
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        for session in &expired {
            debug!(connection = %session.id(), idle = ?session.idle_time(), "Session idle");
            session.close().await;
            self.remove(session.id());
        }

        if !expired.is_empty() {
            info!("Reaped {} idle sessions", expired.len());
        }

        expired.iter().map(|s| s.id()).collect()
    }

    /// Closes and removes every session.
    pub async fn close_all(&self) {
        for session in self.all_sessions() {
            session.close().await;
            self.remove(session.id());
        }
    }
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("sessions", &self.count())
            .field("max_connections", &self.max_connections)
            .field("idle_timeout", &self.idle_timeout)
            .finish()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use gameshard_core::protocol::{FrameCodec, KeyAnnouncement};
    use gameshard_transport::MockTransport;

    fn key(seed: u8) -> CryptographyKey {
        CryptographyKey::from_bytes([seed; 16])
    }

    fn session() -> (Arc<Session>, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::new());
        let session = Session::new(ConnectionId::next(), transport.clone());
        (session, transport)
    }

    fn decode_one(frame: &Bytes) -> BytesMut {
        let mut buf = BytesMut::from(&frame[..]);
        FrameCodec::new().decode(&mut buf).unwrap().unwrap()
    }

    // ========================================
    // Stage
    // ========================================

    #[tokio::test]
    async fn test_stage_only_moves_forward() {
        let (session, _) = session();
        assert_eq!(session.stage(), SessionStage::Connected);

        session.enable_decrypter(key(1));
        assert_eq!(session.stage(), SessionStage::Keyed);

        // Setting the version afterwards must not move back
        session.set_version(ProtocolVersion::new(216));
        assert_eq!(session.stage(), SessionStage::Keyed);
        assert_eq!(session.version(), Some(ProtocolVersion::new(216)));

        session.attach_character(ObjectId::new(5));
        assert_eq!(session.stage(), SessionStage::Authenticated);

        session.close().await;
        assert_eq!(session.stage(), SessionStage::Closed);
        assert!(!session.advance(SessionStage::Authenticated));
    }

    // ========================================
    // Outbound
    // ========================================

    #[tokio::test]
    async fn test_writes_keep_order() {
        let (session, transport) = session();
        let completions: Vec<_> = (0u8..20).map(|i| session.send_payload(&[0x2e, i], AfterWrite::Nothing)).collect();
        for completion in completions {
            completion.wait().await.unwrap();
        }

        let written = transport.written();
        assert_eq!(written.len(), 20);
        for (i, frame) in written.iter().enumerate() {
            assert_eq!(decode_one(frame)[1], i as u8);
        }
        assert_eq!(session.stats().snapshot().frames_tx, 20);
    }

    #[tokio::test]
    async fn test_encrypter_enabled_after_ack() {
        let (session, transport) = session();
        transport.set_write_delay(Some(Duration::from_millis(50)));

        let announce = KeyAnnouncement::new(key(7), true);
        let completion = session.write_then(&announce, AfterWrite::EnableEncrypter(key(7)));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!session.is_encrypting(), "must wait for the write to complete");

        let follow = session.send_payload(&[0x2e, 1, 2, 3], AfterWrite::Nothing);
        completion.wait().await.unwrap();
        assert!(session.is_encrypting());
        follow.wait().await.unwrap();

        let written = transport.written();
        // The announcement itself is plaintext
        assert_eq!(decode_one(&written[0]), announce.to_payload());
        // The next frame is not
        let mut second = decode_one(&written[1]);
        assert_ne!(&second[..], &[0x2e, 1, 2, 3]);
        FrameCipher::new(key(7)).decrypt(&mut second);
        assert_eq!(&second[..], &[0x2e, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_close_after_write_discards_rest() {
        let (session, transport) = session();
        let first = session.send_payload(&[0x2e], AfterWrite::Close);
        let second = session.send_payload(&[0x2e, 9], AfterWrite::Nothing);

        first.wait().await.unwrap();
        assert!(second.wait().await.is_err());
        session.closed().await;

        assert_eq!(transport.written_count(), 1);
        assert_eq!(transport.close_count(), 1);

        // Closing again never reaches the transport
        session.close().await;
        assert_eq!(transport.close_count(), 1);
        assert!(session.send_payload(&[0x2e], AfterWrite::Nothing).wait().await.is_err());
    }

    #[tokio::test]
    async fn test_failed_write_closes_session() {
        let (session, transport) = session();
        transport.fail_writes(true);

        let result = session.send_payload(&[0x2e], AfterWrite::Nothing).wait().await;
        assert!(result.unwrap_err().closes_connection());
        session.closed().await;
        assert_eq!(transport.close_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_payload_rejected() {
        let (session, transport) = session();
        assert!(session.send_payload(&[], AfterWrite::Nothing).wait().await.is_err());
        assert!(!session.is_closed());
        assert_eq!(transport.written_count(), 0);
    }

    // ========================================
    // Manager
    // ========================================

    #[tokio::test]
    async fn test_manager_limit_and_remove() {
        let manager = SessionManager::new(2, Duration::from_secs(60));
        let a = manager.create(Arc::new(MockTransport::new())).unwrap();
        manager.create(Arc::new(MockTransport::new())).unwrap();

        assert!(matches!(
            manager.create(Arc::new(MockTransport::new())),
            Err(ServerError::ConnectionLimitReached { limit: 2 })
        ));

        assert!(manager.remove(a.id()).is_some());
        assert_eq!(manager.count(), 1);
        assert!(manager.get_or_error(a.id()).is_err());
    }

    #[tokio::test]
    async fn test_reap_idle_closes_sessions() {
        let manager = SessionManager::new(10, Duration::from_millis(20));
        let transport = Arc::new(MockTransport::new());
        let session = manager.create(transport.clone()).unwrap();

        assert!(manager.reap_idle().await.is_empty());
        tokio::time::sleep(Duration::from_millis(40)).await;

        assert_eq!(manager.reap_idle().await, vec![session.id()]);
        assert!(manager.is_empty());
        assert!(session.is_closed());
        assert_eq!(transport.close_count(), 1);
    }
}
