// ============================================
// File: crates/gameshard-server/src/services/network.rs
// ============================================
//! # Network Service
//!
//! ## Creation Reason
//! The TCP front door. Accepts game client connections, creates a
//! session for each and feeds their byte streams through the packet
//! pipeline. Sits at the top of the service graph, so starting it brings
//! up everything it depends on.
//!
//! ## Task Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     NetworkService                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐    spawns     ┌────────────────────────┐  │
//! │  │ Accept Task  │ ────────────► │ Reader Task (per conn) │  │
//! │  │              │               │  read → pipeline.feed  │  │
//! │  │ owns JoinSet │               └────────────────────────┘  │
//! │  └──────────────┘                                           │
//! │  ┌──────────────┐               ┌────────────────────────┐  │
//! │  │ Reaper Task  │ ── interval ─►│ SessionManager         │  │
//! │  └──────────────┘               │  reap_idle()           │  │
//! │                                 └────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Every task selects on the shutdown broadcast; the stop hook
//!   broadcasts, closes all sessions, then joins with a timeout
//! - Writes never happen on the reader task; they go through the
//!   session's writer
//!
//! ## Last Modified
//! v0.1.0 - Initial network service

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use parking_lot::{Mutex, RwLock};
use tokio::io::AsyncReadExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use gameshard_core::protocol::ProtocolVersion;
use gameshard_transport::{bind_listener, TcpTransport, Transport};

use crate::config::ServerConfig;
use crate::handlers::{game_dispatcher, InboundPipeline};
use crate::runtime::{NamedService, Service, ServiceId};
use crate::services::{
    DatabaseService, ItemService, KeygenService, Session, SessionManager, WorldService,
};

/// Initial capacity of a connection's read buffer.
const READ_BUFFER_SIZE: usize = 8 * 1024;

/// How long the stop hook waits for each task.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

const DEPENDENCIES: [ServiceId; 4] = [
    KeygenService::ID,
    DatabaseService::ID,
    WorldService::ID,
    ItemService::ID,
];

// ============================================
// NetworkSettings
// ============================================

/// Network parameters taken from the configuration.
#[derive(Debug, Clone)]
pub struct NetworkSettings {
    /// Address to listen on.
    pub listen_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Silence after which a connection is dropped.
    pub idle_timeout: Duration,
    /// How often idle connections are looked for.
    pub reap_interval: Duration,
    /// The only accepted client protocol version.
    pub supported_version: ProtocolVersion,
}

impl NetworkSettings {
    /// Extracts the network settings from `config`.
    #[must_use]
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            listen_addr: config.network.listen_addr,
            max_connections: config.network.max_connections,
            idle_timeout: Duration::from_secs(config.network.idle_timeout_secs),
            reap_interval: Duration::from_secs(config.network.reap_interval_secs),
            supported_version: config.protocol.supported_version,
        }
    }
}

// ============================================
// NetworkService
// ============================================

/// TCP listener service.
pub struct NetworkService {
    settings: NetworkSettings,
    sessions: Arc<SessionManager>,
    pipeline: InboundPipeline,
    shutdown: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
    local_addr: RwLock<Option<SocketAddr>>,
    tasks: Mutex<Vec<(&'static str, JoinHandle<()>)>>,
}

impl NetworkService {
    /// Creates the service and its dispatch table.
    pub fn new(
        settings: NetworkSettings,
        keygen: Arc<KeygenService>,
        world: Arc<WorldService>,
        items: Arc<ItemService>,
    ) -> Self {
        let dispatcher = game_dispatcher(keygen, world, items, settings.supported_version);
        let sessions = Arc::new(SessionManager::new(
            settings.max_connections,
            settings.idle_timeout,
        ));
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            settings,
            sessions,
            pipeline: InboundPipeline::new(Arc::new(dispatcher)),
            shutdown: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            local_addr: RwLock::new(None),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Returns the bound address while the service is started.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.read()
    }

    /// Returns the live sessions.
    #[must_use]
    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    fn spawn_accept_task(&self, listener: TcpListener) -> JoinHandle<()> {
        let shutdown = Arc::clone(&self.shutdown);
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let shutdown_tx = self.shutdown_tx.clone();
        let sessions = Arc::clone(&self.sessions);
        let pipeline = self.pipeline.clone();

        tokio::spawn(async move {
            let mut connections = JoinSet::new();

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        debug!("Accept task received shutdown signal");
                        break;
                    }
                    Some(_) = connections.join_next(), if !connections.is_empty() => {}
                    accepted = listener.accept() => {
                        match accepted {
                            Ok((stream, peer)) => {
                                if shutdown.load(Ordering::SeqCst) {
                                    break;
                                }
                                let Some((session, reader)) = open_session(&sessions, stream, peer).await else {
                                    continue;
                                };
                                connections.spawn(serve_connection(
                                    session,
                                    reader,
                                    pipeline.clone(),
                                    Arc::clone(&sessions),
                                    shutdown_tx.subscribe(),
                                ));
                            }
                            Err(e) => {
                                if !shutdown.load(Ordering::SeqCst) {
                                    error!("Accept error: {}", e);
                                }
                            }
                        }
                    }
                }
            }

            let drain = async { while connections.join_next().await.is_some() {} };
            if tokio::time::timeout(SHUTDOWN_TIMEOUT, drain).await.is_err() {
                warn!("Connection tasks timed out during shutdown, aborting");
                connections.abort_all();
            }
            debug!("Accept task exiting");
        })
    }

    fn spawn_reaper_task(&self) -> JoinHandle<()> {
        let shutdown = Arc::clone(&self.shutdown);
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let sessions = Arc::clone(&self.sessions);
        let interval = self.settings.reap_interval;

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        debug!("Reaper task received shutdown signal");
                        break;
                    }
                    _ = interval_timer.tick() => {
                        if shutdown.load(Ordering::SeqCst) {
                            break;
                        }
                        let reaped = sessions.reap_idle().await;
                        debug!(
                            sessions = sessions.count(),
                            reaped = reaped.len(),
                            "Reap cycle complete"
                        );
                    }
                }
            }

            debug!("Reaper task exiting");
        })
    }
}

/// Wraps an accepted stream into a registered session.
async fn open_session(
    sessions: &SessionManager,
    stream: tokio::net::TcpStream,
    peer: SocketAddr,
) -> Option<(Arc<Session>, OwnedReadHalf)> {
    let (transport, reader) = match TcpTransport::split(stream) {
        Ok(parts) => parts,
        Err(e) => {
            warn!(peer = %peer, error = %e, "Failed to set up connection");
            return None;
        }
    };

    let transport: Arc<dyn Transport> = Arc::new(transport);
    match sessions.create(Arc::clone(&transport)) {
        Ok(session) => Some((session, reader)),
        Err(e) => {
            warn!(peer = %peer, error = %e, "Connection refused");
            let _ = transport.close().await;
            None
        }
    }
}

/// Reads from one connection until it closes or the server stops.
async fn serve_connection(
    session: Arc<Session>,
    mut reader: OwnedReadHalf,
    pipeline: InboundPipeline,
    sessions: Arc<SessionManager>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut buf = BytesMut::with_capacity(READ_BUFFER_SIZE);

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            () = session.closed() => break,
            result = reader.read_buf(&mut buf) => {
                match result {
                    Ok(0) => {
                        debug!(connection = %session.id(), "Peer closed connection");
                        break;
                    }
                    Ok(_) => {
                        if let Err(e) = pipeline.feed(&session, &mut buf) {
                            warn!(connection = %session.id(), error = %e, "Closing connection");
                            break;
                        }
                    }
                    Err(e) => {
                        debug!(connection = %session.id(), error = %e, "Read error");
                        break;
                    }
                }
            }
        }
    }

    session.close().await;
    sessions.remove(session.id());
}

#[async_trait]
impl Service for NetworkService {
    fn dependencies(&self) -> &[ServiceId] {
        &DEPENDENCIES
    }

    async fn start(&self) -> anyhow::Result<()> {
        let listener = bind_listener(self.settings.listen_addr)?;
        let local_addr = listener.local_addr()?;

        self.shutdown.store(false, Ordering::SeqCst);
        *self.local_addr.write() = Some(local_addr);

        let accept = self.spawn_accept_task(listener);
        let reaper = self.spawn_reaper_task();
        self.tasks.lock().extend([("accept", accept), ("reaper", reaper)]);

        info!(
            listen_addr = %local_addr,
            max_connections = self.settings.max_connections,
            protocol = %self.settings.supported_version,
            "Game server listening"
        );
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(());
        self.sessions.close_all().await;

        let tasks = std::mem::take(&mut *self.tasks.lock());
        for (name, task) in tasks {
            match tokio::time::timeout(SHUTDOWN_TIMEOUT, task).await {
                Ok(Ok(())) => debug!("Task '{}' completed", name),
                Ok(Err(e)) => warn!("Task '{}' failed: {}", name, e),
                Err(_) => warn!("Task '{}' timed out during shutdown", name),
            }
        }

        *self.local_addr.write() = None;
        info!("Game server stopped listening");
        Ok(())
    }
}

impl NamedService for NetworkService {
    const ID: ServiceId = ServiceId::new("network");
}

impl fmt::Debug for NetworkService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkService")
            .field("listen_addr", &self.settings.listen_addr)
            .field("local_addr", &self.local_addr())
            .field("sessions", &self.sessions.count())
            .finish_non_exhaustive()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{Buf, Bytes};
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpStream;

    use gameshard_core::protocol::{encode_frame, KeyAnnouncement};

    use crate::config::KeygenMode;
    use crate::runtime::ServiceManager;
    use crate::server::build_registry;

    fn test_config() -> ServerConfig {
        let mut config = ServerConfig::default();
        config.network.listen_addr = SocketAddr::from(([127, 0, 0, 1], 0));
        config.keygen.mode = KeygenMode::Pseudo;
        config.keygen.seed = Some(1);
        config
    }

    async fn read_frame(stream: &mut TcpStream) -> Bytes {
        let len = stream.read_u16_le().await.unwrap() as usize;
        let mut payload = vec![0u8; len - 2];
        stream.read_exact(&mut payload).await.unwrap();
        Bytes::from(payload)
    }

    async fn handshake(addr: SocketAddr, version: u16) -> (TcpStream, KeyAnnouncement) {
        let mut client = TcpStream::connect(addr).await.unwrap();
        let [lo, hi] = version.to_le_bytes();
        client
            .write_all(&encode_frame(&[0x00, lo, hi]).unwrap())
            .await
            .unwrap();

        let mut payload = read_frame(&mut client).await;
        assert_eq!(payload.get_u8(), 0x2e);
        let announced = KeyAnnouncement::decode(&mut payload).unwrap();
        (client, announced)
    }

    #[tokio::test]
    async fn test_loopback_handshake() {
        let manager = ServiceManager::new(build_registry(&test_config()));
        manager.start(NetworkService::ID).await.unwrap();
        for id in DEPENDENCIES {
            assert!(manager.is_started(id), "{id} must be started");
        }

        let network = manager.resolve::<NetworkService>().unwrap();
        let addr = network.local_addr().unwrap();

        let (mut client, announced) = handshake(addr, 216).await;
        assert!(announced.accepted);
        assert_eq!(network.sessions().count(), 1);

        manager.stop_all().await.unwrap();
        assert!(network.local_addr().is_none());
        assert!(network.sessions().is_empty());

        let mut rest = Vec::new();
        client.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn test_loopback_rejected_version() {
        let manager = ServiceManager::new(build_registry(&test_config()));
        manager.start(NetworkService::ID).await.unwrap();
        let addr = manager.resolve::<NetworkService>().unwrap().local_addr().unwrap();

        let (mut client, announced) = handshake(addr, 152).await;
        assert!(!announced.accepted);

        // The server closes right after the announcement
        let mut rest = Vec::new();
        client.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());

        manager.stop_all().await.unwrap();
    }

    #[tokio::test]
    async fn test_restart_rebinds() {
        let manager = ServiceManager::new(build_registry(&test_config()));
        manager.start(NetworkService::ID).await.unwrap();
        manager.restart(NetworkService::ID).await.unwrap();

        let addr = manager.resolve::<NetworkService>().unwrap().local_addr().unwrap();
        let (_client, announced) = handshake(addr, 216).await;
        assert!(announced.accepted);

        manager.stop_all().await.unwrap();
    }
}
