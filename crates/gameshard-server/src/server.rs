// ============================================
// File: crates/gameshard-server/src/server.rs
// ============================================
//! # Server Orchestrator
//!
//! ## Creation Reason
//! Wires the game services into a `ServiceManager` and runs the graph
//! until shutdown.
//!
//! ## Main Functionality
//! - `build_registry`: Factories for every game service
//! - `Server`: Start the network service (which pulls in the rest),
//!   wait for Ctrl+C or a programmatic shutdown, stop everything
//!
//! ## Startup Sequence
//! ```text
//! 1. Build the registry from configuration
//! 2. start(network)
//!    └─ keygen → database → world → item → network
//! 3. Wait for shutdown
//! 4. stop_all(), dependents first
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Factories run lazily, the first time a service is resolved
//! - Only the network service is started explicitly; everything it
//!   needs is started through its declared dependencies
//!
//! ## Last Modified
//! v0.1.0 - Initial server orchestration

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};
use crate::runtime::{NamedService, ServiceManager, ServiceRegistry};
use crate::services::{
    DatabaseService, ItemService, KeygenService, NetworkService, NetworkSettings, WorldService,
};

// ============================================
// Registry
// ============================================

/// Builds the service registry for a game server.
#[must_use]
pub fn build_registry(config: &ServerConfig) -> ServiceRegistry {
    let keygen = config.keygen.clone();
    let settings = NetworkSettings::from_config(config);

    let mut registry = ServiceRegistry::new();
    registry
        .register(move |_| Ok(Arc::new(KeygenService::from_config(&keygen))))
        .register(|_| Ok(Arc::new(DatabaseService::in_memory())))
        .register(|_| Ok(Arc::new(WorldService::new())))
        .register(|manager| {
            Ok(Arc::new(ItemService::new(
                manager.resolve::<WorldService>()?,
                manager.resolve::<DatabaseService>()?,
            )))
        })
        .register(move |manager| {
            Ok(Arc::new(NetworkService::new(
                settings.clone(),
                manager.resolve::<KeygenService>()?,
                manager.resolve::<WorldService>()?,
                manager.resolve::<ItemService>()?,
            )))
        });
    registry
}

// ============================================
// Server
// ============================================

/// Main game server.
///
/// # Lifecycle
/// 1. Create with `Server::new(config)`
/// 2. Start with `server.run().await`
/// 3. Shutdown via `shutdown()` or Ctrl+C
pub struct Server {
    /// Server configuration.
    config: ServerConfig,
    /// Service graph.
    manager: Arc<ServiceManager>,
    /// Shutdown flag.
    shutdown: Arc<AtomicBool>,
    /// Shutdown signal sender.
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    /// Creates a new server instance. No service is built yet.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        let manager = Arc::new(ServiceManager::new(build_registry(&config)));
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            manager,
            shutdown: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    /// Returns the service graph.
    #[must_use]
    pub fn manager(&self) -> &Arc<ServiceManager> {
        &self.manager
    }

    /// Runs the server until shutdown.
    ///
    /// # Errors
    /// Returns error if a service fails to start or to stop.
    pub async fn run(&self) -> Result<()> {
        info!("Starting gameshard server v{}", env!("CARGO_PKG_VERSION"));

        let shutdown_rx = self.shutdown_tx.subscribe();

        if let Err(e) = self.manager.start(NetworkService::ID).await {
            error!("Startup failed: {}", e);
            // Whatever came up before the failure goes back down
            if let Err(stop_err) = self.manager.stop_all().await {
                error!("Cleanup after failed startup: {}", stop_err);
            }
            return Err(ServerError::StartupFailed {
                reason: e.to_string(),
            });
        }

        info!(
            services = ?self.manager.instantiated(),
            "Server started, press Ctrl+C to stop"
        );

        self.wait_for_shutdown(shutdown_rx).await;

        info!("Shutting down server...");
        self.shutdown.store(true, Ordering::SeqCst);
        self.manager.stop_all().await?;

        info!("Server stopped");
        Ok(())
    }

    /// Waits for Ctrl+C or `shutdown()`.
    async fn wait_for_shutdown(&self, mut shutdown_rx: broadcast::Receiver<()>) {
        if self.shutdown.load(Ordering::SeqCst) {
            return;
        }

        let signal = tokio::select! {
            result = tokio::signal::ctrl_c() => Some(result),
            _ = shutdown_rx.recv() => None,
        };

        match signal {
            Some(Ok(())) => info!("Received shutdown signal"),
            Some(Err(e)) => {
                error!("Failed to listen for Ctrl+C: {}", e);
                let _ = shutdown_rx.recv().await;
                info!("Shutdown requested");
            }
            None => info!("Shutdown requested"),
        }
    }

    /// Triggers server shutdown programmatically.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(());
    }

    /// Returns `true` once shutdown has been requested.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("listen_addr", &self.config.network.listen_addr)
            .field("protocol", &self.config.protocol.supported_version)
            .field("keygen", &self.config.keygen.mode)
            .finish()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::time::Duration;

    use crate::config::KeygenMode;
    use crate::runtime::ServiceState;

    fn test_config() -> ServerConfig {
        let mut config = ServerConfig::default();
        config.network.listen_addr = SocketAddr::from(([127, 0, 0, 1], 0));
        config.keygen.mode = KeygenMode::Pseudo;
        config.keygen.seed = Some(3);
        config
    }

    #[test]
    fn test_registry_covers_game_services() {
        let registry = build_registry(&test_config());
        assert_eq!(registry.len(), 5);
        for id in [
            KeygenService::ID,
            DatabaseService::ID,
            WorldService::ID,
            ItemService::ID,
            NetworkService::ID,
        ] {
            assert!(registry.contains(id), "{id} must be registered");
        }
    }

    #[tokio::test]
    async fn test_shutdown_before_run_returns() {
        let server = Server::new(test_config());
        server.shutdown();
        assert!(server.is_shutting_down());

        server.run().await.unwrap();
        assert_eq!(server.manager().state(NetworkService::ID), ServiceState::Stopped);
    }

    #[tokio::test]
    async fn test_run_until_shutdown() {
        let server = Arc::new(Server::new(test_config()));
        let runner = {
            let server = Arc::clone(&server);
            tokio::spawn(async move { server.run().await })
        };

        let manager = Arc::clone(server.manager());
        tokio::time::timeout(Duration::from_secs(5), async {
            while !manager.is_started(NetworkService::ID) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        assert!(manager.is_started(ItemService::ID));

        server.shutdown();
        runner.await.unwrap().unwrap();

        for id in [NetworkService::ID, ItemService::ID, WorldService::ID] {
            assert_eq!(manager.state(id), ServiceState::Stopped);
        }
    }

    #[tokio::test]
    async fn test_startup_failure_is_reported() {
        let mut config = test_config();
        // Occupy a port so the bind fails
        let blocker = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        config.network.listen_addr = blocker.local_addr().unwrap();

        let server = Server::new(config);
        let err = server.run().await.unwrap_err();
        assert!(matches!(err, ServerError::StartupFailed { .. }));
        assert!(!server.manager().is_started(ItemService::ID));
    }
}
