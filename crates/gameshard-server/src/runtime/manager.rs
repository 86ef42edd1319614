// ============================================
// File: crates/gameshard-server/src/runtime/manager.rs
// ============================================
//! # Service Manager
//!
//! ## Creation Reason
//! Owns every service instance of the process and drives their
//! lifecycle in dependency order. It is the explicit runtime context
//! handed to whoever needs another service; there is no global registry.
//!
//! ## Main Functionality
//! - `get` / `resolve`: Lazily build and return an instance
//! - `start`: Start a service after all of its dependencies
//! - `stop`: Stop a service after everything that depends on it
//! - `restart`: Stop hook then start hook for a running service
//! - `stop_all`: Orderly shutdown of every known service
//!
//! ## Start Algorithm
//! ```text
//! start(item)
//!   plan:   visit(item) ─► resolving = [item]
//!             visit(world) ─► resolving = [item, world]   ─► plan = [world]
//!             visit(database) ─► ...                      ─► plan = [world, database]
//!           plan = [world, database, item]
//!           a visit of an id already in `resolving` is a cycle
//!   run:    for entry in plan: lock entry, skip if started, call hook
//! ```
//!
//! ## Stop Algorithm
//! ```text
//! stop(world)
//!   for every KNOWN entry that lists `world` as a dependency:
//!       stop(that entry)            (recursively, dependents first)
//!   call world's stop hook
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - A service is "known" once start/stop/restart acted on it. Dependents
//!   that were never started or stopped through the manager are NOT
//!   stopped along with their dependency
//! - Transitions of one service are serialized by its entry lock;
//!   different services may transition concurrently
//! - Instance construction is serialized process-wide so a factory cycle
//!   is detected instead of deadlocking
//!
//! ## Last Modified
//! v0.1.0 - Initial runtime implementation

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{ReentrantMutex, RwLock};
use tracing::{debug, error, info};

use super::registry::{Factory, Instance, ServiceRegistry};
use super::service::{NamedService, Service, ServiceId, ServiceState};
use crate::error::ServiceError;

/// Result type for runtime operations.
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

// ============================================
// ServiceEntry
// ============================================

/// Runtime bookkeeping for one built service.
struct ServiceEntry {
    id: ServiceId,
    instance: Instance,
    state: RwLock<ServiceState>,
    /// Set once start/stop/restart acted on this service
    known: AtomicBool,
    /// Serializes transitions of this service
    transition: tokio::sync::Mutex<()>,
}

impl ServiceEntry {
    fn new(id: ServiceId, instance: Instance) -> Self {
        Self {
            id,
            instance,
            state: RwLock::new(ServiceState::Stopped),
            known: AtomicBool::new(false),
            transition: tokio::sync::Mutex::new(()),
        }
    }

    fn service(&self) -> &dyn Service {
        self.instance.service.as_ref()
    }

    fn state(&self) -> ServiceState {
        *self.state.read()
    }

    fn set_state(&self, state: ServiceState) {
        *self.state.write() = state;
    }

    fn mark_known(&self) {
        self.known.store(true, Ordering::Release);
    }

    fn is_known(&self) -> bool {
        self.known.load(Ordering::Acquire)
    }

    fn depends_on(&self, id: ServiceId) -> bool {
        self.service().dependencies().contains(&id)
    }
}

// ============================================
// ServiceManager
// ============================================

/// Explicit runtime context owning all service instances.
///
/// # Thread Safety
/// Share it behind an `Arc`; every operation takes `&self`.
pub struct ServiceManager {
    factories: HashMap<ServiceId, Factory>,
    entries: RwLock<HashMap<ServiceId, Arc<ServiceEntry>>>,
    /// Ids whose factory is currently running, in call order
    constructing: ReentrantMutex<RefCell<Vec<ServiceId>>>,
}

impl ServiceManager {
    /// Creates a manager over the given registry. Nothing is built yet.
    #[must_use]
    pub fn new(registry: ServiceRegistry) -> Self {
        Self {
            factories: registry.into_factories(),
            entries: RwLock::new(HashMap::new()),
            constructing: ReentrantMutex::new(RefCell::new(Vec::new())),
        }
    }

    // ========================================
    // Lookup
    // ========================================

    /// Returns the instance registered under `id`, building it if needed.
    ///
    /// # Errors
    /// - `NotRegistered`: unknown id
    /// - `Construction` / `DependencyCycle`: the factory failed
    pub fn get(&self, id: ServiceId) -> ServiceResult<Arc<dyn Service>> {
        Ok(Arc::clone(&self.entry(id)?.instance.service))
    }

    /// Returns the typed instance of `T`, building it if needed.
    ///
    /// # Errors
    /// Same as [`ServiceManager::get`], plus `Construction` if the id is
    /// registered with a different type.
    pub fn resolve<T: NamedService>(&self) -> ServiceResult<Arc<T>> {
        let entry = self.entry(T::ID)?;
        Arc::clone(&entry.instance.any)
            .downcast::<T>()
            .map_err(|_| ServiceError::construction(T::ID, "registered under a different type"))
    }

    /// Returns the lifecycle state of `id`, `Stopped` if never built.
    #[must_use]
    pub fn state(&self, id: ServiceId) -> ServiceState {
        self.entries
            .read()
            .get(&id)
            .map_or(ServiceState::Stopped, |entry| entry.state())
    }

    /// Returns `true` if `id` is currently started.
    #[must_use]
    pub fn is_started(&self, id: ServiceId) -> bool {
        self.state(id) == ServiceState::Started
    }

    fn entry(&self, id: ServiceId) -> ServiceResult<Arc<ServiceEntry>> {
        if let Some(entry) = self.entries.read().get(&id) {
            return Ok(Arc::clone(entry));
        }

        let factory = self
            .factories
            .get(&id)
            .ok_or(ServiceError::NotRegistered { service: id })?;

        let guard = self.constructing.lock();

        // Another thread may have finished it while we waited
        if let Some(entry) = self.entries.read().get(&id) {
            return Ok(Arc::clone(entry));
        }

        {
            let stack = guard.borrow();
            if let Some(pos) = stack.iter().position(|building| *building == id) {
                let mut path = stack[pos..].to_vec();
                path.push(id);
                return Err(ServiceError::cycle(id, &path));
            }
        }

        guard.borrow_mut().push(id);
        let built = factory(self);
        guard.borrow_mut().pop();

        let entry = Arc::new(ServiceEntry::new(id, built?));
        self.entries.write().insert(id, Arc::clone(&entry));
        debug!(service = %id, "Service instantiated");
        Ok(entry)
    }

    // ========================================
    // Start
    // ========================================

    /// Starts `id` after starting all of its dependencies.
    ///
    /// Starting a started service is a no-op.
    ///
    /// # Errors
    /// - `DependencyCycle`: the dependency graph loops
    /// - `StartFailed`: a hook failed; services started before it stay up
    pub async fn start(&self, id: ServiceId) -> ServiceResult<()> {
        let target = self.entry(id)?;
        if target.state() == ServiceState::Started {
            return Ok(());
        }

        for entry in self.start_plan(id)? {
            self.start_entry(&entry).await?;
        }
        Ok(())
    }

    /// Orders `id` and its transitive dependencies, dependencies first.
    fn start_plan(&self, id: ServiceId) -> ServiceResult<Vec<Arc<ServiceEntry>>> {
        let mut plan = Vec::new();
        let mut planned = HashSet::new();
        let mut resolving = Vec::new();
        self.visit(id, &mut resolving, &mut planned, &mut plan)?;
        Ok(plan)
    }

    fn visit(
        &self,
        id: ServiceId,
        resolving: &mut Vec<ServiceId>,
        planned: &mut HashSet<ServiceId>,
        plan: &mut Vec<Arc<ServiceEntry>>,
    ) -> ServiceResult<()> {
        if planned.contains(&id) {
            return Ok(());
        }
        if let Some(pos) = resolving.iter().position(|r| *r == id) {
            let mut path = resolving[pos..].to_vec();
            path.push(id);
            return Err(ServiceError::cycle(id, &path));
        }

        let entry = self.entry(id)?;
        resolving.push(id);
        for dependency in entry.service().dependencies() {
            self.visit(*dependency, resolving, planned, plan)?;
        }
        resolving.pop();

        planned.insert(id);
        plan.push(entry);
        Ok(())
    }

    async fn start_entry(&self, entry: &ServiceEntry) -> ServiceResult<()> {
        let _transition = entry.transition.lock().await;
        if entry.state() == ServiceState::Started {
            return Ok(());
        }
        entry.mark_known();

        debug!(service = %entry.id, "Starting service...");
        entry.set_state(ServiceState::Starting);

        match entry.service().start().await {
            Ok(()) => {
                entry.set_state(ServiceState::Started);
                info!(service = %entry.id, "Service started");
                Ok(())
            }
            Err(e) => {
                entry.set_state(ServiceState::Stopped);
                error!(service = %entry.id, error = %e, "Error starting service");
                Err(ServiceError::StartFailed {
                    service: entry.id,
                    source: e.into(),
                })
            }
        }
    }

    // ========================================
    // Stop
    // ========================================

    /// Stops every known dependent of `id`, then `id` itself.
    ///
    /// Stopping a stopped service is a no-op.
    ///
    /// # Errors
    /// - `NotRegistered` / `Construction`: `id` cannot be built
    /// - `StopFailed`: a hook failed; the failing service stays started
    pub async fn stop(&self, id: ServiceId) -> ServiceResult<()> {
        let target = self.entry(id)?;
        if target.state() == ServiceState::Stopped {
            return Ok(());
        }
        target.mark_known();

        let mut visited = HashSet::from([id]);
        let mut order = Vec::new();
        self.collect_dependents(id, &mut visited, &mut order);

        for dependent in &order {
            self.stop_entry(dependent).await?;
        }
        self.stop_entry(&target).await
    }

    /// Known entries depending on `id`, transitively, deepest first.
    fn collect_dependents(
        &self,
        id: ServiceId,
        visited: &mut HashSet<ServiceId>,
        order: &mut Vec<Arc<ServiceEntry>>,
    ) {
        let dependents: Vec<Arc<ServiceEntry>> = self
            .entries
            .read()
            .values()
            .filter(|entry| entry.is_known() && entry.depends_on(id))
            .cloned()
            .collect();

        for dependent in dependents {
            if visited.insert(dependent.id) {
                self.collect_dependents(dependent.id, visited, order);
                order.push(dependent);
            }
        }
    }

    async fn stop_entry(&self, entry: &ServiceEntry) -> ServiceResult<()> {
        let _transition = entry.transition.lock().await;
        if entry.state() == ServiceState::Stopped {
            return Ok(());
        }
        entry.mark_known();

        debug!(service = %entry.id, "Stopping service...");
        entry.set_state(ServiceState::Stopping);

        match entry.service().stop().await {
            Ok(()) => {
                entry.set_state(ServiceState::Stopped);
                info!(service = %entry.id, "Service stopped");
                Ok(())
            }
            Err(e) => {
                entry.set_state(ServiceState::Started);
                error!(service = %entry.id, error = %e, "Error stopping service");
                Err(ServiceError::StopFailed {
                    service: entry.id,
                    source: e.into(),
                })
            }
        }
    }

    // ========================================
    // Restart
    // ========================================

    /// Runs the stop hook then the start hook of a running service.
    ///
    /// Dependents are left alone; they keep running across the restart.
    ///
    /// # Errors
    /// - `NotRunning`: the service is stopped
    /// - `StopFailed`: the stop hook failed, the service stays started
    /// - `StartFailed`: the start hook failed, the service is stopped
    pub async fn restart(&self, id: ServiceId) -> ServiceResult<()> {
        let entry = self.entry(id)?;
        let _transition = entry.transition.lock().await;
        if entry.state() != ServiceState::Started {
            return Err(ServiceError::NotRunning { service: id });
        }
        entry.mark_known();

        debug!(service = %id, "Restarting service...");

        entry.set_state(ServiceState::Stopping);
        if let Err(e) = entry.service().stop().await {
            entry.set_state(ServiceState::Started);
            error!(service = %id, error = %e, "Error stopping service");
            return Err(ServiceError::StopFailed {
                service: id,
                source: e.into(),
            });
        }

        entry.set_state(ServiceState::Starting);
        if let Err(e) = entry.service().start().await {
            entry.set_state(ServiceState::Stopped);
            error!(service = %id, error = %e, "Error starting service");
            return Err(ServiceError::StartFailed {
                service: id,
                source: e.into(),
            });
        }

        entry.set_state(ServiceState::Started);
        info!(service = %id, "Service restarted");
        Ok(())
    }

    // ========================================
    // Shutdown
    // ========================================

    /// Stops every known service, dependents first.
    ///
    /// Keeps going after a failure and returns the first error.
    ///
    /// # Errors
    /// The first `StopFailed` encountered.
    pub async fn stop_all(&self) -> ServiceResult<()> {
        let mut known: Vec<ServiceId> = self
            .entries
            .read()
            .values()
            .filter(|entry| entry.is_known())
            .map(|entry| entry.id)
            .collect();
        known.sort();

        let mut first_error = None;
        for id in known {
            if let Err(e) = self.stop(id).await {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Returns the ids of all built services.
    #[must_use]
    pub fn instantiated(&self) -> Vec<ServiceId> {
        let mut ids: Vec<_> = self.entries.read().keys().copied().collect();
        ids.sort();
        ids
    }
}

impl fmt::Debug for ServiceManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.read();
        let mut states: Vec<_> = entries.values().map(|e| (e.id, e.state())).collect();
        states.sort_by_key(|(id, _)| *id);
        f.debug_struct("ServiceManager")
            .field("registered", &self.factories.len())
            .field("instances", &states)
            .finish_non_exhaustive()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Shared event log: "start:a", "stop:b", ...
    type Journal = Arc<Mutex<Vec<String>>>;

    /// Configurable test service.
    struct Probe {
        id: ServiceId,
        deps: Vec<ServiceId>,
        journal: Journal,
        fail_start: AtomicBool,
        fail_stop: AtomicBool,
        start_delay: Option<Duration>,
        starts: AtomicUsize,
    }

    impl Probe {
        fn new(id: ServiceId, deps: &[ServiceId], journal: &Journal) -> Self {
            Self {
                id,
                deps: deps.to_vec(),
                journal: Arc::clone(journal),
                fail_start: AtomicBool::new(false),
                fail_stop: AtomicBool::new(false),
                start_delay: None,
                starts: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Service for Probe {
        fn dependencies(&self) -> &[ServiceId] {
            &self.deps
        }

        async fn start(&self) -> anyhow::Result<()> {
            if let Some(delay) = self.start_delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_start.load(Ordering::SeqCst) {
                anyhow::bail!("{} refused to start", self.id);
            }
            self.starts.fetch_add(1, Ordering::SeqCst);
            self.journal.lock().push(format!("start:{}", self.id));
            Ok(())
        }

        async fn stop(&self) -> anyhow::Result<()> {
            if self.fail_stop.load(Ordering::SeqCst) {
                anyhow::bail!("{} refused to stop", self.id);
            }
            self.journal.lock().push(format!("stop:{}", self.id));
            Ok(())
        }
    }

    macro_rules! probe_type {
        ($name:ident, $id:literal) => {
            struct $name(Probe);

            #[async_trait]
            impl Service for $name {
                fn dependencies(&self) -> &[ServiceId] {
                    self.0.dependencies()
                }
                async fn start(&self) -> anyhow::Result<()> {
                    self.0.start().await
                }
                async fn stop(&self) -> anyhow::Result<()> {
                    self.0.stop().await
                }
            }

            impl NamedService for $name {
                const ID: ServiceId = ServiceId::new($id);
            }
        };
    }

    probe_type!(Database, "database");
    probe_type!(World, "world");
    probe_type!(Items, "item");
    probe_type!(Network, "network");

    const DATABASE: ServiceId = Database::ID;
    const WORLD: ServiceId = World::ID;
    const ITEM: ServiceId = Items::ID;
    const NETWORK: ServiceId = Network::ID;

    /// network -> item -> (world, database); world -> database
    fn game_graph(journal: &Journal) -> ServiceManager {
        let mut registry = ServiceRegistry::new();
        let j = Arc::clone(journal);
        registry.register(move |_| Ok(Arc::new(Database(Probe::new(DATABASE, &[], &j)))));
        let j = Arc::clone(journal);
        registry.register(move |_| Ok(Arc::new(World(Probe::new(WORLD, &[DATABASE], &j)))));
        let j = Arc::clone(journal);
        registry.register(move |_| Ok(Arc::new(Items(Probe::new(ITEM, &[WORLD, DATABASE], &j)))));
        let j = Arc::clone(journal);
        registry.register(move |_| Ok(Arc::new(Network(Probe::new(NETWORK, &[ITEM], &j)))));
        ServiceManager::new(registry)
    }

    fn events(journal: &Journal) -> Vec<String> {
        journal.lock().clone()
    }

    #[tokio::test]
    async fn test_start_dependencies_first() {
        let journal = Journal::default();
        let manager = game_graph(&journal);

        manager.start(NETWORK).await.unwrap();

        assert_eq!(
            events(&journal),
            ["start:database", "start:world", "start:item", "start:network"]
        );
        for id in [DATABASE, WORLD, ITEM, NETWORK] {
            assert!(manager.is_started(id), "{id} should be started");
        }
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let journal = Journal::default();
        let manager = game_graph(&journal);

        manager.start(ITEM).await.unwrap();
        manager.start(ITEM).await.unwrap();
        manager.start(WORLD).await.unwrap();

        assert_eq!(events(&journal), ["start:database", "start:world", "start:item"]);
        assert_eq!(manager.resolve::<Items>().unwrap().0.starts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stop_stops_dependents_first() {
        let journal = Journal::default();
        let manager = game_graph(&journal);
        manager.start(NETWORK).await.unwrap();
        journal.lock().clear();

        manager.stop(DATABASE).await.unwrap();

        let log = events(&journal);
        assert_eq!(log.last().map(String::as_str), Some("stop:database"));
        let pos = |e: &str| log.iter().position(|x| x == e).unwrap();
        assert!(pos("stop:network") < pos("stop:item"));
        assert!(pos("stop:item") < pos("stop:world"));
        assert_eq!(log.len(), 4);
        assert!(!manager.is_started(NETWORK));
    }

    #[tokio::test]
    async fn test_stop_skips_unknown_dependents() {
        let journal = Journal::default();
        let manager = game_graph(&journal);

        manager.start(WORLD).await.unwrap();
        // Built, never started or stopped: not known to the runtime
        manager.get(ITEM).unwrap();
        journal.lock().clear();

        manager.stop(DATABASE).await.unwrap();
        assert_eq!(events(&journal), ["stop:world", "stop:database"]);
    }

    #[tokio::test]
    async fn test_stop_of_stopped_service_is_noop() {
        let journal = Journal::default();
        let manager = game_graph(&journal);

        manager.stop(WORLD).await.unwrap();
        assert!(events(&journal).is_empty());
    }

    #[tokio::test]
    async fn test_restart_requires_running() {
        let journal = Journal::default();
        let manager = game_graph(&journal);

        let err = manager.restart(WORLD).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotRunning { service } if service == WORLD));
        assert!(err.to_string().contains("already stopped"));

        manager.start(WORLD).await.unwrap();
        journal.lock().clear();
        manager.restart(WORLD).await.unwrap();
        assert_eq!(events(&journal), ["stop:world", "start:world"]);
        assert!(manager.is_started(WORLD));
        assert!(manager.is_started(DATABASE));
    }

    #[tokio::test]
    async fn test_restart_surfaces_stop_failure() {
        let journal = Journal::default();
        let manager = game_graph(&journal);
        manager.start(WORLD).await.unwrap();

        manager.resolve::<World>().unwrap().0.fail_stop.store(true, Ordering::SeqCst);
        let err = manager.restart(WORLD).await.unwrap_err();
        assert!(matches!(err, ServiceError::StopFailed { .. }));
        assert!(manager.is_started(WORLD));
    }

    #[tokio::test]
    async fn test_dependency_cycle_detected() {
        let journal = Journal::default();
        let mut registry = ServiceRegistry::new();
        let j = Arc::clone(&journal);
        registry.register(move |_| Ok(Arc::new(World(Probe::new(WORLD, &[ITEM], &j)))));
        let j = Arc::clone(&journal);
        registry.register(move |_| Ok(Arc::new(Items(Probe::new(ITEM, &[WORLD], &j)))));
        let manager = ServiceManager::new(registry);

        let err = manager.start(WORLD).await.unwrap_err();
        match err {
            ServiceError::DependencyCycle { service, path } => {
                assert_eq!(service, WORLD);
                assert_eq!(path, "world -> item -> world");
            }
            other => panic!("expected cycle, got {other}"),
        }
        assert!(events(&journal).is_empty());
    }

    #[tokio::test]
    async fn test_factory_cycle_detected() {
        let mut registry = ServiceRegistry::new();
        let journal = Journal::default();
        let j = Arc::clone(&journal);
        registry.register(move |manager| {
            manager.resolve::<Items>()?;
            Ok(Arc::new(World(Probe::new(WORLD, &[], &j))))
        });
        let j = Arc::clone(&journal);
        registry.register(move |manager| {
            manager.resolve::<World>()?;
            Ok(Arc::new(Items(Probe::new(ITEM, &[], &j))))
        });
        let manager = ServiceManager::new(registry);

        let err = manager.get(WORLD).err().unwrap();
        assert!(matches!(err, ServiceError::DependencyCycle { .. }));
        assert!(manager.instantiated().is_empty());
    }

    #[tokio::test]
    async fn test_start_failure_propagates() {
        let journal = Journal::default();
        let manager = game_graph(&journal);
        manager.resolve::<World>().unwrap().0.fail_start.store(true, Ordering::SeqCst);

        let err = manager.start(NETWORK).await.unwrap_err();
        match &err {
            ServiceError::StartFailed { service, source } => {
                assert_eq!(*service, WORLD);
                assert!(source.to_string().contains("refused to start"));
            }
            other => panic!("expected start failure, got {other}"),
        }

        assert!(manager.is_started(DATABASE));
        assert_eq!(manager.state(WORLD), ServiceState::Stopped);
        assert!(!manager.is_started(ITEM));
        assert!(!manager.is_started(NETWORK));
        assert_eq!(events(&journal), ["start:database"]);
    }

    #[tokio::test]
    async fn test_concurrent_start_runs_hook_once() {
        let journal = Journal::default();
        let mut registry = ServiceRegistry::new();
        let j = Arc::clone(&journal);
        registry.register(move |_| {
            let mut probe = Probe::new(WORLD, &[], &j);
            probe.start_delay = Some(Duration::from_millis(50));
            Ok(Arc::new(World(probe)))
        });
        let manager = Arc::new(ServiceManager::new(registry));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = Arc::clone(&manager);
                tokio::spawn(async move { manager.start(WORLD).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(events(&journal), ["start:world"]);
        assert!(manager.is_started(WORLD));
    }

    #[tokio::test]
    async fn test_unregistered_service() {
        let manager = ServiceManager::new(ServiceRegistry::new());
        let err = manager.start(WORLD).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotRegistered { service } if service == WORLD));
        assert_eq!(manager.state(WORLD), ServiceState::Stopped);
    }

    #[tokio::test]
    async fn test_stop_all_reverse_order() {
        let journal = Journal::default();
        let manager = game_graph(&journal);
        manager.start(NETWORK).await.unwrap();
        journal.lock().clear();

        manager.stop_all().await.unwrap();

        let log = events(&journal);
        assert_eq!(log.len(), 4);
        assert_eq!(log.first().map(String::as_str), Some("stop:network"));
        assert_eq!(log.last().map(String::as_str), Some("stop:database"));
        for id in [DATABASE, WORLD, ITEM, NETWORK] {
            assert_eq!(manager.state(id), ServiceState::Stopped);
        }
    }

    #[tokio::test]
    async fn test_stop_failure_keeps_service_started() {
        let journal = Journal::default();
        let manager = game_graph(&journal);
        manager.start(ITEM).await.unwrap();
        manager.resolve::<Items>().unwrap().0.fail_stop.store(true, Ordering::SeqCst);

        let err = manager.stop(WORLD).await.unwrap_err();
        assert!(matches!(err, ServiceError::StopFailed { service, .. } if service == ITEM));
        assert!(manager.is_started(ITEM));
        assert!(manager.is_started(WORLD));
    }
}
