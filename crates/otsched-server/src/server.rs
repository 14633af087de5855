use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use otsched_core::{Clock, DoctorStatus, RosterBroadcaster, RosterUpdate, SystemClock};
use otsched_db_file::JsonFilePersistence;
use otsched_db_memory::InMemoryPersistence;
use otsched_engine::{AllocationEngine, EngineContext};
use otsched_storage::{DynPersistence, ResourceStore};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::{AppConfig, StorageBackend, StorageConfig};

/// Selects the persistence backend named in the configuration.
pub fn create_persistence(cfg: &StorageConfig) -> DynPersistence {
    match cfg.backend {
        StorageBackend::Memory => Arc::new(InMemoryPersistence::new()),
        StorageBackend::File => Arc::new(JsonFilePersistence::new(cfg.path.clone())),
    }
}

pub struct ServerBuilder {
    config: AppConfig,
    clock: Arc<dyn Clock>,
    persistence: Option<DynPersistence>,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            clock: Arc::new(SystemClock),
            persistence: None,
        }
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.config = cfg;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Overrides the backend selected by `storage.backend`.
    pub fn with_persistence(mut self, persistence: DynPersistence) -> Self {
        self.persistence = Some(persistence);
        self
    }

    /// Opens the roster, seeding it on first start, and wires the engine.
    pub async fn build(self) -> anyhow::Result<SchedulerServer> {
        let persistence = self
            .persistence
            .unwrap_or_else(|| create_persistence(&self.config.storage));
        let now = self.clock.now();
        let seed = self.config.roster.clone();
        let store = ResourceStore::open(persistence, || seed.build(now))
            .await
            .context("failed to open roster store")?;
        info!(
            backend = store.backend_name(),
            version = store.version(),
            "Roster store ready"
        );

        let broadcaster = RosterBroadcaster::new_shared();
        let ctx = EngineContext::new(Arc::new(store))
            .with_clock(self.clock)
            .with_publisher(broadcaster.clone())
            .with_settings(self.config.scheduler.clone())
            .with_policy(self.config.preemption.clone());

        Ok(SchedulerServer {
            engine: AllocationEngine::new(ctx),
            broadcaster,
        })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct SchedulerServer {
    engine: AllocationEngine,
    broadcaster: Arc<RosterBroadcaster>,
}

impl SchedulerServer {
    pub fn engine(&self) -> &AllocationEngine {
        &self.engine
    }

    pub fn broadcaster(&self) -> &Arc<RosterBroadcaster> {
        &self.broadcaster
    }

    /// Runs until Ctrl+C.
    pub async fn run(self) -> anyhow::Result<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Starts the sweeper and the update log, then runs until `shutdown`
    /// resolves.
    pub async fn run_until(self, shutdown: impl Future<Output = ()>) -> anyhow::Result<()> {
        let listener = spawn_update_log(self.broadcaster.subscribe(), self.engine.clone());
        let sweeper = self.engine.sweeper().start();
        info!("Scheduler running");

        shutdown.await;

        sweeper.shutdown().await;
        listener.abort();
        Ok(())
    }
}

/// Logs every roster update. A lagging receiver resyncs from the dashboard.
fn spawn_update_log(
    mut updates: broadcast::Receiver<RosterUpdate>,
    engine: AllocationEngine,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(update) => {
                    let occupied = update.roster.occupied_theatre_count();
                    let on_call = update
                        .roster
                        .doctors
                        .iter()
                        .filter(|d| d.status == DoctorStatus::OnCall)
                        .count();
                    info!(
                        cause = %update.cause,
                        version = update.version,
                        theatres = ?update.theatres,
                        occupied,
                        on_call,
                        interrupted = update.interrupted.as_ref().map(|i| i.original_ot.as_str()),
                        "Roster updated"
                    );
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    let dashboard = engine.dashboard();
                    warn!(
                        skipped,
                        version = dashboard.version,
                        "Update log lagged, resynced from dashboard"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

async fn shutdown_signal() {
    shutdown_on(tokio::signal::ctrl_c()).await
}

/// Resolves once `signal` fires. A signal that cannot be installed never
/// resolves, so the server keeps running.
async fn shutdown_on<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        warn!(error = %e, "Failed to listen for Ctrl+C, running until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
