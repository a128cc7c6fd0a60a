use crate::catalog::{LaunchCatalog, retry_budget};
use crate::config::Config;
use crate::pagination::PaginationParams;
use crate::planets::PlanetLookup;
use crate::scheduler::{LaunchError, LaunchScheduler};
use crate::store::LaunchStore;
use crate::sync::{LaunchSynchronizer, SyncError, SyncSummary};
use crate::types::{AbortStatus, FlightNumber, Launch, ScheduleRequest};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LaunchOptions {
    pub page_size: u64,
    /// Per catalog request. A page fetch may take several requests.
    pub catalog_timeout: Duration,
    pub store_timeout: Duration,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        LaunchOptions {
            page_size: 50,
            catalog_timeout: Duration::from_secs(10),
            store_timeout: Duration::from_secs(2),
        }
    }
}

impl From<&Config> for LaunchOptions {
    fn from(config: &Config) -> Self {
        LaunchOptions {
            page_size: config.catalog.page_size,
            catalog_timeout: config.catalog_timeout(),
            store_timeout: config.store_timeout(),
        }
    }
}

#[derive(Debug)]
pub enum Command {
    // Stop the sync worker after the current run, if any, completes.
    Shutdown,
}

struct LaunchServiceInner {
    scheduler: LaunchScheduler,
    synchronizer: LaunchSynchronizer,
    planets: Arc<PlanetLookup>,
    // Used by the readiness check. Initially false and set to true once the
    // catalog has been synchronized at least once.
    ready: AtomicBool,
}

/// Entry point for everything the HTTP layer can ask of launches.
#[derive(Clone)]
pub struct LaunchService {
    inner: Arc<LaunchServiceInner>,
}

impl LaunchService {
    pub fn new(
        store: Arc<dyn LaunchStore>,
        catalog: Arc<dyn LaunchCatalog>,
        planets: Arc<PlanetLookup>,
        options: LaunchOptions,
    ) -> Self {
        let scheduler = LaunchScheduler::new(store.clone(), planets.clone(), options.store_timeout);
        let synchronizer = LaunchSynchronizer::new(
            catalog,
            store,
            options.page_size,
            retry_budget(options.catalog_timeout),
            options.store_timeout,
        );

        LaunchService {
            inner: Arc::new(LaunchServiceInner {
                scheduler,
                synchronizer,
                planets,
                ready: AtomicBool::new(false),
            }),
        }
    }

    pub async fn load_launch_data(&self) -> Result<SyncSummary, SyncError> {
        let summary = self.inner.synchronizer.load_launch_data().await?;
        self.inner.ready.store(true, Ordering::Relaxed);
        Ok(summary)
    }

    pub async fn exists_launch_with_id(&self, id: FlightNumber) -> Result<bool, LaunchError> {
        self.inner.scheduler.exists_with_id(id).await
    }

    pub async fn get_all_launches(
        &self,
        pagination: &PaginationParams,
    ) -> Result<Vec<Launch>, LaunchError> {
        self.inner.scheduler.get_all(pagination).await
    }

    pub async fn schedule_new_launch(
        &self,
        request: ScheduleRequest,
    ) -> Result<Launch, LaunchError> {
        self.inner.scheduler.schedule(request).await
    }

    pub async fn abort_launch_by_id(&self, id: FlightNumber) -> Result<AbortStatus, LaunchError> {
        self.inner.scheduler.abort(id).await
    }

    pub fn planets(&self) -> &PlanetLookup {
        &self.inner.planets
    }

    pub fn is_ready(&self) -> bool {
        self.inner.ready.load(Ordering::Relaxed)
    }

    /// Performs the initial synchronization, then resynchronizes every
    /// `interval` until `Shutdown` is received or the sender is dropped.
    ///
    /// Only the initial synchronization is fatal. Later failures are logged
    /// and the previous data keeps being served until the next tick.
    pub async fn run_sync_worker(
        self,
        interval: Option<Duration>,
        mut rx: mpsc::Receiver<Command>,
    ) -> Result<(), SyncError> {
        self.load_launch_data().await?;

        let Some(interval) = interval else {
            if let Some(cmd) = rx.recv().await {
                tracing::info!(?cmd, "sync worker stopping");
            }
            return Ok(());
        };

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately and the initial load already ran.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.load_launch_data().await {
                        tracing::warn!(error = %e, ?interval, "periodic refresh failed, keeping previous launch data");
                    }
                }
                cmd = rx.recv() => {
                    match cmd {
                        Some(Command::Shutdown) | None => {
                            tracing::info!("sync worker stopping");
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}
