pub mod api;
pub mod catalog;
pub mod config;
pub mod metrics_defs;
pub mod pagination;
pub mod planets;
pub mod scheduler;
pub mod service;
pub mod store;
pub mod sync;
pub mod types;

#[cfg(test)]
mod testutils;

use catalog::{CatalogError, HttpLaunchCatalog};
use config::{Config, ValidationError};
use planets::{PlanetError, PlanetLookup};
use service::{Command, LaunchOptions, LaunchService};
use shared::admin_service::AdminService;
use shared::http::{HttpServiceError, run_http_service};
use std::convert::Infallible;
use std::sync::Arc;
use store::MemoryLaunchStore;
use sync::SyncError;
use tokio::sync::mpsc;

#[derive(thiserror::Error, Debug)]
pub enum LaunchesError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ValidationError),
    #[error(transparent)]
    Planets(#[from] PlanetError),
    #[error("could not create catalog client: {0}")]
    Catalog(#[from] CatalogError),
    #[error("initial launch synchronization failed: {0}")]
    Sync(#[from] SyncError),
    #[error("API listener error: {0}")]
    Api(#[from] std::io::Error),
    #[error("admin listener error: {0}")]
    Admin(#[from] HttpServiceError),
    #[error("sync worker crashed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Runs the launches service until it fails or receives Ctrl-C.
///
/// The planet catalog is loaded before anything else. The API and admin
/// listeners start right away, while the sync worker performs the first
/// catalog synchronization in the background; `/ready` reports unavailable
/// until it succeeds. Failing that first synchronization stops the service.
pub async fn run(config: Config) -> Result<(), LaunchesError> {
    config.validate()?;

    let planets = Arc::new(PlanetLookup::load(&config.planets.path)?);
    let catalog = Arc::new(HttpLaunchCatalog::new(
        &config.catalog.url,
        config.catalog_timeout(),
    )?);
    let store = Arc::new(MemoryLaunchStore::new());
    let launches = LaunchService::new(store, catalog, planets, LaunchOptions::from(&config));

    // Channel to send commands to the sync worker.
    let (cmd_tx, cmd_rx) = mpsc::channel::<Command>(8);
    let mut worker = tokio::spawn(
        launches
            .clone()
            .run_sync_worker(config.refresh_interval(), cmd_rx),
    );

    let ready_handle = launches.clone();
    let admin_service = AdminService::<_, Infallible>::new(move || ready_handle.is_ready());
    let admin_task = run_http_service(
        &config.admin_listener.host,
        config.admin_listener.port,
        admin_service,
    );
    let api_task = api::serve(&config.listener, launches);

    tokio::select! {
        res = api_task => res?,
        res = admin_task => res?,
        res = &mut worker => res??,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received Ctrl-C, shutting down");
            let _ = cmd_tx.send(Command::Shutdown).await;
            worker.await??;
        }
    }

    Ok(())
}
