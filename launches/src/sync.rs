use crate::catalog::{CatalogError, CatalogPage, CatalogQuery, LaunchCatalog, RawLaunch};
use crate::metrics_defs::{LAUNCH_SYNC_DURATION, LAUNCH_SYNC_FAILED, LAUNCH_SYNC_RECORDS};
use crate::store::{LaunchStore, StoreError, UpsertOutcome};
use crate::types::{FlightNumber, Launch, parse_launch_date};
use shared::{counter, histogram};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{AcquireError, Semaphore};

#[derive(thiserror::Error, Debug)]
pub enum SyncError {
    #[error("launch data download failed: {0}")]
    Catalog(#[from] CatalogError),
    #[error("malformed launch record {index} on catalog page {page}: {reason}")]
    Projection {
        page: u64,
        index: usize,
        reason: String,
    },
    #[error("could not store launch {flight_number}: {source}")]
    Store {
        flight_number: FlightNumber,
        #[source]
        source: StoreError,
    },
    #[error("{operation} timed out after {limit:?}")]
    Timeout {
        operation: &'static str,
        limit: Duration,
    },
    #[error("synchronization lock closed")]
    LockClosed(#[from] AcquireError),
}

impl SyncError {
    /// Whether retrying the whole synchronization later can succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Catalog(e) => e.is_retryable(),
            SyncError::Timeout { .. } | SyncError::Store { .. } => true,
            SyncError::Projection { .. } | SyncError::LockClosed(_) => false,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncSummary {
    pub pages: u64,
    pub records: u64,
    pub inserted: u64,
    pub updated: u64,
}

/// Brings the launch store in line with the external catalog.
///
/// Pages are fetched one after another and every record is upserted by its
/// flight number, so running the synchronizer again against an unchanged
/// catalog leaves the store as it was. The first failure ends the run; upserts
/// from earlier pages stay in place until a later run succeeds.
pub struct LaunchSynchronizer {
    catalog: Arc<dyn LaunchCatalog>,
    store: Arc<dyn LaunchStore>,
    page_size: u64,
    // Bounds one `fetch_page` call, retries included.
    fetch_timeout: Duration,
    store_timeout: Duration,
    // Only one synchronization runs at a time.
    update_lock: Semaphore,
}

impl LaunchSynchronizer {
    pub fn new(
        catalog: Arc<dyn LaunchCatalog>,
        store: Arc<dyn LaunchStore>,
        page_size: u64,
        fetch_timeout: Duration,
        store_timeout: Duration,
    ) -> Self {
        LaunchSynchronizer {
            catalog,
            store,
            page_size: page_size.max(1),
            fetch_timeout,
            store_timeout,
            update_lock: Semaphore::new(1),
        }
    }

    pub async fn load_launch_data(&self) -> Result<SyncSummary, SyncError> {
        // Hold permit for the duration of this function
        let _permit = self.update_lock.acquire().await?;
        let started = Instant::now();

        let result = self.load_pages().await;

        match &result {
            Ok(summary) => {
                histogram!(LAUNCH_SYNC_DURATION).record(started.elapsed().as_secs_f64());
                histogram!(LAUNCH_SYNC_RECORDS).record(summary.records as f64);
                tracing::info!(
                    pages = summary.pages,
                    records = summary.records,
                    inserted = summary.inserted,
                    updated = summary.updated,
                    "launch data synchronized"
                );
            }
            Err(e) => {
                counter!(LAUNCH_SYNC_FAILED).increment(1);
                tracing::error!(error = %e, retryable = e.is_retryable(), "launch data synchronization failed");
            }
        }

        result
    }

    async fn load_pages(&self) -> Result<SyncSummary, SyncError> {
        let mut summary = SyncSummary::default();

        // The first page also tells us how many records there are in total.
        let first = self.fetch(1).await?;
        let total_records = first.total_records;
        let page_count = match first.records.is_empty() {
            true => 1,
            false => total_records.div_ceil(self.page_size).max(1),
        };
        tracing::debug!(
            total_records,
            page_count,
            "starting launch synchronization"
        );

        self.apply_page(1, first.records, &mut summary).await?;

        for page in 2..=page_count {
            let fetched = self.fetch(page).await?;
            if fetched.records.is_empty() {
                tracing::warn!(
                    page,
                    page_count,
                    total_records,
                    "catalog returned an empty page before its reported total, stopping"
                );
                break;
            }
            self.apply_page(page, fetched.records, &mut summary).await?;
        }

        Ok(summary)
    }

    async fn fetch(&self, page: u64) -> Result<CatalogPage, SyncError> {
        let query = CatalogQuery {
            page,
            limit: self.page_size,
        };
        let fetched = bounded(self.fetch_timeout, "catalog page fetch", self.catalog.fetch_page(query))
            .await??;
        Ok(fetched)
    }

    async fn apply_page(
        &self,
        page: u64,
        records: Vec<RawLaunch>,
        summary: &mut SyncSummary,
    ) -> Result<(), SyncError> {
        for (index, raw) in records.into_iter().enumerate() {
            let launch =
                project(raw).map_err(|reason| SyncError::Projection { page, index, reason })?;
            let flight_number = launch.flight_number;

            let outcome = bounded(
                self.store_timeout,
                "launch upsert",
                self.store.upsert(flight_number, launch),
            )
            .await?
            .map_err(|source| SyncError::Store {
                flight_number,
                source,
            })?;

            match outcome {
                UpsertOutcome::Inserted => summary.inserted += 1,
                UpsertOutcome::Updated => summary.updated += 1,
            }
            summary.records += 1;
        }
        summary.pages += 1;
        Ok(())
    }
}

async fn bounded<F, T>(limit: Duration, operation: &'static str, fut: F) -> Result<T, SyncError>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| SyncError::Timeout { operation, limit })
}

/// Maps a catalog record onto the local launch schema.
fn project(raw: RawLaunch) -> Result<Launch, String> {
    let flight_number = raw
        .flight_number
        .ok_or_else(|| "missing flight_number".to_string())?;
    let mission = raw
        .name
        .ok_or_else(|| format!("flight {flight_number}: missing name"))?;
    let rocket = raw
        .rocket
        .and_then(|rocket| rocket.name)
        .ok_or_else(|| format!("flight {flight_number}: missing rocket name"))?;
    let date_local = raw
        .date_local
        .ok_or_else(|| format!("flight {flight_number}: missing date_local"))?;
    let launch_date = parse_launch_date(&date_local)
        .ok_or_else(|| format!("flight {flight_number}: invalid date_local {date_local:?}"))?;

    let customers = raw
        .payloads
        .into_iter()
        .flat_map(|payload| payload.customers)
        .collect();

    Ok(Launch {
        flight_number,
        mission,
        rocket,
        target: raw.target,
        launch_date,
        customers,
        upcoming: raw.upcoming,
        success: raw.success.unwrap_or(true),
    })
}
