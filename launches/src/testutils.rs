use crate::catalog::{
    CatalogError, CatalogPage, CatalogQuery, LaunchCatalog, RawLaunch, RawPayload, RawRocket,
};
use crate::store::{LaunchFilter, LaunchPatch, LaunchStore, StoreError, UpdateResult, UpsertOutcome};
use crate::types::{FlightNumber, Launch};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

pub fn launch(flight_number: FlightNumber, mission: &str) -> Launch {
    Launch {
        flight_number,
        mission: mission.into(),
        rocket: "NCC 1701-D".into(),
        target: Some("Kepler-62 f".into()),
        launch_date: Utc.with_ymd_and_hms(2028, 1, 4, 0, 0, 0).unwrap(),
        customers: vec!["Zero to Mastery".into(), "NASA".into()],
        upcoming: true,
        success: true,
    }
}

pub fn raw_launch(flight_number: FlightNumber, name: &str) -> RawLaunch {
    RawLaunch {
        flight_number: Some(flight_number),
        name: Some(name.into()),
        rocket: Some(RawRocket {
            name: Some("NCC 1701-D".into()),
        }),
        target: Some("Kepler-62 f".into()),
        date_local: Some("January 4, 2028".into()),
        payloads: vec![RawPayload {
            customers: vec!["GMDT".into(), "ALNADJAH".into()],
        }],
        upcoming: true,
        success: Some(true),
    }
}

/// In-memory catalog serving fixed records, slicing them the way the HTTP
/// catalog paginates.
#[derive(Clone)]
pub struct StaticCatalog {
    records: Arc<Vec<RawLaunch>>,
    requested: Arc<Mutex<Vec<u64>>>,
    failing_page: Option<u64>,
    delay: Option<Duration>,
    reported_total: Option<u64>,
}

impl StaticCatalog {
    pub fn new(records: Vec<RawLaunch>) -> Self {
        StaticCatalog {
            records: Arc::new(records),
            requested: Arc::new(Mutex::new(Vec::new())),
            failing_page: None,
            delay: None,
            reported_total: None,
        }
    }

    pub fn failing_on_page(mut self, page: u64) -> Self {
        self.failing_page = Some(page);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Claims `total` records regardless of how many are actually served.
    pub fn with_reported_total(mut self, total: u64) -> Self {
        self.reported_total = Some(total);
        self
    }

    pub fn requested_pages(&self) -> Vec<u64> {
        self.requested.lock().clone()
    }
}

#[async_trait]
impl LaunchCatalog for StaticCatalog {
    async fn fetch_page(&self, query: CatalogQuery) -> Result<CatalogPage, CatalogError> {
        self.requested.lock().push(query.page);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_page == Some(query.page) {
            return Err(CatalogError::RetriesExceeded);
        }

        let start = ((query.page - 1) * query.limit) as usize;
        let records = self
            .records
            .iter()
            .skip(start)
            .take(query.limit as usize)
            .cloned()
            .collect();

        Ok(CatalogPage {
            total_records: self
                .reported_total
                .unwrap_or(self.records.len() as u64),
            records,
        })
    }
}

/// Store whose backend is always down.
pub struct FailingStore;

fn unavailable() -> StoreError {
    StoreError::Unavailable("connection refused".into())
}

#[async_trait]
impl LaunchStore for FailingStore {
    async fn find_one(&self, _filter: &LaunchFilter) -> Result<Option<Launch>, StoreError> {
        Err(unavailable())
    }

    async fn find_many(
        &self,
        _filter: &LaunchFilter,
        _skip: u64,
        _limit: u64,
    ) -> Result<Vec<Launch>, StoreError> {
        Err(unavailable())
    }

    async fn upsert(
        &self,
        _flight_number: FlightNumber,
        _launch: Launch,
    ) -> Result<UpsertOutcome, StoreError> {
        Err(unavailable())
    }

    async fn update_fields(
        &self,
        _flight_number: FlightNumber,
        _patch: &LaunchPatch,
    ) -> Result<UpdateResult, StoreError> {
        Err(unavailable())
    }

    async fn max_flight_number(&self) -> Result<FlightNumber, StoreError> {
        Err(unavailable())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Err(unavailable())
    }
}

/// Store that never answers, for exercising timeouts.
pub struct StalledStore;

#[async_trait]
impl LaunchStore for StalledStore {
    async fn find_one(&self, _filter: &LaunchFilter) -> Result<Option<Launch>, StoreError> {
        std::future::pending().await
    }

    async fn find_many(
        &self,
        _filter: &LaunchFilter,
        _skip: u64,
        _limit: u64,
    ) -> Result<Vec<Launch>, StoreError> {
        std::future::pending().await
    }

    async fn upsert(
        &self,
        _flight_number: FlightNumber,
        _launch: Launch,
    ) -> Result<UpsertOutcome, StoreError> {
        std::future::pending().await
    }

    async fn update_fields(
        &self,
        _flight_number: FlightNumber,
        _patch: &LaunchPatch,
    ) -> Result<UpdateResult, StoreError> {
        std::future::pending().await
    }

    async fn max_flight_number(&self) -> Result<FlightNumber, StoreError> {
        std::future::pending().await
    }

    async fn count(&self) -> Result<u64, StoreError> {
        std::future::pending().await
    }
}
