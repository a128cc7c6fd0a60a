use crate::metrics_defs::{LAUNCHES_ABORTED, LAUNCHES_SCHEDULED};
use crate::pagination::{PaginationParams, get_pagination};
use crate::planets::PlanetLookup;
use crate::store::{LaunchFilter, LaunchPatch, LaunchStore, StoreError};
use crate::types::{AbortStatus, FlightNumber, Launch, ScheduleRequest, parse_launch_date};
use shared::counter;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub const MISSING_LAUNCH_PROPERTY: &str = "Missing required launch property";
pub const INVALID_LAUNCH_DATE: &str = "Invalid launch date";
pub const NO_MATCHING_PLANET: &str = "No matching planet found";
pub const LAUNCH_NOT_FOUND: &str = "Launch not found";
pub const LAUNCH_NOT_ABORTED: &str = "Launch not aborted";
pub const FLIGHT_NUMBERS_EXHAUSTED: &str = "No flight number available";

/// Customers attached to every locally scheduled launch.
pub const BASE_CUSTOMERS: &[&str] = &["Zero to Mastery", "NASA"];

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum LaunchError {
    #[error("{0}")]
    Validation(&'static str),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(&'static str),
    #[error("launch store error: {0}")]
    Store(#[from] StoreError),
    #[error("launch store did not answer within {0:?}")]
    Timeout(Duration),
}

impl LaunchError {
    /// Store faults and timeouts may clear up; client errors will not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LaunchError::Store(_) | LaunchError::Timeout(_))
    }
}

/// Validates and applies client-driven launch changes.
///
/// New flight numbers are derived from the current maximum in the store. The
/// read-then-write is serialized by `create_lock`, which makes this process
/// the single writer of new flight numbers. Several processes sharing one
/// store can still race and must coordinate through the store instead.
pub struct LaunchScheduler {
    store: Arc<dyn LaunchStore>,
    planets: Arc<PlanetLookup>,
    timeout: Duration,
    create_lock: Mutex<()>,
}

impl LaunchScheduler {
    pub fn new(store: Arc<dyn LaunchStore>, planets: Arc<PlanetLookup>, timeout: Duration) -> Self {
        LaunchScheduler {
            store,
            planets,
            timeout,
            create_lock: Mutex::new(()),
        }
    }

    pub async fn schedule(&self, request: ScheduleRequest) -> Result<Launch, LaunchError> {
        let (Some(mission), Some(rocket), Some(target), Some(launch_date)) = (
            present(request.mission),
            present(request.rocket),
            present(request.target),
            present(request.launch_date),
        ) else {
            return Err(LaunchError::Validation(MISSING_LAUNCH_PROPERTY));
        };

        let launch_date =
            parse_launch_date(&launch_date).ok_or(LaunchError::Validation(INVALID_LAUNCH_DATE))?;

        if !self.planets.exists(&target) {
            return Err(LaunchError::NotFound(NO_MATCHING_PLANET));
        }

        let _guard = self.create_lock.lock().await;

        let flight_number = self
            .bounded(self.store.max_flight_number())
            .await?
            .checked_add(1)
            .ok_or(LaunchError::Conflict(FLIGHT_NUMBERS_EXHAUSTED))?;
        let launch = Launch {
            flight_number,
            mission,
            rocket,
            target: Some(target),
            launch_date,
            customers: BASE_CUSTOMERS.iter().map(|c| c.to_string()).collect(),
            upcoming: true,
            success: true,
        };

        self.bounded(self.store.upsert(flight_number, launch.clone()))
            .await?;

        counter!(LAUNCHES_SCHEDULED).increment(1);
        tracing::info!(
            flight_number,
            mission = %launch.mission,
            planet = launch.target.as_deref().unwrap_or_default(),
            "launch scheduled"
        );
        Ok(launch)
    }

    pub async fn exists_with_id(&self, flight_number: FlightNumber) -> Result<bool, LaunchError> {
        let found = self
            .bounded(self.store.find_one(&LaunchFilter::flight_number(flight_number)))
            .await?;
        Ok(found.is_some())
    }

    pub async fn abort(&self, flight_number: FlightNumber) -> Result<AbortStatus, LaunchError> {
        if !self.exists_with_id(flight_number).await? {
            return Err(LaunchError::NotFound(LAUNCH_NOT_FOUND));
        }

        let result = self
            .bounded(
                self.store
                    .update_fields(flight_number, &LaunchPatch::aborted()),
            )
            .await?;

        // An already-aborted launch matches but changes nothing.
        if result.modified == 0 {
            tracing::debug!(flight_number, matched = result.matched, "abort had no effect");
            return Err(LaunchError::Conflict(LAUNCH_NOT_ABORTED));
        }

        counter!(LAUNCHES_ABORTED).increment(1);
        tracing::info!(flight_number, "launch aborted");
        Ok(AbortStatus { ok: true })
    }

    pub async fn get_all(&self, params: &PaginationParams) -> Result<Vec<Launch>, LaunchError> {
        let pagination = get_pagination(params);
        self.bounded(self.store.find_many(
            &LaunchFilter::all(),
            pagination.skip,
            pagination.limit,
        ))
        .await
    }

    async fn bounded<F, T>(&self, fut: F) -> Result<T, LaunchError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                tracing::warn!(timeout = ?self.timeout, "launch store timed out");
                Err(LaunchError::Timeout(self.timeout))
            }
        }
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
