use crate::types::{FlightNumber, Launch};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// First flight number handed out when no launch has been stored yet.
pub const FLIGHT_NUMBER_BASELINE: FlightNumber = 100;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("launch store unavailable: {0}")]
    Unavailable(String),
}

/// Selects launches. Unset fields match everything.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LaunchFilter {
    pub flight_number: Option<FlightNumber>,
    pub upcoming: Option<bool>,
}

impl LaunchFilter {
    pub fn all() -> Self {
        LaunchFilter::default()
    }

    pub fn flight_number(flight_number: FlightNumber) -> Self {
        LaunchFilter {
            flight_number: Some(flight_number),
            ..Default::default()
        }
    }

    pub fn upcoming(mut self, upcoming: bool) -> Self {
        self.upcoming = Some(upcoming);
        self
    }

    pub fn matches(&self, launch: &Launch) -> bool {
        self.flight_number
            .is_none_or(|flight_number| launch.flight_number == flight_number)
            && self.upcoming.is_none_or(|upcoming| launch.upcoming == upcoming)
    }
}

/// Named fields to merge into an existing launch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LaunchPatch {
    pub upcoming: Option<bool>,
    pub success: Option<bool>,
}

impl LaunchPatch {
    pub fn aborted() -> Self {
        LaunchPatch {
            upcoming: Some(false),
            success: Some(false),
        }
    }

    /// Applies the patch and reports whether any value changed.
    pub fn apply(&self, launch: &mut Launch) -> bool {
        let mut changed = false;
        if let Some(upcoming) = self.upcoming {
            changed |= launch.upcoming != upcoming;
            launch.upcoming = upcoming;
        }
        if let Some(success) = self.success {
            changed |= launch.success != success;
            launch.success = success;
        }
        changed
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateResult {
    pub matched: u64,
    pub modified: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Document collection of launches keyed by flight number.
///
/// Every write is atomic for the document it touches: readers observe either
/// the old or the new record, never a mix.
#[async_trait]
pub trait LaunchStore: Send + Sync {
    async fn find_one(&self, filter: &LaunchFilter) -> Result<Option<Launch>, StoreError>;

    /// Matching launches in ascending flight number order. A `limit` of 0
    /// returns everything after `skip`.
    async fn find_many(
        &self,
        filter: &LaunchFilter,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Launch>, StoreError>;

    /// Overwrites the launch stored under `flight_number`, or inserts it.
    async fn upsert(
        &self,
        flight_number: FlightNumber,
        launch: Launch,
    ) -> Result<UpsertOutcome, StoreError>;

    async fn update_fields(
        &self,
        flight_number: FlightNumber,
        patch: &LaunchPatch,
    ) -> Result<UpdateResult, StoreError>;

    /// Highest stored flight number, or `FLIGHT_NUMBER_BASELINE - 1` when empty.
    async fn max_flight_number(&self) -> Result<FlightNumber, StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;
}

/// In-process launch collection.
#[derive(Default)]
pub struct MemoryLaunchStore {
    launches: RwLock<BTreeMap<FlightNumber, Launch>>,
}

impl MemoryLaunchStore {
    pub fn new() -> Self {
        MemoryLaunchStore::default()
    }
}

#[async_trait]
impl LaunchStore for MemoryLaunchStore {
    async fn find_one(&self, filter: &LaunchFilter) -> Result<Option<Launch>, StoreError> {
        let read_guard = self.launches.read();

        let found = match filter.flight_number {
            Some(flight_number) => read_guard
                .get(&flight_number)
                .filter(|launch| filter.matches(launch)),
            None => read_guard.values().find(|launch| filter.matches(launch)),
        };

        Ok(found.cloned())
    }

    async fn find_many(
        &self,
        filter: &LaunchFilter,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Launch>, StoreError> {
        let skip = usize::try_from(skip).unwrap_or(usize::MAX);
        let limit = match limit {
            0 => usize::MAX,
            n => usize::try_from(n).unwrap_or(usize::MAX),
        };

        let read_guard = self.launches.read();
        Ok(read_guard
            .values()
            .filter(|launch| filter.matches(launch))
            .skip(skip)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn upsert(
        &self,
        flight_number: FlightNumber,
        mut launch: Launch,
    ) -> Result<UpsertOutcome, StoreError> {
        launch.flight_number = flight_number;

        let mut write_guard = self.launches.write();
        match write_guard.insert(flight_number, launch) {
            Some(_) => Ok(UpsertOutcome::Updated),
            None => Ok(UpsertOutcome::Inserted),
        }
    }

    async fn update_fields(
        &self,
        flight_number: FlightNumber,
        patch: &LaunchPatch,
    ) -> Result<UpdateResult, StoreError> {
        let mut write_guard = self.launches.write();
        let Some(launch) = write_guard.get_mut(&flight_number) else {
            return Ok(UpdateResult::default());
        };

        let modified = patch.apply(launch);
        Ok(UpdateResult {
            matched: 1,
            modified: u64::from(modified),
        })
    }

    async fn max_flight_number(&self) -> Result<FlightNumber, StoreError> {
        let read_guard = self.launches.read();
        Ok(read_guard
            .keys()
            .next_back()
            .copied()
            .unwrap_or(FLIGHT_NUMBER_BASELINE - 1))
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.launches.read().len() as u64)
    }
}
