//! Metrics definitions for the launches service.

use shared::metrics_defs::{MetricDef, MetricType};

pub const LAUNCH_SYNC_DURATION: MetricDef = MetricDef {
    name: "launches.sync.duration",
    metric_type: MetricType::Histogram,
    description: "Time to complete a catalog synchronization in seconds",
};

pub const LAUNCH_SYNC_RECORDS: MetricDef = MetricDef {
    name: "launches.sync.records",
    metric_type: MetricType::Histogram,
    description: "Number of launch records upserted by a catalog synchronization",
};

pub const LAUNCH_SYNC_FAILED: MetricDef = MetricDef {
    name: "launches.sync.failed",
    metric_type: MetricType::Counter,
    description: "Number of catalog synchronizations that failed",
};

pub const LAUNCHES_SCHEDULED: MetricDef = MetricDef {
    name: "launches.scheduled",
    metric_type: MetricType::Counter,
    description: "Number of launches scheduled by clients",
};

pub const LAUNCHES_ABORTED: MetricDef = MetricDef {
    name: "launches.aborted",
    metric_type: MetricType::Counter,
    description: "Number of launches aborted by clients",
};

pub const CATALOG_FETCH_RETRY: MetricDef = MetricDef {
    name: "catalog.fetch.retry",
    metric_type: MetricType::Counter,
    description: "Number of catalog page fetches retried after a transient failure",
};

pub const ALL_METRICS: &[MetricDef] = &[
    LAUNCH_SYNC_DURATION,
    LAUNCH_SYNC_RECORDS,
    LAUNCH_SYNC_FAILED,
    LAUNCHES_SCHEDULED,
    LAUNCHES_ABORTED,
    CATALOG_FETCH_RETRY,
];
