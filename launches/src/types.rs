use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

pub type FlightNumber = u64;

/// One tracked launch attempt, keyed by its flight number.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Launch {
    pub flight_number: FlightNumber,
    pub mission: String,
    pub rocket: String,
    // Synchronized launches are not tied to a habitable planet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub launch_date: DateTime<Utc>,
    #[serde(default)]
    pub customers: Vec<String>,
    pub upcoming: bool,
    #[serde(default = "default_success")]
    pub success: bool,
}

fn default_success() -> bool {
    true
}

/// A destination that launches may target.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Planet {
    pub kepler_name: String,
}

impl Planet {
    pub fn new<N: Into<String>>(kepler_name: N) -> Self {
        Planet {
            kepler_name: kepler_name.into(),
        }
    }
}

/// Body of a client request to schedule a launch. Every field is optional at
/// this layer so that missing properties are reported by the scheduler rather
/// than by deserialization.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRequest {
    pub mission: Option<String>,
    pub rocket: Option<String>,
    pub target: Option<String>,
    pub launch_date: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct AbortStatus {
    pub ok: bool,
}

// %B also accepts the abbreviated month name when parsing.
const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%B %d, %Y %H:%M:%S",
    "%B %d, %Y %H:%M",
];
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
];

/// Parses the date formats launch records arrive in. Dates without a time of
/// day resolve to midnight UTC.
pub fn parse_launch_date(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in DATE_TIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Some(naive.and_utc());
        }
    }

    DATE_FORMATS.iter().find_map(|format| {
        NaiveDate::parse_from_str(input, format)
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    })
}
