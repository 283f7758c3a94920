//! Scheduling configuration.

use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};

/// Which lines get their trips regenerated after a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegenerationScope {
    /// Every line in the network, so readers always see one consistent
    /// snapshot of the whole timetable.
    Global,
    /// Only the line that was mutated.
    PerLine,
}

/// Configuration parameters for trip generation and trip search.
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// Turnaround between one trip's arrival and the next departure (minutes).
    pub trip_interval_mins: i64,

    /// Latest departure time a generated trip may have (inclusive).
    pub last_departure: NaiveTime,

    /// Frequency used when a line's frequency text has no usable number.
    pub default_frequency_mins: u32,

    /// How far a trip's departure may be from the requested time in
    /// trip search (minutes, inclusive).
    pub search_tolerance_mins: i64,

    /// Scope after adding, removing or inserting a station.
    pub topology_scope: RegenerationScope,

    /// Scope after a field update of a line.
    pub update_scope: RegenerationScope,
}

impl ScheduleConfig {
    /// Returns the trip interval as a Duration.
    pub fn trip_interval(&self) -> Duration {
        Duration::minutes(self.trip_interval_mins)
    }

    /// Returns the search tolerance as a Duration.
    pub fn search_tolerance(&self) -> Duration {
        Duration::minutes(self.search_tolerance_mins)
    }

    /// Set a different last departure time.
    pub fn with_last_departure(mut self, last_departure: NaiveTime) -> Self {
        self.last_departure = last_departure;
        self
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            trip_interval_mins: 10,
            last_departure: NaiveTime::from_hms_opt(22, 0, 0).unwrap_or_default(),
            default_frequency_mins: 10,
            search_tolerance_mins: 15,
            topology_scope: RegenerationScope::Global,
            update_scope: RegenerationScope::PerLine,
        }
    }
}
