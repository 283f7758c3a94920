//! Trip-schedule generation.
//!
//! Derives a line's total duration from its station count and frequency,
//! synthesises the day's forward and return trips from it, and answers
//! queries over the resulting timetables.

mod config;
mod duration;
mod generator;
mod query;

pub use config::{RegenerationScope, ScheduleConfig};
pub use duration::{compute_total_duration, parse_frequency};
pub use generator::TripGenerator;
pub use query::{TripSearch, trips_at_station};
