//! Domain error types.
//!
//! These errors represent validation failures of identifiers and times
//! supplied from outside the core. They are distinct from store errors.

use super::{InvalidLineId, InvalidStationId, InvalidTripId};

/// Domain-level validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    #[error(transparent)]
    Station(#[from] InvalidStationId),

    #[error(transparent)]
    Line(#[from] InvalidLineId),

    #[error(transparent)]
    Trip(#[from] InvalidTripId),

    /// A clock time that is not `HH:MM` or `HH:MM:SS`
    #[error("invalid time: {0}")]
    InvalidTime(String),
}

/// Parse an `HH:MM` or `HH:MM:SS` clock time.
pub fn parse_clock_time(s: &str) -> Result<chrono::NaiveTime, DomainError> {
    let s = s.trim();
    chrono::NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| chrono::NaiveTime::parse_from_str(s, "%H:%M"))
        .map_err(|_| DomainError::InvalidTime(s.to_string()))
}
