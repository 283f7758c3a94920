//! Data transfer objects for web requests and responses.
//!
//! Create and patch bodies reuse the request types of [`crate::network`];
//! only the shapes specific to HTTP live here.

use serde::{Deserialize, Serialize};

use crate::domain::StationId;

/// Query for station name search.
#[derive(Debug, Deserialize)]
pub struct StationSearchQuery {
    pub q: String,
}

/// Optional active/resolved filter.
#[derive(Debug, Default, Deserialize)]
pub struct ActiveQuery {
    pub active: Option<bool>,
}

/// Body for switching a line on or off.
#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    pub is_active: bool,
}

/// Body naming one station.
#[derive(Debug, Deserialize)]
pub struct StationRequest {
    pub station_id: StationId,
}

/// Body for inserting a station at a position hint.
#[derive(Debug, Deserialize)]
pub struct InsertStationRequest {
    pub station_id: StationId,
    pub position: usize,
}

/// Body naming several stations.
#[derive(Debug, Deserialize)]
pub struct StationsRequest {
    pub station_ids: Vec<StationId>,
}

/// Query for searching trips between two stations.
#[derive(Debug, Deserialize)]
pub struct TripSearchQuery {
    pub from: StationId,
    pub to: StationId,

    /// Approximate departure in HH:MM format
    pub time: Option<String>,
}

/// Body for regenerating every timetable.
#[derive(Debug, Default, Deserialize)]
pub struct RegenerateRequest {
    /// Last departure in HH:MM format (defaults to the configured one)
    pub last_departure: Option<String>,
}

/// Body for extending a suspension.
#[derive(Debug, Deserialize)]
pub struct ExtendRequest {
    pub additional_hours: u32,
}

/// A count of records affected by a bulk operation.
#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: usize,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trip_search_query_validates_station_ids() {
        let query: TripSearchQuery =
            serde_json::from_str(r#"{"from": "ST1", "to": "ST3", "time": "06:05"}"#).unwrap();
        assert_eq!(query.from.number(), 1);
        assert_eq!(query.time.as_deref(), Some("06:05"));

        let bad = serde_json::from_str::<TripSearchQuery>(r#"{"from": "central", "to": "ST3"}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn regenerate_body_is_optional() {
        let req: RegenerateRequest = serde_json::from_str("{}").unwrap();
        assert!(req.last_departure.is_none());
    }
}
