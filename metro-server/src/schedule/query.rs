//! Trip queries over generated timetables.

use chrono::{Duration, NaiveTime};

use crate::domain::{StationId, Trip};

/// Trips calling at a station, trimmed to the segments touching it.
pub fn trips_at_station(trips: &[Trip], station: &StationId) -> Vec<Trip> {
    trips
        .iter()
        .filter(|trip| trip.calls_at(station))
        .map(|trip| Trip {
            segments: trip
                .segments
                .iter()
                .filter(|s| s.touches(station))
                .cloned()
                .collect(),
            ..trip.clone()
        })
        .collect()
}

/// A trip search between two stations.
#[derive(Debug, Clone)]
pub struct TripSearch<'a> {
    pub from: &'a StationId,
    pub to: &'a StationId,
    /// Requested departure time at `from`; `None` disables the time filter.
    pub approximate_time: Option<NaiveTime>,
    pub tolerance: Duration,
}

impl TripSearch<'_> {
    /// Whether a trip travels from `from` to `to` near the requested time.
    ///
    /// The trip must leave `from` on a segment no later than the segment
    /// that arrives at `to`. Adjacent stations share that segment and so
    /// match, unlike a strict boarding-before-alighting index check. When a time is given, the departure from
    /// `from` must be within the tolerance either side of it.
    pub fn matches(&self, trip: &Trip) -> bool {
        let board = trip
            .segments
            .iter()
            .rposition(|s| &s.from_station_id == self.from);
        let alight = trip
            .segments
            .iter()
            .rposition(|s| &s.to_station_id == self.to);

        let (Some(board), Some(alight)) = (board, alight) else {
            return false;
        };
        if board > alight {
            return false;
        }

        match self.approximate_time {
            Some(approx) => {
                let offset = trip.segments[board].departure_time.signed_duration_since(approx);
                offset <= self.tolerance && -offset <= self.tolerance
            }
            None => true,
        }
    }

    /// All matching trips, in input order.
    pub fn run(&self, trips: &[Trip]) -> Vec<Trip> {
        trips.iter().filter(|t| self.matches(t)).cloned().collect()
    }
}
