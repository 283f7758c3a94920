//! Trip timetable generation.
//!
//! A line's trips are a pure projection of its station list, total duration
//! and first departure. Generation runs two independent passes starting at
//! the same first departure: one over the stored station order, one over
//! the reversed order. Within a pass each trip departs `trip_interval`
//! after the previous trip arrived, for as long as the departure is not
//! after the last departure time.
//!
//! The service day ends at midnight: a pass stops once its clock would
//! wrap past 24:00, so a long line can never loop forever.

use chrono::{Duration, NaiveTime};
use tracing::{debug, warn};

use crate::domain::{Direction, LineId, MetroLine, StationId, Trip, TripId, TripSegment};
use crate::store::{StoreError, TripStore};

use super::config::ScheduleConfig;

/// Builds trip timetables for lines.
#[derive(Debug, Clone, Copy)]
pub struct TripGenerator<'a> {
    config: &'a ScheduleConfig,
}

impl<'a> TripGenerator<'a> {
    pub fn new(config: &'a ScheduleConfig) -> Self {
        Self { config }
    }

    /// Generate the forward and return trips of a line.
    ///
    /// Lines with fewer than two stations, or without a first departure,
    /// have no trips. Forward trips come first, each pass in departure
    /// order.
    pub fn generate(&self, line: &MetroLine, last_departure: NaiveTime) -> Vec<Trip> {
        let stations = line.station_ids().as_slice();
        if stations.len() < 2 {
            return Vec::new();
        }

        let Some(first_departure) = line.first_departure.map(|dt| dt.time()) else {
            warn!(line = %line.line_id, "Line has no first departure, no trips generated");
            return Vec::new();
        };

        let hops = stations.len() as u32 - 1;
        let segment_mins = line.total_duration() / hops;

        let pass = Pass {
            line_id: &line.line_id,
            first_departure,
            last_departure,
            segment: Duration::minutes(i64::from(segment_mins)),
            segment_mins,
            interval: self.config.trip_interval(),
        };

        let reversed: Vec<StationId> = stations.iter().rev().cloned().collect();

        let mut trips = pass.run(stations, Direction::Forward);
        trips.extend(pass.run(&reversed, Direction::Return));

        debug!(line = %line.line_id, trips = trips.len(), segment_mins, "Generated trips");
        trips
    }

    /// Regenerate a line's stored trips.
    ///
    /// The previous trip set is dropped before the new one is inserted.
    /// Readers between the two steps observe an empty set; the store offers
    /// no cross-step atomicity.
    pub fn regenerate<S: TripStore + ?Sized>(
        &self,
        store: &S,
        line: &MetroLine,
        last_departure: NaiveTime,
    ) -> Result<Vec<Trip>, StoreError> {
        store.drop_trips(&line.line_id)?;
        let trips = self.generate(line, last_departure);
        if !trips.is_empty() {
            store.replace_trips(&line.line_id, trips.clone())?;
        }
        Ok(trips)
    }
}

/// Parameters shared by one direction's generation pass.
struct Pass<'a> {
    line_id: &'a LineId,
    first_departure: NaiveTime,
    last_departure: NaiveTime,
    segment: Duration,
    segment_mins: u32,
    interval: Duration,
}

impl Pass<'_> {
    fn run(&self, stations: &[StationId], direction: Direction) -> Vec<Trip> {
        let mut trips = Vec::new();
        let mut departure = self.first_departure;

        while departure <= self.last_departure {
            let (trip, crossed_midnight) = self.build_trip(stations, departure, direction);
            let (next, wrapped) = trip.arrival_time.overflowing_add_signed(self.interval);
            trips.push(trip);

            if crossed_midnight || wrapped != 0 || next <= departure {
                break;
            }
            departure = next;
        }

        trips
    }

    /// Build one trip. Also reports whether its clock crossed midnight.
    fn build_trip(
        &self,
        stations: &[StationId],
        departure: NaiveTime,
        direction: Direction,
    ) -> (Trip, bool) {
        let mut clock = departure;
        let mut crossed_midnight = false;

        let segments = stations
            .windows(2)
            .map(|pair| {
                let (arrival, wrapped) = clock.overflowing_add_signed(self.segment);
                crossed_midnight |= wrapped != 0;
                let segment = TripSegment {
                    from_station_id: pair[0].clone(),
                    to_station_id: pair[1].clone(),
                    departure_time: clock,
                    arrival_time: arrival,
                    duration_minutes: self.segment_mins,
                };
                clock = arrival;
                segment
            })
            .collect();

        let trip = Trip {
            trip_id: TripId::new(self.line_id, departure, direction),
            line_id: self.line_id.clone(),
            departure_time: departure,
            arrival_time: clock,
            direction,
            segments,
        };
        (trip, crossed_midnight)
    }
}
