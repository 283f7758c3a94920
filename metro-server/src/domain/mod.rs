//! Domain types for the metro network.
//!
//! Identifiers validate at construction and station lists keep their
//! numeric order at every mutation, so code that receives these types can
//! trust their invariants without re-checking.

mod error;
mod line;
mod station;
mod suspension;
mod trip;

pub use error::{DomainError, parse_clock_time};
pub use line::{
    InvalidLineId, LINE_ID_PREFIX, LineId, MIN_ACTIVE_STATIONS, MetroLine, StationList,
    SuspensionMirror,
};
pub use station::{InvalidStationId, STATION_ID_PREFIX, Station, StationId};
pub use suspension::{SUSPENSION_ID_PREFIX, Suspension, SuspensionId};
pub use trip::{Direction, InvalidTripId, Trip, TripId, TripSegment};

/// Current local wall-clock time, used for record timestamps.
pub fn now() -> chrono::NaiveDateTime {
    chrono::Local::now().naive_local()
}
