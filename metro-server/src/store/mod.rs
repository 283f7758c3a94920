//! Storage collaborators for the metro core.
//!
//! The core never talks to a database directly. It reads and writes
//! stations, lines, suspensions and per-line trip collections through the
//! traits below. Single-record operations are expected to be
//! read-your-writes consistent; nothing spans records atomically.

mod error;
mod memory;
mod snapshot;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use snapshot::{Snapshot, SnapshotFile};

use crate::domain::{LineId, MetroLine, Station, StationId, Suspension, SuspensionId, Trip};

/// Station records.
pub trait StationStore {
    fn station(&self, id: &StationId) -> Result<Option<Station>, StoreError>;

    /// All stations, ordered by id.
    fn stations(&self) -> Result<Vec<Station>, StoreError>;

    /// Stations with the given ids, in the order given. Unknown ids are skipped.
    fn stations_by_ids(&self, ids: &[StationId]) -> Result<Vec<Station>, StoreError>;

    /// Insert or replace a station.
    fn save_station(&self, station: Station) -> Result<(), StoreError>;

    /// Returns `false` if there was no such station.
    fn delete_station(&self, id: &StationId) -> Result<bool, StoreError>;
}

/// Metro line records.
pub trait LineStore {
    fn line(&self, id: &LineId) -> Result<Option<MetroLine>, StoreError>;

    fn lines(&self) -> Result<Vec<MetroLine>, StoreError>;

    fn lines_by_active(&self, active: bool) -> Result<Vec<MetroLine>, StoreError>;

    /// Insert or replace a line.
    fn save_line(&self, line: MetroLine) -> Result<(), StoreError>;

    /// Returns `false` if there was no such line.
    fn delete_line(&self, id: &LineId) -> Result<bool, StoreError>;
}

/// Suspension records.
pub trait SuspensionStore {
    fn suspension(&self, id: &SuspensionId) -> Result<Option<Suspension>, StoreError>;

    fn suspensions(&self) -> Result<Vec<Suspension>, StoreError>;

    fn suspensions_by_line(&self, line: &LineId) -> Result<Vec<Suspension>, StoreError>;

    /// Suspensions listing the station as affected.
    fn suspensions_by_station(&self, station: &StationId) -> Result<Vec<Suspension>, StoreError>;

    fn suspensions_by_active(&self, active: bool) -> Result<Vec<Suspension>, StoreError>;

    /// Insert or replace a suspension.
    fn save_suspension(&self, suspension: Suspension) -> Result<(), StoreError>;

    /// Returns `false` if there was no such suspension.
    fn delete_suspension(&self, id: &SuspensionId) -> Result<bool, StoreError>;

    /// Returns the number of suspensions deleted.
    fn delete_suspensions_by_line(&self, line: &LineId) -> Result<usize, StoreError>;
}

/// One owned trip collection per line.
pub trait TripStore {
    /// Replace the line's whole trip collection.
    fn replace_trips(&self, line: &LineId, trips: Vec<Trip>) -> Result<(), StoreError>;

    /// The line's trips; empty if it has no collection.
    fn trips(&self, line: &LineId) -> Result<Vec<Trip>, StoreError>;

    /// Drop the line's trip collection.
    fn drop_trips(&self, line: &LineId) -> Result<(), StoreError>;
}

/// Everything the metro core needs from storage.
pub trait MetroStore: StationStore + LineStore + SuspensionStore + TripStore {}

impl<T: StationStore + LineStore + SuspensionStore + TripStore + ?Sized> MetroStore for T {}
