//! In-memory store.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::domain::{LineId, MetroLine, Station, StationId, Suspension, SuspensionId, Trip};

use super::{LineStore, StationStore, StoreError, SuspensionStore, TripStore};

/// Thread-safe in-memory implementation of every store trait.
///
/// Each collection sits behind its own lock, so a reader may observe one
/// collection updated and another not yet; callers that need a consistent
/// multi-record view must serialise their writes.
#[derive(Debug, Default)]
pub struct MemoryStore {
    stations: RwLock<BTreeMap<StationId, Station>>,
    lines: RwLock<BTreeMap<LineId, MetroLine>>,
    suspensions: RwLock<BTreeMap<SuspensionId, Suspension>>,
    trips: RwLock<HashMap<LineId, Vec<Trip>>>,
}

fn read<'a, T>(
    lock: &'a RwLock<T>,
    collection: &'static str,
) -> Result<RwLockReadGuard<'a, T>, StoreError> {
    lock.read().map_err(|_| StoreError::Poisoned { collection })
}

fn write<'a, T>(
    lock: &'a RwLock<T>,
    collection: &'static str,
) -> Result<RwLockWriteGuard<'a, T>, StoreError> {
    lock.write().map_err(|_| StoreError::Poisoned { collection })
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Line ids that currently own a trip collection.
    pub fn trip_collections(&self) -> Result<Vec<LineId>, StoreError> {
        let trips = read(&self.trips, "trips")?;
        let mut ids: Vec<LineId> = trips.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    fn filter_suspensions(
        &self,
        keep: impl Fn(&Suspension) -> bool,
    ) -> Result<Vec<Suspension>, StoreError> {
        let guard = read(&self.suspensions, "suspensions")?;
        Ok(guard.values().filter(|s| keep(s)).cloned().collect())
    }
}

impl StationStore for MemoryStore {
    fn station(&self, id: &StationId) -> Result<Option<Station>, StoreError> {
        Ok(read(&self.stations, "stations")?.get(id).cloned())
    }

    fn stations(&self) -> Result<Vec<Station>, StoreError> {
        Ok(read(&self.stations, "stations")?.values().cloned().collect())
    }

    fn stations_by_ids(&self, ids: &[StationId]) -> Result<Vec<Station>, StoreError> {
        let guard = read(&self.stations, "stations")?;
        Ok(ids.iter().filter_map(|id| guard.get(id).cloned()).collect())
    }

    fn save_station(&self, station: Station) -> Result<(), StoreError> {
        write(&self.stations, "stations")?.insert(station.station_id.clone(), station);
        Ok(())
    }

    fn delete_station(&self, id: &StationId) -> Result<bool, StoreError> {
        Ok(write(&self.stations, "stations")?.remove(id).is_some())
    }
}

impl LineStore for MemoryStore {
    fn line(&self, id: &LineId) -> Result<Option<MetroLine>, StoreError> {
        Ok(read(&self.lines, "lines")?.get(id).cloned())
    }

    fn lines(&self) -> Result<Vec<MetroLine>, StoreError> {
        Ok(read(&self.lines, "lines")?.values().cloned().collect())
    }

    fn lines_by_active(&self, active: bool) -> Result<Vec<MetroLine>, StoreError> {
        let guard = read(&self.lines, "lines")?;
        Ok(guard
            .values()
            .filter(|l| l.is_active == active)
            .cloned()
            .collect())
    }

    fn save_line(&self, line: MetroLine) -> Result<(), StoreError> {
        write(&self.lines, "lines")?.insert(line.line_id.clone(), line);
        Ok(())
    }

    fn delete_line(&self, id: &LineId) -> Result<bool, StoreError> {
        Ok(write(&self.lines, "lines")?.remove(id).is_some())
    }
}

impl SuspensionStore for MemoryStore {
    fn suspension(&self, id: &SuspensionId) -> Result<Option<Suspension>, StoreError> {
        Ok(read(&self.suspensions, "suspensions")?.get(id).cloned())
    }

    fn suspensions(&self) -> Result<Vec<Suspension>, StoreError> {
        self.filter_suspensions(|_| true)
    }

    fn suspensions_by_line(&self, line: &LineId) -> Result<Vec<Suspension>, StoreError> {
        self.filter_suspensions(|s| &s.metro_line_id == line)
    }

    fn suspensions_by_station(&self, station: &StationId) -> Result<Vec<Suspension>, StoreError> {
        self.filter_suspensions(|s| s.affects(station))
    }

    fn suspensions_by_active(&self, active: bool) -> Result<Vec<Suspension>, StoreError> {
        self.filter_suspensions(|s| s.is_active == active)
    }

    fn save_suspension(&self, suspension: Suspension) -> Result<(), StoreError> {
        write(&self.suspensions, "suspensions")?.insert(suspension.id.clone(), suspension);
        Ok(())
    }

    fn delete_suspension(&self, id: &SuspensionId) -> Result<bool, StoreError> {
        Ok(write(&self.suspensions, "suspensions")?.remove(id).is_some())
    }

    fn delete_suspensions_by_line(&self, line: &LineId) -> Result<usize, StoreError> {
        let mut guard = write(&self.suspensions, "suspensions")?;
        let before = guard.len();
        guard.retain(|_, s| &s.metro_line_id != line);
        Ok(before - guard.len())
    }
}

impl TripStore for MemoryStore {
    fn replace_trips(&self, line: &LineId, trips: Vec<Trip>) -> Result<(), StoreError> {
        write(&self.trips, "trips")?.insert(line.clone(), trips);
        Ok(())
    }

    fn trips(&self, line: &LineId) -> Result<Vec<Trip>, StoreError> {
        Ok(read(&self.trips, "trips")?
            .get(line)
            .cloned()
            .unwrap_or_default())
    }

    fn drop_trips(&self, line: &LineId) -> Result<(), StoreError> {
        write(&self.trips, "trips")?.remove(line);
        Ok(())
    }
}
