//! Station directory.

use serde::Deserialize;
use tracing::info;

use crate::domain::{MetroLine, Station, StationId, now};
use crate::store::{LineStore, StationStore};

use super::error::NetworkError;

/// Maximum edit distance for a fuzzy station name match.
const MAX_NAME_DISTANCE: usize = 2;

/// Request to create a station.
#[derive(Debug, Clone, Deserialize)]
pub struct NewStation {
    /// Assigned as the next `ST<n>` when absent.
    #[serde(default)]
    pub station_id: Option<StationId>,
    pub station_name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub map_marker: Option<String>,
}

/// Fields to change on a station; `None` leaves a field as is.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StationPatch {
    pub station_name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub map_marker: Option<String>,
}

/// Station identity, name and location lookups.
pub struct StationDirectory<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: StationStore + LineStore + ?Sized> StationDirectory<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn get_station(&self, id: &StationId) -> Result<Station, NetworkError> {
        self.store
            .station(id)?
            .ok_or_else(|| NetworkError::StationNotFound(id.clone()))
    }

    pub fn list_stations(&self) -> Result<Vec<Station>, NetworkError> {
        Ok(self.store.stations()?)
    }

    pub fn create_station(&self, new: NewStation) -> Result<Station, NetworkError> {
        let station_id = match new.station_id {
            Some(id) => {
                if self.store.station(&id)?.is_some() {
                    return Err(NetworkError::DuplicateStation(id));
                }
                id
            }
            None => self.next_station_id()?,
        };

        let now = now();
        let station = Station {
            station_id,
            station_name: new.station_name,
            latitude: new.latitude,
            longitude: new.longitude,
            map_marker: new.map_marker,
            created_at: now,
            updated_at: now,
        };
        self.store.save_station(station.clone())?;
        info!(station = %station.station_id, name = %station.station_name, "Station created");
        Ok(station)
    }

    pub fn update_station(&self, id: &StationId, patch: StationPatch) -> Result<Station, NetworkError> {
        let mut station = self.get_station(id)?;
        if let Some(name) = patch.station_name {
            station.station_name = name;
        }
        if let Some(latitude) = patch.latitude {
            station.latitude = latitude;
        }
        if let Some(longitude) = patch.longitude {
            station.longitude = longitude;
        }
        if let Some(marker) = patch.map_marker {
            station.map_marker = Some(marker);
        }
        station.updated_at = now();
        self.store.save_station(station.clone())?;
        Ok(station)
    }

    /// Delete a station record. Lines listing it keep the id and skip it
    /// when resolving their stations.
    pub fn delete_station(&self, id: &StationId) -> Result<(), NetworkError> {
        if !self.store.delete_station(id)? {
            return Err(NetworkError::StationNotFound(id.clone()));
        }
        info!(station = %id, "Station deleted");
        Ok(())
    }

    /// Stations whose name contains the query, or is within a small edit
    /// distance of it. Case-insensitive.
    pub fn search_stations(&self, query: &str) -> Result<Vec<Station>, NetworkError> {
        let query = query.trim().to_lowercase();
        Ok(self
            .store
            .stations()?
            .into_iter()
            .filter(|s| {
                let name = s.station_name.to_lowercase();
                name.contains(&query) || strsim::levenshtein(&name, &query) <= MAX_NAME_DISTANCE
            })
            .collect())
    }

    pub fn stations_by_marker(&self, marker: &str) -> Result<Vec<Station>, NetworkError> {
        Ok(self
            .store
            .stations()?
            .into_iter()
            .filter(|s| s.map_marker.as_deref() == Some(marker))
            .collect())
    }

    /// Every line whose station list includes the station.
    pub fn lines_for_station(&self, id: &StationId) -> Result<Vec<MetroLine>, NetworkError> {
        Ok(self
            .store
            .lines()?
            .into_iter()
            .filter(|l| l.station_ids().contains(id))
            .collect())
    }

    fn next_station_id(&self) -> Result<StationId, NetworkError> {
        let max = self
            .store
            .stations()?
            .iter()
            .map(|s| s.station_id.number())
            .max()
            .unwrap_or(0);
        Ok(StationId::from_number(max + 1))
    }
}
