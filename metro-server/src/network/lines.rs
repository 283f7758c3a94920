//! Line topology management.
//!
//! Every station list change goes through [`LineManager`], which recomputes
//! the line's total duration, saves the line and only then regenerates
//! trips. Add, remove and insert rebuild trips with the configured
//! topology scope; `update_line` uses the update scope.

use chrono::NaiveDateTime;
use serde::Deserialize;
use tracing::{debug, info};

use crate::domain::{LineId, MetroLine, Station, StationId, StationList, now};
use crate::schedule::{RegenerationScope, ScheduleConfig, compute_total_duration};
use crate::store::MetroStore;

use super::error::NetworkError;
use super::timetable::Timetable;

/// Request to create a line.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewLine {
    /// Assigned as the next `LN<n>` when absent.
    #[serde(default)]
    pub line_id: Option<LineId>,
    pub line_name: String,
    #[serde(default)]
    pub station_ids: Vec<StationId>,
    #[serde(default)]
    pub first_departure: Option<NaiveDateTime>,
    #[serde(default)]
    pub frequency_minutes: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Fields to change on a line; `None` leaves a field as is.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LinePatch {
    pub line_name: Option<String>,
    pub station_ids: Option<Vec<StationId>>,
    pub first_departure: Option<NaiveDateTime>,
    pub frequency_minutes: Option<String>,
    pub is_active: Option<bool>,
}

/// What an update actually changed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Changes {
    frequency: bool,
    stations: bool,
    first_departure: bool,
    other: bool,
}

impl Changes {
    fn affects_duration(self) -> bool {
        self.frequency || self.stations
    }

    fn affects_trips(self) -> bool {
        self.frequency || self.stations || self.first_departure
    }

    fn any(self) -> bool {
        self.affects_trips() || self.other
    }
}

/// Owns the station ordering of lines and keeps trips in step with it.
pub struct LineManager<'a, S: ?Sized> {
    store: &'a S,
    config: &'a ScheduleConfig,
}

impl<'a, S: MetroStore + ?Sized> LineManager<'a, S> {
    pub fn new(store: &'a S, config: &'a ScheduleConfig) -> Self {
        Self { store, config }
    }

    pub fn get_line(&self, id: &LineId) -> Result<MetroLine, NetworkError> {
        self.store
            .line(id)?
            .ok_or_else(|| NetworkError::LineNotFound(id.clone()))
    }

    pub fn list_lines(&self) -> Result<Vec<MetroLine>, NetworkError> {
        Ok(self.store.lines()?)
    }

    pub fn lines_by_active(&self, active: bool) -> Result<Vec<MetroLine>, NetworkError> {
        Ok(self.store.lines_by_active(active)?)
    }

    /// Create a line and generate its trips.
    ///
    /// Lines with fewer than three stations are stored inactive whatever
    /// the request says.
    pub fn create_line(&self, new: NewLine) -> Result<MetroLine, NetworkError> {
        let line_id = match new.line_id {
            Some(id) => {
                if self.store.line(&id)?.is_some() {
                    return Err(NetworkError::DuplicateLine(id));
                }
                id
            }
            None => self.next_line_id()?,
        };
        self.require_stations(&new.station_ids)?;

        let mut line = MetroLine::new(line_id, new.line_name, now());
        line.first_departure = new.first_departure;
        line.frequency_minutes = new.frequency_minutes;
        line.set_station_ids(StationList::from(new.station_ids));
        line.set_active(new.is_active.unwrap_or(true));
        self.recompute_duration(&mut line);

        self.store.save_line(line.clone())?;
        info!(
            line = %line.line_id,
            stations = line.station_ids().len(),
            active = line.is_active,
            "Line created"
        );

        self.timetable()
            .regenerate_for(RegenerationScope::PerLine, &line, "line created")?;
        Ok(line)
    }

    /// Apply a patch, recomputing duration and trips only when the
    /// fields they depend on changed.
    pub fn update_line(&self, id: &LineId, patch: LinePatch) -> Result<MetroLine, NetworkError> {
        let mut line = self.get_line(id)?;
        let mut changes = Changes::default();

        if let Some(name) = patch.line_name
            && name != line.line_name
        {
            line.line_name = name;
            changes.other = true;
        }

        if let Some(frequency) = patch.frequency_minutes
            && line.frequency_minutes.as_deref() != Some(frequency.as_str())
        {
            line.frequency_minutes = Some(frequency);
            changes.frequency = true;
        }

        if let Some(station_ids) = patch.station_ids {
            let stations = StationList::from(station_ids);
            if &stations != line.station_ids() {
                self.require_stations(stations.as_slice())?;
                line.set_station_ids(stations);
                changes.stations = true;
            }
        }

        if let Some(first) = patch.first_departure
            && line.first_departure != Some(first)
        {
            line.first_departure = Some(first);
            changes.first_departure = true;
        }

        if !line.can_be_active() {
            if line.is_active {
                line.is_active = false;
                changes.other = true;
            }
        } else if let Some(active) = patch.is_active
            && active != line.is_active
        {
            line.set_active(active);
            changes.other = true;
        }

        if changes.affects_duration() {
            self.recompute_duration(&mut line);
        }

        if !changes.any() {
            debug!(line = %id, "Line update changed nothing");
            return Ok(line);
        }

        line.updated_at = now();
        self.store.save_line(line.clone())?;
        info!(line = %id, ?changes, "Line updated");

        if changes.affects_trips() {
            self.timetable()
                .regenerate_for(self.config.update_scope, &line, "line updated")?;
        }
        Ok(line)
    }

    /// Set the active flag. A line with fewer than three stations stays
    /// inactive.
    pub fn set_line_active(&self, id: &LineId, active: bool) -> Result<MetroLine, NetworkError> {
        let mut line = self.get_line(id)?;
        if line.set_active(active) != active {
            debug!(line = %id, "Line has too few stations to activate");
        }
        line.updated_at = now();
        self.store.save_line(line.clone())?;
        Ok(line)
    }

    /// Delete a line and its trips. Suspensions referencing it are kept.
    pub fn delete_line(&self, id: &LineId) -> Result<(), NetworkError> {
        if !self.store.delete_line(id)? {
            return Err(NetworkError::LineNotFound(id.clone()));
        }
        self.store.drop_trips(id)?;
        info!(line = %id, "Line deleted");
        Ok(())
    }

    /// Add a station. Adding a station already on the line changes
    /// nothing.
    pub fn add_station(&self, line_id: &LineId, station_id: &StationId) -> Result<MetroLine, NetworkError> {
        self.require_stations(std::slice::from_ref(station_id))?;
        self.change_topology(line_id, "station added", |ids| ids.add(station_id.clone()))
    }

    /// Remove a station. Removing a station not on the line changes
    /// nothing.
    pub fn remove_station(&self, line_id: &LineId, station_id: &StationId) -> Result<MetroLine, NetworkError> {
        self.change_topology(line_id, "station removed", |ids| ids.remove(station_id))
    }

    /// Insert a station near `position`. The list is re-sorted afterwards,
    /// so the final position is always given by the station number.
    pub fn insert_station_at(
        &self,
        line_id: &LineId,
        station_id: &StationId,
        position: usize,
    ) -> Result<MetroLine, NetworkError> {
        self.require_stations(std::slice::from_ref(station_id))?;
        self.change_topology(line_id, "station inserted", |ids| {
            ids.insert_at(position, station_id.clone())
        })
    }

    /// The line's stations in line order. Ids with no station record are
    /// skipped.
    pub fn stations_for_line(&self, id: &LineId) -> Result<Vec<Station>, NetworkError> {
        let line = self.get_line(id)?;
        Ok(self.store.stations_by_ids(line.station_ids().as_slice())?)
    }

    /// A station that is part of the line.
    pub fn station_on_line(&self, line_id: &LineId, station_id: &StationId) -> Result<Station, NetworkError> {
        let line = self.get_line(line_id)?;
        if !line.station_ids().contains(station_id) {
            return Err(NetworkError::StationNotOnLine {
                line: line_id.clone(),
                station: station_id.clone(),
            });
        }
        self.store
            .station(station_id)?
            .ok_or_else(|| NetworkError::StationNotFound(station_id.clone()))
    }

    fn change_topology(
        &self,
        line_id: &LineId,
        reason: &str,
        mutate: impl FnOnce(&mut StationList) -> bool,
    ) -> Result<MetroLine, NetworkError> {
        let mut line = self.get_line(line_id)?;
        let mut ids = line.station_ids().clone();
        if !mutate(&mut ids) {
            debug!(line = %line_id, reason, "Station list unchanged");
            return Ok(line);
        }

        line.set_station_ids(ids);
        self.recompute_duration(&mut line);
        line.updated_at = now();
        self.store.save_line(line.clone())?;
        info!(
            line = %line_id,
            reason,
            stations = line.station_ids().len(),
            total_duration = line.total_duration(),
            "Line topology changed"
        );

        self.timetable()
            .regenerate_for(self.config.topology_scope, &line, reason)?;
        Ok(line)
    }

    fn recompute_duration(&self, line: &mut MetroLine) {
        line.set_total_duration(compute_total_duration(
            line.station_ids().len(),
            line.frequency_minutes.as_deref(),
            self.config.default_frequency_mins,
        ));
    }

    fn require_stations(&self, ids: &[StationId]) -> Result<(), NetworkError> {
        for id in ids {
            if self.store.station(id)?.is_none() {
                return Err(NetworkError::StationNotFound(id.clone()));
            }
        }
        Ok(())
    }

    fn next_line_id(&self) -> Result<LineId, NetworkError> {
        let max = self
            .store
            .lines()?
            .iter()
            .filter_map(|l| l.line_id.sequence_number())
            .max()
            .unwrap_or(0);
        Ok(LineId::from_number(max + 1))
    }

    fn timetable(&self) -> Timetable<'a, S> {
        Timetable::new(self.store, self.config)
    }
}
