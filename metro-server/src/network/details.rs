//! Combined read models of lines.

use serde::Serialize;

use crate::domain::{LineId, MetroLine, Station, StationId, Suspension, Trip};
use crate::store::MetroStore;

use super::error::NetworkError;

/// Shown when a terminal station has no record.
pub const UNKNOWN_STATION: &str = "unknown";

/// A line with its terminals resolved to names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineSummary {
    pub line_id: LineId,
    pub line_name: String,
    pub first_station: String,
    pub last_station: String,
    pub total_duration: u32,
    pub station_count: usize,
    pub station_names: Vec<String>,
    pub is_active: bool,
    pub is_suspended: bool,
}

/// A line together with everything that hangs off it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineDetails {
    pub line: MetroLine,
    pub stations: Vec<Station>,
    pub suspensions: Vec<Suspension>,
    pub trips: Vec<Trip>,
}

pub fn line_summaries<S: MetroStore + ?Sized>(store: &S) -> Result<Vec<LineSummary>, NetworkError> {
    let mut summaries = Vec::new();
    for line in store.lines()? {
        let stations = store.stations_by_ids(line.station_ids().as_slice())?;
        let name_of = |id: Option<&StationId>| {
            id.and_then(|id| stations.iter().find(|s| &s.station_id == id))
                .map_or_else(|| UNKNOWN_STATION.to_string(), |s| s.station_name.clone())
        };

        summaries.push(LineSummary {
            first_station: name_of(line.station_ids().first()),
            last_station: name_of(line.station_ids().last()),
            total_duration: line.total_duration(),
            station_count: line.station_ids().len(),
            station_names: stations.iter().map(|s| s.station_name.clone()).collect(),
            is_active: line.is_active,
            is_suspended: line.is_suspended(),
            line_id: line.line_id,
            line_name: line.line_name,
        });
    }
    Ok(summaries)
}

pub fn line_details<S: MetroStore + ?Sized>(store: &S, id: &LineId) -> Result<LineDetails, NetworkError> {
    let line = store
        .line(id)?
        .ok_or_else(|| NetworkError::LineNotFound(id.clone()))?;
    details_of(store, line)
}

pub fn all_line_details<S: MetroStore + ?Sized>(store: &S) -> Result<Vec<LineDetails>, NetworkError> {
    store
        .lines()?
        .into_iter()
        .map(|line| details_of(store, line))
        .collect()
}

fn details_of<S: MetroStore + ?Sized>(store: &S, line: MetroLine) -> Result<LineDetails, NetworkError> {
    Ok(LineDetails {
        stations: store.stations_by_ids(line.station_ids().as_slice())?,
        suspensions: store.suspensions_by_line(&line.line_id)?,
        trips: store.trips(&line.line_id)?,
        line,
    })
}
