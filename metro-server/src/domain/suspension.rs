//! Service suspensions.

use std::fmt;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::line::LineId;
use super::station::StationId;

/// Prefix used for generated suspension ids.
pub const SUSPENSION_ID_PREFIX: &str = "SP";

/// A suspension identifier, conventionally `SP<n>`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SuspensionId(String);

impl SuspensionId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn from_number(number: u64) -> Self {
        Self(format!("{SUSPENSION_ID_PREFIX}{number}"))
    }

    /// The `<n>` of an `SP<n>` id, if it follows the convention.
    pub fn sequence_number(&self) -> Option<u64> {
        self.0.strip_prefix(SUSPENSION_ID_PREFIX)?.parse().ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SuspensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SuspensionId({})", self.0)
    }
}

impl fmt::Display for SuspensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A time-bounded service interruption on a line.
///
/// `line_name` is a snapshot taken when the suspension was created and is
/// never refreshed from the line afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suspension {
    pub id: SuspensionId,
    pub metro_line_id: LineId,
    pub line_name: Option<String>,
    pub reason: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub affected_station_ids: Vec<StationId>,
    pub start_time: NaiveDateTime,
    pub expected_end_time: Option<NaiveDateTime>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Suspension {
    /// Whether the suspension lists the station as affected.
    pub fn affects(&self, station: &StationId) -> bool {
        self.affected_station_ids.contains(station)
    }

    /// Push the expected end time forward.
    ///
    /// With no end time recorded, the extension counts from `now`. Returns
    /// the new end, or `None` (leaving the suspension untouched) when it
    /// falls outside the representable date range.
    pub fn extend_by(&mut self, additional: Duration, now: NaiveDateTime) -> Option<NaiveDateTime> {
        let base = self.expected_end_time.unwrap_or(now);
        let end = base.checked_add_signed(additional)?;
        self.expected_end_time = Some(end);
        Some(end)
    }

    /// Add stations not already listed. Returns how many were added.
    pub fn add_stations(&mut self, ids: impl IntoIterator<Item = StationId>) -> usize {
        let mut added = 0;
        for id in ids {
            if !self.affects(&id) {
                self.affected_station_ids.push(id);
                added += 1;
            }
        }
        added
    }

    /// Remove a station. Returns `false` if it was not listed.
    pub fn remove_station(&mut self, id: &StationId) -> bool {
        let before = self.affected_station_ids.len();
        self.affected_station_ids.retain(|s| s != id);
        self.affected_station_ids.len() != before
    }
}
