//! Metro line records and their station ordering.

use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::station::StationId;

/// Prefix used for generated line ids.
pub const LINE_ID_PREFIX: &str = "LN";

/// Minimum number of stations a line needs before it may be active.
pub const MIN_ACTIVE_STATIONS: usize = 3;

/// Error returned when parsing an invalid line identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid line id: {reason}")]
pub struct InvalidLineId {
    reason: &'static str,
}

/// A metro line identifier, conventionally `LN<n>`.
///
/// Any non-empty id without `-` is accepted; only ids following the `LN<n>`
/// convention take part in sequential id assignment. `-` is reserved as the
/// separator inside trip ids.
///
/// # Examples
///
/// ```
/// use metro_server::domain::LineId;
///
/// let ln = LineId::parse("LN3").unwrap();
/// assert_eq!(ln.sequence_number(), Some(3));
/// assert_eq!(LineId::parse("red").unwrap().sequence_number(), None);
/// assert!(LineId::parse("LN-1").is_err());
///
/// // `LN<n>` ids order numerically, ahead of unconventional ones
/// assert!(LineId::from_number(2) < LineId::from_number(10));
/// assert!(LineId::from_number(99) < LineId::parse("red").unwrap());
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct LineId(String);

impl LineId {
    /// Parse a line id.
    pub fn parse(s: &str) -> Result<Self, InvalidLineId> {
        let s = s.trim();
        if s.is_empty() {
            return Err(InvalidLineId {
                reason: "must not be empty",
            });
        }
        if s.contains('-') {
            return Err(InvalidLineId {
                reason: "must not contain '-'",
            });
        }
        Ok(Self(s.to_string()))
    }

    /// Build the conventional `LN<n>` id.
    pub fn from_number(number: u64) -> Self {
        Self(format!("{LINE_ID_PREFIX}{number}"))
    }

    /// The `<n>` of an `LN<n>` id, if it follows the convention.
    pub fn sequence_number(&self) -> Option<u64> {
        self.0.strip_prefix(LINE_ID_PREFIX)?.parse().ok()
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Ord for LineId {
    fn cmp(&self, other: &Self) -> Ordering {
        let key = |id: &LineId| {
            let n = id.sequence_number();
            (n.is_none(), n)
        };
        key(self).cmp(&key(other)).then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for LineId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LineId({})", self.0)
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for LineId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for LineId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        LineId::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// The ordered station ids of a line.
///
/// Always sorted ascending by numeric station suffix and free of
/// duplicates. Every constructor and mutator restores that order, so
/// readers never need to sort.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StationList(Vec<StationId>);

impl StationList {
    /// An empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a station. Returns `false` if it was already present.
    pub fn add(&mut self, id: StationId) -> bool {
        match self.0.binary_search(&id) {
            Ok(_) => false,
            Err(pos) => {
                self.0.insert(pos, id);
                true
            }
        }
    }

    /// Insert a station at a position.
    ///
    /// The position is clamped to the list bounds and only used as the
    /// initial placement; the list is re-sorted afterwards, so the final
    /// position is always the numeric one. Returns `false` if the station
    /// was already present.
    pub fn insert_at(&mut self, position: usize, id: StationId) -> bool {
        if self.contains(&id) {
            return false;
        }
        let position = position.min(self.0.len());
        self.0.insert(position, id);
        self.0.sort();
        true
    }

    /// Remove a station. Returns `false` if it was not present.
    pub fn remove(&mut self, id: &StationId) -> bool {
        match self.0.binary_search(id) {
            Ok(pos) => {
                self.0.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    pub fn contains(&self, id: &StationId) -> bool {
        self.0.binary_search(id).is_ok()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, StationId> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[StationId] {
        &self.0
    }

    pub fn first(&self) -> Option<&StationId> {
        self.0.first()
    }

    pub fn last(&self) -> Option<&StationId> {
        self.0.last()
    }
}

impl From<Vec<StationId>> for StationList {
    fn from(mut ids: Vec<StationId>) -> Self {
        ids.sort();
        ids.dedup();
        Self(ids)
    }
}

impl FromIterator<StationId> for StationList {
    fn from_iter<I: IntoIterator<Item = StationId>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

impl<'a> IntoIterator for &'a StationList {
    type Item = &'a StationId;
    type IntoIter = std::slice::Iter<'a, StationId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<'de> Deserialize<'de> for StationList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<StationId>::deserialize(deserializer).map(StationList::from)
    }
}

/// Suspension state copied onto a line for fast reads.
///
/// The line record is the single source of truth for these flags; they are
/// overwritten by the suspension manager on every suspension transition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuspensionMirror {
    pub is_suspended: bool,
    pub suspension_reason: Option<String>,
    pub suspension_start_time: Option<NaiveDateTime>,
    pub suspension_end_time: Option<NaiveDateTime>,
}

impl SuspensionMirror {
    /// The mirror of a line with no active suspension.
    pub fn cleared() -> Self {
        Self::default()
    }
}

/// A metro line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetroLine {
    pub line_id: LineId,
    pub line_name: String,
    station_ids: StationList,
    /// Minutes from first to last station. Only ever written through
    /// [`MetroLine::set_total_duration`] by the duration calculator.
    total_duration: u32,
    pub is_active: bool,
    #[serde(flatten)]
    pub suspension: SuspensionMirror,
    pub first_departure: Option<NaiveDateTime>,
    /// Free text such as `"10 min"`; parsed by the duration calculator.
    pub frequency_minutes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl MetroLine {
    /// Create a line record. Duration starts at zero until recomputed.
    pub fn new(line_id: LineId, line_name: impl Into<String>, now: NaiveDateTime) -> Self {
        Self {
            line_id,
            line_name: line_name.into(),
            station_ids: StationList::new(),
            total_duration: 0,
            is_active: true,
            suspension: SuspensionMirror::cleared(),
            first_departure: None,
            frequency_minutes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn station_ids(&self) -> &StationList {
        &self.station_ids
    }

    /// Replace the station list.
    ///
    /// Also applies the activity rule: a line with fewer than
    /// [`MIN_ACTIVE_STATIONS`] stations is never active.
    pub fn set_station_ids(&mut self, ids: StationList) {
        self.station_ids = ids;
        self.enforce_activity_rule();
    }

    pub fn total_duration(&self) -> u32 {
        self.total_duration
    }

    pub fn set_total_duration(&mut self, minutes: u32) {
        self.total_duration = minutes;
    }

    /// Whether the line has enough stations to be active.
    pub fn can_be_active(&self) -> bool {
        self.station_ids.len() >= MIN_ACTIVE_STATIONS
    }

    /// Set the active flag, subject to the minimum station rule.
    /// Returns the resulting flag.
    pub fn set_active(&mut self, active: bool) -> bool {
        self.is_active = active && self.can_be_active();
        self.is_active
    }

    fn enforce_activity_rule(&mut self) {
        if !self.can_be_active() {
            self.is_active = false;
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.suspension.is_suspended
    }
}
