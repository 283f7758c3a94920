//! Generated trips and their segments.

use std::fmt;

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::line::LineId;
use super::station::StationId;

/// Error returned when parsing an invalid trip identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid trip id: {reason}")]
pub struct InvalidTripId {
    reason: &'static str,
}

/// Direction of travel along a line's station order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Stations in stored (ascending) order.
    Forward,
    /// Stations in reversed order.
    Return,
}

impl Direction {
    /// The single-letter suffix used in trip ids.
    pub fn suffix(self) -> char {
        match self {
            Direction::Forward => 'F',
            Direction::Return => 'R',
        }
    }

    fn from_suffix(s: &str) -> Option<Self> {
        match s {
            "F" => Some(Direction::Forward),
            "R" => Some(Direction::Return),
            _ => None,
        }
    }

    pub fn is_return(self) -> bool {
        self == Direction::Return
    }
}

/// Deterministic trip identifier: `<line>-<HHMM>-<F|R>`.
///
/// The departure is written without colons; seconds are appended only when
/// non-zero. Regenerating a line with unchanged state yields the same ids.
///
/// # Examples
///
/// ```
/// use chrono::NaiveTime;
/// use metro_server::domain::{Direction, LineId, TripId};
///
/// let line = LineId::parse("LN1").unwrap();
/// let dep = NaiveTime::from_hms_opt(6, 30, 0).unwrap();
/// let id = TripId::new(&line, dep, Direction::Forward);
/// assert_eq!(id.to_string(), "LN1-0630-F");
///
/// let parsed = TripId::parse("LN1-0630-F").unwrap();
/// assert_eq!(parsed, id);
/// assert_eq!(parsed.departure(), dep);
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TripId {
    line_id: LineId,
    departure: NaiveTime,
    direction: Direction,
}

impl TripId {
    pub fn new(line_id: &LineId, departure: NaiveTime, direction: Direction) -> Self {
        Self {
            line_id: line_id.clone(),
            departure: departure.with_nanosecond(0).unwrap_or(departure),
            direction,
        }
    }

    /// Reconstruct the id components from their text form.
    pub fn parse(s: &str) -> Result<Self, InvalidTripId> {
        let mut parts = s.rsplitn(3, '-');
        let direction = parts
            .next()
            .and_then(Direction::from_suffix)
            .ok_or(InvalidTripId {
                reason: "expected F or R direction suffix",
            })?;
        let time = parts.next().ok_or(InvalidTripId {
            reason: "missing departure time",
        })?;
        let line = parts.next().ok_or(InvalidTripId {
            reason: "missing line id",
        })?;

        let departure = match time.len() {
            4 => NaiveTime::parse_from_str(time, "%H%M"),
            6 => NaiveTime::parse_from_str(time, "%H%M%S"),
            _ => {
                return Err(InvalidTripId {
                    reason: "departure must be HHMM or HHMMSS",
                });
            }
        }
        .map_err(|_| InvalidTripId {
            reason: "invalid departure time",
        })?;

        let line_id = LineId::parse(line).map_err(|_| InvalidTripId {
            reason: "invalid line id",
        })?;

        Ok(Self {
            line_id,
            departure,
            direction,
        })
    }

    pub fn line_id(&self) -> &LineId {
        &self.line_id
    }

    pub fn departure(&self) -> NaiveTime {
        self.departure
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }
}

impl fmt::Display for TripId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{:02}{:02}",
            self.line_id,
            self.departure.hour(),
            self.departure.minute()
        )?;
        if self.departure.second() != 0 {
            write!(f, "{:02}", self.departure.second())?;
        }
        write!(f, "-{}", self.direction.suffix())
    }
}

impl fmt::Debug for TripId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TripId({self})")
    }
}

impl Serialize for TripId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TripId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        TripId::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// The run between two consecutive stations of a trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripSegment {
    pub from_station_id: StationId,
    pub to_station_id: StationId,
    pub departure_time: NaiveTime,
    pub arrival_time: NaiveTime,
    pub duration_minutes: u32,
}

impl TripSegment {
    /// Whether the segment starts or ends at the station.
    pub fn touches(&self, station: &StationId) -> bool {
        &self.from_station_id == station || &self.to_station_id == station
    }
}

/// One scheduled run of a line in one direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trip {
    pub trip_id: TripId,
    pub line_id: LineId,
    pub departure_time: NaiveTime,
    pub arrival_time: NaiveTime,
    pub direction: Direction,
    pub segments: Vec<TripSegment>,
}

impl Trip {
    pub fn is_return_trip(&self) -> bool {
        self.direction.is_return()
    }

    /// Whether any segment starts or ends at the station.
    pub fn calls_at(&self, station: &StationId) -> bool {
        self.segments.iter().any(|s| s.touches(station))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn line() -> LineId {
        LineId::parse("LN2").unwrap()
    }

    #[test]
    fn id_format() {
        assert_eq!(
            TripId::new(&line(), hm(6, 0), Direction::Forward).to_string(),
            "LN2-0600-F"
        );
        assert_eq!(
            TripId::new(&line(), hm(22, 5), Direction::Return).to_string(),
            "LN2-2205-R"
        );
        let with_secs = NaiveTime::from_hms_opt(7, 1, 30).unwrap();
        assert_eq!(
            TripId::new(&line(), with_secs, Direction::Forward).to_string(),
            "LN2-070130-F"
        );
    }

    #[test]
    fn parse_reconstructs_components() {
        let id = TripId::parse("LN2-2205-R").unwrap();
        assert_eq!(id.line_id(), &line());
        assert_eq!(id.departure(), hm(22, 5));
        assert_eq!(id.direction(), Direction::Return);

        let id = TripId::parse("LN2-070130-F").unwrap();
        assert_eq!(id.departure(), NaiveTime::from_hms_opt(7, 1, 30).unwrap());
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(TripId::parse("LN2-0600-X").is_err());
        assert!(TripId::parse("LN2-600-F").is_err());
        assert!(TripId::parse("LN2-2561-F").is_err());
        assert!(TripId::parse("0600-F").is_err());
        assert!(TripId::parse("").is_err());
    }

    #[test]
    fn serde_as_string() {
        let id = TripId::new(&line(), hm(9, 40), Direction::Forward);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"LN2-0940-F\"");
        let back: TripId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Any generated id can be reconstructed from its text
        #[test]
        fn id_reconstructs(
            n in 0u64..1000,
            h in 0u32..24, m in 0u32..60, s in 0u32..60,
            ret in any::<bool>()
        ) {
            let dir = if ret { Direction::Return } else { Direction::Forward };
            let dep = NaiveTime::from_hms_opt(h, m, s).unwrap();
            let id = TripId::new(&LineId::from_number(n), dep, dir);
            let parsed = TripId::parse(&id.to_string()).unwrap();
            prop_assert_eq!(parsed, id);
        }
    }
}
