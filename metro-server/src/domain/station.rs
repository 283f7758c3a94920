//! Station identifiers and records.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Error returned when parsing an invalid station identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid station id: {reason}")]
pub struct InvalidStationId {
    reason: &'static str,
}

/// A station identifier such as `ST12`.
///
/// Station ids are a non-numeric prefix followed by a decimal number. The
/// number is the ordering key of the network: stations on a line are always
/// kept in ascending order of it. Ids with equal numbers fall back to
/// comparing the full text so that ordering stays total.
///
/// # Examples
///
/// ```
/// use metro_server::domain::StationId;
///
/// let st = StationId::parse("ST12").unwrap();
/// assert_eq!(st.number(), 12);
/// assert!(StationId::parse("ST2").unwrap() < st);
///
/// // A numeric suffix is required
/// assert!(StationId::parse("ST").is_err());
/// assert!(StationId::parse("").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct StationId {
    text: String,
    number: u64,
}

/// Prefix used for generated station ids.
pub const STATION_ID_PREFIX: &str = "ST";

impl StationId {
    /// Parse a station id, extracting its numeric suffix.
    pub fn parse(s: &str) -> Result<Self, InvalidStationId> {
        let s = s.trim();
        if s.is_empty() {
            return Err(InvalidStationId {
                reason: "must not be empty",
            });
        }

        let digits_start = s
            .char_indices()
            .rev()
            .take_while(|(_, c)| c.is_ascii_digit())
            .last()
            .map(|(i, _)| i)
            .ok_or(InvalidStationId {
                reason: "must end with a numeric suffix",
            })?;

        let number = s[digits_start..].parse::<u64>().map_err(|_| InvalidStationId {
            reason: "numeric suffix out of range",
        })?;

        Ok(Self {
            text: s.to_string(),
            number,
        })
    }

    /// Build the conventional `ST<n>` id.
    pub fn from_number(number: u64) -> Self {
        Self {
            text: format!("{STATION_ID_PREFIX}{number}"),
            number,
        }
    }

    /// The numeric suffix used for ordering.
    pub fn number(&self) -> u64 {
        self.number
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl Ord for StationId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.number
            .cmp(&other.number)
            .then_with(|| self.text.cmp(&other.text))
    }
}

impl PartialOrd for StationId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StationId({})", self.text)
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl Serialize for StationId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

impl<'de> Deserialize<'de> for StationId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        StationId::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// A station in the network directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub station_id: StationId,
    pub station_name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Map marker tag used by clients to group stations.
    #[serde(default)]
    pub map_marker: Option<String>,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}
