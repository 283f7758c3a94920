//! Network operation errors.

use crate::domain::{LineId, StationId, SuspensionId};
use crate::store::StoreError;

/// Errors surfaced by line, station and suspension operations.
///
/// Malformed frequencies and vanished mirror targets are recovered inside
/// the core and never appear here.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("metro line not found: {0}")]
    LineNotFound(LineId),

    #[error("station not found: {0}")]
    StationNotFound(StationId),

    #[error("suspension not found: {0}")]
    SuspensionNotFound(SuspensionId),

    #[error("station {station} is not on line {line}")]
    StationNotOnLine { line: LineId, station: StationId },

    /// Resolved suspensions accept no further changes
    #[error("suspension {0} is resolved")]
    SuspensionResolved(SuspensionId),

    /// An hour count that pushes a suspension's end past the date range
    #[error("suspension end out of range: {hours} hours")]
    EndTimeOutOfRange { hours: u32 },

    #[error("metro line already exists: {0}")]
    DuplicateLine(LineId),

    #[error("station already exists: {0}")]
    DuplicateStation(StationId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl NetworkError {
    /// Whether the error names an unknown record.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            NetworkError::LineNotFound(_)
                | NetworkError::StationNotFound(_)
                | NetworkError::SuspensionNotFound(_)
                | NetworkError::StationNotOnLine { .. }
        )
    }
}
