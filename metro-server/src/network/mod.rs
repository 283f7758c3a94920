//! Operations on the metro network.
//!
//! Each manager borrows a store for the duration of one request. Managers
//! do not lock anything themselves; callers that let requests run
//! concurrently must serialise mutations, otherwise two topology changes
//! to the same line can race on its station list.

mod details;
mod error;
mod lines;
mod mirror;
mod stations;
mod suspensions;
mod timetable;

pub use details::{LineDetails, LineSummary, UNKNOWN_STATION, all_line_details, line_details, line_summaries};
pub use error::NetworkError;
pub use lines::{LineManager, LinePatch, NewLine};
pub use mirror::{MirrorIntent, MirrorOutcome, Reconciler, apply_mirror, sync_mirror};
pub use stations::{NewStation, StationDirectory, StationPatch};
pub use suspensions::{NewSuspension, SuspensionDetails, SuspensionManager, SuspensionRequest};
pub use timetable::Timetable;
