//! Suspension mirroring onto lines, and its reconciliation.
//!
//! Updating a suspension and updating its line's mirror are two separate
//! store writes with nothing tying them together. Each transition first
//! settles the suspension record, then applies a [`MirrorIntent`] to the
//! line. A crash in between leaves the line stale; [`Reconciler`] rebuilds
//! mirrors from the active suspensions to repair that.

use chrono::NaiveDateTime;
use tracing::{info, warn};

use crate::domain::{LineId, Suspension, SuspensionMirror};
use crate::store::{LineStore, StoreError, SuspensionStore};

use super::error::NetworkError;

/// The mirror state a line should end up with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorIntent {
    Suspended {
        reason: Option<String>,
        start_time: NaiveDateTime,
        end_time: Option<NaiveDateTime>,
    },
    Cleared,
}

impl MirrorIntent {
    /// Mirror exactly this suspension.
    pub fn for_suspension(suspension: &Suspension) -> Self {
        MirrorIntent::Suspended {
            reason: suspension.reason.clone(),
            start_time: suspension.start_time,
            end_time: suspension.expected_end_time,
        }
    }

    /// Mirror the most recently started active suspension, or clear.
    pub fn from_active<'a>(suspensions: impl IntoIterator<Item = &'a Suspension>) -> Self {
        suspensions
            .into_iter()
            .filter(|s| s.is_active)
            .max_by_key(|s| s.start_time)
            .map(Self::for_suspension)
            .unwrap_or(MirrorIntent::Cleared)
    }

    pub fn into_mirror(self) -> SuspensionMirror {
        match self {
            MirrorIntent::Suspended {
                reason,
                start_time,
                end_time,
            } => SuspensionMirror {
                is_suspended: true,
                suspension_reason: reason,
                suspension_start_time: Some(start_time),
                suspension_end_time: end_time,
            },
            MirrorIntent::Cleared => SuspensionMirror::cleared(),
        }
    }
}

/// What happened when a mirror intent was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorOutcome {
    Applied,
    /// The line already carried this mirror.
    Unchanged,
    /// The line no longer exists; nothing was written.
    LineMissing,
}

/// Write a mirror intent onto a line.
///
/// A missing line is not an error: the mirror step is skipped and logged.
pub fn apply_mirror<S: LineStore + ?Sized>(
    store: &S,
    line_id: &LineId,
    intent: MirrorIntent,
) -> Result<MirrorOutcome, StoreError> {
    let Some(mut line) = store.line(line_id)? else {
        warn!(line = %line_id, "Line missing, suspension mirror skipped");
        return Ok(MirrorOutcome::LineMissing);
    };

    let mirror = intent.into_mirror();
    if line.suspension == mirror {
        return Ok(MirrorOutcome::Unchanged);
    }
    line.suspension = mirror;
    store.save_line(line)?;
    Ok(MirrorOutcome::Applied)
}

/// Rebuild a line's mirror from the active suspensions referencing it.
pub fn sync_mirror<S: LineStore + SuspensionStore + ?Sized>(
    store: &S,
    line_id: &LineId,
) -> Result<MirrorOutcome, StoreError> {
    let suspensions = store.suspensions_by_line(line_id)?;
    apply_mirror(store, line_id, MirrorIntent::from_active(&suspensions))
}

/// Repairs line mirrors left stale by interrupted suspension transitions.
pub struct Reconciler<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: LineStore + SuspensionStore + ?Sized> Reconciler<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Reconcile one line's mirror.
    pub fn reconcile_line(&self, line_id: &LineId) -> Result<MirrorOutcome, NetworkError> {
        if self.store.line(line_id)?.is_none() {
            return Err(NetworkError::LineNotFound(line_id.clone()));
        }
        Ok(sync_mirror(self.store, line_id)?)
    }

    /// Reconcile every line. Returns how many mirrors were rewritten.
    pub fn reconcile_all(&self) -> Result<usize, StoreError> {
        let mut repaired = 0;
        for line in self.store.lines()? {
            if sync_mirror(self.store, &line.line_id)? == MirrorOutcome::Applied {
                repaired += 1;
            }
        }
        if repaired > 0 {
            info!(repaired, "Reconciled suspension mirrors");
        }
        Ok(repaired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MetroLine, SuspensionId};
    use crate::store::MemoryStore;
    use chrono::NaiveDate;

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn suspension(id: u64, line: &LineId, start: u32, active: bool) -> Suspension {
        Suspension {
            id: SuspensionId::from_number(id),
            metro_line_id: line.clone(),
            line_name: None,
            reason: Some(format!("reason {id}")),
            description: None,
            affected_station_ids: Vec::new(),
            start_time: at(start),
            expected_end_time: Some(at(start + 2)),
            is_active: active,
            created_at: at(start),
            updated_at: at(start),
        }
    }

    fn store_with_line() -> (MemoryStore, LineId) {
        let store = MemoryStore::new();
        let id = LineId::from_number(1);
        store.save_line(MetroLine::new(id.clone(), "Red", at(0))).unwrap();
        (store, id)
    }

    #[test]
    fn intent_picks_latest_active() {
        let line = LineId::from_number(1);
        let all = vec![
            suspension(1, &line, 8, true),
            suspension(2, &line, 10, false),
            suspension(3, &line, 9, true),
        ];
        let intent = MirrorIntent::from_active(&all);
        assert_eq!(intent, MirrorIntent::for_suspension(&all[2]));

        let none: Vec<Suspension> = Vec::new();
        assert_eq!(MirrorIntent::from_active(&none), MirrorIntent::Cleared);
    }

    #[test]
    fn apply_and_clear() {
        let (store, id) = store_with_line();
        let s = suspension(1, &id, 8, true);

        let outcome = apply_mirror(&store, &id, MirrorIntent::for_suspension(&s)).unwrap();
        assert_eq!(outcome, MirrorOutcome::Applied);
        let line = store.line(&id).unwrap().unwrap();
        assert!(line.is_suspended());
        assert_eq!(line.suspension.suspension_reason.as_deref(), Some("reason 1"));
        assert_eq!(line.suspension.suspension_end_time, Some(at(10)));

        let again = apply_mirror(&store, &id, MirrorIntent::for_suspension(&s)).unwrap();
        assert_eq!(again, MirrorOutcome::Unchanged);

        apply_mirror(&store, &id, MirrorIntent::Cleared).unwrap();
        let line = store.line(&id).unwrap().unwrap();
        assert_eq!(line.suspension, SuspensionMirror::cleared());
    }

    #[test]
    fn missing_line_is_skipped() {
        let store = MemoryStore::new();
        let outcome =
            apply_mirror(&store, &LineId::from_number(9), MirrorIntent::Cleared).unwrap();
        assert_eq!(outcome, MirrorOutcome::LineMissing);
    }

    #[test]
    fn reconcile_repairs_stale_mirror() {
        let (store, id) = store_with_line();
        // Suspension resolved but the line was never cleared
        let mut s = suspension(1, &id, 8, true);
        apply_mirror(&store, &id, MirrorIntent::for_suspension(&s)).unwrap();
        s.is_active = false;
        store.save_suspension(s).unwrap();

        let reconciler = Reconciler::new(&store);
        assert_eq!(reconciler.reconcile_all().unwrap(), 1);
        assert!(!store.line(&id).unwrap().unwrap().is_suspended());
        assert_eq!(reconciler.reconcile_all().unwrap(), 0);
    }

    #[test]
    fn reconcile_sets_missing_mirror() {
        let (store, id) = store_with_line();
        store.save_suspension(suspension(1, &id, 8, true)).unwrap();

        let outcome = Reconciler::new(&store).reconcile_line(&id).unwrap();
        assert_eq!(outcome, MirrorOutcome::Applied);
        assert!(store.line(&id).unwrap().unwrap().is_suspended());
    }

    #[test]
    fn reconcile_unknown_line_fails() {
        let store = MemoryStore::new();
        let err = Reconciler::new(&store)
            .reconcile_line(&LineId::from_number(5))
            .unwrap_err();
        assert!(matches!(err, NetworkError::LineNotFound(_)));
    }
}
