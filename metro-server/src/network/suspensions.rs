//! Suspension lifecycle.
//!
//! A suspension is `active` until resolved; resolution is terminal. Each
//! transition saves the suspension first and then mirrors the outcome
//! onto its line (see [`super::mirror`]). Trips are never touched here.

use chrono::{Duration, NaiveDateTime};
use serde::Deserialize;
use tracing::info;

use crate::domain::{LineId, StationId, Suspension, SuspensionId, now};
use crate::store::{LineStore, SuspensionStore};

use super::error::NetworkError;
use super::mirror::{MirrorIntent, MirrorOutcome, Reconciler, apply_mirror, sync_mirror};

/// The descriptive part of a suspension request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SuspensionRequest {
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub affected_station_ids: Vec<StationId>,
    /// Defaults to now.
    #[serde(default)]
    pub start_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub expected_end_time: Option<NaiveDateTime>,
    /// Sets the expected end relative to the start when no explicit end
    /// is given.
    #[serde(default)]
    pub duration_hours: Option<u32>,
}

/// Request to create a suspension on any line id, known or not.
#[derive(Debug, Clone, Deserialize)]
pub struct NewSuspension {
    #[serde(default)]
    pub id: Option<SuspensionId>,
    pub metro_line_id: LineId,
    /// Taken from the line when absent.
    #[serde(default)]
    pub line_name: Option<String>,
    #[serde(flatten)]
    pub request: SuspensionRequest,
}

/// Changes to an active suspension's details.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SuspensionDetails {
    pub reason: Option<String>,
    pub description: Option<String>,
    /// Resets the expected end to start plus this many hours.
    pub duration_hours: Option<u32>,
}

/// Creates, transitions and queries suspensions.
pub struct SuspensionManager<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: LineStore + SuspensionStore + ?Sized> SuspensionManager<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Create a suspension and mirror it onto its line.
    ///
    /// The line need not exist; the suspension is stored either way and
    /// the mirror step is skipped.
    pub fn create_suspension(&self, new: NewSuspension) -> Result<Suspension, NetworkError> {
        let id = match new.id {
            Some(id) => id,
            None => self.next_suspension_id()?,
        };
        let line_name = match new.line_name {
            Some(name) => Some(name),
            None => self.store.line(&new.metro_line_id)?.map(|l| l.line_name),
        };

        let now = now();
        let request = new.request;
        let start_time = request.start_time.unwrap_or(now);
        let expected_end_time = match request.expected_end_time {
            Some(end) => Some(end),
            None => request
                .duration_hours
                .map(|hours| hours_after(start_time, hours))
                .transpose()?,
        };

        let mut suspension = Suspension {
            id,
            metro_line_id: new.metro_line_id,
            line_name,
            reason: request.reason,
            description: request.description,
            affected_station_ids: Vec::new(),
            start_time,
            expected_end_time,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        suspension.add_stations(request.affected_station_ids);

        self.store.save_suspension(suspension.clone())?;
        info!(
            suspension = %suspension.id,
            line = %suspension.metro_line_id,
            "Suspension created"
        );

        apply_mirror(
            self.store,
            &suspension.metro_line_id,
            MirrorIntent::for_suspension(&suspension),
        )?;
        Ok(suspension)
    }

    /// Suspend an existing line.
    pub fn suspend_line(&self, line_id: &LineId, request: SuspensionRequest) -> Result<Suspension, NetworkError> {
        let line = self
            .store
            .line(line_id)?
            .ok_or_else(|| NetworkError::LineNotFound(line_id.clone()))?;
        self.create_suspension(NewSuspension {
            id: None,
            metro_line_id: line.line_id,
            line_name: Some(line.line_name),
            request,
        })
    }

    /// Resolve a suspension. Resolving a resolved suspension changes
    /// nothing.
    ///
    /// The line mirror is rebuilt from the suspensions still active on it,
    /// so it only clears once the last one is resolved.
    pub fn resolve_suspension(&self, id: &SuspensionId) -> Result<Suspension, NetworkError> {
        let mut suspension = self.get_suspension(id)?;
        if !suspension.is_active {
            return Ok(suspension);
        }

        suspension.is_active = false;
        suspension.updated_at = now();
        self.store.save_suspension(suspension.clone())?;
        info!(suspension = %id, line = %suspension.metro_line_id, "Suspension resolved");

        sync_mirror(self.store, &suspension.metro_line_id)?;
        Ok(suspension)
    }

    /// Push the expected end time back by some hours.
    pub fn extend_suspension(&self, id: &SuspensionId, additional_hours: u32) -> Result<Suspension, NetworkError> {
        let mut suspension = self.active_suspension(id)?;
        let now = now();
        suspension
            .extend_by(Duration::hours(i64::from(additional_hours)), now)
            .ok_or(NetworkError::EndTimeOutOfRange { hours: additional_hours })?;
        suspension.updated_at = now;
        self.save_and_mirror(&suspension)?;
        info!(suspension = %id, hours = additional_hours, "Suspension extended");
        Ok(suspension)
    }

    pub fn update_suspension_details(
        &self,
        id: &SuspensionId,
        details: SuspensionDetails,
    ) -> Result<Suspension, NetworkError> {
        let mut suspension = self.active_suspension(id)?;
        if let Some(reason) = details.reason {
            suspension.reason = Some(reason);
        }
        if let Some(description) = details.description {
            suspension.description = Some(description);
        }
        if let Some(hours) = details.duration_hours {
            suspension.expected_end_time = Some(hours_after(suspension.start_time, hours)?);
        }
        suspension.updated_at = now();
        self.save_and_mirror(&suspension)?;
        Ok(suspension)
    }

    /// Add affected stations. Stations already listed are skipped.
    pub fn add_stations_to_suspension(
        &self,
        id: &SuspensionId,
        station_ids: Vec<StationId>,
    ) -> Result<Suspension, NetworkError> {
        let mut suspension = self.active_suspension(id)?;
        if suspension.add_stations(station_ids) > 0 {
            suspension.updated_at = now();
            self.store.save_suspension(suspension.clone())?;
        }
        Ok(suspension)
    }

    pub fn remove_station_from_suspension(
        &self,
        id: &SuspensionId,
        station_id: &StationId,
    ) -> Result<Suspension, NetworkError> {
        let mut suspension = self.active_suspension(id)?;
        if suspension.remove_station(station_id) {
            suspension.updated_at = now();
            self.store.save_suspension(suspension.clone())?;
        }
        Ok(suspension)
    }

    /// Delete a suspension and rebuild its line's mirror.
    pub fn delete_suspension(&self, id: &SuspensionId) -> Result<(), NetworkError> {
        let suspension = self.get_suspension(id)?;
        self.store.delete_suspension(id)?;
        info!(suspension = %id, "Suspension deleted");
        sync_mirror(self.store, &suspension.metro_line_id)?;
        Ok(())
    }

    /// Delete every suspension of a line and clear its mirror. Returns how
    /// many were deleted.
    pub fn delete_all_suspensions_by_line(&self, line_id: &LineId) -> Result<usize, NetworkError> {
        let deleted = self.store.delete_suspensions_by_line(line_id)?;
        info!(line = %line_id, deleted, "Suspensions deleted");
        apply_mirror(self.store, line_id, MirrorIntent::Cleared)?;
        Ok(deleted)
    }

    pub fn get_suspension(&self, id: &SuspensionId) -> Result<Suspension, NetworkError> {
        self.store
            .suspension(id)?
            .ok_or_else(|| NetworkError::SuspensionNotFound(id.clone()))
    }

    pub fn list_suspensions(&self) -> Result<Vec<Suspension>, NetworkError> {
        Ok(self.store.suspensions()?)
    }

    pub fn suspensions_by_active(&self, active: bool) -> Result<Vec<Suspension>, NetworkError> {
        Ok(self.store.suspensions_by_active(active)?)
    }

    /// A line's suspensions, optionally only active or only resolved ones.
    pub fn suspensions_by_line(
        &self,
        line_id: &LineId,
        active: Option<bool>,
    ) -> Result<Vec<Suspension>, NetworkError> {
        let mut suspensions = self.store.suspensions_by_line(line_id)?;
        if let Some(active) = active {
            suspensions.retain(|s| s.is_active == active);
        }
        Ok(suspensions)
    }

    pub fn suspensions_by_station(&self, station_id: &StationId) -> Result<Vec<Suspension>, NetworkError> {
        Ok(self.store.suspensions_by_station(station_id)?)
    }

    pub fn reconcile_line(&self, line_id: &LineId) -> Result<MirrorOutcome, NetworkError> {
        Reconciler::new(self.store).reconcile_line(line_id)
    }

    pub fn reconcile_all(&self) -> Result<usize, NetworkError> {
        Ok(Reconciler::new(self.store).reconcile_all()?)
    }

    fn active_suspension(&self, id: &SuspensionId) -> Result<Suspension, NetworkError> {
        let suspension = self.get_suspension(id)?;
        if !suspension.is_active {
            return Err(NetworkError::SuspensionResolved(id.clone()));
        }
        Ok(suspension)
    }

    fn save_and_mirror(&self, suspension: &Suspension) -> Result<(), NetworkError> {
        self.store.save_suspension(suspension.clone())?;
        apply_mirror(
            self.store,
            &suspension.metro_line_id,
            MirrorIntent::for_suspension(suspension),
        )?;
        Ok(())
    }

    fn next_suspension_id(&self) -> Result<SuspensionId, NetworkError> {
        let max = self
            .store
            .suspensions()?
            .iter()
            .filter_map(|s| s.id.sequence_number())
            .max()
            .unwrap_or(0);
        Ok(SuspensionId::from_number(max + 1))
    }
}

fn hours_after(start: NaiveDateTime, hours: u32) -> Result<NaiveDateTime, NetworkError> {
    start
        .checked_add_signed(Duration::hours(i64::from(hours)))
        .ok_or(NetworkError::EndTimeOutOfRange { hours })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MetroLine, SuspensionMirror};
    use crate::store::MemoryStore;
    use chrono::NaiveDate;

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn store_with_line() -> (MemoryStore, LineId) {
        let store = MemoryStore::new();
        let id = LineId::from_number(1);
        store.save_line(MetroLine::new(id.clone(), "Red", at(0))).unwrap();
        (store, id)
    }

    fn request(start: u32, hours: Option<u32>) -> SuspensionRequest {
        SuspensionRequest {
            reason: Some("Signal failure".into()),
            start_time: Some(at(start)),
            duration_hours: hours,
            ..SuspensionRequest::default()
        }
    }

    fn mirror(store: &MemoryStore, id: &LineId) -> SuspensionMirror {
        store.line(id).unwrap().unwrap().suspension
    }

    #[test]
    fn create_then_resolve_mirrors_onto_line() {
        let (store, line) = store_with_line();
        let manager = SuspensionManager::new(&store);

        let s = manager.suspend_line(&line, request(8, Some(2))).unwrap();
        assert_eq!(s.id.as_str(), "SP1");
        assert_eq!(s.line_name.as_deref(), Some("Red"));
        assert_eq!(s.expected_end_time, Some(at(10)));

        let m = mirror(&store, &line);
        assert!(m.is_suspended);
        assert_eq!(m.suspension_reason.as_deref(), Some("Signal failure"));
        assert_eq!(m.suspension_start_time, Some(at(8)));
        assert_eq!(m.suspension_end_time, Some(at(10)));

        let resolved = manager.resolve_suspension(&s.id).unwrap();
        assert!(!resolved.is_active);
        assert_eq!(mirror(&store, &line), SuspensionMirror::cleared());

        let again = manager.resolve_suspension(&s.id).unwrap();
        assert_eq!(again, resolved);
    }

    #[test]
    fn suspend_unknown_line_fails_but_create_allows_orphans() {
        let store = MemoryStore::new();
        let manager = SuspensionManager::new(&store);
        let ghost = LineId::from_number(4);

        let err = manager.suspend_line(&ghost, request(8, None)).unwrap_err();
        assert!(matches!(err, NetworkError::LineNotFound(_)));

        let orphan = manager
            .create_suspension(NewSuspension {
                id: None,
                metro_line_id: ghost.clone(),
                line_name: None,
                request: request(8, None),
            })
            .unwrap();
        assert!(orphan.line_name.is_none());
        assert_eq!(manager.suspensions_by_line(&ghost, None).unwrap().len(), 1);
    }

    #[test]
    fn resolving_one_of_two_keeps_line_suspended() {
        let (store, line) = store_with_line();
        let manager = SuspensionManager::new(&store);
        let early = manager.suspend_line(&line, request(8, Some(1))).unwrap();
        let late = manager.suspend_line(&line, request(9, Some(1))).unwrap();

        manager.resolve_suspension(&late.id).unwrap();
        let m = mirror(&store, &line);
        assert!(m.is_suspended);
        assert_eq!(m.suspension_start_time, Some(early.start_time));

        manager.resolve_suspension(&early.id).unwrap();
        assert!(!mirror(&store, &line).is_suspended);
    }

    #[test]
    fn extend_and_update_details() {
        let (store, line) = store_with_line();
        let manager = SuspensionManager::new(&store);
        let s = manager.suspend_line(&line, request(8, Some(2))).unwrap();

        let extended = manager.extend_suspension(&s.id, 3).unwrap();
        assert_eq!(extended.expected_end_time, Some(at(13)));
        assert_eq!(mirror(&store, &line).suspension_end_time, Some(at(13)));

        let details = SuspensionDetails {
            reason: Some("Flooding".into()),
            duration_hours: Some(1),
            ..SuspensionDetails::default()
        };
        let updated = manager.update_suspension_details(&s.id, details).unwrap();
        assert_eq!(updated.expected_end_time, Some(at(9)));
        assert_eq!(updated.description, None);
        let m = mirror(&store, &line);
        assert_eq!(m.suspension_reason.as_deref(), Some("Flooding"));
        assert_eq!(m.suspension_end_time, Some(at(9)));
    }

    #[test]
    fn oversized_hours_are_rejected() {
        let (store, line) = store_with_line();
        let manager = SuspensionManager::new(&store);
        let out_of_range = |r: Result<Suspension, NetworkError>| {
            matches!(r, Err(NetworkError::EndTimeOutOfRange { hours: u32::MAX }))
        };

        assert!(out_of_range(manager.suspend_line(&line, request(8, Some(u32::MAX)))));
        assert!(manager.list_suspensions().unwrap().is_empty());
        assert!(!mirror(&store, &line).is_suspended);

        let s = manager.suspend_line(&line, request(8, Some(2))).unwrap();
        assert!(out_of_range(manager.extend_suspension(&s.id, u32::MAX)));
        let details = SuspensionDetails {
            duration_hours: Some(u32::MAX),
            ..SuspensionDetails::default()
        };
        assert!(out_of_range(manager.update_suspension_details(&s.id, details)));

        // Neither failed change reached the store or the mirror
        assert_eq!(manager.get_suspension(&s.id).unwrap().expected_end_time, Some(at(10)));
        assert_eq!(mirror(&store, &line).suspension_end_time, Some(at(10)));

        // Repeated extensions are caught once they run off the end
        let mut err = None;
        for _ in 0..1000 {
            if let Err(e) = manager.extend_suspension(&s.id, u32::MAX / 8) {
                err = Some(e);
                break;
            }
        }
        assert!(matches!(err, Some(NetworkError::EndTimeOutOfRange { .. })));
    }

    #[test]
    fn resolved_suspension_rejects_changes() {
        let (store, line) = store_with_line();
        let manager = SuspensionManager::new(&store);
        let s = manager.suspend_line(&line, request(8, Some(2))).unwrap();
        manager.resolve_suspension(&s.id).unwrap();

        let resolved = |r: Result<Suspension, NetworkError>| {
            matches!(r, Err(NetworkError::SuspensionResolved(_)))
        };
        assert!(resolved(manager.extend_suspension(&s.id, 1)));
        assert!(resolved(manager.update_suspension_details(&s.id, SuspensionDetails::default())));
        assert!(resolved(manager.add_stations_to_suspension(&s.id, vec![StationId::from_number(1)])));
        assert!(resolved(manager.remove_station_from_suspension(&s.id, &StationId::from_number(1))));
        assert!(!mirror(&store, &line).is_suspended);
    }

    #[test]
    fn affected_stations() {
        let (store, line) = store_with_line();
        let manager = SuspensionManager::new(&store);
        let st1 = StationId::from_number(1);
        let st2 = StationId::from_number(2);

        let s = manager
            .suspend_line(
                &line,
                SuspensionRequest {
                    affected_station_ids: vec![st1.clone(), st1.clone()],
                    ..request(8, None)
                },
            )
            .unwrap();
        assert_eq!(s.affected_station_ids, vec![st1.clone()]);

        let s = manager
            .add_stations_to_suspension(&s.id, vec![st1.clone(), st2.clone()])
            .unwrap();
        assert_eq!(s.affected_station_ids, vec![st1.clone(), st2.clone()]);
        assert_eq!(manager.suspensions_by_station(&st2).unwrap().len(), 1);

        let s = manager.remove_station_from_suspension(&s.id, &st1).unwrap();
        assert_eq!(s.affected_station_ids, vec![st2]);
        assert!(manager.suspensions_by_station(&st1).unwrap().is_empty());
    }

    #[test]
    fn delete_resyncs_mirror() {
        let (store, line) = store_with_line();
        let manager = SuspensionManager::new(&store);
        let a = manager.suspend_line(&line, request(8, None)).unwrap();
        manager.suspend_line(&line, request(9, None)).unwrap();

        assert_eq!(manager.suspensions_by_line(&line, Some(true)).unwrap().len(), 2);
        manager.resolve_suspension(&a.id).unwrap();
        assert_eq!(manager.suspensions_by_line(&line, Some(false)).unwrap().len(), 1);

        let deleted = manager.delete_all_suspensions_by_line(&line).unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(mirror(&store, &line), SuspensionMirror::cleared());
        assert!(manager.list_suspensions().unwrap().is_empty());
    }

    #[test]
    fn delete_single_and_unknown() {
        let (store, line) = store_with_line();
        let manager = SuspensionManager::new(&store);
        let s = manager.suspend_line(&line, request(8, None)).unwrap();

        manager.delete_suspension(&s.id).unwrap();
        assert!(!mirror(&store, &line).is_suspended);

        let err = manager.delete_suspension(&s.id).unwrap_err();
        assert!(matches!(err, NetworkError::SuspensionNotFound(_)));
        assert!(manager.resolve_suspension(&s.id).unwrap_err().is_not_found());
    }

    #[test]
    fn queries_by_active() {
        let (store, line) = store_with_line();
        let manager = SuspensionManager::new(&store);
        let a = manager.suspend_line(&line, request(8, None)).unwrap();
        manager.suspend_line(&line, request(9, None)).unwrap();
        manager.resolve_suspension(&a.id).unwrap();

        assert_eq!(manager.suspensions_by_active(true).unwrap().len(), 1);
        assert_eq!(manager.suspensions_by_active(false).unwrap().len(), 1);
        assert_eq!(manager.get_suspension(&a.id).unwrap().id, a.id);
    }
}
