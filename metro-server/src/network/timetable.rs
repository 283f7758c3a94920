//! Stored trip timetables: regeneration and queries.

use chrono::NaiveTime;
use tracing::{debug, info};

use crate::domain::{LineId, MetroLine, StationId, Trip, parse_clock_time};
use crate::schedule::{RegenerationScope, ScheduleConfig, TripGenerator, TripSearch, trips_at_station};
use crate::store::{LineStore, StoreError, TripStore};

use super::error::NetworkError;

/// Reads and rebuilds the per-line trip collections.
pub struct Timetable<'a, S: ?Sized> {
    store: &'a S,
    config: &'a ScheduleConfig,
}

impl<'a, S: LineStore + TripStore + ?Sized> Timetable<'a, S> {
    pub fn new(store: &'a S, config: &'a ScheduleConfig) -> Self {
        Self { store, config }
    }

    /// Regenerate after a change to `line`.
    ///
    /// `Global` rebuilds every line in the store, `PerLine` only the
    /// changed one. Returns how many lines were rebuilt.
    pub fn regenerate_for(
        &self,
        scope: RegenerationScope,
        line: &MetroLine,
        reason: &str,
    ) -> Result<usize, StoreError> {
        let generator = TripGenerator::new(self.config);
        let last = self.config.last_departure;

        let rebuilt = match scope {
            RegenerationScope::PerLine => {
                generator.regenerate(self.store, line, last)?;
                1
            }
            RegenerationScope::Global => {
                let lines = self.store.lines()?;
                for other in &lines {
                    generator.regenerate(self.store, other, last)?;
                }
                lines.len()
            }
        };

        info!(line = %line.line_id, reason, ?scope, rebuilt, "Regenerated trips");
        Ok(rebuilt)
    }

    /// Rebuild every line's trips with the given last departure.
    pub fn regenerate_all(&self, last_departure: NaiveTime) -> Result<usize, StoreError> {
        let generator = TripGenerator::new(self.config);
        let lines = self.store.lines()?;
        let mut total = 0;
        for line in &lines {
            total += generator.regenerate(self.store, line, last_departure)?.len();
        }
        info!(lines = lines.len(), trips = total, %last_departure, "Regenerated all timetables");
        Ok(total)
    }

    /// Drop the trips of every line.
    pub fn clear_all_trips(&self) -> Result<usize, StoreError> {
        let lines = self.store.lines()?;
        for line in &lines {
            self.store.drop_trips(&line.line_id)?;
        }
        info!(lines = lines.len(), "Cleared all trips");
        Ok(lines.len())
    }

    pub fn trips_for_line(&self, line_id: &LineId) -> Result<Vec<Trip>, NetworkError> {
        self.require_line(line_id)?;
        Ok(self.store.trips(line_id)?)
    }

    /// A line's trips calling at a station, each cut down to the segments
    /// touching it.
    pub fn trips_for_station_in_line(
        &self,
        line_id: &LineId,
        station: &StationId,
    ) -> Result<Vec<Trip>, NetworkError> {
        let trips = self.trips_for_line(line_id)?;
        Ok(trips_at_station(&trips, station))
    }

    /// Every stored trip, grouped by line in numeric line id order.
    pub fn all_trips(&self) -> Result<Vec<Trip>, StoreError> {
        let mut all = Vec::new();
        for line in self.store.lines()? {
            all.extend(self.store.trips(&line.line_id)?);
        }
        Ok(all)
    }

    /// Trips on any line from `from` to `to`, leaving `from` near the
    /// given `HH:MM` time. An absent or unparsable time matches any
    /// departure.
    pub fn search_trips(
        &self,
        from: &StationId,
        to: &StationId,
        approximate_time: Option<&str>,
    ) -> Result<Vec<Trip>, StoreError> {
        let approximate_time = approximate_time.and_then(|text| match parse_clock_time(text) {
            Ok(time) => Some(time),
            Err(e) => {
                debug!(%e, "Ignoring unparsable search time");
                None
            }
        });

        let search = TripSearch {
            from,
            to,
            approximate_time,
            tolerance: self.config.search_tolerance(),
        };
        Ok(search.run(&self.all_trips()?))
    }

    fn require_line(&self, line_id: &LineId) -> Result<MetroLine, NetworkError> {
        self.store
            .line(line_id)?
            .ok_or_else(|| NetworkError::LineNotFound(line_id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StationList;
    use crate::schedule::compute_total_duration;
    use crate::store::MemoryStore;
    use chrono::NaiveDate;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn line(n: u64, stations: &[u64], first: NaiveTime) -> MetroLine {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let mut line = MetroLine::new(LineId::from_number(n), format!("Line {n}"), date.and_time(hm(0, 0)));
        line.set_station_ids(stations.iter().copied().map(StationId::from_number).collect::<StationList>());
        line.frequency_minutes = Some("10".into());
        line.first_departure = Some(date.and_time(first));
        line.set_total_duration(compute_total_duration(stations.len(), Some("10"), 10));
        line
    }

    fn config() -> ScheduleConfig {
        ScheduleConfig::default().with_last_departure(hm(6, 30))
    }

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store.save_line(line(1, &[1, 2, 3], hm(6, 0))).unwrap();
        store.save_line(line(2, &[3, 4], hm(6, 30))).unwrap();
        store
    }

    #[test]
    fn per_line_scope_rebuilds_one_line() {
        let store = seeded();
        let config = config();
        let timetable = Timetable::new(&store, &config);
        let ln1 = store.line(&LineId::from_number(1)).unwrap().unwrap();

        let rebuilt = timetable
            .regenerate_for(RegenerationScope::PerLine, &ln1, "test")
            .unwrap();
        assert_eq!(rebuilt, 1);
        assert_eq!(store.trips(&ln1.line_id).unwrap().len(), 4);
        assert!(store.trips(&LineId::from_number(2)).unwrap().is_empty());
    }

    #[test]
    fn global_scope_rebuilds_every_line() {
        let store = seeded();
        let config = config();
        let timetable = Timetable::new(&store, &config);
        let ln1 = store.line(&LineId::from_number(1)).unwrap().unwrap();

        let rebuilt = timetable
            .regenerate_for(RegenerationScope::Global, &ln1, "test")
            .unwrap();
        assert_eq!(rebuilt, 2);
        // LN2 starts at the last departure: one trip each way
        assert_eq!(store.trips(&LineId::from_number(2)).unwrap().len(), 2);
    }

    #[test]
    fn regenerate_and_clear_all() {
        let store = seeded();
        let config = config();
        let timetable = Timetable::new(&store, &config);

        let total = timetable.regenerate_all(hm(7, 0)).unwrap();
        assert_eq!(total, timetable.all_trips().unwrap().len());
        assert!(total > 0);

        assert_eq!(timetable.clear_all_trips().unwrap(), 2);
        assert!(timetable.all_trips().unwrap().is_empty());
    }

    #[test]
    fn line_queries_require_line() {
        let store = seeded();
        let config = config();
        let timetable = Timetable::new(&store, &config);

        let err = timetable.trips_for_line(&LineId::from_number(9)).unwrap_err();
        assert!(matches!(err, NetworkError::LineNotFound(_)));

        timetable.regenerate_all(hm(6, 30)).unwrap();
        let at_st2 = timetable
            .trips_for_station_in_line(&LineId::from_number(1), &StationId::from_number(2))
            .unwrap();
        assert_eq!(at_st2.len(), 4);
        assert!(at_st2.iter().all(|t| t.segments.len() == 2));
    }

    #[test]
    fn search_spans_lines_and_ignores_bad_times() {
        let store = seeded();
        let config = config();
        let timetable = Timetable::new(&store, &config);
        timetable.regenerate_all(hm(7, 0)).unwrap();

        let (st1, st3, st4) = (
            StationId::from_number(1),
            StationId::from_number(3),
            StationId::from_number(4),
        );

        let found = timetable.search_trips(&st1, &st3, Some("06:05")).unwrap();
        let ids: Vec<String> = found.iter().map(|t| t.trip_id.to_string()).collect();
        assert_eq!(ids, vec!["LN1-0600-F"]);

        let on_ln2 = timetable.search_trips(&st3, &st4, Some("07:00")).unwrap();
        assert_eq!(on_ln2.len(), 1);
        assert_eq!(on_ln2[0].line_id, LineId::from_number(2));

        let unfiltered = timetable.search_trips(&st1, &st3, Some("later")).unwrap();
        assert_eq!(unfiltered, timetable.search_trips(&st1, &st3, None).unwrap());
        assert!(unfiltered.len() > 1);
    }
}
