//! Sampling efforts and the effort accumulator
//!
//! Visits stream in location-then-date order. Consecutive visits at one
//! location fold into a running effort; each visit closes one write-once
//! snapshot carrying the cumulative tally, richness and both curves.

use crate::pagination::PageRequest;
use crate::store::{EffortStore, VisitStore};
use crate::taxon::{Rank, RankTally, TaxonEntry, TaxonTally};
use crate::visit::Visit;
use bioseed_common::time::date_from_epoch_day;
use bioseed_common::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// One point on an accumulation curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(i64, i64)", into = "(i64, i64)")]
pub struct CurvePoint {
    /// Visit index or cumulative person count
    pub x: i64,
    pub species: i64,
}

impl From<(i64, i64)> for CurvePoint {
    fn from((x, species): (i64, i64)) -> Self {
        Self { x, species }
    }
}

impl From<CurvePoint> for (i64, i64) {
    fn from(point: CurvePoint) -> Self {
        (point.x, point.species)
    }
}

/// Cumulative snapshot of one location's visits
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Effort {
    pub location_id: i64,
    pub is_cave: bool,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub visit_count: i64,
    pub person_visit_count: i64,
    pub species_count: i64,
    /// Last snapshot written for its location
    pub is_final: bool,
    #[serde(skip)]
    pub tally: TaxonTally,
    pub per_visit_points: Vec<CurvePoint>,
    pub per_person_visit_points: Vec<CurvePoint>,
}

/// Counters for one accumulation run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EffortRunStats {
    pub visits_processed: u64,
    pub locations: u64,
    pub snapshots_written: u64,
}

/// Running totals for the location currently being accumulated
#[derive(Debug, Clone)]
struct RunningEffort {
    location_id: i64,
    is_cave: bool,
    start_epoch_day: i64,
    end_epoch_day: i64,
    visit_count: i64,
    person_visit_count: i64,
    species_count: i64,
    tally: TaxonTally,
    per_visit_points: Vec<CurvePoint>,
    per_person_visit_points: Vec<CurvePoint>,
}

impl RunningEffort {
    /// Seed directly from a location's first visit
    fn start(visit: &Visit, kingdom: &str) -> Self {
        let mut running = Self {
            location_id: visit.location_id(),
            is_cave: visit.is_cave(),
            start_epoch_day: visit.start_epoch_day(),
            end_epoch_day: visit.last_epoch_day(),
            visit_count: 0,
            person_visit_count: 0,
            species_count: 0,
            tally: effort_tally(visit, kingdom),
            per_visit_points: Vec::new(),
            per_person_visit_points: Vec::new(),
        };
        running.record(visit);
        running
    }

    fn absorb(&mut self, visit: &Visit, kingdom: &str) {
        self.tally.merge(&effort_tally(visit, kingdom));
        self.is_cave |= visit.is_cave();
        self.end_epoch_day = self.end_epoch_day.max(visit.last_epoch_day());
        self.record(visit);
    }

    fn record(&mut self, visit: &Visit) {
        self.species_count = self.tally.total_species();

        self.visit_count += 1;
        self.per_visit_points.push(CurvePoint {
            x: self.visit_count,
            species: self.species_count,
        });

        self.person_visit_count += visit.collector_count();
        self.per_person_visit_points.push(CurvePoint {
            x: self.person_visit_count,
            species: self.species_count,
        });
    }

    fn snapshot(&self, is_final: bool) -> Result<Effort> {
        Ok(Effort {
            location_id: self.location_id,
            is_cave: self.is_cave,
            start_date: to_date(self.start_epoch_day)?,
            end_date: to_date(self.end_epoch_day)?,
            visit_count: self.visit_count,
            person_visit_count: self.person_visit_count,
            species_count: self.species_count,
            is_final,
            tally: self.tally.clone(),
            per_visit_points: self.per_visit_points.clone(),
            per_person_visit_points: self.per_person_visit_points.clone(),
        })
    }
}

fn to_date(day: i64) -> Result<NaiveDate> {
    date_from_epoch_day(day)
        .ok_or_else(|| Error::Internal(format!("epoch day {day} is out of calendar range")))
}

/// A visit's tally extended with the implicit kingdom.
///
/// The kingdom counts only for a visit with no identification at all;
/// any named taxon supersedes it.
pub fn effort_tally(visit: &Visit, kingdom: &str) -> TaxonTally {
    let mut tally = visit.tally().clone();
    let entry = TaxonEntry::new(kingdom, visit.tally().is_empty());
    tally.set_rank(Rank::Kingdom, Some(RankTally::single(entry)));
    tally
}

/// Streams visits into effort snapshots
pub struct EffortAccumulator<'a, S: VisitStore + EffortStore + ?Sized> {
    store: &'a S,
    page_size: i64,
    kingdom: String,
}

impl<'a, S: VisitStore + EffortStore + ?Sized> EffortAccumulator<'a, S> {
    pub fn new(store: &'a S, page_size: i64, kingdom: impl Into<String>) -> Self {
        Self {
            store,
            page_size,
            kingdom: kingdom.into(),
        }
    }

    /// Rebuild the effort table from every stored visit
    ///
    /// Existing snapshots are deleted first. Any write failure aborts the run.
    pub async fn tally_effort(&self) -> Result<EffortRunStats> {
        let cleared = self.store.clear_efforts().await?;
        info!("Cleared {} existing effort snapshots", cleared);

        let mut stats = EffortRunStats::default();
        let mut running: Option<RunningEffort> = None;
        let mut page = PageRequest::first(self.page_size);

        loop {
            let visits = self.store.fetch_visits(page).await?;
            debug!("Fetched {} visits at offset {}", visits.len(), page.offset);

            for visit in &visits {
                let next = match running.take() {
                    Some(mut current) if current.location_id == visit.location_id() => {
                        self.flush(&current, false, &mut stats).await?;
                        current.absorb(visit, &self.kingdom);
                        current
                    }
                    Some(current) => {
                        self.flush(&current, true, &mut stats).await?;
                        stats.locations += 1;
                        RunningEffort::start(visit, &self.kingdom)
                    }
                    None => {
                        stats.locations += 1;
                        RunningEffort::start(visit, &self.kingdom)
                    }
                };
                running = Some(next);
                stats.visits_processed += 1;
            }

            if page.is_last(visits.len()) {
                break;
            }
            page = page.next();
        }

        if let Some(current) = running {
            self.flush(&current, true, &mut stats).await?;
        }

        info!(
            "Effort tally complete: {} visits across {} locations, {} snapshots",
            stats.visits_processed, stats.locations, stats.snapshots_written
        );
        Ok(stats)
    }

    async fn flush(&self, running: &RunningEffort, is_final: bool, stats: &mut EffortRunStats) -> Result<()> {
        let effort = running.snapshot(is_final)?;
        self.store.insert_effort(&effort).await?;
        stats.snapshots_written += 1;
        if is_final {
            debug!(
                "Location {} final: {} visits, {} species",
                effort.location_id, effort.visit_count, effort.species_count
            );
        }
        Ok(())
    }
}
