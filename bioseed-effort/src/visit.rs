//! Visits and the visit aggregator
//!
//! A visit gathers every single-day specimen collected at one location on
//! one day by one collector group. Identity is the triple
//! (location, start epoch day, collector signature).

use crate::pagination::PageRequest;
use crate::specimen::{collector_count, Specimen};
use crate::store::{SpecimenSource, VisitStore};
use crate::taxon::{Rank, TaxonTally};
use bioseed_common::{Error, Result};
use tracing::{debug, info};

/// Identity of a visit
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VisitKey {
    pub location_id: i64,
    pub start_epoch_day: i64,
    pub normalized_collectors: String,
}

impl VisitKey {
    pub fn new(location_id: i64, start_epoch_day: i64, normalized_collectors: impl Into<String>) -> Self {
        Self {
            location_id,
            start_epoch_day,
            normalized_collectors: normalized_collectors.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visit {
    key: VisitKey,
    is_cave: bool,
    end_epoch_day: Option<i64>,
    tally: TaxonTally,
}

impl Visit {
    /// Assemble a visit from stored parts
    ///
    /// Rejects an empty collector signature, an end day before the start
    /// day, and any kingdom-rank names (kingdom is tallied per effort only).
    pub fn new(key: VisitKey, is_cave: bool, end_epoch_day: Option<i64>, tally: TaxonTally) -> Result<Self> {
        if key.normalized_collectors.trim().is_empty() {
            return Err(Error::InvalidInput(format!(
                "visit at location {} has an empty collector signature",
                key.location_id
            )));
        }
        if let Some(end) = end_epoch_day {
            if end < key.start_epoch_day {
                return Err(Error::InvalidInput(format!(
                    "visit at location {} ends (day {end}) before it starts (day {})",
                    key.location_id, key.start_epoch_day
                )));
            }
        }
        if tally.rank(Rank::Kingdom).is_some() {
            return Err(Error::InvalidInput(
                "visit tallies carry phylum through subspecies only".to_string(),
            ));
        }
        Ok(Self {
            key,
            is_cave,
            end_epoch_day,
            tally,
        })
    }

    /// First specimen of a new visit
    pub fn from_specimen(specimen: &Specimen) -> Result<Self> {
        let (day, signature) = specimen.visit_identity()?;
        Self::new(
            VisitKey::new(specimen.locality_id, day, signature),
            specimen.is_cave,
            None,
            specimen.lineage_tally(),
        )
    }

    /// Fold a later specimen sharing this visit's key into it
    pub fn absorb(&mut self, specimen: &Specimen) -> Result<()> {
        let (day, signature) = specimen.visit_identity()?;
        if specimen.locality_id != self.key.location_id
            || day != self.key.start_epoch_day
            || signature != self.key.normalized_collectors
        {
            return Err(Error::InvalidInput(format!(
                "specimen ({}, day {day}, {signature}) does not belong to visit {:?}",
                specimen.locality_id, self.key
            )));
        }

        self.tally.merge(&specimen.lineage_tally());
        self.end_epoch_day = Some(self.last_epoch_day().max(day));
        Ok(())
    }

    pub fn key(&self) -> &VisitKey {
        &self.key
    }

    pub fn location_id(&self) -> i64 {
        self.key.location_id
    }

    pub fn start_epoch_day(&self) -> i64 {
        self.key.start_epoch_day
    }

    pub fn end_epoch_day(&self) -> Option<i64> {
        self.end_epoch_day
    }

    /// End day, or the start day when the visit has none
    pub fn last_epoch_day(&self) -> i64 {
        self.end_epoch_day.unwrap_or(self.key.start_epoch_day)
    }

    pub fn is_cave(&self) -> bool {
        self.is_cave
    }

    pub fn normalized_collectors(&self) -> &str {
        &self.key.normalized_collectors
    }

    /// People in this visit's collector group
    pub fn collector_count(&self) -> i64 {
        collector_count(&self.key.normalized_collectors)
    }

    pub fn tally(&self) -> &TaxonTally {
        &self.tally
    }
}

/// What `add_specimen` did with a specimen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitChange {
    Created,
    Updated,
}

/// Counters for one visit rebuild
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisitRunStats {
    pub specimens_seen: u64,
    pub specimens_skipped: u64,
    pub visits_created: u64,
    pub visits_updated: u64,
}

/// Folds specimens into persisted visits
pub struct VisitAggregator<'a, S: VisitStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: VisitStore + ?Sized> VisitAggregator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Add one specimen to its visit, creating the visit if needed
    ///
    /// Fails with `Precondition` when the specimen has no start date, has
    /// an end date, or has no collector signature. An update that does
    /// not touch exactly one row is a `Consistency` failure.
    pub async fn add_specimen(&self, specimen: &Specimen) -> Result<VisitChange> {
        let (day, signature) = specimen.visit_identity()?;
        let key = VisitKey::new(specimen.locality_id, day, signature);

        match self.store.find_visit(&key).await? {
            None => {
                let visit = Visit::from_specimen(specimen)?;
                self.store.insert_visit(&visit).await?;
                Ok(VisitChange::Created)
            }
            Some(mut visit) => {
                visit.absorb(specimen)?;
                let rows = self.store.update_visit(&visit).await?;
                if rows != 1 {
                    return Err(Error::Consistency(format!(
                        "update of visit {:?} affected {rows} rows",
                        visit.key()
                    )));
                }
                Ok(VisitChange::Updated)
            }
        }
    }

    /// Clear all visits and rebuild them from every eligible specimen
    ///
    /// Specimens that cannot form a visit are counted and skipped.
    pub async fn rebuild<Src>(&self, source: &Src, page_size: i64) -> Result<VisitRunStats>
    where
        Src: SpecimenSource + ?Sized,
    {
        let cleared = self.store.clear_visits().await?;
        info!("Cleared {} existing visits", cleared);

        let mut stats = VisitRunStats::default();
        let mut page = PageRequest::first(page_size);

        loop {
            let specimens = source.fetch_specimens(page).await?;
            debug!(
                "Fetched {} specimens at offset {}",
                specimens.len(),
                page.offset
            );

            for specimen in &specimens {
                stats.specimens_seen += 1;
                if !specimen.is_visit_eligible() {
                    stats.specimens_skipped += 1;
                    continue;
                }
                match self.add_specimen(specimen).await? {
                    VisitChange::Created => stats.visits_created += 1,
                    VisitChange::Updated => stats.visits_updated += 1,
                }
            }

            if page.is_last(specimens.len()) {
                break;
            }
            page = page.next();
        }

        info!(
            "Visit rebuild complete: {} specimens, {} skipped, {} visits created, {} merges",
            stats.specimens_seen, stats.specimens_skipped, stats.visits_created, stats.visits_updated
        );
        Ok(stats)
    }
}
