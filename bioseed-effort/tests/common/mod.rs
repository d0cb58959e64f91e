//! Shared helpers for bioseed-effort integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use bioseed_common::db::init_memory_database;
use bioseed_common::{Error, Result};
use bioseed_effort::pagination::PageRequest;
use bioseed_effort::{
    Effort, EffortStore, Rank, RankTally, RichnessRange, SqliteStore, TaxonEntry, TaxonTally,
    Visit, VisitKey, VisitStore,
};
use chrono::NaiveDate;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Fresh in-memory SQLite store with the full schema
pub async fn sqlite_store() -> SqliteStore {
    let pool = init_memory_database()
        .await
        .expect("in-memory database should open");
    SqliteStore::new(pool)
}

/// Tally holding the given species, all terminal
pub fn species_tally(species: &[&str]) -> TaxonTally {
    let mut tally = TaxonTally::new();
    if !species.is_empty() {
        let entries = species.iter().map(|s| TaxonEntry::new(*s, true));
        tally.set_rank(
            Rank::Species,
            Some(RankTally::from_entries(entries).expect("distinct names")),
        );
    }
    tally
}

pub fn visit(location_id: i64, day: i64, collectors: &str, species: &[&str]) -> Visit {
    Visit::new(
        VisitKey::new(location_id, day, collectors),
        true,
        None,
        species_tally(species),
    )
    .expect("valid visit")
}

/// Final effort snapshot holding the given species
pub fn final_effort(location_id: i64, species: &[&str]) -> Effort {
    let date = NaiveDate::from_ymd_opt(2020, 6, 1).expect("valid date");
    Effort {
        location_id,
        is_cave: true,
        start_date: date,
        end_date: date,
        visit_count: 1,
        person_visit_count: 1,
        species_count: species.len() as i64,
        is_final: true,
        tally: species_tally(species),
        per_visit_points: Vec::new(),
        per_person_visit_points: Vec::new(),
    }
}

/// In-memory effort store that counts page fetches
///
/// With `sorted` off, efforts come back in insertion order, imitating a
/// store that ignores the richness ordering.
pub struct MemoryEffortStore {
    efforts: Mutex<Vec<Effort>>,
    sorted: bool,
    fetches: AtomicUsize,
}

impl MemoryEffortStore {
    pub fn new(efforts: Vec<Effort>) -> Self {
        Self {
            efforts: Mutex::new(efforts),
            sorted: true,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn unsorted(efforts: Vec<Effort>) -> Self {
        Self {
            sorted: false,
            ..Self::new(efforts)
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EffortStore for MemoryEffortStore {
    async fn insert_effort(&self, effort: &Effort) -> Result<()> {
        self.efforts.lock().unwrap().push(effort.clone());
        Ok(())
    }

    async fn fetch_efforts(&self, range: RichnessRange, page: PageRequest) -> Result<Vec<Effort>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let mut rows: Vec<Effort> = self
            .efforts
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.is_final && (range.min..=range.max).contains(&e.species_count))
            .cloned()
            .collect();
        if self.sorted {
            rows.sort_by(|a, b| {
                b.species_count
                    .cmp(&a.species_count)
                    .then(a.location_id.cmp(&b.location_id))
            });
        }
        Ok(rows
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .collect())
    }

    async fn final_effort(&self, location_id: i64) -> Result<Option<Effort>> {
        Ok(self
            .efforts
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.is_final && e.location_id == location_id)
            .cloned())
    }

    async fn clear_efforts(&self) -> Result<u64> {
        let mut efforts = self.efforts.lock().unwrap();
        let count = efforts.len() as u64;
        efforts.clear();
        Ok(count)
    }
}

/// Visit store that finds one existing visit and reports a fixed row
/// count for every update, as if the row vanished or was duplicated
pub struct StaleVisitStore {
    pub existing: Visit,
    pub rows_affected: u64,
}

#[async_trait]
impl VisitStore for StaleVisitStore {
    async fn find_visit(&self, key: &VisitKey) -> Result<Option<Visit>> {
        Ok((key == self.existing.key()).then(|| self.existing.clone()))
    }

    async fn insert_visit(&self, _visit: &Visit) -> Result<()> {
        Ok(())
    }

    async fn update_visit(&self, _visit: &Visit) -> Result<u64> {
        Ok(self.rows_affected)
    }

    async fn fetch_visits(&self, _page: PageRequest) -> Result<Vec<Visit>> {
        Ok(Vec::new())
    }

    async fn clear_visits(&self) -> Result<u64> {
        Ok(0)
    }
}

/// Serves fixed visits and fails the `fail_on`-th effort insert (1-based)
pub struct FailingEffortStore {
    visits: Vec<Visit>,
    fail_on: usize,
    attempts: AtomicUsize,
    inserted: Mutex<Vec<Effort>>,
}

impl FailingEffortStore {
    pub fn new(visits: Vec<Visit>, fail_on: usize) -> Self {
        Self {
            visits,
            fail_on,
            attempts: AtomicUsize::new(0),
            inserted: Mutex::new(Vec::new()),
        }
    }

    pub fn inserted(&self) -> Vec<Effort> {
        self.inserted.lock().unwrap().clone()
    }
}

#[async_trait]
impl VisitStore for FailingEffortStore {
    async fn find_visit(&self, key: &VisitKey) -> Result<Option<Visit>> {
        Ok(self.visits.iter().find(|v| v.key() == key).cloned())
    }

    async fn insert_visit(&self, _visit: &Visit) -> Result<()> {
        Ok(())
    }

    async fn update_visit(&self, _visit: &Visit) -> Result<u64> {
        Ok(1)
    }

    async fn fetch_visits(&self, page: PageRequest) -> Result<Vec<Visit>> {
        Ok(self
            .visits
            .iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .cloned()
            .collect())
    }

    async fn clear_visits(&self) -> Result<u64> {
        Ok(0)
    }
}

#[async_trait]
impl EffortStore for FailingEffortStore {
    async fn insert_effort(&self, effort: &Effort) -> Result<()> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt == self.fail_on {
            return Err(Error::Database(sqlx::Error::PoolClosed));
        }
        self.inserted.lock().unwrap().push(effort.clone());
        Ok(())
    }

    async fn fetch_efforts(&self, _range: RichnessRange, _page: PageRequest) -> Result<Vec<Effort>> {
        Ok(Vec::new())
    }

    async fn final_effort(&self, location_id: i64) -> Result<Option<Effort>> {
        Ok(self
            .inserted
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.is_final && e.location_id == location_id)
            .cloned())
    }

    async fn clear_efforts(&self) -> Result<u64> {
        Ok(0)
    }
}
