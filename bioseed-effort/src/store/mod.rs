//! Storage capabilities consumed by the engine
//!
//! Each component receives the store it needs as an explicit parameter.
//! [`SqliteStore`] implements all of them over the shared database; tests
//! substitute in-memory fakes.

use crate::effort::Effort;
use crate::pagination::PageRequest;
use crate::specimen::Specimen;
use crate::visit::{Visit, VisitKey};
use async_trait::async_trait;
use bioseed_common::Result;

pub mod codec;
mod sqlite;

pub use sqlite::SqliteStore;

/// Inclusive species-richness window for effort scans
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RichnessRange {
    pub min: i64,
    pub max: i64,
}

/// Raw specimen rows, ordered by locality then start date
#[async_trait]
pub trait SpecimenSource: Send + Sync {
    async fn fetch_specimens(&self, page: PageRequest) -> Result<Vec<Specimen>>;
}

/// Persisted visits
#[async_trait]
pub trait VisitStore: Send + Sync {
    /// Point lookup by identity key
    async fn find_visit(&self, key: &VisitKey) -> Result<Option<Visit>>;

    async fn insert_visit(&self, visit: &Visit) -> Result<()>;

    /// Rewrite the row with this visit's key; returns rows affected
    async fn update_visit(&self, visit: &Visit) -> Result<u64>;

    /// Visits ordered by location, then start day, then collectors
    async fn fetch_visits(&self, page: PageRequest) -> Result<Vec<Visit>>;

    async fn clear_visits(&self) -> Result<u64>;
}

/// Persisted effort snapshots
#[async_trait]
pub trait EffortStore: Send + Sync {
    async fn insert_effort(&self, effort: &Effort) -> Result<()>;

    /// Final snapshots whose richness lies in `range`, ordered by richness
    /// descending then location ascending
    async fn fetch_efforts(&self, range: RichnessRange, page: PageRequest) -> Result<Vec<Effort>>;

    /// Final snapshot of one location
    async fn final_effort(&self, location_id: i64) -> Result<Option<Effort>>;

    async fn clear_efforts(&self) -> Result<u64>;
}
