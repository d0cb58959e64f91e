//! bioseed-effort library - sampling effort aggregation and seed selection
//!
//! Pipeline stages, each driven by an explicit store:
//! - [`visit::VisitAggregator`] folds specimens into visits
//! - [`effort::EffortAccumulator`] streams visits into effort snapshots
//! - [`seeds::SeedSelector`] picks a diverse set of locations

pub mod effort;
pub mod pagination;
pub mod seeds;
pub mod specimen;
pub mod store;
pub mod taxon;
pub mod visit;

pub use effort::{CurvePoint, Effort, EffortAccumulator, EffortRunStats};
pub use seeds::{SeedSelector, SeedSpec};
pub use specimen::Specimen;
pub use store::{EffortStore, RichnessRange, SpecimenSource, SqliteStore, VisitStore};
pub use taxon::{Rank, RankTally, TaxonEntry, TaxonTally};
pub use visit::{Visit, VisitAggregator, VisitChange, VisitKey, VisitRunStats};
