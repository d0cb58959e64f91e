//! Diverse seed selection
//!
//! Greedy maximum coverage: each round picks the location whose terminal
//! taxa add the most names not yet covered by earlier picks.
//!
//! The scan relies on the store returning efforts in descending richness
//! order. An effort's richness bounds how many new taxa it can add, so
//! once richness drops to the best gain seen so far the rest of the scan
//! (this page and every later one) cannot improve on it and is skipped.
//! Unsorted input silently yields a worse selection.

use crate::effort::Effort;
use crate::pagination::PageRequest;
use crate::store::{EffortStore, RichnessRange};
use bioseed_common::{Error, Result};
use std::collections::HashSet;
use tracing::{debug, info};

/// Parameters of one selection run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSpec {
    pub min_species: i64,
    pub max_species: i64,
    pub max_clusters: usize,
}

impl SeedSpec {
    fn richness_range(&self) -> Result<RichnessRange> {
        if self.min_species > self.max_species {
            return Err(Error::InvalidInput(format!(
                "min_species {} exceeds max_species {}",
                self.min_species, self.max_species
            )));
        }
        Ok(RichnessRange {
            min: self.min_species,
            max: self.max_species,
        })
    }
}

/// Best effort found so far in one round
#[derive(Debug)]
struct Candidate {
    location_id: i64,
    new_taxa: usize,
    taxa: HashSet<String>,
}

/// Working set of one run; never persisted
#[derive(Debug, Default)]
struct Coverage {
    covered: HashSet<String>,
    chosen: Vec<i64>,
    chosen_set: HashSet<i64>,
}

impl Coverage {
    fn choose(&mut self, candidate: Candidate) {
        info!(
            "Seed {}: location {} adds {} taxa",
            self.chosen.len() + 1,
            candidate.location_id,
            candidate.new_taxa
        );
        self.covered.extend(candidate.taxa);
        self.chosen.push(candidate.location_id);
        self.chosen_set.insert(candidate.location_id);
    }

    fn new_taxa(&self, taxa: &HashSet<String>) -> usize {
        taxa.iter().filter(|t| !self.covered.contains(*t)).count()
    }
}

pub struct SeedSelector<'a, S: EffortStore + ?Sized> {
    store: &'a S,
    page_size: i64,
}

impl<'a, S: EffortStore + ?Sized> SeedSelector<'a, S> {
    pub fn new(store: &'a S, page_size: i64) -> Self {
        Self { store, page_size }
    }

    /// Up to `max_clusters` location ids, in the order they were chosen
    ///
    /// Returns fewer when the candidates run out or a round finds no
    /// location adding at least one new taxon.
    pub async fn select_seeds(&self, spec: &SeedSpec) -> Result<Vec<i64>> {
        let range = spec.richness_range()?;
        let mut coverage = Coverage::default();

        while coverage.chosen.len() < spec.max_clusters {
            let pick = if coverage.chosen.is_empty() {
                self.first_seed(range).await?
            } else {
                self.best_candidate(range, &coverage).await?
            };

            match pick {
                Some(candidate) => coverage.choose(candidate),
                None => {
                    debug!("No improving candidate; stopping early");
                    break;
                }
            }
        }

        info!(
            "Selected {} of {} requested seeds",
            coverage.chosen.len(),
            spec.max_clusters
        );
        Ok(coverage.chosen)
    }

    /// Richest effort in range, ties broken by lowest location id
    async fn first_seed(&self, range: RichnessRange) -> Result<Option<Candidate>> {
        let efforts = self
            .store
            .fetch_efforts(range, PageRequest::first(self.page_size))
            .await?;

        Ok(efforts.into_iter().next().map(|effort| {
            let taxa = effort.tally.terminal_taxa();
            Candidate {
                location_id: effort.location_id,
                new_taxa: taxa.len(),
                taxa,
            }
        }))
    }

    async fn best_candidate(&self, range: RichnessRange, coverage: &Coverage) -> Result<Option<Candidate>> {
        let mut best: Option<Candidate> = None;
        let mut best_new = 0usize;
        let mut page = PageRequest::first(self.page_size);

        'scan: loop {
            let efforts = self.store.fetch_efforts(range, page).await?;

            for effort in &efforts {
                if coverage.chosen_set.contains(&effort.location_id) {
                    continue;
                }
                if effort.species_count <= best_new as i64 {
                    debug!(
                        "Pruned scan at location {} (richness {} <= best gain {})",
                        effort.location_id, effort.species_count, best_new
                    );
                    break 'scan;
                }
                if let Some(candidate) = improving_candidate(effort, coverage, best_new) {
                    best_new = candidate.new_taxa;
                    best = Some(candidate);
                }
            }

            if page.is_last(efforts.len()) {
                break;
            }
            page = page.next();
        }

        Ok(best)
    }
}

fn improving_candidate(effort: &Effort, coverage: &Coverage, best_new: usize) -> Option<Candidate> {
    let taxa = effort.tally.terminal_taxa();
    let new_taxa = coverage.new_taxa(&taxa);
    (new_taxa > best_new).then(|| Candidate {
        location_id: effort.location_id,
        new_taxa,
        taxa,
    })
}
