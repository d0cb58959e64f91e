//! Taxon tallies
//!
//! A tally records, for each of the eight ranks, the distinct taxon names
//! seen so far in order of first appearance, each flagged terminal (counts
//! toward species richness) or superseded (a more specific identification
//! of the same lineage is the one that counts).
//!
//! Merging only ever downgrades a flag from terminal to superseded. A name
//! already present is never upgraded by a later terminal claim.

use bioseed_common::db::schema::RANK_COLUMNS;
use bioseed_common::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Reserved character; never part of a taxon name
pub const NAME_SEPARATOR: &str = "|";

/// Taxonomic rank, ordered from least to most specific
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Rank {
    Kingdom,
    Phylum,
    Class,
    Order,
    Family,
    Genus,
    Species,
    Subspecies,
}

impl Rank {
    pub const ALL: [Rank; 8] = [
        Rank::Kingdom,
        Rank::Phylum,
        Rank::Class,
        Rank::Order,
        Rank::Family,
        Rank::Genus,
        Rank::Species,
        Rank::Subspecies,
    ];

    /// Ranks a specimen or visit can carry; kingdom is implied by the domain
    pub const IDENTIFIED: [Rank; 7] = [
        Rank::Phylum,
        Rank::Class,
        Rank::Order,
        Rank::Family,
        Rank::Genus,
        Rank::Species,
        Rank::Subspecies,
    ];

    /// 0 for kingdom through 7 for subspecies
    pub fn depth(self) -> usize {
        self as usize
    }

    /// Column prefix used by the persisted layout
    pub fn column(self) -> &'static str {
        RANK_COLUMNS[self.depth()]
    }

    pub fn label(self) -> &'static str {
        match self {
            Rank::Kingdom => "kingdom",
            Rank::Phylum => "phylum",
            Rank::Class => "class",
            Rank::Order => "order",
            Rank::Family => "family",
            Rank::Genus => "genus",
            Rank::Species => "species",
            Rank::Subspecies => "subspecies",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One distinct name at one rank
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonEntry {
    pub name: String,
    /// `true` when this name counts toward richness
    pub terminal: bool,
    /// Numeric taxon identifier, when the source supplied one
    pub id: Option<i64>,
}

impl TaxonEntry {
    pub fn new(name: impl Into<String>, terminal: bool) -> Self {
        Self {
            name: name.into(),
            terminal,
            id: None,
        }
    }

    pub fn with_id(mut self, id: Option<i64>) -> Self {
        self.id = id;
        self
    }
}

/// Ordered, duplicate-free names of a single rank with their flags
#[derive(Debug, Clone, Default)]
pub struct RankTally {
    entries: Vec<TaxonEntry>,
    positions: HashMap<String, usize>,
}

impl PartialEq for RankTally {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for RankTally {}

impl RankTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(entry: TaxonEntry) -> Self {
        let mut tally = Self::new();
        tally.append(entry);
        tally
    }

    /// Build from entries, rejecting repeated names
    pub fn from_entries<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = TaxonEntry>,
    {
        let mut tally = Self::new();
        for entry in entries {
            if tally.positions.contains_key(&entry.name) {
                return Err(Error::InvalidInput(format!(
                    "taxon name '{}' appears twice at one rank",
                    entry.name
                )));
            }
            tally.append(entry);
        }
        Ok(tally)
    }

    fn append(&mut self, entry: TaxonEntry) {
        self.positions.insert(entry.name.clone(), self.entries.len());
        self.entries.push(entry);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaxonEntry> {
        self.entries.iter()
    }

    pub fn get(&self, name: &str) -> Option<&TaxonEntry> {
        self.positions.get(name).map(|&i| &self.entries[i])
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn flags(&self) -> impl Iterator<Item = bool> + '_ {
        self.entries.iter().map(|e| e.terminal)
    }

    pub fn terminal_count(&self) -> usize {
        self.entries.iter().filter(|e| e.terminal).count()
    }

    pub fn terminal_names(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|e| e.terminal)
            .map(|e| e.name.as_str())
    }

    /// Fold one incoming name into this rank.
    ///
    /// Unseen names are appended with their incoming flag. A known name is
    /// downgraded when the incoming flag is superseded; an incoming terminal
    /// flag leaves it untouched. A missing id is filled from the incoming one.
    pub fn merge_entry(&mut self, incoming: &TaxonEntry) {
        match self.positions.get(&incoming.name) {
            None => self.append(incoming.clone()),
            Some(&i) => {
                let existing = &mut self.entries[i];
                if !incoming.terminal && existing.terminal {
                    existing.terminal = false;
                }
                if existing.id.is_none() {
                    existing.id = incoming.id;
                }
            }
        }
    }

    /// Fold every name of `other` into this rank, in `other`'s order
    pub fn merge(&mut self, other: &RankTally) {
        for entry in &other.entries {
            self.merge_entry(entry);
        }
    }
}

/// Per-rank tallies, kingdom through subspecies
///
/// A rank with no identifications at all is `None`, which is distinct from
/// a rank that is present but empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaxonTally {
    ranks: [Option<RankTally>; 8],
}

impl TaxonTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rank(&self, rank: Rank) -> Option<&RankTally> {
        self.ranks[rank.depth()].as_ref()
    }

    pub fn set_rank(&mut self, rank: Rank, tally: Option<RankTally>) {
        self.ranks[rank.depth()] = tally;
    }

    /// Merge one rank's incoming names.
    ///
    /// A rank this tally has never seen adopts the incoming list wholesale;
    /// an absent incoming rank changes nothing.
    pub fn merge_rank(&mut self, rank: Rank, incoming: Option<&RankTally>) {
        let Some(incoming) = incoming else {
            return;
        };
        let slot = &mut self.ranks[rank.depth()];
        if let Some(existing) = slot.as_mut() {
            existing.merge(incoming);
        } else {
            *slot = Some(incoming.clone());
        }
    }

    /// Merge all eight ranks of `other` into this tally
    pub fn merge(&mut self, other: &TaxonTally) {
        for rank in Rank::ALL {
            self.merge_rank(rank, other.rank(rank));
        }
    }

    /// Count of terminal flags summed across every rank
    pub fn total_species(&self) -> i64 {
        self.ranks
            .iter()
            .flatten()
            .map(|r| r.terminal_count() as i64)
            .sum()
    }

    /// Terminal names of all ranks in one flat set
    ///
    /// A name shared by two ranks collapses into one member.
    pub fn terminal_taxa(&self) -> HashSet<String> {
        self.ranks
            .iter()
            .flatten()
            .flat_map(|r| r.terminal_names())
            .map(str::to_string)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.iter().flatten().all(RankTally::is_empty)
    }
}
