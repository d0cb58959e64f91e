//! Specimen records as handed to the visit aggregator

use crate::taxon::{Rank, RankTally, TaxonEntry, TaxonTally, NAME_SEPARATOR};
use bioseed_common::time::epoch_day;
use bioseed_common::{Error, Result};
use chrono::NaiveDate;

/// Separator between names in a normalized collector signature
pub const COLLECTOR_SEPARATOR: &str = "|";

/// A name and optional numeric identifier at one rank
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identification {
    pub name: String,
    pub id: Option<i64>,
}

/// One collected specimen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specimen {
    pub locality_id: i64,
    pub locality_name: String,
    pub is_cave: bool,
    pub start_date: Option<NaiveDate>,
    /// `None` for single-day collection events
    pub end_date: Option<NaiveDate>,
    pub normalized_collectors: Option<String>,
    // phylum..subspecies, indexed by depth - 1
    identifications: [Option<Identification>; 7],
}

impl Specimen {
    pub fn new(locality_id: i64, locality_name: impl Into<String>) -> Self {
        Self {
            locality_id,
            locality_name: locality_name.into(),
            is_cave: false,
            start_date: None,
            end_date: None,
            normalized_collectors: None,
            identifications: Default::default(),
        }
    }

    pub fn in_cave(mut self, is_cave: bool) -> Self {
        self.is_cave = is_cave;
        self
    }

    pub fn collected_on(mut self, date: NaiveDate) -> Self {
        self.start_date = Some(date);
        self.end_date = None;
        self
    }

    pub fn collected_between(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    /// Set the collectors from free text, normalizing it
    pub fn collected_by(mut self, raw: &str) -> Self {
        self.normalized_collectors = normalize_collectors(raw);
        self
    }

    /// Set an already-normalized collector signature
    pub fn with_signature(mut self, signature: Option<String>) -> Self {
        self.normalized_collectors = signature;
        self
    }

    /// Record the identification at `rank`
    ///
    /// Kingdom is implicit for the domain and cannot be set per specimen.
    pub fn identify(mut self, rank: Rank, name: &str, id: Option<i64>) -> Result<Self> {
        let slot = identification_slot(rank)?;
        self.identifications[slot] = Some(Identification {
            name: validate_taxon_name(name)?,
            id,
        });
        Ok(self)
    }

    pub fn identification(&self, rank: Rank) -> Option<&Identification> {
        identification_slot(rank)
            .ok()
            .and_then(|slot| self.identifications[slot].as_ref())
    }

    /// Carried identifications, least specific first
    pub fn identifications(&self) -> impl Iterator<Item = (Rank, &Identification)> {
        Rank::IDENTIFIED
            .iter()
            .zip(self.identifications.iter())
            .filter_map(|(rank, ident)| ident.as_ref().map(|i| (*rank, i)))
    }

    /// Epoch day and collector signature, or why this specimen cannot
    /// become part of a visit
    pub fn visit_identity(&self) -> Result<(i64, &str)> {
        let start = self.start_date.ok_or_else(|| {
            Error::Precondition(format!(
                "specimen at locality {} has no start date",
                self.locality_id
            ))
        })?;
        if let Some(end) = self.end_date {
            return Err(Error::Precondition(format!(
                "specimen at locality {} spans {start} to {end}; only single-day events form visits",
                self.locality_id
            )));
        }
        let signature = self
            .normalized_collectors
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                Error::Precondition(format!(
                    "specimen at locality {} has no collector signature",
                    self.locality_id
                ))
            })?;
        Ok((epoch_day(start), signature))
    }

    pub fn is_visit_eligible(&self) -> bool {
        self.visit_identity().is_ok()
    }

    /// Single-lineage tally: the deepest carried rank is terminal, every
    /// shallower carried rank is superseded by it.
    pub fn lineage_tally(&self) -> TaxonTally {
        let mut tally = TaxonTally::new();
        let deepest = self.identifications().map(|(rank, _)| rank).last();
        for (rank, ident) in self.identifications() {
            let entry = TaxonEntry::new(ident.name.clone(), Some(rank) == deepest).with_id(ident.id);
            tally.set_rank(rank, Some(RankTally::single(entry)));
        }
        tally
    }
}

fn identification_slot(rank: Rank) -> Result<usize> {
    match rank {
        Rank::Kingdom => Err(Error::InvalidInput(
            "kingdom is implicit and cannot be identified per specimen".to_string(),
        )),
        other => Ok(other.depth() - 1),
    }
}

/// Trim and check a taxon name for storage
pub fn validate_taxon_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput("taxon name is empty".to_string()));
    }
    if name.contains(NAME_SEPARATOR) {
        return Err(Error::InvalidInput(format!(
            "taxon name '{name}' contains reserved separator '{NAME_SEPARATOR}'"
        )));
    }
    Ok(name.to_string())
}

/// Canonical signature for a group of collectors.
///
/// Splits on `,` `;` `&` `|` and the word "and", trims, drops duplicates
/// (case-insensitive, first spelling kept), sorts, joins with `|`.
pub fn normalize_collectors(raw: &str) -> Option<String> {
    let mut names: Vec<String> = Vec::new();
    for part in raw.split([',', ';', '&', '|']) {
        let mut current: Vec<&str> = Vec::new();
        for word in part.split_whitespace() {
            if word.eq_ignore_ascii_case("and") {
                push_name(&mut names, &current);
                current.clear();
            } else {
                current.push(word);
            }
        }
        push_name(&mut names, &current);
    }

    if names.is_empty() {
        return None;
    }
    names.sort_by_key(|n| n.to_lowercase());
    Some(names.join(COLLECTOR_SEPARATOR))
}

fn push_name(names: &mut Vec<String>, words: &[&str]) {
    if words.is_empty() {
        return;
    }
    let name = words.join(" ");
    if !names.iter().any(|n| n.eq_ignore_ascii_case(&name)) {
        names.push(name);
    }
}

/// Number of people in a normalized collector signature
pub fn collector_count(signature: &str) -> i64 {
    signature
        .split(COLLECTOR_SEPARATOR)
        .filter(|s| !s.trim().is_empty())
        .count() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_normalize_collectors_sorts_and_dedupes() {
        assert_eq!(
            normalize_collectors("Smith; Adams & smith and Brown").as_deref(),
            Some("Adams|Brown|Smith")
        );
        assert_eq!(
            normalize_collectors("Jane  Doe|John Roe").as_deref(),
            Some("Jane Doe|John Roe")
        );
    }

    #[test]
    fn test_normalize_collectors_empty() {
        assert_eq!(normalize_collectors("  ,; and "), None);
        assert_eq!(normalize_collectors(""), None);
    }

    #[test]
    fn test_collector_count() {
        assert_eq!(collector_count("Adams|Brown|Smith"), 3);
        assert_eq!(collector_count("Solo"), 1);
    }

    #[test]
    fn test_identify_rejects_kingdom_and_separator() {
        let base = Specimen::new(1, "Blowing Cave");
        assert!(matches!(
            base.clone().identify(Rank::Kingdom, "Animalia", None),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            base.clone().identify(Rank::Genus, "Bad|Name", None),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            base.identify(Rank::Genus, "   ", None),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_visit_identity_preconditions() {
        let specimen = Specimen::new(9, "Sink").collected_by("Adams");
        assert!(matches!(specimen.visit_identity(), Err(Error::Precondition(_))));

        let ranged = specimen
            .clone()
            .collected_between(day(2020, 5, 1), day(2020, 5, 3));
        assert!(matches!(ranged.visit_identity(), Err(Error::Precondition(_))));

        let anonymous = Specimen::new(9, "Sink").collected_on(day(2020, 5, 1));
        assert!(matches!(anonymous.visit_identity(), Err(Error::Precondition(_))));

        let ok = specimen.collected_on(day(2020, 5, 1));
        let (epoch, signature) = ok.visit_identity().unwrap();
        assert_eq!(epoch, epoch_day(day(2020, 5, 1)));
        assert_eq!(signature, "Adams");
    }

    #[test]
    fn test_lineage_tally_marks_deepest_terminal() {
        let specimen = Specimen::new(1, "Cave")
            .identify(Rank::Phylum, "Arthropoda", Some(1))
            .unwrap()
            .identify(Rank::Family, "Carabidae", None)
            .unwrap()
            .identify(Rank::Genus, "Pseudanophthalmus", Some(77))
            .unwrap();

        let tally = specimen.lineage_tally();
        assert_eq!(tally.total_species(), 1);
        assert_eq!(
            tally.rank(Rank::Genus).and_then(|r| r.get("Pseudanophthalmus")),
            Some(&TaxonEntry::new("Pseudanophthalmus", true).with_id(Some(77)))
        );
        assert_eq!(
            tally.rank(Rank::Phylum).and_then(|r| r.get("Arthropoda")).map(|e| e.terminal),
            Some(false)
        );
        assert!(tally.rank(Rank::Class).is_none());
        assert!(tally.rank(Rank::Kingdom).is_none());
    }

    #[test]
    fn test_lineage_tally_of_unidentified_specimen_is_empty() {
        assert!(Specimen::new(1, "Cave").lineage_tally().is_empty());
    }
}
