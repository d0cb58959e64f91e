//! Column encoding for tallies and curves
//!
//! A rank persists as parallel delimited strings: names joined by `|`,
//! flags as one `0`/`1` character per name, and (visits only) ids joined by
//! `|` with an empty slot for a missing id. A NULL names column means the
//! rank was never identified; an empty string means an empty rank.
//! Curves persist as JSON arrays of `[x, species]` pairs.

use crate::effort::CurvePoint;
use crate::taxon::{Rank, RankTally, TaxonEntry, NAME_SEPARATOR};
use bioseed_common::{Error, Result};

const TERMINAL: char = '1';
const SUPERSEDED: char = '0';

pub fn encode_names(tally: Option<&RankTally>) -> Option<String> {
    tally.map(|t| {
        t.names()
            .collect::<Vec<_>>()
            .join(NAME_SEPARATOR)
    })
}

pub fn encode_flags(tally: Option<&RankTally>) -> Option<String> {
    tally.map(|t| {
        t.flags()
            .map(|terminal| if terminal { TERMINAL } else { SUPERSEDED })
            .collect()
    })
}

pub fn encode_ids(tally: Option<&RankTally>) -> Option<String> {
    tally.map(|t| {
        t.iter()
            .map(|e| e.id.map(|id| id.to_string()).unwrap_or_default())
            .collect::<Vec<_>>()
            .join(NAME_SEPARATOR)
    })
}

fn split_list(text: &str) -> Vec<&str> {
    if text.is_empty() {
        Vec::new()
    } else {
        text.split(NAME_SEPARATOR).collect()
    }
}

/// Rebuild one rank from its stored columns
pub fn decode_rank(
    rank: Rank,
    names: Option<&str>,
    flags: Option<&str>,
    ids: Option<&str>,
) -> Result<Option<RankTally>> {
    let (names, flags) = match (names, flags) {
        (None, None) => return Ok(None),
        (Some(names), Some(flags)) => (split_list(names), flags),
        _ => {
            return Err(Error::Encoding(format!(
                "{rank}: names and flags must both be present or both be NULL"
            )))
        }
    };

    let flag_chars: Vec<char> = flags.chars().collect();
    if flag_chars.len() != names.len() {
        return Err(Error::Encoding(format!(
            "{rank}: {} names but {} flags",
            names.len(),
            flag_chars.len()
        )));
    }

    let ids: Vec<Option<i64>> = match ids {
        None => vec![None; names.len()],
        Some(text) => {
            let slots = if names.is_empty() { Vec::new() } else { text.split(NAME_SEPARATOR).collect() };
            if slots.len() != names.len() {
                return Err(Error::Encoding(format!(
                    "{rank}: {} names but {} ids",
                    names.len(),
                    slots.len()
                )));
            }
            slots
                .into_iter()
                .map(|slot| parse_id(rank, slot))
                .collect::<Result<_>>()?
        }
    };

    let mut entries = Vec::with_capacity(names.len());
    for ((name, flag), id) in names.into_iter().zip(flag_chars).zip(ids) {
        if name.is_empty() {
            return Err(Error::Encoding(format!("{rank}: empty taxon name")));
        }
        let terminal = match flag {
            TERMINAL => true,
            SUPERSEDED => false,
            other => {
                return Err(Error::Encoding(format!(
                    "{rank}: invalid flag character '{other}'"
                )))
            }
        };
        entries.push(TaxonEntry::new(name, terminal).with_id(id));
    }

    RankTally::from_entries(entries)
        .map(Some)
        .map_err(|e| Error::Encoding(format!("{rank}: {e}")))
}

fn parse_id(rank: Rank, slot: &str) -> Result<Option<i64>> {
    if slot.is_empty() {
        return Ok(None);
    }
    slot.parse::<i64>()
        .map(Some)
        .map_err(|_| Error::Encoding(format!("{rank}: invalid taxon id '{slot}'")))
}

pub fn encode_curve(points: &[CurvePoint]) -> Result<String> {
    Ok(serde_json::to_string(points)?)
}

pub fn decode_curve(text: &str) -> Result<Vec<CurvePoint>> {
    Ok(serde_json::from_str(text)?)
}
