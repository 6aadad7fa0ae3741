use iamdb_models::{DatasetRecord, EnrichedMovie};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagReason {
    MissingPublicRating,
    MissingGenres,
    UnknownId,
}

impl fmt::Display for FlagReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlagReason::MissingPublicRating => write!(f, "missing public rating"),
            FlagReason::MissingGenres => write!(f, "missing genres"),
            FlagReason::UnknownId => write!(f, "not in current dataset"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlaggedRecord {
    pub external_id: String,
    pub title: String,
    pub reasons: Vec<FlagReason>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CheckReport {
    pub checked: usize,
    pub flagged: Vec<FlaggedRecord>,
}

impl CheckReport {
    pub fn is_clean(&self) -> bool {
        self.flagged.is_empty()
    }
}

/// Which of `persisted_ids` occur in the dataset stream.
///
/// Only ids already persisted are retained, so the full dataset never sits in memory.
pub fn known_ids_among<E>(
    persisted_ids: &HashSet<String>,
    records: impl IntoIterator<Item = Result<DatasetRecord, E>>,
) -> Result<HashSet<String>, E> {
    let mut seen = HashSet::new();
    for record in records {
        let record = record?;
        if persisted_ids.contains(&record.external_id) {
            seen.insert(record.external_id);
        }
    }
    Ok(seen)
}

/// Flag stored records that lack enrichment or whose id is not in `known_ids`.
///
/// Flagged records keep the order of `stored`.
pub fn check_records(stored: &[EnrichedMovie], known_ids: &HashSet<String>) -> CheckReport {
    let flagged = stored
        .iter()
        .filter_map(|movie| {
            let external_id = movie.external_id.clone().unwrap_or_default();
            let mut reasons = Vec::new();
            if movie.public_rating.is_none() {
                reasons.push(FlagReason::MissingPublicRating);
            }
            if movie.genres.is_empty() {
                reasons.push(FlagReason::MissingGenres);
            }
            if !known_ids.contains(&external_id) {
                reasons.push(FlagReason::UnknownId);
            }
            (!reasons.is_empty()).then(|| FlaggedRecord {
                external_id,
                title: movie.title.clone(),
                reasons,
            })
        })
        .collect();

    CheckReport {
        checked: stored.len(),
        flagged,
    }
}
