use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::{DatasetRecord, WatchedEntry};

/// A watched entry merged with its best dataset match.
///
/// `external_id` is `Some` exactly when a match was found.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrichedMovie {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub title: String,
    pub year: Option<u32>,
    pub public_rating: Option<f64>,
    pub personal_rating: Option<f64>,
    pub watch_date: NaiveDate,
    #[serde(default)]
    pub genres: BTreeSet<String>,
}

impl EnrichedMovie {
    pub fn matched(entry: &WatchedEntry, record: &DatasetRecord) -> Self {
        Self {
            external_id: Some(record.external_id.clone()),
            title: record.title.clone(),
            year: record.year,
            public_rating: record.public_rating,
            personal_rating: entry.personal_rating,
            watch_date: entry.watch_date,
            genres: record.genres.clone(),
        }
    }

    pub fn unmatched(entry: &WatchedEntry) -> Self {
        Self {
            external_id: None,
            title: entry.title.clone(),
            year: entry.release_year,
            public_rating: None,
            personal_rating: entry.personal_rating,
            watch_date: entry.watch_date,
            genres: BTreeSet::new(),
        }
    }

    pub fn is_matched(&self) -> bool {
        self.external_id.is_some()
    }
}

impl std::fmt::Display for EnrichedMovie {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.year {
            Some(year) => write!(f, "{} ({})", self.title, year)?,
            None => write!(f, "{}", self.title)?,
        }
        if let Some(id) = &self.external_id {
            write!(f, " [{}]", id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> WatchedEntry {
        WatchedEntry::new("heat", NaiveDate::from_ymd_opt(2020, 1, 2).unwrap()).with_rating(8.0)
    }

    fn record() -> DatasetRecord {
        DatasetRecord {
            external_id: "tt0113277".to_string(),
            title: "Heat".to_string(),
            year: Some(1995),
            public_rating: Some(8.3),
            genres: ["Crime", "Drama"].iter().map(|g| g.to_string()).collect(),
            title_type: "movie".to_string(),
        }
    }

    #[test]
    fn test_matched_merges_personal_and_public_fields() {
        let movie = EnrichedMovie::matched(&entry(), &record());
        assert!(movie.is_matched());
        assert_eq!(movie.title, "Heat");
        assert_eq!(movie.personal_rating, Some(8.0));
        assert_eq!(movie.public_rating, Some(8.3));
        assert_eq!(movie.genres.len(), 2);
        assert_eq!(movie.to_string(), "Heat (1995) [tt0113277]");
    }

    #[test]
    fn test_unmatched_has_no_id_and_no_enrichment() {
        let movie = EnrichedMovie::unmatched(&entry());
        assert!(!movie.is_matched());
        assert_eq!(movie.title, "heat");
        assert_eq!(movie.public_rating, None);
        assert!(movie.genres.is_empty());
    }

    #[test]
    fn test_unmatched_json_omits_external_id() {
        let json = serde_json::to_value(EnrichedMovie::unmatched(&entry())).unwrap();
        assert!(json.get("external_id").is_none());
        assert_eq!(json["watch_date"], "2020-01-02");

        let json = serde_json::to_value(EnrichedMovie::matched(&entry(), &record())).unwrap();
        assert_eq!(json["external_id"], "tt0113277");
    }
}
