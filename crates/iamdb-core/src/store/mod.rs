use async_trait::async_trait;
use chrono::NaiveDate;
use iamdb_models::EnrichedMovie;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{PersistenceError, UpsertError, ValidationError};

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// Document shape of a persisted movie, keyed by its external id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredMovie {
    #[serde(rename = "_id")]
    pub external_id: String,
    pub title: String,
    pub year: Option<u32>,
    pub public_rating: Option<f64>,
    pub personal_rating: Option<f64>,
    pub watch_date: NaiveDate,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<bson::DateTime>,
}

impl StoredMovie {
    /// Rejects movies that never matched a dataset record.
    pub fn from_movie(movie: &EnrichedMovie) -> Result<Self, ValidationError> {
        let external_id = match movie.external_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                return Err(ValidationError {
                    title: movie.title.clone(),
                    reason: "missing external id".to_string(),
                })
            }
        };

        Ok(Self {
            external_id,
            title: movie.title.clone(),
            year: movie.year,
            public_rating: movie.public_rating,
            personal_rating: movie.personal_rating,
            watch_date: movie.watch_date,
            genres: movie.genres.iter().cloned().collect(),
            modified: None,
        })
    }

    pub fn touched(mut self) -> Self {
        self.modified = Some(bson::DateTime::now());
        self
    }
}

impl From<StoredMovie> for EnrichedMovie {
    fn from(stored: StoredMovie) -> Self {
        EnrichedMovie {
            external_id: Some(stored.external_id),
            title: stored.title,
            year: stored.year,
            public_rating: stored.public_rating,
            personal_rating: stored.personal_rating,
            watch_date: stored.watch_date,
            genres: stored.genres.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FailedUpsert {
    pub external_id: Option<String>,
    pub title: String,
    pub error: String,
}

/// Outcome of a batch of independent upserts.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct UpsertReport {
    pub succeeded: usize,
    pub failed: Vec<FailedUpsert>,
}

impl UpsertReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn attempted(&self) -> usize {
        self.succeeded + self.failed.len()
    }
}

/// A keyed collection of enriched movies.
#[async_trait]
pub trait MovieStore: Send + Sync {
    /// Human-readable description of where records go
    fn describe(&self) -> String;

    /// Write or replace the record keyed by the movie's external id.
    async fn upsert(&self, movie: &EnrichedMovie) -> Result<(), UpsertError>;

    /// Every persisted record.
    async fn fetch_all(&self) -> Result<Vec<EnrichedMovie>, PersistenceError>;

    /// Upsert each movie in order. Earlier writes are kept when a later one fails.
    async fn upsert_all(&self, movies: &[EnrichedMovie]) -> UpsertReport {
        let mut report = UpsertReport::default();
        for movie in movies {
            match self.upsert(movie).await {
                Ok(()) => report.succeeded += 1,
                Err(e) => {
                    warn!("Failed to upsert {}: {}", movie, e);
                    report.failed.push(FailedUpsert {
                        external_id: movie.external_id.clone(),
                        title: movie.title.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
        info!(
            "Upserted {} of {} records to {}",
            report.succeeded,
            report.attempted(),
            self.describe()
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn movie(id: Option<&str>) -> EnrichedMovie {
        EnrichedMovie {
            external_id: id.map(str::to_string),
            title: "Heat".to_string(),
            year: Some(1995),
            public_rating: Some(8.3),
            personal_rating: Some(9.0),
            watch_date: NaiveDate::from_ymd_opt(2021, 3, 4).unwrap(),
            genres: BTreeSet::from(["Crime".to_string(), "Drama".to_string()]),
        }
    }

    #[test]
    fn test_stored_movie_uses_id_as_document_key() {
        let stored = StoredMovie::from_movie(&movie(Some("tt0113277"))).unwrap();
        let doc = bson::to_document(&stored).unwrap();

        assert_eq!(doc.get_str("_id").unwrap(), "tt0113277");
        assert!(!doc.contains_key("external_id"));
        assert!(!doc.contains_key("modified"));
        assert_eq!(doc.get_str("watch_date").unwrap(), "2021-03-04");
        assert_eq!(doc.get_array("genres").unwrap().len(), 2);
    }

    #[test]
    fn test_stored_movie_document_round_trip() {
        let stored = StoredMovie::from_movie(&movie(Some("tt0113277"))).unwrap().touched();
        let doc = bson::to_document(&stored).unwrap();
        assert!(doc.contains_key("modified"));

        let decoded: StoredMovie = bson::from_document(doc).unwrap();
        assert_eq!(EnrichedMovie::from(decoded), movie(Some("tt0113277")));
    }

    #[test]
    fn test_unmatched_movie_fails_validation() {
        let err = StoredMovie::from_movie(&movie(None)).unwrap_err();
        assert_eq!(err.title, "Heat");
        assert!(StoredMovie::from_movie(&movie(Some("  "))).is_err());
    }

    #[test]
    fn test_upsert_report_counts() {
        let mut report = UpsertReport::default();
        assert!(report.is_success());
        report.succeeded = 2;
        report.failed.push(FailedUpsert {
            external_id: None,
            title: "Nope".to_string(),
            error: "missing external id".to_string(),
        });
        assert!(!report.is_success());
        assert_eq!(report.attempted(), 3);
    }
}
