use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// A single viewing, as recorded by the user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchedEntry {
    pub title: String,
    pub watch_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personal_rating: Option<f64>,
    /// Release year, when the source knows it (e.g. a "Title (1999)" directory name)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_year: Option<u32>,
    /// Dataset id pinned by the user; taken over any title match
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

impl WatchedEntry {
    pub fn new(title: impl Into<String>, watch_date: NaiveDate) -> Self {
        Self {
            title: title.into(),
            watch_date,
            personal_rating: None,
            release_year: None,
            external_id: None,
        }
    }

    pub fn with_rating(mut self, rating: f64) -> Self {
        self.personal_rating = Some(rating);
        self
    }

    pub fn with_release_year(mut self, year: u32) -> Self {
        self.release_year = Some(year);
        self
    }

    pub fn with_external_id(mut self, id: impl Into<String>) -> Self {
        self.external_id = Some(id.into());
        self
    }

    /// Year used to break ties between dataset records sharing this title.
    pub fn target_year(&self) -> Option<u32> {
        self.release_year
            .or_else(|| u32::try_from(self.watch_date.year()).ok())
    }
}
