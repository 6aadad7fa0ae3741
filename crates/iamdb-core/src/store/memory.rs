use async_trait::async_trait;
use iamdb_models::EnrichedMovie;
use std::collections::BTreeMap;
use std::sync::Mutex;

use super::{MovieStore, StoredMovie};
use crate::error::{PersistenceError, UpsertError};

/// In-process store keyed by external id, used for dry runs and tests.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<String, StoredMovie>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, external_id: &str) -> Option<EnrichedMovie> {
        let records = self.records.lock().ok()?;
        records.get(external_id).cloned().map(EnrichedMovie::from)
    }
}

#[async_trait]
impl MovieStore for MemoryStore {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    async fn upsert(&self, movie: &EnrichedMovie) -> Result<(), UpsertError> {
        let stored = StoredMovie::from_movie(movie)?.touched();
        let mut records = self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        records.insert(stored.external_id.clone(), stored);
        Ok(())
    }

    async fn fetch_all(&self) -> Result<Vec<EnrichedMovie>, PersistenceError> {
        let records = self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(records.values().cloned().map(EnrichedMovie::from).collect())
    }
}
