use iamdb_models::{DatasetRecord, EnrichedMovie, WatchedEntry};
use iamdb_sources::FetchError;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::check::{check_records, known_ids_among, CheckReport};
use crate::error::PipelineError;
use crate::join::{try_join, JoinOutcome};
use crate::store::{MovieStore, UpsertReport};

/// Counts and leftovers of one `sync` run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub entries: usize,
    pub matched: usize,
    pub unmatched: Vec<EnrichedMovie>,
    pub upserts: UpsertReport,
}

impl SyncReport {
    pub fn is_success(&self) -> bool {
        self.upserts.is_success()
    }
}

/// Upsert every matched movie of `outcome`, in watch-list order.
///
/// Unmatched movies are logged and reported but never written.
pub async fn persist(outcome: JoinOutcome, store: &dyn MovieStore) -> SyncReport {
    let unmatched: Vec<EnrichedMovie> = outcome.unmatched().cloned().collect();
    for movie in &unmatched {
        warn!("No dataset match for '{}' watched {}", movie.title, movie.watch_date);
    }

    let matched: Vec<EnrichedMovie> = outcome.matched().cloned().collect();
    let upserts = store.upsert_all(&matched).await;

    SyncReport {
        entries: outcome.movies.len(),
        matched: matched.len(),
        unmatched,
        upserts,
    }
}

/// Join the watch list against the dataset stream, then persist the matches.
pub async fn run_sync<I>(
    watchlist: &[WatchedEntry],
    records: I,
    store: &dyn MovieStore,
) -> Result<SyncReport, PipelineError>
where
    I: IntoIterator<Item = Result<DatasetRecord, FetchError>>,
{
    let outcome = try_join(watchlist, records)?;
    let report = persist(outcome, store).await;
    info!(
        "Sync finished: {} entries, {} matched, {} upserted, {} failed",
        report.entries,
        report.matched,
        report.upserts.succeeded,
        report.upserts.failed.len()
    );
    Ok(report)
}

/// Audit every persisted record against the dataset stream. Writes nothing.
pub async fn run_check<I>(store: &dyn MovieStore, records: I) -> Result<CheckReport, PipelineError>
where
    I: IntoIterator<Item = Result<DatasetRecord, FetchError>>,
{
    let stored = store.fetch_all().await?;
    let persisted_ids: HashSet<String> = stored
        .iter()
        .filter_map(|movie| movie.external_id.clone())
        .collect();
    info!("Checking {} stored records from {}", stored.len(), store.describe());

    let known_ids = known_ids_among(&persisted_ids, records)?;
    let report = check_records(&stored, &known_ids);
    info!(
        "Check finished: {} records, {} flagged",
        report.checked,
        report.flagged.len()
    );
    Ok(report)
}
