mod csv_log;
mod movie_dirs;

pub use csv_log::CsvWatchLog;
pub use movie_dirs::{parse_dir_name, MovieDirectories, PIN_FILE_NAME};

use iamdb_config::WatchlistConfig;
use iamdb_models::WatchedEntry;
use tracing::info;

use crate::{FetchError, WatchListSource};

/// Build the configured watch-list sources, CSV log first, then each movie directory.
pub fn sources_from_config(config: &WatchlistConfig) -> Vec<Box<dyn WatchListSource>> {
    let mut sources: Vec<Box<dyn WatchListSource>> = Vec::new();
    if let Some(csv) = &config.csv {
        sources.push(Box::new(CsvWatchLog::new(csv.clone())));
    }
    for dir in &config.movie_dirs {
        sources.push(Box::new(MovieDirectories::new(dir.clone())));
    }
    sources
}

/// Read every source in order and concatenate their entries.
pub fn collect_watchlist(
    sources: &[Box<dyn WatchListSource>],
) -> Result<Vec<WatchedEntry>, FetchError> {
    let mut entries = Vec::new();
    for source in sources {
        let found = source.entries()?;
        info!(source = source.name(), entries = found.len(), "Read watch list");
        entries.extend(found);
    }
    Ok(entries)
}
