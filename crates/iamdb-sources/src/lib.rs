pub mod dataset;
pub mod error;
pub mod traits;
pub mod watchlist;

pub use dataset::{DatasetFetcher, DatasetReader, Location};
pub use error::FetchError;
pub use traits::WatchListSource;
pub use watchlist::{collect_watchlist, sources_from_config, CsvWatchLog, MovieDirectories};
