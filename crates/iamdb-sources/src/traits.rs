use iamdb_models::WatchedEntry;

use crate::FetchError;

/// Somewhere the user keeps track of what they watched.
pub trait WatchListSource {
    fn name(&self) -> &str;

    /// All viewings, one entry each, in the source's own order.
    fn entries(&self) -> Result<Vec<WatchedEntry>, FetchError>;
}
