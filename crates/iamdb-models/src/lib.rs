pub mod dataset_record;
pub mod enriched_movie;
pub mod title;
pub mod watched_entry;

pub use dataset_record::DatasetRecord;
pub use enriched_movie::EnrichedMovie;
pub use title::normalize_title;
pub use watched_entry::WatchedEntry;
