pub mod check;
pub mod error;
pub mod join;
pub mod pipeline;
pub mod store;

pub use check::{check_records, known_ids_among, CheckReport, FlagReason, FlaggedRecord};
pub use error::{PersistenceError, PipelineError, UpsertError, ValidationError};
pub use join::{join, try_join, JoinOutcome, Joiner};
pub use pipeline::{persist, run_check, run_sync, SyncReport};
pub use store::{FailedUpsert, MemoryStore, MongoStore, MovieStore, StoredMovie, UpsertReport};
