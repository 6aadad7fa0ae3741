use iamdb_sources::FetchError;
use thiserror::Error;

/// A record lacks what it needs to be stored (its key).
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Cannot persist '{title}': {reason}")]
pub struct ValidationError {
    pub title: String,
    pub reason: String,
}

/// Reading from or writing to the remote collection failed.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Could not encode document: {0}")]
    Encode(#[from] bson::ser::Error),

    #[error("Could not decode stored document: {0}")]
    Decode(#[from] bson::de::Error),
}

#[derive(Error, Debug)]
pub enum UpsertError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Errors that abort a whole `sync` or `check` run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Persistence failed: {0}")]
    Persistence(#[from] PersistenceError),
}
