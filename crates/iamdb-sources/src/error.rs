use std::path::PathBuf;
use thiserror::Error;

/// The dataset or watch list could not be reached or read in the expected shape.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Request to {location} failed: {source}")]
    Http {
        location: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{location} responded with HTTP {status}")]
    Status { location: String, status: u16 },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed table {location}: {source}")]
    Csv {
        location: String,
        #[source]
        source: csv::Error,
    },

    #[error("{location} is missing required column '{column}'. Available columns: {available:?}")]
    MissingColumn {
        location: String,
        column: String,
        available: Vec<String>,
    },

    #[error("Malformed id pin {}: {source}", path.display())]
    Pin {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{location}, row {row}: {message}")]
    Row {
        location: String,
        row: u64,
        message: String,
    },
}

impl FetchError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
