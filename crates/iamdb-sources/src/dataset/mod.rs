mod download;
mod parser;

pub use download::{cached_snapshot_path, DatasetFetcher};
pub use parser::{load_ratings, DatasetReader};

use std::fmt;
use std::path::PathBuf;

/// Where a dataset table lives: a URL to download or a file already on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Remote(String),
    Local(PathBuf),
}

impl Location {
    pub fn parse(location: &str) -> Self {
        let trimmed = location.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            Location::Remote(trimmed.to_string())
        } else {
            Location::Local(PathBuf::from(trimmed))
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Remote(url) => write!(f, "{}", url),
            Location::Local(path) => write!(f, "{}", path.display()),
        }
    }
}
