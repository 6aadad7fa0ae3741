use iamdb_config::ResolvedDataset;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::{DatasetReader, Location};
use crate::FetchError;

/// Downloads dataset snapshots (one attempt, no retries) and opens them as record streams.
pub struct DatasetFetcher {
    client: Client,
    cache_dir: PathBuf,
    max_cache_age: Duration,
    refresh: bool,
    title_types: Vec<String>,
}

impl DatasetFetcher {
    pub fn new(cache_dir: PathBuf, max_cache_age: Duration, title_types: Vec<String>) -> Self {
        Self {
            client: Client::new(),
            cache_dir,
            max_cache_age,
            refresh: false,
            title_types,
        }
    }

    pub fn from_config(dataset: &ResolvedDataset) -> Self {
        Self::new(
            dataset.cache_dir.clone(),
            dataset.max_cache_age,
            dataset.title_types.clone(),
        )
    }

    /// Ignore cached snapshots and download again
    pub fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    /// Make `location` available on local disk and return the path.
    pub async fn materialize(&self, location: &Location) -> Result<PathBuf, FetchError> {
        match location {
            Location::Local(path) => {
                if !path.is_file() {
                    return Err(FetchError::io(
                        path,
                        std::io::Error::new(std::io::ErrorKind::NotFound, "dataset file not found"),
                    ));
                }
                Ok(path.clone())
            }
            Location::Remote(url) => {
                let target = cached_snapshot_path(&self.cache_dir, url);
                if !self.refresh && is_fresh(&target, self.max_cache_age) {
                    info!("Reusing cached snapshot {}", target.display());
                    return Ok(target);
                }
                self.download(url, &target).await?;
                Ok(target)
            }
        }
    }

    async fn download(&self, url: &str, target: &Path) -> Result<(), FetchError> {
        info!("Downloading {}", url);

        let http_error = |source| FetchError::Http {
            location: url.to_string(),
            source,
        };

        let mut response = self.client.get(url).send().await.map_err(http_error)?;
        if !response.status().is_success() {
            return Err(FetchError::Status {
                location: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FetchError::io(parent, e))?;
        }

        // An interrupted download never looks like a complete snapshot
        let mut partial = PartialFile::create(target).await?;
        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await.map_err(http_error)? {
            partial.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        partial.commit(target).await?;

        info!("Downloaded {} bytes to {}", written, target.display());
        Ok(())
    }

    /// Fetch the basics table (and ratings, if given) and return a lazy record stream.
    pub async fn fetch(
        &self,
        basics: &Location,
        ratings: Option<&Location>,
    ) -> Result<DatasetReader, FetchError> {
        let basics_path = self.materialize(basics).await?;
        let ratings_path = match ratings {
            Some(location) => Some(self.materialize(location).await?),
            None => None,
        };

        debug!(
            basics = %basics_path.display(),
            ratings = ?ratings_path,
            title_types = ?self.title_types,
            "Opening dataset"
        );
        DatasetReader::open(&basics_path, ratings_path.as_deref(), &self.title_types)
    }
}

/// Side file a snapshot is streamed into. Removed on drop unless committed.
struct PartialFile {
    path: PathBuf,
    file: Option<tokio::fs::File>,
    committed: bool,
}

impl PartialFile {
    async fn create(target: &Path) -> Result<Self, FetchError> {
        let path = target.with_extension("part");
        let file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| FetchError::io(&path, e))?;
        Ok(Self {
            path,
            file: Some(file),
            committed: false,
        })
    }

    async fn write_all(&mut self, chunk: &[u8]) -> Result<(), FetchError> {
        if let Some(file) = self.file.as_mut() {
            file.write_all(chunk)
                .await
                .map_err(|e| FetchError::io(&self.path, e))?;
        }
        Ok(())
    }

    /// Flush and move the side file onto `target`.
    async fn commit(mut self, target: &Path) -> Result<(), FetchError> {
        if let Some(mut file) = self.file.take() {
            file.flush().await.map_err(|e| FetchError::io(&self.path, e))?;
        }
        tokio::fs::rename(&self.path, target)
            .await
            .map_err(|e| FetchError::io(target, e))?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        drop(self.file.take());
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed incomplete download {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Could not remove {}: {}", self.path.display(), e),
        }
    }
}

/// Cache file for a snapshot URL: the URL's last path segment inside `cache_dir`.
pub fn cached_snapshot_path(cache_dir: &Path, url: &str) -> PathBuf {
    let without_query = url.split(&['?', '#'][..]).next().unwrap_or(url);
    let name = without_query
        .rsplit('/')
        .find(|segment| !segment.is_empty() && !segment.contains(':'))
        .unwrap_or("dataset.tsv");
    cache_dir.join(name)
}

fn is_fresh(path: &Path, max_age: Duration) -> bool {
    let Ok(modified) = std::fs::metadata(path).and_then(|m| m.modified()) else {
        return false;
    };
    SystemTime::now()
        .duration_since(modified)
        .map(|age| age < max_age)
        .unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_cached_snapshot_path() {
        let dir = Path::new("/cache");
        assert_eq!(
            cached_snapshot_path(dir, "https://datasets.imdbws.com/title.basics.tsv.gz"),
            PathBuf::from("/cache/title.basics.tsv.gz")
        );
        assert_eq!(
            cached_snapshot_path(dir, "https://example.com/dumps/ratings.tsv?token=abc"),
            PathBuf::from("/cache/ratings.tsv")
        );
        assert_eq!(
            cached_snapshot_path(dir, "https://example.com/"),
            PathBuf::from("/cache/example.com")
        );
    }

    #[test]
    fn test_is_fresh() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snapshot.tsv");
        assert!(!is_fresh(&path, Duration::from_secs(3600)));

        std::fs::File::create(&path).unwrap().write_all(b"tconst\n").unwrap();
        assert!(is_fresh(&path, Duration::from_secs(3600)));
        assert!(!is_fresh(&path, Duration::ZERO));
    }

    #[tokio::test]
    async fn test_materialize_reuses_fresh_cache_without_network() {
        let dir = tempdir().unwrap();
        let url = "https://datasets.invalid/title.basics.tsv";
        let cached = cached_snapshot_path(dir.path(), url);
        std::fs::write(&cached, "tconst\ttitleType\tprimaryTitle\tstartYear\tgenres\n").unwrap();

        let fetcher =
            DatasetFetcher::new(dir.path().to_path_buf(), Duration::from_secs(3600), vec![]);
        let path = fetcher.materialize(&Location::Remote(url.to_string())).await.unwrap();
        assert_eq!(path, cached);
    }

    #[tokio::test]
    async fn test_materialize_missing_local_file() {
        let dir = tempdir().unwrap();
        let fetcher =
            DatasetFetcher::new(dir.path().to_path_buf(), Duration::from_secs(3600), vec![]);
        let result = fetcher
            .materialize(&Location::Local(dir.path().join("missing.tsv")))
            .await;
        assert!(matches!(result, Err(FetchError::Io { .. })));
    }

    #[tokio::test]
    async fn test_interrupted_download_leaves_no_side_file() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("title.basics.tsv.gz");
        let side_file = target.with_extension("part");

        let failed: Result<(), FetchError> = async {
            let mut partial = PartialFile::create(&target).await?;
            partial.write_all(b"tconst\ttitleType\n").await?;
            assert!(side_file.exists());
            Err(FetchError::Status {
                location: "https://datasets.invalid/title.basics.tsv.gz".to_string(),
                status: 502,
            })
        }
        .await;

        assert!(failed.is_err());
        assert!(!side_file.exists());
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn test_committed_download_replaces_snapshot() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("title.ratings.tsv");
        std::fs::write(&target, "stale").unwrap();

        let mut partial = PartialFile::create(&target).await.unwrap();
        partial.write_all(b"tconst\taverageRating\n").await.unwrap();
        partial.commit(&target).await.unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "tconst\taverageRating\n");
        assert!(!target.with_extension("part").exists());
    }

    #[tokio::test]
    async fn test_fetch_local_tables() {
        let dir = tempdir().unwrap();
        let basics = dir.path().join("basics.tsv");
        std::fs::write(
            &basics,
            "tconst\ttitleType\tprimaryTitle\tstartYear\tgenres\n\
             tt0113277\tmovie\tHeat\t1995\tCrime,Drama\n",
        )
        .unwrap();
        let ratings = dir.path().join("ratings.tsv");
        std::fs::write(
            &ratings,
            "tconst\taverageRating\tnumVotes\ntt0113277\t8.3\t1\n",
        )
        .unwrap();

        let fetcher = DatasetFetcher::new(
            dir.path().to_path_buf(),
            Duration::from_secs(3600),
            vec!["movie".to_string()],
        );
        let records: Vec<_> = fetcher
            .fetch(&Location::Local(basics), Some(&Location::Local(ratings)))
            .await
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].public_rating, Some(8.3));
    }
}
