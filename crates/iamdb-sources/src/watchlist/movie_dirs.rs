use chrono::{DateTime, Local, NaiveDate};
use iamdb_models::WatchedEntry;
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::SystemTime;
use tracing::{debug, warn};

use crate::{FetchError, WatchListSource};

const VIDEO_EXTENSIONS: [&str; 3] = ["mkv", "mp4", "avi"];

/// File inside a movie directory that pins it to a dataset id.
pub const PIN_FILE_NAME: &str = ".iamdb.json";

#[derive(Debug, Deserialize)]
struct PinFile {
    id: Option<String>,
}

fn dir_name_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^(?P<title>.*)\s+\((?P<year>\d{4})\)(\s+\[(?P<quality>\d{3,}p)\])?")
            .expect("movie directory pattern is valid")
    })
}

/// Split a `Title (1999) [1080p]` directory name into title and release year.
pub fn parse_dir_name(name: &str) -> Option<(String, u32)> {
    let captures = dir_name_regex().captures(name)?;
    let title = captures.name("title")?.as_str().trim().to_string();
    let year = captures.name("year")?.as_str().parse().ok()?;
    if title.is_empty() {
        return None;
    }
    Some((title, year))
}

/// A directory holding one sub-directory per watched movie.
///
/// The watch date is the earliest access time among the video files inside,
/// or the directory's modification time when it holds none. A `.iamdb.json`
/// holding `{"id": "tt..."}` pins the directory to that dataset id.
pub struct MovieDirectories {
    root: PathBuf,
    name: String,
}

impl MovieDirectories {
    pub fn new(root: PathBuf) -> Self {
        let name = root.display().to_string();
        Self { root, name }
    }

    fn read_entry(&self, dir: &Path) -> Result<Option<WatchedEntry>, FetchError> {
        let Some(dir_name) = dir.file_name().and_then(|n| n.to_str()) else {
            return Ok(None);
        };
        let Some((title, year)) = parse_dir_name(dir_name) else {
            warn!(directory = %dir.display(), "Could not parse movie directory name, skipping");
            return Ok(None);
        };

        let watched_at = match first_watch_time(dir)? {
            Some(time) => time,
            None => std::fs::metadata(dir)
                .and_then(|m| m.modified())
                .map_err(|e| FetchError::io(dir, e))?,
        };

        let mut entry = WatchedEntry::new(title, local_date(watched_at)).with_release_year(year);
        if let Some(id) = read_pin(dir)? {
            entry = entry.with_external_id(id);
        }
        Ok(Some(entry))
    }
}

impl WatchListSource for MovieDirectories {
    fn name(&self) -> &str {
        &self.name
    }

    fn entries(&self) -> Result<Vec<WatchedEntry>, FetchError> {
        let read_dir = std::fs::read_dir(&self.root).map_err(|e| FetchError::io(&self.root, e))?;

        let mut dirs = Vec::new();
        for dir_entry in read_dir {
            let path = dir_entry.map_err(|e| FetchError::io(&self.root, e))?.path();
            if path.is_dir() {
                dirs.push(path);
            }
        }
        dirs.sort();

        let mut entries = Vec::new();
        for dir in &dirs {
            if let Some(entry) = self.read_entry(dir)? {
                debug!(title = %entry.title, date = %entry.watch_date, "Found movie directory");
                entries.push(entry);
            }
        }
        Ok(entries)
    }
}

fn first_watch_time(dir: &Path) -> Result<Option<SystemTime>, FetchError> {
    let mut earliest: Option<SystemTime> = None;
    for dir_entry in std::fs::read_dir(dir).map_err(|e| FetchError::io(dir, e))? {
        let path = dir_entry.map_err(|e| FetchError::io(dir, e))?.path();
        let is_video = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
            .unwrap_or(false);
        if !is_video {
            continue;
        }
        let accessed = std::fs::metadata(&path)
            .and_then(|m| m.accessed())
            .map_err(|e| FetchError::io(&path, e))?;
        earliest = Some(earliest.map_or(accessed, |current| current.min(accessed)));
    }
    Ok(earliest)
}

fn read_pin(dir: &Path) -> Result<Option<String>, FetchError> {
    let path = dir.join(PIN_FILE_NAME);
    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(FetchError::io(&path, e)),
    };
    let pin: PinFile = serde_json::from_str(&raw).map_err(|source| FetchError::Pin {
        path: path.clone(),
        source,
    })?;
    Ok(pin.id.map(|id| id.trim().to_string()).filter(|id| !id.is_empty()))
}

fn local_date(time: SystemTime) -> NaiveDate {
    DateTime::<Local>::from(time).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_dir_name() {
        assert_eq!(parse_dir_name("Heat (1995)"), Some(("Heat".to_string(), 1995)));
        assert_eq!(
            parse_dir_name("The Matrix (1999) [1080p]"),
            Some(("The Matrix".to_string(), 1999))
        );
        assert_eq!(
            parse_dir_name("2001 A Space Odyssey (1968) [720p]"),
            Some(("2001 A Space Odyssey".to_string(), 1968))
        );
    }

    #[test]
    fn test_parse_dir_name_rejects_unstructured_names() {
        assert_eq!(parse_dir_name("Heat"), None);
        assert_eq!(parse_dir_name("Heat 1995"), None);
        assert_eq!(parse_dir_name(" (1995)"), None);
    }

    #[test]
    fn test_entries_from_directories() {
        let root = tempdir().unwrap();
        std::fs::create_dir(root.path().join("Heat (1995) [1080p]")).unwrap();
        std::fs::write(root.path().join("Heat (1995) [1080p]").join("heat.mkv"), b"").unwrap();
        std::fs::create_dir(root.path().join("Alien (1979)")).unwrap();
        std::fs::create_dir(root.path().join("random stuff")).unwrap();
        std::fs::write(root.path().join("notes.txt"), b"not a movie").unwrap();

        let entries = MovieDirectories::new(root.path().to_path_buf()).entries().unwrap();

        // Sorted by directory name; unparseable directories and plain files are ignored
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title, "Alien");
        assert_eq!(entries[0].release_year, Some(1979));
        assert_eq!(entries[1].title, "Heat");
        assert_eq!(entries[1].release_year, Some(1995));
        assert_eq!(entries[1].personal_rating, None);
    }

    #[test]
    fn test_pin_file_sets_external_id() {
        let root = tempdir().unwrap();
        let pinned = root.path().join("Solaris (1972)");
        std::fs::create_dir(&pinned).unwrap();
        std::fs::write(pinned.join(PIN_FILE_NAME), r#"{"id": "tt0069293", "note": "Tarkovsky"}"#)
            .unwrap();
        std::fs::create_dir(root.path().join("Solaris (2002)")).unwrap();

        let entries = MovieDirectories::new(root.path().to_path_buf()).entries().unwrap();
        assert_eq!(entries[0].external_id.as_deref(), Some("tt0069293"));
        assert_eq!(entries[1].external_id, None);
    }

    #[test]
    fn test_malformed_pin_file_is_an_error() {
        let root = tempdir().unwrap();
        let dir = root.path().join("Heat (1995)");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join(PIN_FILE_NAME), "tt0113277").unwrap();

        let result = MovieDirectories::new(root.path().to_path_buf()).entries();
        assert!(matches!(result, Err(FetchError::Pin { .. })));
    }

    #[test]
    fn test_missing_root_is_io_error() {
        let result = MovieDirectories::new(PathBuf::from("/nonexistent/movies")).entries();
        assert!(matches!(result, Err(FetchError::Io { .. })));
    }
}
