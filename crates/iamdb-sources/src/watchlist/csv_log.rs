use chrono::NaiveDate;
use csv::ReaderBuilder;
use iamdb_models::WatchedEntry;
use std::collections::HashMap;
use std::fs::File;
use std::path::PathBuf;
use tracing::debug;

use crate::{FetchError, WatchListSource};

/// A hand-maintained CSV log: `Title,Watched[,Rating][,Year][,Id]`, dates as YYYY-MM-DD.
///
/// A non-empty `Id` pins the row to that dataset id.
pub struct CsvWatchLog {
    path: PathBuf,
    name: String,
}

impl CsvWatchLog {
    pub fn new(path: PathBuf) -> Self {
        let name = path.display().to_string();
        Self { path, name }
    }

    fn row_error(&self, row: u64, message: String) -> FetchError {
        FetchError::Row {
            location: self.name.clone(),
            row,
            message,
        }
    }
}

impl WatchListSource for CsvWatchLog {
    fn name(&self) -> &str {
        &self.name
    }

    fn entries(&self) -> Result<Vec<WatchedEntry>, FetchError> {
        let file = File::open(&self.path).map_err(|e| FetchError::io(&self.path, e))?;
        let mut reader = ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);
        let csv_error = |source| FetchError::Csv {
            location: self.name.clone(),
            source,
        };

        let headers = reader.headers().map_err(csv_error)?.clone();
        let header_map: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.to_string(), i))
            .collect();
        let available: Vec<String> = headers.iter().map(|h| h.to_string()).collect();

        for col in ["Title", "Watched"] {
            if !header_map.contains_key(col) {
                return Err(FetchError::MissingColumn {
                    location: self.name.clone(),
                    column: col.to_string(),
                    available,
                });
            }
        }
        let rating_col = header_map.get("Rating").copied();
        let year_col = header_map.get("Year").copied();
        let id_col = header_map.get("Id").copied();

        let mut entries = Vec::new();
        let mut row: u64 = 0;
        for result in reader.records() {
            let record = result.map_err(csv_error)?;
            row += 1;

            let title = record.get(header_map["Title"]).unwrap_or("");
            if title.is_empty() {
                debug!(row, "Skipping watch log row with empty title");
                continue;
            }

            let watched = record.get(header_map["Watched"]).unwrap_or("");
            let watch_date = NaiveDate::parse_from_str(watched, "%Y-%m-%d")
                .map_err(|e| self.row_error(row, format!("invalid date '{}': {}", watched, e)))?;

            let mut entry = WatchedEntry::new(title, watch_date);

            if let Some(raw) = rating_col.and_then(|i| record.get(i)).filter(|r| !r.is_empty()) {
                let rating = raw
                    .parse::<f64>()
                    .map_err(|e| self.row_error(row, format!("invalid rating '{}': {}", raw, e)))?;
                entry = entry.with_rating(rating);
            }

            if let Some(raw) = year_col.and_then(|i| record.get(i)).filter(|y| !y.is_empty()) {
                let year = raw
                    .parse::<u32>()
                    .map_err(|e| self.row_error(row, format!("invalid year '{}': {}", raw, e)))?;
                entry = entry.with_release_year(year);
            }

            if let Some(id) = id_col.and_then(|i| record.get(i)).filter(|id| !id.is_empty()) {
                entry = entry.with_external_id(id);
            }

            entries.push(entry);
        }

        debug!("Parsed {} rows, {} watch log entries", row, entries.len());
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_log(lines: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file
    }

    #[test]
    fn test_parse_watch_log() {
        let file = write_log(&[
            "Title,Watched,Rating,Year",
            "Heat,2021-03-04,9,1995",
            "\"Crouching Tiger, Hidden Dragon\",2021-03-10,,",
            "The Matrix, 2022-01-01 ,7.5,",
        ]);

        let entries = CsvWatchLog::new(file.path().to_path_buf()).entries().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].title, "Heat");
        assert_eq!(entries[0].watch_date, NaiveDate::from_ymd_opt(2021, 3, 4).unwrap());
        assert_eq!(entries[0].personal_rating, Some(9.0));
        assert_eq!(entries[0].release_year, Some(1995));
        assert_eq!(entries[1].title, "Crouching Tiger, Hidden Dragon");
        assert_eq!(entries[1].personal_rating, None);
        assert_eq!(entries[1].release_year, None);
        assert_eq!(entries[2].personal_rating, Some(7.5));
    }

    #[test]
    fn test_id_column_pins_entry() {
        let file = write_log(&[
            "Title,Watched,Id",
            "Solaris,2021-03-04,tt0069293",
            "Heat,2021-03-05,",
        ]);
        let entries = CsvWatchLog::new(file.path().to_path_buf()).entries().unwrap();
        assert_eq!(entries[0].external_id.as_deref(), Some("tt0069293"));
        assert_eq!(entries[1].external_id, None);
    }

    #[test]
    fn test_optional_columns_may_be_absent() {
        let file = write_log(&["Watched,Title", "2020-12-31,Heat"]);
        let entries = CsvWatchLog::new(file.path().to_path_buf()).entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Heat");
        assert_eq!(entries[0].external_id, None);
    }

    #[test]
    fn test_missing_required_column() {
        let file = write_log(&["Title,Rating", "Heat,9"]);
        let result = CsvWatchLog::new(file.path().to_path_buf()).entries();
        assert!(result.unwrap_err().to_string().contains("missing required column 'Watched'"));
    }

    #[test]
    fn test_invalid_date_reports_row() {
        let file = write_log(&["Title,Watched", "Heat,2021-03-04", "Ronin,04/03/2021"]);
        let err = CsvWatchLog::new(file.path().to_path_buf()).entries().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("row 2"));
        assert!(message.contains("invalid date '04/03/2021'"));
    }

    #[test]
    fn test_empty_titles_are_skipped() {
        let file = write_log(&["Title,Watched", ",2021-03-04", "Heat,2021-03-05"]);
        let entries = CsvWatchLog::new(file.path().to_path_buf()).entries().unwrap();
        assert_eq!(entries.len(), 1);
    }
}
