use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};
use flate2::read::MultiGzDecoder;
use iamdb_models::DatasetRecord;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info};

use crate::FetchError;

/// Null marker used throughout the IMDb TSV dumps
const NULL: &str = "\\N";

type TableReader = csv::Reader<Box<dyn Read>>;

/// Open a tab-separated table, decompressing `.gz` files on the fly.
///
/// Quoting is disabled: titles contain bare `"` characters that are not field delimiters.
fn open_table(path: &Path) -> Result<TableReader, FetchError> {
    let file = File::open(path).map_err(|e| FetchError::io(path, e))?;
    let input: Box<dyn Read> = if path.extension().and_then(|ext| ext.to_str()) == Some("gz") {
        Box::new(MultiGzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };

    Ok(ReaderBuilder::new()
        .delimiter(b'\t')
        .quoting(false)
        .has_headers(true)
        .from_reader(input))
}

fn header_map(
    reader: &mut TableReader,
    location: &str,
) -> Result<HashMap<String, usize>, FetchError> {
    let headers = reader.headers().map_err(|e| FetchError::Csv {
        location: location.to_string(),
        source: e,
    })?;
    Ok(headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.to_string(), i))
        .collect())
}

fn require_column(
    header_map: &HashMap<String, usize>,
    column: &str,
    location: &str,
) -> Result<usize, FetchError> {
    header_map.get(column).copied().ok_or_else(|| {
        let mut available: Vec<String> = header_map.keys().cloned().collect();
        available.sort();
        FetchError::MissingColumn {
            location: location.to_string(),
            column: column.to_string(),
            available,
        }
    })
}

fn non_null(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty() && *v != NULL)
}

/// Load `tconst -> averageRating` from a ratings table.
pub fn load_ratings(path: &Path) -> Result<HashMap<String, f64>, FetchError> {
    let location = path.display().to_string();
    let mut reader = open_table(path)?;
    let header_map = header_map(&mut reader, &location)?;
    let id_col = require_column(&header_map, "tconst", &location)?;
    let rating_col = require_column(&header_map, "averageRating", &location)?;

    let mut ratings = HashMap::new();
    for (index, result) in reader.records().enumerate() {
        let row = index as u64 + 1;
        let record = result.map_err(|e| FetchError::Csv {
            location: location.clone(),
            source: e,
        })?;
        let Some(id) = non_null(record.get(id_col)) else {
            continue;
        };
        let Some(raw) = non_null(record.get(rating_col)) else {
            continue;
        };
        let rating = raw.parse::<f64>().map_err(|e| FetchError::Row {
            location: location.clone(),
            row,
            message: format!("invalid averageRating '{}': {}", raw, e),
        })?;
        ratings.insert(id.to_string(), rating);
    }

    info!("Loaded {} ratings from {}", ratings.len(), location);
    Ok(ratings)
}

struct BasicsColumns {
    id: usize,
    title_type: usize,
    title: usize,
    start_year: usize,
    genres: usize,
}

/// Lazy stream of dataset records read from a title basics table.
pub struct DatasetReader {
    location: String,
    records: StringRecordsIntoIter<Box<dyn Read>>,
    columns: BasicsColumns,
    ratings: HashMap<String, f64>,
    title_types: HashSet<String>,
    row: u64,
    yielded: u64,
}

impl DatasetReader {
    /// Open `basics`, attaching ratings from `ratings` when given.
    /// An empty `title_types` keeps every row.
    pub fn open(
        basics: &Path,
        ratings: Option<&Path>,
        title_types: &[String],
    ) -> Result<Self, FetchError> {
        let ratings = match ratings {
            Some(path) => load_ratings(path)?,
            None => HashMap::new(),
        };

        let location = basics.display().to_string();
        let mut reader = open_table(basics)?;
        let header_map = header_map(&mut reader, &location)?;
        debug!("Dataset columns: {:?}", header_map.keys().collect::<Vec<_>>());

        let columns = BasicsColumns {
            id: require_column(&header_map, "tconst", &location)?,
            title_type: require_column(&header_map, "titleType", &location)?,
            title: require_column(&header_map, "primaryTitle", &location)?,
            start_year: require_column(&header_map, "startYear", &location)?,
            genres: require_column(&header_map, "genres", &location)?,
        };

        Ok(Self {
            location,
            records: reader.into_records(),
            columns,
            ratings,
            title_types: title_types.iter().cloned().collect(),
            row: 0,
            yielded: 0,
        })
    }

    fn parse_row(&self, record: &StringRecord) -> Result<Option<DatasetRecord>, FetchError> {
        let title_type = record.get(self.columns.title_type).unwrap_or("");
        if !self.title_types.is_empty() && !self.title_types.contains(title_type) {
            return Ok(None);
        }

        let Some(external_id) = non_null(record.get(self.columns.id)) else {
            debug!(row = self.row, "Skipping dataset row with empty tconst");
            return Ok(None);
        };

        let year = match non_null(record.get(self.columns.start_year)) {
            Some(raw) => Some(raw.parse::<u32>().map_err(|e| FetchError::Row {
                location: self.location.clone(),
                row: self.row,
                message: format!("invalid startYear '{}': {}", raw, e),
            })?),
            None => None,
        };

        let genres: BTreeSet<String> = non_null(record.get(self.columns.genres))
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|g| !g.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Some(DatasetRecord {
            external_id: external_id.to_string(),
            title: record.get(self.columns.title).unwrap_or("").to_string(),
            year,
            public_rating: self.ratings.get(external_id).copied(),
            genres,
            title_type: title_type.to_string(),
        }))
    }
}

impl Iterator for DatasetReader {
    type Item = Result<DatasetRecord, FetchError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = match self.records.next() {
                Some(Ok(record)) => record,
                Some(Err(e)) => {
                    return Some(Err(FetchError::Csv {
                        location: self.location.clone(),
                        source: e,
                    }))
                }
                None => {
                    info!(
                        "Read {} dataset rows from {}, {} kept",
                        self.row, self.location, self.yielded
                    );
                    return None;
                }
            };
            self.row += 1;

            match self.parse_row(&record) {
                Ok(Some(parsed)) => {
                    self.yielded += 1;
                    return Some(Ok(parsed));
                }
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
