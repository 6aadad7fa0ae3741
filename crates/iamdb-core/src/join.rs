use iamdb_models::{normalize_title, DatasetRecord, EnrichedMovie, WatchedEntry};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Result of joining a watch list against the dataset.
///
/// Holds exactly one movie per watched entry, in watch-list order.
#[derive(Debug, Clone, Default)]
pub struct JoinOutcome {
    pub movies: Vec<EnrichedMovie>,
}

impl JoinOutcome {
    pub fn matched(&self) -> impl Iterator<Item = &EnrichedMovie> {
        self.movies.iter().filter(|m| m.is_matched())
    }

    pub fn unmatched(&self) -> impl Iterator<Item = &EnrichedMovie> {
        self.movies.iter().filter(|m| !m.is_matched())
    }

    pub fn matched_count(&self) -> usize {
        self.matched().count()
    }

    pub fn unmatched_count(&self) -> usize {
        self.movies.len() - self.matched_count()
    }
}

/// Incremental joiner fed one dataset record at a time.
///
/// Only records whose id is pinned by an entry, or whose normalized title
/// appears among the unpinned entries, are kept.
pub struct Joiner<'a> {
    entries: &'a [WatchedEntry],
    wanted: HashSet<String>,
    pinned: HashMap<String, Option<DatasetRecord>>,
    candidates: HashMap<String, Vec<DatasetRecord>>,
    offered: u64,
}

impl<'a> Joiner<'a> {
    pub fn new(entries: &'a [WatchedEntry]) -> Self {
        let mut wanted = HashSet::new();
        let mut pinned = HashMap::new();
        for entry in entries {
            match &entry.external_id {
                Some(id) => {
                    pinned.insert(id.clone(), None);
                }
                None => {
                    wanted.insert(normalize_title(&entry.title));
                }
            }
        }
        Self {
            entries,
            wanted,
            pinned,
            candidates: HashMap::new(),
            offered: 0,
        }
    }

    pub fn offer(&mut self, record: DatasetRecord) {
        self.offered += 1;
        if let Some(slot) = self.pinned.get_mut(&record.external_id) {
            if slot.is_none() {
                *slot = Some(record.clone());
            }
        }
        let key = normalize_title(&record.title);
        if self.wanted.contains(&key) {
            self.candidates.entry(key).or_default().push(record);
        }
    }

    fn resolve(&self, entry: &WatchedEntry) -> Option<&DatasetRecord> {
        if let Some(id) = &entry.external_id {
            let record = self.pinned.get(id).and_then(Option::as_ref);
            if record.is_none() {
                warn!(title = %entry.title, id = %id, "Pinned id not found in dataset");
            }
            return record;
        }
        let candidates = self
            .candidates
            .get(&normalize_title(&entry.title))
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        best_candidate(entry, candidates)
    }

    pub fn finish(self) -> JoinOutcome {
        let kept = self.candidates.values().map(Vec::len).sum::<usize>()
            + self.pinned.values().filter(|r| r.is_some()).count();
        debug!(
            offered = self.offered,
            kept, "Dataset scan complete, resolving matches"
        );

        let movies: Vec<EnrichedMovie> = self
            .entries
            .iter()
            .map(|entry| match self.resolve(entry) {
                Some(record) => EnrichedMovie::matched(entry, record),
                None => EnrichedMovie::unmatched(entry),
            })
            .collect();

        let outcome = JoinOutcome { movies };
        info!(
            "Joined {} watched entries: {} matched, {} unmatched",
            outcome.movies.len(),
            outcome.matched_count(),
            outcome.unmatched_count()
        );
        outcome
    }
}

/// Pick the candidate whose year is closest to the entry's target year.
///
/// Candidates without a year (or any candidate, when the entry has no
/// target) rank after dated ones; ties keep the earliest candidate.
fn best_candidate<'r>(
    entry: &WatchedEntry,
    candidates: &'r [DatasetRecord],
) -> Option<&'r DatasetRecord> {
    let target = entry.target_year();
    let rank = |record: &DatasetRecord| match (target, record.year) {
        (Some(target), Some(year)) => (false, target.abs_diff(year)),
        _ => (true, 0),
    };

    let mut best: Option<(&DatasetRecord, (bool, u32))> = None;
    for record in candidates {
        let score = rank(record);
        match best {
            Some((_, current)) if current <= score => {}
            _ => best = Some((record, score)),
        }
    }
    best.map(|(record, _)| record)
}

/// Join `entries` against an in-memory dataset.
pub fn join(
    entries: &[WatchedEntry],
    records: impl IntoIterator<Item = DatasetRecord>,
) -> JoinOutcome {
    let mut joiner = Joiner::new(entries);
    for record in records {
        joiner.offer(record);
    }
    joiner.finish()
}

/// Join `entries` against a fallible record stream, stopping at the first error.
pub fn try_join<E>(
    entries: &[WatchedEntry],
    records: impl IntoIterator<Item = Result<DatasetRecord, E>>,
) -> Result<JoinOutcome, E> {
    let mut joiner = Joiner::new(entries);
    for record in records {
        joiner.offer(record?);
    }
    Ok(joiner.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use iamdb_sources::watchlist::parse_dir_name;
    use std::collections::BTreeSet;

    fn watched(title: &str, year: i32) -> WatchedEntry {
        WatchedEntry::new(title, NaiveDate::from_ymd_opt(year, 6, 1).unwrap())
    }

    fn record(id: &str, title: &str, year: Option<u32>) -> DatasetRecord {
        DatasetRecord {
            external_id: id.to_string(),
            title: title.to_string(),
            year,
            public_rating: Some(7.0),
            genres: BTreeSet::from(["Drama".to_string()]),
            title_type: "movie".to_string(),
        }
    }

    #[test]
    fn test_one_movie_per_entry_in_order() {
        let entries = vec![
            watched("Heat", 2020),
            watched("Nope", 2022),
            watched("Heat", 2021),
        ];
        let outcome = join(&entries, vec![record("tt1", "Heat", Some(1995))]);

        assert_eq!(outcome.movies.len(), entries.len());
        assert_eq!(outcome.movies[0].watch_date, entries[0].watch_date);
        assert_eq!(outcome.movies[1].title, "Nope");
        assert_eq!(outcome.movies[2].watch_date, entries[2].watch_date);
    }

    #[test]
    fn test_no_title_match_is_unmatched() {
        let entries = vec![watched("Solaris", 2020)];
        let outcome = join(&entries, vec![record("tt1", "Heat", Some(1995))]);

        let movie = &outcome.movies[0];
        assert_eq!(movie.external_id, None);
        assert_eq!(movie.title, "Solaris");
        assert_eq!(outcome.unmatched().count(), 1);
        assert_eq!(outcome.matched_count(), 0);
    }

    #[test]
    fn test_single_match_ignores_year() {
        let entries = vec![watched("Heat", 2020)];
        let outcome = join(&entries, vec![record("tt1", "Heat", Some(1995))]);
        assert_eq!(outcome.movies[0].external_id.as_deref(), Some("tt1"));

        let outcome = join(&entries, vec![record("tt2", "Heat", None)]);
        assert_eq!(outcome.movies[0].external_id.as_deref(), Some("tt2"));
    }

    #[test]
    fn test_closest_year_wins() {
        let entries = vec![watched("Solaris", 2003)];
        let outcome = join(
            &entries,
            vec![
                record("tt1999", "Solaris", Some(1999)),
                record("tt2004", "Solaris", Some(2004)),
            ],
        );
        assert_eq!(outcome.movies[0].external_id.as_deref(), Some("tt2004"));
        assert_eq!(outcome.movies[0].year, Some(2004));
    }

    #[test]
    fn test_release_year_preferred_over_watch_date() {
        let entries = vec![watched("Solaris", 2003).with_release_year(1972)];
        let outcome = join(
            &entries,
            vec![
                record("tt0069293", "Solaris", Some(1972)),
                record("tt0307479", "Solaris", Some(2002)),
            ],
        );
        assert_eq!(outcome.movies[0].external_id.as_deref(), Some("tt0069293"));
    }

    #[test]
    fn test_ties_keep_first_occurrence() {
        let entries = vec![watched("Hamlet", 2000)];
        let outcome = join(
            &entries,
            vec![
                record("tt1", "Hamlet", Some(1996)),
                record("tt2", "Hamlet", Some(2004)),
                record("tt3", "Hamlet", Some(1996)),
            ],
        );
        assert_eq!(outcome.movies[0].external_id.as_deref(), Some("tt1"));
    }

    #[test]
    fn test_undated_candidates_rank_last() {
        let entries = vec![watched("Hamlet", 2000)];
        let outcome = join(
            &entries,
            vec![
                record("tt1", "Hamlet", None),
                record("tt2", "Hamlet", Some(1948)),
            ],
        );
        assert_eq!(outcome.movies[0].external_id.as_deref(), Some("tt2"));
    }

    #[test]
    fn test_title_match_ignores_case_and_spacing() {
        let entries = vec![watched("  the   MATRIX ", 2020)];
        let outcome = join(&entries, vec![record("tt0133093", "The Matrix", Some(1999))]);
        assert_eq!(outcome.movies[0].external_id.as_deref(), Some("tt0133093"));
        assert_eq!(outcome.movies[0].title, "The Matrix");
    }

    #[test]
    fn test_directory_title_matches_punctuated_record() {
        let dir_name = "Star Wars Episode IV - A New Hope (1977) [1080p]";
        let (title, year) = parse_dir_name(dir_name).unwrap();
        let entries = vec![watched(&title, 2015).with_release_year(year)];
        let outcome = join(
            &entries,
            vec![
                record("tt0076759", "Star Wars: Episode IV - A New Hope", Some(1977)),
                record("tt0080684", "Star Wars: Episode V - The Empire Strikes Back", Some(1980)),
            ],
        );
        assert_eq!(outcome.movies[0].external_id.as_deref(), Some("tt0076759"));
        assert_eq!(outcome.movies[0].title, "Star Wars: Episode IV - A New Hope");
    }

    #[test]
    fn test_pinned_id_overrides_title_match() {
        let entries = vec![
            watched("Solaris", 2003).with_external_id("tt0069293"),
            watched("Solaris", 2003),
        ];
        let outcome = join(
            &entries,
            vec![
                record("tt0069293", "Solyaris", Some(1972)),
                record("tt0307479", "Solaris", Some(2002)),
            ],
        );
        assert_eq!(outcome.movies[0].external_id.as_deref(), Some("tt0069293"));
        assert_eq!(outcome.movies[0].title, "Solyaris");
        assert_eq!(outcome.movies[1].external_id.as_deref(), Some("tt0307479"));
    }

    #[test]
    fn test_unknown_pinned_id_stays_unmatched() {
        let entries = vec![watched("Heat", 2020).with_external_id("tt9999999")];
        let outcome = join(&entries, vec![record("tt0113277", "Heat", Some(1995))]);
        assert_eq!(outcome.movies[0].external_id, None);
        assert_eq!(outcome.unmatched_count(), 1);
    }

    #[test]
    fn test_try_join_stops_at_first_error() {
        let entries = vec![watched("Heat", 2020)];
        let records: Vec<Result<DatasetRecord, String>> = vec![
            Ok(record("tt1", "Heat", Some(1995))),
            Err("bad row".to_string()),
        ];
        assert_eq!(try_join(&entries, records).unwrap_err(), "bad row");
    }

    #[test]
    fn test_join_is_deterministic() {
        let entries = vec![watched("Heat", 2020), watched("Solaris", 2003)];
        let dataset = vec![
            record("tt1", "Heat", Some(1995)),
            record("tt1999", "Solaris", Some(1999)),
            record("tt2004", "Solaris", Some(2004)),
        ];
        let first = join(&entries, dataset.clone());
        let second = join(&entries, dataset);
        assert_eq!(first.movies, second.movies);
    }
}
