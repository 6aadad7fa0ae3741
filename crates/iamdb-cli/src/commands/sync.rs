use super::progress::Progress;
use super::{connect_store, open_dataset, Workspace};
use crate::output::Output;
use color_eyre::Result;
use iamdb_core::{try_join, JoinOutcome, SyncReport};
use iamdb_models::{EnrichedMovie, WatchedEntry};
use iamdb_sources::{collect_watchlist, sources_from_config};
use owo_colors::OwoColorize;
use serde_json::json;
use std::process::ExitCode;

pub async fn run_sync(
    workspace: &Workspace,
    refresh: bool,
    dry_run: bool,
    output: &Output,
) -> Result<ExitCode> {
    tracing::debug!(refresh, dry_run, "Sync command started");

    let config = workspace.load_config(output)?;
    config
        .validate_watchlist()
        .map_err(|e| color_eyre::eyre::eyre!("Configuration validation failed: {}", e))?;

    let watchlist = read_watchlist(&config.watchlist)?;
    output.info(format!("Read {} watched entries", watchlist.len()));

    // Resolve credentials before the (slow) dataset download so a missing password fails fast
    let resolved = if dry_run {
        None
    } else {
        Some(workspace.resolve(&config, output)?)
    };
    let dataset = match &resolved {
        Some(resolved) => resolved.dataset.clone(),
        None => workspace.resolve_dataset(&config),
    };

    let progress = Progress::new(output);
    let reader = open_dataset(&dataset, refresh, &progress).await?;

    let Some(resolved) = resolved else {
        progress.set_message("Matching watch list against dataset");
        let outcome = try_join(&watchlist, reader)
            .map_err(|e| color_eyre::eyre::eyre!("Failed to read dataset: {}", e))?;
        progress.finish();
        print_dry_run(&outcome, output);
        return Ok(ExitCode::SUCCESS);
    };

    let store = connect_store(&resolved).await?;
    progress.set_message(format!(
        "Matching and writing to {}.{}",
        resolved.database, resolved.collection
    ));
    let report = iamdb_core::run_sync(&watchlist, reader, &store)
        .await
        .map_err(|e| color_eyre::eyre::eyre!("Sync operation failed: {}", e))?;
    progress.finish();

    print_report(&report, output);
    Ok(exit_code(&report))
}

/// Nonzero when any upsert failed. Unmatched entries only warn.
fn exit_code(report: &SyncReport) -> ExitCode {
    if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn read_watchlist(config: &iamdb_config::WatchlistConfig) -> Result<Vec<WatchedEntry>> {
    let sources = sources_from_config(config);
    collect_watchlist(&sources)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to read watch list: {}", e))
}

fn describe(movie: &EnrichedMovie) -> String {
    let mut line = format!("{} watched {}", movie, movie.watch_date);
    if let Some(rating) = movie.personal_rating {
        line.push_str(&format!(", rated {}", rating));
    }
    line
}

fn warn_unmatched<'a>(unmatched: impl Iterator<Item = &'a EnrichedMovie>, output: &Output) {
    for movie in unmatched {
        output.warn(format!(
            "No dataset match for '{}' (watched {})",
            movie.title, movie.watch_date
        ));
    }
}

fn print_dry_run(outcome: &JoinOutcome, output: &Output) {
    if output.is_human() {
        warn_unmatched(outcome.unmatched(), output);
        output.info(format!(
            "Dry run: {} of {} entries would be written",
            outcome.matched_count(),
            outcome.movies.len()
        ));
        for movie in outcome.matched() {
            output.println(format!("  {} {}", "→".bright_blue(), describe(movie)));
        }
    } else {
        let matched: Vec<&EnrichedMovie> = outcome.matched().collect();
        let unmatched: Vec<&EnrichedMovie> = outcome.unmatched().collect();
        output.json(&json!({
            "dry_run": true,
            "entries": outcome.movies.len(),
            "would_write": matched,
            "unmatched": unmatched,
        }));
    }
}

fn print_report(report: &SyncReport, output: &Output) {
    if output.is_human() {
        warn_unmatched(report.unmatched.iter(), output);
        for failure in &report.upserts.failed {
            output.error(format!("Failed to write '{}': {}", failure.title, failure.error));
        }
        let summary = format!(
            "Sync completed: {} entries, {} matched, {} unmatched, {} written, {} failed",
            report.entries,
            report.matched,
            report.unmatched.len(),
            report.upserts.succeeded,
            report.upserts.failed.len()
        );
        if report.is_success() {
            output.success(summary);
        } else {
            output.error(summary);
        }
    } else {
        output.json(&json!({
            "success": report.is_success(),
            "entries": report.entries,
            "matched": report.matched,
            "unmatched": report.unmatched,
            "written": report.upserts.succeeded,
            "failed": report.upserts.failed,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use iamdb_core::{FailedUpsert, UpsertReport};

    fn same(a: ExitCode, b: ExitCode) -> bool {
        format!("{:?}", a) == format!("{:?}", b)
    }

    #[test]
    fn test_failed_upsert_exits_nonzero() {
        let report = SyncReport {
            entries: 2,
            matched: 2,
            unmatched: Vec::new(),
            upserts: UpsertReport {
                succeeded: 1,
                failed: vec![FailedUpsert {
                    external_id: Some("tt0113277".to_string()),
                    title: "Heat".to_string(),
                    error: "connection reset".to_string(),
                }],
            },
        };
        assert!(same(exit_code(&report), ExitCode::FAILURE));
    }

    #[test]
    fn test_unmatched_entries_still_exit_zero() {
        let entry = WatchedEntry::new("Nope", NaiveDate::from_ymd_opt(2022, 8, 1).unwrap());
        let report = SyncReport {
            entries: 2,
            matched: 1,
            unmatched: vec![EnrichedMovie::unmatched(&entry)],
            upserts: UpsertReport {
                succeeded: 1,
                failed: Vec::new(),
            },
        };
        assert!(same(exit_code(&report), ExitCode::SUCCESS));
    }
}
