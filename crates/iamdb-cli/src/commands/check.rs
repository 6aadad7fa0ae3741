use super::progress::Progress;
use super::{connect_store, open_dataset, Workspace};
use crate::output::Output;
use color_eyre::Result;
use comfy_table::{Attribute, Cell, Color, Table};
use iamdb_core::{CheckReport, FlaggedRecord};
use serde_json::json;
use std::process::ExitCode;

pub async fn run_check(workspace: &Workspace, refresh: bool, output: &Output) -> Result<ExitCode> {
    tracing::debug!(refresh, "Check command started");

    let config = workspace.load_config(output)?;
    let resolved = workspace.resolve(&config, output)?;
    let store = connect_store(&resolved).await?;

    let progress = Progress::new(output);
    let reader = open_dataset(&resolved.dataset, refresh, &progress).await?;
    progress.set_message("Auditing stored records against the dataset");
    let report = iamdb_core::run_check(&store, reader)
        .await
        .map_err(|e| color_eyre::eyre::eyre!("Check failed: {}", e))?;
    progress.finish();

    print_report(&report, output);
    Ok(exit_code(&report))
}

/// Nonzero when any stored record was flagged.
fn exit_code(report: &CheckReport) -> ExitCode {
    if report.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn reasons(record: &FlaggedRecord) -> String {
    record
        .reasons
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn flagged_table(flagged: &[FlaggedRecord]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        Cell::new("ID").fg(Color::Cyan).add_attribute(Attribute::Bold),
        Cell::new("Title").fg(Color::Cyan).add_attribute(Attribute::Bold),
        Cell::new("Problems").fg(Color::Cyan).add_attribute(Attribute::Bold),
    ]);
    for record in flagged {
        table.add_row(vec![
            Cell::new(&record.external_id),
            Cell::new(&record.title),
            Cell::new(reasons(record)),
        ]);
    }
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    table
}

/// What `check` always writes to stdout, --quiet or not: the JSON report,
/// or one flagged id per line for quiet human output.
fn unconditional_output(report: &CheckReport, output: &Output) -> Option<String> {
    if !output.is_human() {
        return Some(output.render_json(&json!({
            "checked": report.checked,
            "clean": report.is_clean(),
            "flagged": report.flagged,
        })));
    }
    if output.is_quiet() && !report.is_clean() {
        let ids: Vec<&str> = report.flagged.iter().map(|r| r.external_id.as_str()).collect();
        return Some(ids.join("\n"));
    }
    None
}

fn print_report(report: &CheckReport, output: &Output) {
    if let Some(text) = unconditional_output(report, output) {
        println!("{}", text);
        return;
    }

    if report.is_clean() {
        output.success(format!("All {} stored records are complete", report.checked));
        return;
    }

    println!("{}", flagged_table(&report.flagged));
    output.warn(format!(
        "{} of {} stored records flagged",
        report.flagged.len(),
        report.checked
    ));
}
