//! `imgsync sync`: one local reconciliation pass.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use imgsync_core::ImageRef;
use imgsync_daemon::Services;
use imgsync_sync::{
    pipeline::{self, PassOptions},
    Action, Outcome, ReconciliationReport,
};

use super::{block_on, GlobalArgs};

/// Arguments for `imgsync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Comma-separated ranges to read instead of the configured ones.
    #[arg(long)]
    pub range: Option<String>,

    /// Compute the plan without copying or deleting anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit the report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let report = run_pass(global, self.range, self.dry_run)?;
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize report")?
            );
            return Ok(());
        }
        print_report(&report);
        Ok(())
    }
}

/// Load settings, build collaborators and run one pass.
pub(crate) fn run_pass(
    global: &GlobalArgs,
    range: Option<String>,
    dry_run: bool,
) -> Result<ReconciliationReport> {
    let settings = global.load_settings()?;
    imgsync_daemon::init_tracing(global.log_json);
    let services =
        Services::from_settings(&settings).context("failed to set up collaborators")?;
    let ctx = services.pass_context();

    let report = block_on(pipeline::run(
        &ctx,
        PassOptions {
            range_override: range,
            dry_run,
        },
    ))?
    .context("reconciliation pass failed")?;
    Ok(report)
}

#[derive(Tabled, Debug, PartialEq, Eq)]
struct OutcomeRow {
    #[tabled(rename = "action")]
    action: String,
    #[tabled(rename = "image")]
    image: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "detail")]
    detail: String,
}

fn paint(status: &str) -> String {
    match status {
        "succeeded" => status.green().to_string(),
        "failed" => status.red().to_string(),
        "skipped" => status.yellow().to_string(),
        _ => status.cyan().to_string(),
    }
}

/// Recorded outcomes, then the plan itself when the pass did not execute.
fn report_rows(report: &ReconciliationReport) -> Vec<OutcomeRow> {
    let mut rows: Vec<OutcomeRow> = report
        .outcomes()
        .map(|(action, outcome)| OutcomeRow {
            action: action.to_string(),
            image: outcome.image.clone(),
            status: match &outcome.outcome {
                Outcome::Succeeded => "succeeded",
                Outcome::Failed { .. } => "failed",
                Outcome::SkippedMalformed => "skipped",
            }
            .to_string(),
            detail: match &outcome.outcome {
                Outcome::Failed { reason } => reason.clone(),
                Outcome::SkippedMalformed => "reference has no tag".into(),
                Outcome::Succeeded => String::new(),
            },
        })
        .collect();

    if !report.executed {
        let planned = |action: Action, images: &[ImageRef]| {
            images
                .iter()
                .map(move |image| OutcomeRow {
                    action: action.to_string(),
                    image: image.to_string(),
                    status: "planned".into(),
                    detail: String::new(),
                })
                .collect::<Vec<_>>()
        };
        rows.extend(planned(Action::Copy, &report.to_copy));
        rows.extend(planned(Action::Delete, &report.to_delete));
    }
    rows
}

fn print_report(report: &ReconciliationReport) {
    let summary = report.summary();
    if report.executed {
        println!(
            "imgsync v{} | {} copied | {} deleted | {} present | {} failed | {} skipped",
            env!("CARGO_PKG_VERSION"),
            summary.copied,
            summary.deleted,
            summary.present,
            summary.failed,
            summary.skipped,
        );
    } else {
        println!(
            "imgsync v{} | dry run | {} to copy | {} to delete | {} present | {} skipped",
            env!("CARGO_PKG_VERSION"),
            summary.planned_copies,
            summary.planned_deletes,
            summary.present,
            summary.skipped,
        );
    }

    let mut rows = report_rows(report);
    if rows.is_empty() {
        println!("{} registry already matches the inventory", "✓".green());
    } else {
        for row in &mut rows {
            row.status = paint(&row.status);
        }
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
    }

    for repo in &report.unreadable {
        println!(
            "{} could not read tags of '{}': {}",
            "!".yellow(),
            repo.name,
            repo.reason
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imgsync_sync::ImageOutcome;

    fn row(action: &str, image: &str, status: &str, detail: &str) -> OutcomeRow {
        OutcomeRow {
            action: action.into(),
            image: image.into(),
            status: status.into(),
            detail: detail.into(),
        }
    }

    #[test]
    fn dry_run_lists_pending_copies_and_deletes() {
        let report = ReconciliationReport {
            to_copy: vec![ImageRef::parse("app:2")],
            to_delete: vec![ImageRef::parse("old:1")],
            malformed: vec!["bare".into()],
            copy_results: vec![ImageOutcome::skipped("bare")],
            executed: false,
            ..Default::default()
        };

        assert_eq!(
            report_rows(&report),
            vec![
                row("copy", "bare", "skipped", "reference has no tag"),
                row("copy", "app:2", "planned", ""),
                row("delete", "old:1", "planned", ""),
            ]
        );
    }

    #[test]
    fn executed_pass_lists_outcomes_only() {
        let report = ReconciliationReport {
            to_copy: vec![ImageRef::parse("app:2")],
            to_delete: vec![ImageRef::parse("old:1")],
            copy_results: vec![ImageOutcome::failed("app:2", "denied", "")],
            delete_results: vec![ImageOutcome::succeeded("old:1")],
            executed: true,
            ..Default::default()
        };

        assert_eq!(
            report_rows(&report),
            vec![
                row("copy", "app:2", "failed", "denied"),
                row("delete", "old:1", "succeeded", ""),
            ]
        );
    }

    #[test]
    fn matching_inventory_has_no_rows() {
        let report = ReconciliationReport {
            present: vec![ImageRef::parse("app:1")],
            ..Default::default()
        };
        assert!(report_rows(&report).is_empty());
    }
}
