//! Row layouts for release-spreadsheet tabs.

use chrono::{DateTime, Utc};

use imgsync_core::{ArchiveInfo, ObservedState};
use imgsync_sync::{Outcome, ReconciliationReport};

const STAMP: &str = "%Y%m%d-%H%M%S";

/// Tab (and archive file) name for an export taken at `now`:
/// `YYYYMMDD-HHMMSS.tar.gz`, UTC.
pub fn tab_title(now: DateTime<Utc>) -> String {
    format!("{}.tar.gz", now.format(STAMP))
}

/// Tab name for a persisted sync report: `sync-YYYYMMDD-HHMMSS`.
pub fn sync_tab_title(now: DateTime<Utc>) -> String {
    format!("sync-{}", now.format(STAMP))
}

/// Export manifest: one row per stored `name:tag`, then the archive facts.
pub fn manifest_rows(observed: &ObservedState, archive: &ArchiveInfo) -> Vec<Vec<String>> {
    let mut rows = vec![vec!["repository".into(), "tag".into(), "image".into()]];
    for repo in &observed.repositories {
        for tag in &repo.tags {
            rows.push(vec![
                repo.name.clone(),
                tag.clone(),
                format!("{}:{tag}", repo.name),
            ]);
        }
    }
    for repo in &observed.unreadable {
        rows.push(vec![repo.name.clone(), String::new(), format!("unreadable: {}", repo.reason)]);
    }

    rows.push(Vec::new());
    rows.push(vec!["archive".into(), archive.file_name.clone()]);
    rows.push(vec!["size_bytes".into(), archive.size_bytes.to_string()]);
    rows.push(vec!["sha256".into(), archive.sha256.clone()]);
    rows
}

/// Sync report: one row per outcome, copies first, then a summary block.
pub fn report_rows(report: &ReconciliationReport) -> Vec<Vec<String>> {
    let mut rows = vec![vec![
        "action".into(),
        "image".into(),
        "status".into(),
        "detail".into(),
    ]];
    for (action, outcome) in report.outcomes() {
        let detail = match &outcome.outcome {
            Outcome::Failed { reason } => reason.clone(),
            Outcome::SkippedMalformed => "reference has no tag".into(),
            Outcome::Succeeded => String::new(),
        };
        rows.push(vec![
            action.to_string(),
            outcome.image.clone(),
            outcome.outcome.label().into(),
            detail,
        ]);
    }
    for image in &report.present {
        rows.push(vec!["keep".into(), image.to_string(), "present".into(), String::new()]);
    }

    let summary = report.summary();
    rows.push(Vec::new());
    for (key, value) in [
        ("copied", summary.copied),
        ("deleted", summary.deleted),
        ("present", summary.present),
        ("failed", summary.failed),
        ("skipped", summary.skipped),
    ] {
        rows.push(vec![key.into(), value.to_string()]);
    }
    rows
}
