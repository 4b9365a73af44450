use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use imgsync_core::{
    ArchiveInfo, Archiver, ImageRef, ObservedState, ObservedStateSource, ReportSink, SourceError,
    Uploader,
};
use imgsync_report::{manifest_rows, report_rows, ArchivalReporter, ReportError};
use imgsync_sync::{ImageOutcome, ReconciliationReport};

// ---------------------------------------------------------------------------
// Fakes recording the order of every step
// ---------------------------------------------------------------------------

type Journal = Arc<Mutex<Vec<String>>>;

fn note(journal: &Journal, entry: impl Into<String>) {
    journal.lock().expect("journal").push(entry.into());
}

struct Registry(Journal, ObservedState);

#[async_trait]
impl ObservedStateSource for Registry {
    async fn fetch_observed(&self) -> Result<ObservedState, SourceError> {
        note(&self.0, "observed");
        Ok(self.1.clone())
    }

    async fn ping(&self) -> Result<(), SourceError> {
        Ok(())
    }
}

struct Tar(Journal);

#[async_trait]
impl Archiver for Tar {
    async fn archive(&self, file_name: &str) -> Result<ArchiveInfo, SourceError> {
        note(&self.0, format!("archive {file_name}"));
        Ok(ArchiveInfo {
            path: PathBuf::from("/tmp/out").join(file_name),
            file_name: file_name.to_string(),
            size_bytes: 42,
            sha256: "ab".repeat(32),
        })
    }
}

struct Scp(Journal, bool);

#[async_trait]
impl Uploader for Scp {
    async fn upload(&self, file: &Path) -> Result<String, SourceError> {
        note(&self.0, format!("upload {}", file.display()));
        if self.1 {
            Err(SourceError::Command("scp exit status 1".into()))
        } else {
            Ok(format!("nas:/exports/{}", file.file_name().unwrap_or_default().to_string_lossy()))
        }
    }
}

#[derive(Default)]
struct Sheet(Journal, Mutex<Vec<(String, Vec<Vec<String>>)>>);

#[async_trait]
impl ReportSink for Sheet {
    async fn create_tab(&self, title: &str) -> Result<(), SourceError> {
        note(&self.0, format!("tab {title}"));
        Ok(())
    }

    async fn write_rows(&self, tab: &str, rows: Vec<Vec<String>>) -> Result<(), SourceError> {
        note(&self.0, format!("rows {tab}"));
        self.1.lock().expect("written").push((tab.to_string(), rows));
        Ok(())
    }
}

fn reporter(journal: &Journal, upload_fails: bool) -> (ArchivalReporter, Arc<Sheet>) {
    let sheet = Arc::new(Sheet(journal.clone(), Mutex::default()));
    let mut observed = ObservedState::from_pairs([("app", vec!["1.0", "2.0"]), ("svc", vec!["3"])]);
    observed.mark_unreadable("broken", "HTTP 500");
    let reporter = ArchivalReporter {
        observed: Arc::new(Registry(journal.clone(), observed)),
        archiver: Arc::new(Tar(journal.clone())),
        uploader: Arc::new(Scp(journal.clone(), upload_fails)),
        sink: sheet.clone(),
    };
    (reporter, sheet)
}

// ---------------------------------------------------------------------------
// 1. Export
// ---------------------------------------------------------------------------

#[tokio::test]
async fn export_runs_steps_in_order_and_writes_manifest() {
    let journal = Journal::default();
    let (reporter, sheet) = reporter(&journal, false);
    let now = Utc.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).single().expect("time");

    let summary = reporter.export(now).await.expect("export");

    assert_eq!(
        *journal.lock().expect("journal"),
        vec![
            "observed",
            "archive 20261014-120000.tar.gz",
            "upload /tmp/out/20261014-120000.tar.gz",
            "tab 20261014-120000.tar.gz",
            "rows 20261014-120000.tar.gz",
        ]
    );
    assert_eq!(summary.tab, "20261014-120000.tar.gz");
    assert_eq!(summary.uploaded_to, "nas:/exports/20261014-120000.tar.gz");
    assert_eq!(summary.images, 3);
    assert_eq!(summary.unreadable, 1);

    let written = sheet.1.lock().expect("written");
    let (_, rows) = &written[0];
    assert_eq!(rows[0], vec!["repository", "tag", "image"]);
    assert_eq!(rows[1], vec!["app", "1.0", "app:1.0"]);
    assert!(rows.contains(&vec!["sha256".to_string(), "ab".repeat(32)]));
}

#[tokio::test]
async fn failed_upload_creates_no_tab() {
    let journal = Journal::default();
    let (reporter, _) = reporter(&journal, true);

    let err = reporter.export(Utc::now()).await.expect_err("upload fails");
    assert!(matches!(err, ReportError::Upload(_)));
    assert!(!journal.lock().expect("journal").iter().any(|e| e.starts_with("tab")));
}

// ---------------------------------------------------------------------------
// 2. Sync report
// ---------------------------------------------------------------------------

fn executed_report() -> ReconciliationReport {
    ReconciliationReport {
        to_copy: vec![ImageRef::parse("web:2")],
        to_delete: vec![ImageRef::parse("app:2.0")],
        present: vec![ImageRef::parse("app:1.0")],
        malformed: vec!["bare".into()],
        copy_results: vec![
            ImageOutcome::skipped("bare"),
            ImageOutcome::failed("web:2", "timeout after 600s", ""),
        ],
        delete_results: vec![ImageOutcome::succeeded("app:2.0")],
        executed: true,
        ..Default::default()
    }
}

#[test]
fn report_rows_list_every_outcome() {
    let rows = report_rows(&executed_report());
    assert_eq!(rows[0], vec!["action", "image", "status", "detail"]);
    assert_eq!(rows[1], vec!["copy", "bare", "skipped_malformed", "reference has no tag"]);
    assert_eq!(rows[2], vec!["copy", "web:2", "failed", "timeout after 600s"]);
    assert_eq!(rows[3], vec!["delete", "app:2.0", "succeeded", ""]);
    assert_eq!(rows[4], vec!["keep", "app:1.0", "present", ""]);
    assert!(rows.contains(&vec!["failed".to_string(), "1".to_string()]));
}

#[tokio::test]
async fn persist_report_writes_sync_tab() {
    let journal = Journal::default();
    let (reporter, sheet) = reporter(&journal, false);
    let now = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).single().expect("time");

    let tab = reporter
        .persist_report(&executed_report(), now)
        .await
        .expect("persist");
    assert_eq!(tab, "sync-20260102-030405");
    assert_eq!(sheet.1.lock().expect("written")[0].0, "sync-20260102-030405");
}

#[test]
fn manifest_of_empty_registry_still_records_archive() {
    let archive = ArchiveInfo {
        path: PathBuf::from("/tmp/x.tar.gz"),
        file_name: "x.tar.gz".into(),
        size_bytes: 10,
        sha256: "00".into(),
    };
    let rows = manifest_rows(&ObservedState::default(), &archive);
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[2], vec!["archive", "x.tar.gz"]);
}
