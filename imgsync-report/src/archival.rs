//! Export flow and report persistence.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use imgsync_core::{Archiver, ObservedStateSource, ReportSink, SourceError, Uploader};
use imgsync_sync::ReconciliationReport;

use crate::error::ReportError;
use crate::rows::{manifest_rows, report_rows, sync_tab_title, tab_title};

/// Result of one export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSummary {
    /// Name of the created tab; also the archive file name.
    pub tab: String,
    pub archive_path: PathBuf,
    pub size_bytes: u64,
    pub sha256: String,
    /// Remote location reported by the uploader.
    pub uploaded_to: String,
    pub images: usize,
    pub unreadable: usize,
}

/// Writes to the release spreadsheet.
#[derive(Clone)]
pub struct ArchivalReporter {
    pub observed: Arc<dyn ObservedStateSource>,
    pub archiver: Arc<dyn Archiver>,
    pub uploader: Arc<dyn Uploader>,
    pub sink: Arc<dyn ReportSink>,
}

impl ArchivalReporter {
    /// Archive the registry, upload the archive, and record its manifest.
    ///
    /// Steps run strictly in order; the first failure stops the flow and no
    /// tab is created unless the upload succeeded.
    pub async fn export(&self, now: DateTime<Utc>) -> Result<ExportSummary, ReportError> {
        let title = tab_title(now);

        let observed = self
            .observed
            .fetch_observed()
            .await
            .map_err(ReportError::Observed)?;
        let archive = self
            .archiver
            .archive(&title)
            .await
            .map_err(ReportError::Archive)?;
        let uploaded_to = self
            .uploader
            .upload(&archive.path)
            .await
            .map_err(ReportError::Upload)?;

        let rows = manifest_rows(&observed, &archive);
        self.write_tab(&title, rows).await?;

        tracing::info!(
            tab = %title,
            images = observed.image_count(),
            %uploaded_to,
            "export recorded"
        );
        Ok(ExportSummary {
            tab: title,
            archive_path: archive.path,
            size_bytes: archive.size_bytes,
            sha256: archive.sha256,
            uploaded_to,
            images: observed.image_count(),
            unreadable: observed.unreadable.len(),
        })
    }

    /// Write `report` to a new `sync-<stamp>` tab; returns the tab name.
    pub async fn persist_report(
        &self,
        report: &ReconciliationReport,
        now: DateTime<Utc>,
    ) -> Result<String, ReportError> {
        let title = sync_tab_title(now);
        self.write_tab(&title, report_rows(report)).await?;
        Ok(title)
    }

    async fn write_tab(&self, title: &str, rows: Vec<Vec<String>>) -> Result<(), ReportError> {
        let sink_err = |source: SourceError| ReportError::Sink {
            tab: title.to_string(),
            source,
        };
        self.sink.create_tab(title).await.map_err(sink_err)?;
        self.sink.write_rows(title, rows).await.map_err(sink_err)?;
        Ok(())
    }
}
