//! Error types for imgsync-report.

use thiserror::Error;

use imgsync_core::SourceError;

/// Failures of the export and report-persisting flows, tagged by step.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("reading registry contents failed: {0}")]
    Observed(#[source] SourceError),

    #[error("archiving failed: {0}")]
    Archive(#[source] SourceError),

    #[error("upload failed: {0}")]
    Upload(#[source] SourceError),

    /// Creating the tab or writing its rows failed.
    #[error("writing tab {tab} failed: {source}")]
    Sink {
        tab: String,
        #[source]
        source: SourceError,
    },
}
