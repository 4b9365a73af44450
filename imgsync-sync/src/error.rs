//! Error types for imgsync-sync.

use std::time::Duration;

use thiserror::Error;

use imgsync_core::SourceError;

/// Errors that abort a whole reconciliation pass.
///
/// Per-image failures never surface here; they are recorded in the report.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The declared inventory could not be read. Nothing was touched.
    #[error("declared state unavailable: {0}")]
    SourceUnavailable(#[source] SourceError),

    /// The registry catalog could not be listed. Nothing was touched.
    #[error("observed state unavailable: {0}")]
    ObservedUnavailable(#[source] SourceError),

    /// A state fetch exceeded its deadline.
    #[error("{stage} fetch timed out after {}s", after.as_secs())]
    Timeout { stage: &'static str, after: Duration },
}
