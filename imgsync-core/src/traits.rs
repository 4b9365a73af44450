//! Collaborator boundaries the engine is written against.
//!
//! Implementations live in `imgsync-sources`; tests supply in-memory fakes.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{SourceError, TransportError};
use crate::types::{DeclaredState, ImageRef, ObservedState};

/// Reads the desired inventory.
#[async_trait]
pub trait DeclaredStateSource: Send + Sync {
    /// Read every range and return the include/exclude split.
    ///
    /// All-or-nothing: a failure on any one range fails the whole call.
    async fn fetch_declared(&self, ranges: &[String]) -> Result<DeclaredState, SourceError>;
}

/// Reads what the registry currently stores.
#[async_trait]
pub trait ObservedStateSource: Send + Sync {
    /// Enumerate repositories and their tags.
    ///
    /// Best-effort per repository: an unreadable tag list is recorded in
    /// [`ObservedState::unreadable`] instead of failing the fetch.
    async fn fetch_observed(&self) -> Result<ObservedState, SourceError>;

    /// Reachability check.
    async fn ping(&self) -> Result<(), SourceError>;
}

/// Moves images into and out of the registry.
#[async_trait]
pub trait ImageTransport: Send + Sync {
    /// Mirror `image` into the registry. Returns tool output on success.
    async fn copy(&self, image: &ImageRef) -> Result<String, TransportError>;

    /// Remove `image` from the registry. Returns tool output on success.
    async fn delete(&self, image: &ImageRef) -> Result<String, TransportError>;
}

/// Writes rows back to a spreadsheet.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Create a new tab named `title`.
    async fn create_tab(&self, title: &str) -> Result<(), SourceError>;

    /// Write `rows` starting at the top-left cell of `tab`.
    async fn write_rows(&self, tab: &str, rows: Vec<Vec<String>>) -> Result<(), SourceError>;
}

/// A produced archive file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveInfo {
    pub path: PathBuf,
    pub file_name: String,
    pub size_bytes: u64,
    pub sha256: String,
}

/// Compresses the registry storage directory.
#[async_trait]
pub trait Archiver: Send + Sync {
    async fn archive(&self, file_name: &str) -> Result<ArchiveInfo, SourceError>;
}

/// Ships an archive to remote storage.
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Upload `file`; returns the remote location.
    async fn upload(&self, file: &Path) -> Result<String, SourceError>;
}
