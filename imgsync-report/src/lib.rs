//! # imgsync-report
//!
//! Formats reconciliation and export results as spreadsheet rows and writes
//! them to timestamped tabs of the release spreadsheet.
//!
//! - [`rows`] builds row grids and tab titles; it does no I/O.
//! - [`ArchivalReporter`] runs the export flow and persists sync reports.

pub mod archival;
pub mod error;
pub mod rows;

pub use archival::{ArchivalReporter, ExportSummary};
pub use error::ReportError;
pub use rows::{manifest_rows, report_rows, sync_tab_title, tab_title};
