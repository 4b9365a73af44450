//! # imgsync-sync
//!
//! Reconciliation engine and pass orchestration.
//!
//! [`reconcile`] computes the copy/delete plan from a declared and an observed
//! snapshot without side effects; [`execute`] drives an
//! [`ImageTransport`](imgsync_core::ImageTransport) through that plan and fills
//! in per-image outcomes. [`pipeline::run`] performs one full pass.

pub mod engine;
pub mod error;
pub mod execute;
pub mod pipeline;
pub mod report;

pub use engine::reconcile;
pub use error::SyncError;
pub use execute::{execute, ExecuteOptions};
pub use report::{Action, ImageOutcome, Outcome, ReconciliationReport, ReportSummary};
