//! Shared pass entrypoint used by the CLI and the daemon.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;

use imgsync_core::{
    config::split_ranges, DeclaredState, DeclaredStateSource, ImageTransport, ObservedState,
    ObservedStateSource, SourceError,
};

use crate::{engine::reconcile, execute, ExecuteOptions, ReconciliationReport, SyncError};

/// The collaborators and settings for one pass.
///
/// Built explicitly by the caller for each pass; nothing here is global.
#[derive(Clone)]
pub struct PassContext {
    pub declared: Arc<dyn DeclaredStateSource>,
    pub observed: Arc<dyn ObservedStateSource>,
    pub transport: Arc<dyn ImageTransport>,
    /// Configured declared-state ranges.
    pub ranges: Vec<String>,
    pub execute: ExecuteOptions,
}

/// Per-invocation switches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassOptions {
    /// Comma-separated ranges replacing the configured ones for this pass only.
    pub range_override: Option<String>,
    /// Compute the plan without executing it.
    pub dry_run: bool,
}

impl PassContext {
    /// Ranges for this pass: the override when it names at least one range.
    pub fn ranges_for(&self, options: &PassOptions) -> Vec<String> {
        options
            .range_override
            .as_deref()
            .map(split_ranges)
            .filter(|ranges| !ranges.is_empty())
            .unwrap_or_else(|| self.ranges.clone())
    }
}

/// Run one reconciliation pass.
///
/// Declared state is fetched first; if that fails, the registry is never
/// queried. Both snapshots are taken once, before any copy or delete.
pub async fn run(
    ctx: &PassContext,
    options: PassOptions,
) -> Result<ReconciliationReport, SyncError> {
    let started_at = Utc::now();
    let started = Instant::now();
    let ranges = ctx.ranges_for(&options);
    let deadline = ctx.execute.call_timeout;

    tracing::info!(ranges = %ranges.join(","), dry_run = options.dry_run, "reading declared state");
    let declared: DeclaredState = with_deadline(
        "declared",
        deadline,
        ctx.declared.fetch_declared(&ranges),
    )
    .await?
    .map_err(SyncError::SourceUnavailable)?;

    tracing::info!(
        include = declared.include.len(),
        exclude = declared.exclude.len(),
        "reading registry catalog",
    );
    let observed: ObservedState = with_deadline("observed", deadline, ctx.observed.fetch_observed())
        .await?
        .map_err(SyncError::ObservedUnavailable)?;
    for repo in &observed.unreadable {
        tracing::warn!(
            repository = %repo.name,
            reason = %repo.reason,
            "repository omitted from pass"
        );
    }

    let mut report = reconcile(&declared, &observed);
    if !options.dry_run {
        report = execute(report, ctx.transport.as_ref(), &ctx.execute).await;
    }

    report.started_at = Some(started_at);
    report.duration_ms = Some(started.elapsed().as_millis() as u64);

    let summary = report.summary();
    tracing::info!(
        copied = summary.copied,
        deleted = summary.deleted,
        present = summary.present,
        failed = summary.failed,
        skipped = summary.skipped,
        duration_ms = report.duration_ms.unwrap_or_default(),
        "reconciliation pass finished",
    );
    Ok(report)
}

async fn with_deadline<T>(
    stage: &'static str,
    after: Duration,
    fut: impl Future<Output = Result<T, SourceError>>,
) -> Result<Result<T, SourceError>, SyncError> {
    tokio::time::timeout(after, fut)
        .await
        .map_err(|_| SyncError::Timeout { stage, after })
}
