//! Plan execution against an [`ImageTransport`].
//!
//! Copies run to completion before any delete starts. Within a phase, up to
//! `concurrency` calls are in flight and results are collected in plan order.
//! They are appended after the `skipped_malformed` outcomes that
//! [`reconcile`](crate::engine::reconcile) records, so the trailing
//! `to_copy.len()` entries of `copy_results` line up with `to_copy` (and
//! likewise for deletes).

use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};

use imgsync_core::{ImageRef, ImageTransport, Settings, TransportError};

use crate::report::{Action, ImageOutcome, ReconciliationReport};

/// Knobs for [`execute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteOptions {
    /// Deadline for every individual transport call.
    pub call_timeout: Duration,
    /// Maximum in-flight calls per phase. `1` is strictly sequential.
    pub concurrency: usize,
    /// Extra attempts after a failed or timed-out call.
    pub retries: u32,
    /// Base delay between attempts; attempt `n` waits `n * retry_backoff`.
    pub retry_backoff: Duration,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(600),
            concurrency: 1,
            retries: 0,
            retry_backoff: Duration::from_secs(2),
        }
    }
}

impl ExecuteOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            call_timeout: settings.call_timeout,
            concurrency: settings.concurrency.max(1),
            retries: settings.retries,
            ..Self::default()
        }
    }
}

/// Run the report's plan and fill in `copy_results` and `delete_results`.
///
/// One failing call never stops the batch: every planned image receives
/// exactly one outcome. A delete the transport classifies as not-found counts
/// as succeeded, since the image is absent either way.
pub async fn execute(
    mut report: ReconciliationReport,
    transport: &dyn ImageTransport,
    options: &ExecuteOptions,
) -> ReconciliationReport {
    let copies = run_phase(&report.to_copy, Action::Copy, transport, options).await;
    report.copy_results.extend(copies);

    let deletes = run_phase(&report.to_delete, Action::Delete, transport, options).await;
    report.delete_results.extend(deletes);

    report.executed = true;
    report
}

async fn run_phase(
    images: &[ImageRef],
    action: Action,
    transport: &dyn ImageTransport,
    options: &ExecuteOptions,
) -> Vec<ImageOutcome> {
    if images.is_empty() {
        return Vec::new();
    }
    tracing::info!(action = %action, count = images.len(), "starting phase");
    let started = Instant::now();

    let calls: Vec<_> = images
        .iter()
        .map(|image| run_one(image, action, transport, options))
        .collect();
    let outcomes: Vec<ImageOutcome> = stream::iter(calls)
    .buffered(options.concurrency.max(1))
    .collect()
    .await;

    let failed = outcomes.iter().filter(|o| o.is_failure()).count();
    tracing::info!(
        action = %action,
        count = outcomes.len(),
        failed,
        duration_ms = started.elapsed().as_millis() as u64,
        "phase finished",
    );
    outcomes
}

async fn run_one(
    image: &ImageRef,
    action: Action,
    transport: &dyn ImageTransport,
    options: &ExecuteOptions,
) -> ImageOutcome {
    let label = image.to_string();
    if image.is_malformed() {
        tracing::warn!(image = %label, action = %action, "reference has no tag; skipping");
        return ImageOutcome::skipped(label);
    }

    let mut attempt: u32 = 0;
    loop {
        let call = async {
            match action {
                Action::Copy => transport.copy(image).await,
                Action::Delete => transport.delete(image).await,
            }
        };
        let result = match tokio::time::timeout(options.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout {
                after: options.call_timeout,
            }),
        };

        match result {
            Ok(_) => {
                tracing::info!(image = %label, action = %action, "succeeded");
                return ImageOutcome::succeeded(label);
            }
            Err(TransportError::NotFound { .. }) if action == Action::Delete => {
                tracing::info!(image = %label, "not present in registry; nothing to delete");
                return ImageOutcome::succeeded(label);
            }
            Err(err) if err.is_retryable() && attempt < options.retries => {
                attempt += 1;
                tracing::warn!(
                    image = %label,
                    action = %action,
                    attempt,
                    error = %err,
                    "call failed; retrying",
                );
                tokio::time::sleep(options.retry_backoff * attempt).await;
            }
            Err(err) => {
                tracing::error!(image = %label, action = %action, error = %err, "failed");
                return failure(label, err);
            }
        }
    }
}

fn failure(image: String, err: TransportError) -> ImageOutcome {
    match err {
        TransportError::NotFound { output } => {
            ImageOutcome::failed(image, "source image not found", output)
        }
        TransportError::Failed { output, reason } => ImageOutcome::failed(image, reason, output),
        TransportError::Timeout { after } => {
            ImageOutcome::failed(image, format!("timeout after {}s", after.as_secs()), "")
        }
    }
}
