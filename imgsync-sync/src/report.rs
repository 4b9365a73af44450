//! The reconciliation report: plan plus per-image outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use imgsync_core::{ImageRef, UnreadableRepository};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Which side of the plan an outcome belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Copy,
    Delete,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Copy => write!(f, "copy"),
            Action::Delete => write!(f, "delete"),
        }
    }
}

/// Terminal result for one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Succeeded,
    Failed { reason: String },
    /// The reference had no tag; no registry call was made.
    SkippedMalformed,
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Succeeded => "succeeded",
            Outcome::Failed { .. } => "failed",
            Outcome::SkippedMalformed => "skipped_malformed",
        }
    }
}

/// Outcome of a single copy or delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageOutcome {
    pub image: String,
    #[serde(flatten)]
    pub outcome: Outcome,
    /// Tool output, kept for failed calls.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub output: String,
}

impl ImageOutcome {
    pub fn succeeded(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            outcome: Outcome::Succeeded,
            output: String::new(),
        }
    }

    pub fn failed(
        image: impl Into<String>,
        reason: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            image: image.into(),
            outcome: Outcome::Failed {
                reason: reason.into(),
            },
            output: output.into(),
        }
    }

    pub fn skipped(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            outcome: Outcome::SkippedMalformed,
            output: String::new(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, Outcome::Failed { .. })
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Output of one reconciliation pass.
///
/// `to_copy`, `to_delete`, `present` and `malformed` come from a single
/// snapshot of declared and observed state and are fixed once computed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    /// Included refs whose exact `name:tag` is absent from the registry.
    pub to_copy: Vec<ImageRef>,
    /// Excluded refs, then stored images not declared for inclusion.
    pub to_delete: Vec<ImageRef>,
    /// Included refs already stored.
    pub present: Vec<ImageRef>,
    /// Declared refs without a tag, in row order (include side first).
    pub malformed: Vec<String>,
    /// Repositories omitted from the observed snapshot.
    pub unreadable: Vec<UnreadableRepository>,
    pub copy_results: Vec<ImageOutcome>,
    pub delete_results: Vec<ImageOutcome>,
    /// `false` for a dry run.
    pub executed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

/// Counts derived from a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub planned_copies: usize,
    pub planned_deletes: usize,
    pub present: usize,
    pub copied: usize,
    pub deleted: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl ReconciliationReport {
    pub fn summary(&self) -> ReportSummary {
        let count = |results: &[ImageOutcome], want: fn(&Outcome) -> bool| {
            results.iter().filter(|r| want(&r.outcome)).count()
        };
        let succeeded = |o: &Outcome| matches!(o, Outcome::Succeeded);
        let failed = |o: &Outcome| matches!(o, Outcome::Failed { .. });
        let skipped = |o: &Outcome| matches!(o, Outcome::SkippedMalformed);

        ReportSummary {
            planned_copies: self.to_copy.len(),
            planned_deletes: self.to_delete.len(),
            present: self.present.len(),
            copied: count(&self.copy_results, succeeded),
            deleted: count(&self.delete_results, succeeded),
            failed: count(&self.copy_results, failed) + count(&self.delete_results, failed),
            skipped: count(&self.copy_results, skipped) + count(&self.delete_results, skipped),
        }
    }

    /// Every outcome with its action, copies first.
    pub fn outcomes(&self) -> impl Iterator<Item = (Action, &ImageOutcome)> {
        self.copy_results
            .iter()
            .map(|o| (Action::Copy, o))
            .chain(self.delete_results.iter().map(|o| (Action::Delete, o)))
    }

    pub fn has_failures(&self) -> bool {
        self.outcomes().any(|(_, o)| o.is_failure())
    }
}
