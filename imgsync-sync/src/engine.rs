//! Diff computation: declared vs. observed.

use std::collections::HashSet;

use imgsync_core::{DeclaredState, ImageRef, ObservedState};

use crate::report::{ImageOutcome, ReconciliationReport};

/// Compute the copy and delete plan for one pass.
///
/// Pure: the same inputs always produce the same report, and no collaborator
/// is touched.
///
/// - `to_copy`: include rows, in row order, whose exact `name:tag` is not
///   stored. Duplicates are kept; every row is processed on its own.
/// - `to_delete`: every tagged exclude row, then every stored `name:tag` that
///   occurs in neither the include nor the exclude list, repository-then-tag
///   order. Matching is per exact pair, so a repository keeps its declared
///   tags and loses only the undeclared ones. Repeated exclude rows stay
///   repeated.
/// - Rows without a tag go to `malformed` with a `skipped_malformed` outcome
///   (copy side for include rows, delete side for exclude rows). They are
///   never looked up and appear in neither `to_copy` nor `to_delete`.
/// - Refs are compared after trimming, on both the include and delete side.
pub fn reconcile(declared: &DeclaredState, observed: &ObservedState) -> ReconciliationReport {
    let stored = observed.qualified_set();
    let mut report = ReconciliationReport {
        unreadable: observed.unreadable.clone(),
        ..Default::default()
    };

    let mut included: HashSet<String> = HashSet::new();
    for raw in &declared.include {
        let image = ImageRef::parse(raw);
        match image.qualified() {
            None => {
                tracing::warn!(image = %raw, "declared image has no tag; skipping");
                report.malformed.push(raw.clone());
                report.copy_results.push(ImageOutcome::skipped(raw.as_str()));
            }
            Some(qualified) => {
                if stored.contains(&qualified) {
                    report.present.push(image);
                } else {
                    report.to_copy.push(image);
                }
                included.insert(qualified);
            }
        }
    }

    for raw in &declared.exclude {
        let image = ImageRef::parse(raw);
        if image.is_malformed() {
            tracing::warn!(image = %raw, "excluded image has no tag; skipping");
            report.malformed.push(raw.clone());
            report.delete_results.push(ImageOutcome::skipped(raw.as_str()));
        } else {
            report.to_delete.push(image);
        }
    }

    let excluded: HashSet<String> = report.to_delete.iter().map(ToString::to_string).collect();
    report.to_delete.extend(observed.images().filter(|image| {
        let qualified = image.to_string();
        !included.contains(&qualified) && !excluded.contains(&qualified)
    }));

    tracing::debug!(
        to_copy = report.to_copy.len(),
        to_delete = report.to_delete.len(),
        present = report.present.len(),
        malformed = report.malformed.len(),
        "reconciliation plan computed",
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declared(rows: &[(&str, bool)]) -> DeclaredState {
        let mut state = DeclaredState::default();
        for (reference, export) in rows {
            state.push(imgsync_core::DeclaredImage {
                reference: reference.to_string(),
                export: *export,
            });
        }
        state
    }

    fn names(refs: &[ImageRef]) -> Vec<String> {
        refs.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn present_tag_is_not_copied_and_excluded_tag_is_deleted() {
        let declared = declared(&[("app:1.0", true), ("app:2.0", false)]);
        let observed = ObservedState::from_pairs([("app", vec!["1.0"])]);

        let report = reconcile(&declared, &observed);
        assert!(report.to_copy.is_empty());
        assert_eq!(names(&report.to_delete), vec!["app:2.0"]);
        assert_eq!(names(&report.present), vec!["app:1.0"]);
    }

    #[test]
    fn untagged_reference_is_malformed_not_copied() {
        let declared = declared(&[("app", true)]);
        let report = reconcile(&declared, &ObservedState::default());
        assert!(report.to_copy.is_empty());
        assert_eq!(report.malformed, vec!["app"]);
        assert_eq!(report.copy_results, vec![ImageOutcome::skipped("app")]);
    }

    #[test]
    fn missing_tag_is_copied_and_undeclared_repo_is_deleted() {
        let declared = declared(&[("svc:3", true)]);
        let observed =
            ObservedState::from_pairs([("svc", vec!["1", "2"]), ("other", vec!["1"])]);

        let report = reconcile(&declared, &observed);
        assert_eq!(names(&report.to_copy), vec!["svc:3"]);
        assert_eq!(names(&report.to_delete), vec!["svc:1", "svc:2", "other:1"]);
    }

    #[test]
    fn excluded_and_stored_image_is_listed_once() {
        let declared = declared(&[("app:1", false), ("app:1", false), ("web:1", false)]);
        let observed = ObservedState::from_pairs([("app", vec!["1", "2"]), ("web", vec!["1"])]);

        let report = reconcile(&declared, &observed);
        assert_eq!(names(&report.to_delete), vec!["app:1", "app:1", "web:1", "app:2"]);
    }

    #[test]
    fn padded_include_row_keeps_its_stored_image() {
        let declared = DeclaredState {
            include: vec![" app:1".into(), "web:2 ".into()],
            exclude: Vec::new(),
        };
        let observed = ObservedState::from_pairs([("app", vec!["1"]), ("web", vec!["1"])]);

        let report = reconcile(&declared, &observed);
        assert_eq!(names(&report.present), vec!["app:1"]);
        assert_eq!(names(&report.to_copy), vec!["web:2"]);
        assert_eq!(names(&report.to_delete), vec!["web:1"]);
    }

    #[test]
    fn untagged_exclude_row_is_not_planned_for_deletion() {
        let declared = declared(&[("app", false), ("web:1", false)]);
        let observed = ObservedState::from_pairs([("web", vec!["1"])]);

        let report = reconcile(&declared, &observed);
        assert_eq!(names(&report.to_delete), vec!["web:1"]);
        assert_eq!(report.malformed, vec!["app"]);
        assert_eq!(report.delete_results, vec![ImageOutcome::skipped("app")]);
    }

    #[test]
    fn reconcile_is_deterministic() {
        let declared = declared(&[("a:1", true), ("b:1", false), ("c", true)]);
        let observed = ObservedState::from_pairs([("a", vec!["0", "1"]), ("z", vec!["9"])]);
        assert_eq!(reconcile(&declared, &observed), reconcile(&declared, &observed));
    }
}
