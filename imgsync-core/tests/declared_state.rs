//! Include/exclude row assignment and reference parsing.

use imgsync_core::{DeclaredState, ImageRef};
use rstest::rstest;

fn rows(raw: &[&[&str]]) -> Vec<Vec<String>> {
    raw.iter()
        .map(|row| row.iter().map(|c| c.to_string()).collect())
        .collect()
}

// ---------------------------------------------------------------------------
// 1. Export flag
// ---------------------------------------------------------------------------

#[rstest]
#[case(&["app:1", "FALSE"], false)]
#[case(&["app:1", "TRUE"], true)]
#[case(&["app:1", "false"], true)]
#[case(&["app:1", ""], true)]
#[case(&["app:1", "no"], true)]
#[case(&["app:1"], true)]
fn flag_assignment(#[case] row: &[&str], #[case] included: bool) {
    let state = DeclaredState::from_rows(&rows(&[row]));
    if included {
        assert_eq!(state.include, vec!["app:1"]);
        assert!(state.exclude.is_empty());
    } else {
        assert_eq!(state.exclude, vec!["app:1"]);
        assert!(state.include.is_empty());
    }
}

#[test]
fn every_row_lands_in_exactly_one_list() {
    let input = rows(&[
        &["a:1", "TRUE"],
        &["b:1", "FALSE"],
        &["c:1"],
        &[],
        &["d:1", "FALSE", "extra"],
        &["a:1"],
    ]);
    let state = DeclaredState::from_rows(&input);
    assert_eq!(state.include, vec!["a:1", "c:1", "a:1"]);
    assert_eq!(state.exclude, vec!["b:1", "d:1"]);
    assert_eq!(state.include.len() + state.exclude.len(), 5, "empty row contributes nothing");
}

#[test]
fn references_are_trimmed() {
    let state = DeclaredState::from_rows(&rows(&[&["  app:1 ", "TRUE"]]));
    assert_eq!(state.include, vec!["app:1"]);
}

#[test]
fn extend_preserves_range_order() {
    let mut first = DeclaredState::from_rows(&rows(&[&["a:1"], &["x:1", "FALSE"]]));
    let second = DeclaredState::from_rows(&rows(&[&["b:1"], &["y:1", "FALSE"]]));
    first.extend(second);
    assert_eq!(first.include, vec!["a:1", "b:1"]);
    assert_eq!(first.exclude, vec!["x:1", "y:1"]);
}

// ---------------------------------------------------------------------------
// 2. Reference parsing
// ---------------------------------------------------------------------------

#[rstest]
#[case("nginx:1.25", Some(("nginx", "1.25")))]
#[case("docker.io/library/nginx:1.25", Some(("docker.io/library/nginx", "1.25")))]
#[case("registry.local:5000/team/app:v1", Some(("registry.local:5000/team/app", "v1")))]
#[case("nginx", None)]
#[case("registry.local:5000/team/app", None)]
#[case("app:", None)]
fn reference_parsing(#[case] raw: &str, #[case] expected: Option<(&str, &str)>) {
    let parsed = ImageRef::parse(raw);
    match expected {
        Some((name, tag)) => {
            assert_eq!(parsed.name, name);
            assert_eq!(parsed.tag.as_deref(), Some(tag));
            assert_eq!(parsed.to_string(), raw);
        }
        None => {
            assert!(parsed.is_malformed(), "{raw} should be malformed");
            assert_eq!(parsed.to_string(), raw);
        }
    }
}
