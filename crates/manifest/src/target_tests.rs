// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

const MANIFEST: &str = r#"
[runnable.db]
command = "postgres"

[runnable.api]
command = "api-server"

[runnable.worker]
command = "worker"

[group]
backend = ["db", "api"]
"#;

fn manifest() -> Manifest {
    Manifest::parse(MANIFEST).unwrap()
}

fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn empty_selects_all_in_declaration_order() {
    let resolved = resolve_targets(&manifest(), &[]).unwrap();
    assert_eq!(resolved, vec!["db", "api", "worker"]);
}

#[test]
fn runnable_name_resolves_to_itself() {
    let resolved = resolve_targets(&manifest(), &names(&["api"])).unwrap();
    assert_eq!(resolved, vec!["api"]);
}

#[test]
fn group_expands_to_members() {
    let resolved = resolve_targets(&manifest(), &names(&["backend"])).unwrap();
    assert_eq!(resolved, vec!["db", "api"]);
}

#[test]
fn duplicates_are_removed_preserving_order() {
    let resolved =
        resolve_targets(&manifest(), &names(&["api", "backend", "api"])).unwrap();
    assert_eq!(resolved, vec!["api", "db"]);
}

#[test]
fn group_wins_over_runnable_of_same_name() {
    let mut manifest = manifest();
    manifest.groups.insert("api".to_string(), vec!["db".to_string()]);
    let resolved = resolve_targets(&manifest, &names(&["api"])).unwrap();
    assert_eq!(resolved, vec!["db"]);
}

#[test]
fn group_with_unknown_member_is_reported() {
    let mut manifest = manifest();
    manifest.groups.insert("broken".to_string(), vec!["ghost".to_string()]);
    let err = resolve_targets(&manifest, &names(&["broken"])).unwrap_err();
    assert_eq!(err.to_string(), "Group broken references unknown service ghost");
}

#[parameterized(
    prefix = { "wor", "worker" },
    transposition = { "ap", "api" },
    distance_one = { "dd", "db" },
    group_name = { "backen", "backend" },
)]
fn unknown_target_suggests(input: &str, expected: &str) {
    let err = resolve_targets(&manifest(), &names(&[input])).unwrap_err();
    match err {
        ManifestError::UnknownTarget { suggestion, .. } => {
            assert_eq!(suggestion.as_deref(), Some(expected));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn hopeless_typo_has_no_suggestion() {
    let err = resolve_targets(&manifest(), &names(&["zzzzzzzzzz"])).unwrap_err();
    match err {
        ManifestError::UnknownTarget { name, suggestion } => {
            assert_eq!(name, "zzzzzzzzzz");
            assert!(suggestion.is_none());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn resolution_is_case_sensitive() {
    let err = resolve_targets(&manifest(), &names(&["API"])).unwrap_err();
    assert!(matches!(err, ManifestError::UnknownTarget { .. }));
}
