// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::spec::RunnableSpec;

fn specs(defs: &[(&str, &[&str])]) -> IndexMap<String, RunnableSpec> {
    defs.iter()
        .map(|(id, deps)| {
            let mut spec = RunnableSpec::shell(*id, "sleep 1000");
            spec.depends_on = deps.iter().map(|d| d.to_string()).collect();
            (id.to_string(), spec)
        })
        .collect()
}

fn ids(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[test]
fn expansion_includes_transitive_deps() {
    let specs = specs(&[("a", &[]), ("b", &["a"]), ("c", &["b"]), ("d", &[])]);
    let closure = expand_targets(&specs, &ids(&["c"]));
    assert_eq!(closure, ids(&["c", "b", "a"]));
}

#[test]
fn expansion_deduplicates_shared_deps() {
    let specs = specs(&[("base", &[]), ("x", &["base"]), ("y", &["base"])]);
    let closure = expand_targets(&specs, &ids(&["x", "y"]));
    assert_eq!(closure, ids(&["x", "y", "base"]));
}

#[test]
fn expansion_is_idempotent() {
    let specs = specs(&[("a", &[]), ("b", &["a"])]);
    let once = expand_targets(&specs, &ids(&["b"]));
    let twice = expand_targets(&specs, &once);
    assert_eq!(once, twice);
}

#[test]
fn missing_dependency_names_everything() {
    let specs = specs(&[("a", &["ghost"]), ("b", &[])]);
    let err = validate_dependencies(&specs, &ids(&["a", "ghost", "b"])).unwrap_err();
    match err {
        SupervisorError::MissingDependency { id, dependency, known } => {
            assert_eq!(id, "a");
            assert_eq!(dependency, "ghost");
            assert_eq!(known, ids(&["a", "b"]));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn topo_order_respects_dependencies() {
    let specs = specs(&[("api", &["db"]), ("db", &[]), ("web", &["api"])]);
    let order = topo_order(&specs, &ids(&["api", "db", "web"])).unwrap();
    let pos = |id: &str| order.iter().position(|x| x == id).unwrap();
    assert!(pos("db") < pos("api"));
    assert!(pos("api") < pos("web"));
}

#[test]
fn topo_order_ignores_edges_leaving_the_subset() {
    // "api" depends on "db", but only "api" is in the subset.
    let specs = specs(&[("api", &["db"]), ("db", &[])]);
    let order = topo_order(&specs, &ids(&["api"])).unwrap();
    assert_eq!(order, ids(&["api"]));
}

#[test]
fn cycle_is_detected_and_lists_members() {
    let specs = specs(&[("a", &["b"]), ("b", &["a"]), ("c", &[])]);
    let err = topo_order(&specs, &ids(&["a", "b", "c"])).unwrap_err();
    match err {
        SupervisorError::Cycle { ids } => assert_eq!(ids, vec!["a", "b"]),
        other => panic!("unexpected error: {other}"),
    }
    assert!(err_to_string(&specs).contains("Dependency cycle detected"));
}

fn err_to_string(specs: &IndexMap<String, RunnableSpec>) -> String {
    topo_order(specs, &ids(&["a", "b"])).unwrap_err().to_string()
}

#[test]
fn self_dependency_is_a_cycle() {
    let specs = specs(&[("a", &["a"])]);
    let err = topo_order(&specs, &ids(&["a"])).unwrap_err();
    assert!(matches!(err, SupervisorError::Cycle { ids } if ids == vec!["a"]));
}
