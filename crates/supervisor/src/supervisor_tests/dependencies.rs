// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dependency gating, runtime env inheritance, recovery.

use super::*;
use crate::error::SupervisorError;
use indexmap::IndexMap;
use regex::Regex;
use rig_core::LogChannel;
use std::sync::Arc;

/// `a` publishes a URL derived from its ready line; `b` echoes what it
/// inherited.
fn publisher_and_dependent() -> Vec<RunnableSpec> {
    let mut a = shell("a", "echo 'listening on 7070'; sleep 5");
    let pattern = Regex::new(r"listening on (?P<port>\d+)").unwrap();
    a.ready_when = Some(pattern.clone());
    let mut exports = IndexMap::new();
    exports.insert("URL".to_string(), "http://localhost:${port}".to_string());
    a.on_ready = Some(Arc::new(EnvExportHook::new(exports, Some(pattern))));

    let mut b = shell("b", "echo \"url=$URL\"; sleep 5");
    b.depends_on = vec!["a".to_string()];
    vec![a, b]
}

#[tokio::test]
async fn dependent_waits_then_inherits_runtime_env() {
    let sup = supervisor(publisher_and_dependent());
    let mut status_rx = sup.subscribe_status();

    sup.start_all(&targets(&["b"])).await.unwrap();

    let waiting = await_status(&mut status_rx, "b", ServiceStatus::Waiting).await;
    assert_eq!(waiting.status, ServiceStatus::Waiting);
    assert_eq!(sup.get("b").unwrap().waiting_for, vec!["a"]);

    await_status(&mut status_rx, "a", ServiceStatus::Running).await;
    await_status(&mut status_rx, "b", ServiceStatus::Running).await;

    assert_eq!(
        sup.output_lines("b", LogChannel::Combined, None),
        vec!["url=http://localhost:7070"]
    );
    assert!(sup.get("b").unwrap().waiting_for.is_empty());

    sup.stop_all().await;
}

#[tokio::test]
async fn closure_is_started_even_when_only_the_leaf_is_targeted() {
    let sup = supervisor(publisher_and_dependent());
    let mut status_rx = sup.subscribe_status();

    sup.start_all(&targets(&["b"])).await.unwrap();
    await_status(&mut status_rx, "a", ServiceStatus::Running).await;

    // Both were unhidden by the expansion.
    assert!(sup.get("a").map(|v| !v.hidden).unwrap_or(false));
    assert!(sup.get("b").map(|v| !v.hidden).unwrap_or(false));

    sup.stop_all().await;
}

#[tokio::test]
async fn independent_branches_run_in_parallel() {
    let sup = supervisor(vec![shell("x", "sleep 5"), shell("y", "sleep 5")]);
    let mut status_rx = sup.subscribe_status();

    sup.start_all(&targets(&["x", "y"])).await.unwrap();
    await_status(&mut status_rx, "x", ServiceStatus::Running).await;
    await_status(&mut status_rx, "y", ServiceStatus::Running).await;

    sup.stop_all().await;
}

#[tokio::test]
async fn cycle_fails_fast_without_spawning() {
    let mut a = shell("a", "sleep 5");
    a.depends_on = vec!["b".to_string()];
    let mut b = shell("b", "sleep 5");
    b.depends_on = vec!["a".to_string()];
    let sup = supervisor(vec![a, b]);

    let err = sup.start_all(&targets(&["a", "b"])).await.unwrap_err();
    match err {
        SupervisorError::Cycle { ids } => assert_eq!(ids, vec!["a", "b"]),
        other => panic!("unexpected error: {other}"),
    }

    for view in sup.get_all() {
        assert_eq!(view.status, ServiceStatus::Stopped);
        assert!(view.hidden, "validation failure must not unhide services");
        assert!(view.pid.is_none());
    }
}

#[tokio::test]
async fn dangling_dependency_fails_fast() {
    let mut a = shell("a", "sleep 5");
    a.depends_on = vec!["ghost".to_string()];
    let sup = supervisor(vec![a]);

    let err = sup.start_all(&targets(&["a"])).await.unwrap_err();
    match err {
        SupervisorError::MissingDependency { id, dependency, known } => {
            assert_eq!(id, "a");
            assert_eq!(dependency, "ghost");
            assert_eq!(known, vec!["a"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn failed_dependency_parks_the_waiter() {
    let mut a = shell("a", "exit 1");
    a.depends_on = Vec::new();
    let mut b = shell("b", "sleep 5");
    b.depends_on = vec!["a".to_string()];
    let sup = supervisor(vec![a, b]);
    let mut status_rx = sup.subscribe_status();

    sup.start_all(&targets(&["b"])).await.unwrap();
    await_status(&mut status_rx, "a", ServiceStatus::Error).await;

    // The waiter keeps its gate list so UIs can explain the park.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let view = sup.get("b").unwrap();
    assert_eq!(view.status, ServiceStatus::Waiting);
    assert_eq!(view.waiting_for, vec!["a"]);
}

#[tokio::test]
async fn recovery_watcher_restarts_waiters_when_dep_comes_back() {
    // `a` fails on its first run and succeeds once the marker exists.
    let temp = tempfile::tempdir().unwrap();
    let marker = temp.path().join("ready-once");
    let command = format!(
        "if [ -f '{}' ]; then sleep 5; else touch '{}'; exit 1; fi",
        marker.display(),
        marker.display()
    );
    let a = shell("a", &command);
    let mut b = shell("b", "echo up; sleep 5");
    b.depends_on = vec!["a".to_string()];
    let sup = supervisor(vec![a, b]);
    let mut status_rx = sup.subscribe_status();

    sup.start_all(&targets(&["b"])).await.unwrap();
    await_status(&mut status_rx, "a", ServiceStatus::Error).await;
    assert_eq!(sup.get("b").unwrap().status, ServiceStatus::Waiting);

    // Operator fixes `a`; the watcher notices it running and releases `b`.
    sup.start("a").await.unwrap();
    await_status(&mut status_rx, "a", ServiceStatus::Running).await;
    await_status(&mut status_rx, "b", ServiceStatus::Running).await;

    sup.stop_all().await;
}

#[tokio::test]
async fn start_with_dependencies_unhides_and_starts_the_chain() {
    let mut api = shell("api", "sleep 5");
    api.depends_on = vec!["db".to_string()];
    let db = shell("db", "sleep 5");
    let other = shell("other", "sleep 5");
    let sup = supervisor(vec![db, api, other]);
    let mut status_rx = sup.subscribe_status();

    sup.start_with_dependencies("api").await.unwrap();
    await_status(&mut status_rx, "db", ServiceStatus::Running).await;
    await_status(&mut status_rx, "api", ServiceStatus::Running).await;

    assert!(!sup.get("db").unwrap().hidden);
    assert!(!sup.get("api").unwrap().hidden);
    // Unrelated services stay hidden and stopped.
    let other_view = sup.get("other").unwrap();
    assert!(other_view.hidden);
    assert_eq!(other_view.status, ServiceStatus::Stopped);

    sup.stop_all().await;
}

#[tokio::test]
async fn later_dependency_wins_env_conflicts() {
    let mut exports_one = IndexMap::new();
    exports_one.insert("SHARED".to_string(), "from-one".to_string());
    let mut one = shell("one", "sleep 5");
    one.on_ready = Some(Arc::new(EnvExportHook::new(exports_one, None)));

    let mut exports_two = IndexMap::new();
    exports_two.insert("SHARED".to_string(), "from-two".to_string());
    let mut two = shell("two", "sleep 5");
    two.on_ready = Some(Arc::new(EnvExportHook::new(exports_two, None)));

    let mut leaf = shell("leaf", "echo \"shared=$SHARED\"; sleep 5");
    leaf.depends_on = vec!["one".to_string(), "two".to_string()];
    let sup = supervisor(vec![one, two, leaf]);
    let mut status_rx = sup.subscribe_status();

    sup.start_all(&targets(&["leaf"])).await.unwrap();
    await_status(&mut status_rx, "leaf", ServiceStatus::Running).await;
    assert_eq!(
        sup.output_lines("leaf", LogChannel::Combined, None),
        vec!["shared=from-two"]
    );

    sup.stop_all().await;
}
