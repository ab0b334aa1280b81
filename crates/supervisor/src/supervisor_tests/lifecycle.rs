// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-service lifecycle: readiness, exit classification, stop
//! protocol, epoch reset.

use super::*;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use regex::Regex;
use rig_core::{LogChannel, OutputStream};

#[tokio::test]
async fn grace_path_emits_starting_output_running() {
    let sup = supervisor(vec![shell("api", "echo hi && sleep 5")]);
    let mut status_rx = sup.subscribe_status();
    let mut output_rx = sup.subscribe_output();

    sup.start_all(&targets(&["api"])).await.unwrap();

    assert_eq!(next_status(&mut status_rx, "api").await.status, ServiceStatus::Starting);

    let line = timeout(EVENT_WAIT, output_rx.recv()).await.unwrap().unwrap();
    assert_eq!(line.id, "api");
    assert_eq!(line.line, "hi");
    assert_eq!(line.stream, OutputStream::Stdout);

    assert_eq!(next_status(&mut status_rx, "api").await.status, ServiceStatus::Running);

    let view = sup.get("api").unwrap();
    assert_eq!(view.status, ServiceStatus::Running);
    assert!(view.pid.is_some());
    assert!(view.started_at.is_some());

    sup.stop_all().await;
}

#[tokio::test]
async fn ready_predicate_beats_grace_timer() {
    let mut spec = shell(
        "db",
        "echo one; echo two; echo 'listening on 5432'; sleep 5",
    );
    spec.ready_when = Some(Regex::new("listening").unwrap());
    // With a predicate there is no grace timer at all; make sure a
    // short grace would have lost anyway.
    spec.grace = Duration::from_secs(30);
    let sup = supervisor(vec![spec]);
    let mut status_rx = sup.subscribe_status();

    sup.start_all(&targets(&["db"])).await.unwrap();
    await_status(&mut status_rx, "db", ServiceStatus::Running).await;

    // The line that fired readiness is observable at that point.
    let combined = sup.output_lines("db", LogChannel::Combined, None);
    assert!(combined.iter().any(|l| l.contains("listening on 5432")));

    sup.stop_all().await;
}

#[tokio::test]
async fn ready_predicate_matches_through_ansi_color() {
    let mut spec = shell("db", "printf '\\033[32mready to accept\\033[0m\\n'; sleep 5");
    spec.ready_when = Some(Regex::new("ready to accept").unwrap());
    let sup = supervisor(vec![spec]);
    let mut status_rx = sup.subscribe_status();

    sup.start_all(&targets(&["db"])).await.unwrap();
    await_status(&mut status_rx, "db", ServiceStatus::Running).await;

    sup.stop_all().await;
}

#[tokio::test]
async fn unmatched_predicate_stays_starting() {
    let mut spec = shell("db", "echo nope; sleep 5");
    spec.ready_when = Some(Regex::new("never matches").unwrap());
    let sup = supervisor(vec![spec]);
    let mut status_rx = sup.subscribe_status();

    sup.start_all(&targets(&["db"])).await.unwrap();
    assert_eq!(next_status(&mut status_rx, "db").await.status, ServiceStatus::Starting);
    assert_no_status(&mut status_rx, "db", Duration::from_millis(400)).await;
    assert_eq!(sup.get("db").unwrap().status, ServiceStatus::Starting);

    sup.stop_all().await;
}

#[tokio::test]
async fn nonzero_exit_is_error_with_code() {
    let sup = supervisor(vec![shell("api", "exit 3")]);
    let mut status_rx = sup.subscribe_status();

    sup.start_all(&targets(&["api"])).await.unwrap();
    assert_eq!(next_status(&mut status_rx, "api").await.status, ServiceStatus::Starting);
    let ev = next_status(&mut status_rx, "api").await;
    assert_eq!(ev.status, ServiceStatus::Error);
    assert_eq!(ev.error.as_deref(), Some("Exited with code 3"));

    let view = sup.get("api").unwrap();
    assert_eq!(view.error.as_deref(), Some("Exited with code 3"));
    assert!(view.pid.is_none());
}

#[tokio::test]
async fn zero_exit_is_stopped() {
    let sup = supervisor(vec![shell("task", "true")]);
    let mut status_rx = sup.subscribe_status();

    sup.start_all(&targets(&["task"])).await.unwrap();
    assert_eq!(next_status(&mut status_rx, "task").await.status, ServiceStatus::Starting);
    assert_eq!(next_status(&mut status_rx, "task").await.status, ServiceStatus::Stopped);
}

#[tokio::test]
async fn spawn_failure_is_error() {
    let mut spec = shell("api", "echo unreachable");
    spec.cwd = Some("/definitely/not/a/real/directory".into());
    let sup = supervisor(vec![spec]);
    let mut status_rx = sup.subscribe_status();

    sup.start_all(&targets(&["api"])).await.unwrap();
    let ev = await_status(&mut status_rx, "api", ServiceStatus::Error).await;
    assert!(ev.error.is_some());
}

#[tokio::test]
async fn stop_terminates_whole_group() {
    let sup = supervisor(vec![shell("fan", "sleep 30 & sleep 30 & wait")]);
    let mut status_rx = sup.subscribe_status();

    sup.start_all(&targets(&["fan"])).await.unwrap();
    await_status(&mut status_rx, "fan", ServiceStatus::Running).await;
    let pgid = sup.get("fan").unwrap().pid.unwrap();

    sup.stop("fan").await.unwrap();
    assert_eq!(sup.get("fan").unwrap().status, ServiceStatus::Stopped);

    // The whole group is gone, including the backgrounded sleeps.
    // Allow a beat for the kernel to reap.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let probe = killpg(Pid::from_raw(pgid as i32), None::<Signal>);
    assert!(probe.is_err(), "process group {pgid} still alive");
}

#[tokio::test]
async fn stop_keeps_buffers() {
    let sup = supervisor(vec![shell("api", "echo kept; sleep 5")]);
    let mut status_rx = sup.subscribe_status();

    sup.start_all(&targets(&["api"])).await.unwrap();
    await_status(&mut status_rx, "api", ServiceStatus::Running).await;
    let before = sup.output_lines("api", LogChannel::Combined, None);

    sup.stop("api").await.unwrap();
    assert_eq!(sup.output_lines("api", LogChannel::Combined, None), before);
}

#[tokio::test]
async fn stop_on_stopped_service_is_noop() {
    let sup = supervisor(vec![shell("api", "sleep 5")]);
    let mut status_rx = sup.subscribe_status();

    sup.stop("api").await.unwrap();
    assert_no_status(&mut status_rx, "api", Duration::from_millis(200)).await;
    assert_eq!(sup.get("api").unwrap().status, ServiceStatus::Stopped);
}

#[tokio::test]
async fn start_on_running_service_is_noop() {
    let sup = supervisor(vec![shell("api", "sleep 5")]);
    let mut status_rx = sup.subscribe_status();

    sup.start_all(&targets(&["api"])).await.unwrap();
    await_status(&mut status_rx, "api", ServiceStatus::Running).await;
    let pid = sup.get("api").unwrap().pid;

    sup.start("api").await.unwrap();
    assert_no_status(&mut status_rx, "api", Duration::from_millis(300)).await;
    assert_eq!(sup.get("api").unwrap().pid, pid);

    sup.stop_all().await;
}

#[tokio::test]
async fn restart_gives_a_fresh_epoch() {
    let sup = supervisor(vec![shell("api", "echo once; sleep 5")]);
    let mut status_rx = sup.subscribe_status();

    sup.start_all(&targets(&["api"])).await.unwrap();
    await_status(&mut status_rx, "api", ServiceStatus::Running).await;
    let first = sup.get("api").unwrap();
    assert_eq!(sup.output_lines("api", LogChannel::Combined, None), vec!["once"]);

    sup.restart("api").await.unwrap();
    await_status(&mut status_rx, "api", ServiceStatus::Running).await;

    let second = sup.get("api").unwrap();
    assert!(second.error.is_none());
    assert_ne!(first.pid, second.pid);
    // Buffers were cleared and repopulated by the new child.
    assert_eq!(sup.output_lines("api", LogChannel::Combined, None), vec!["once"]);
    assert_eq!(sup.output_len("api", LogChannel::Combined), 1);

    sup.stop_all().await;
}

#[tokio::test]
async fn definition_env_and_force_color_reach_the_child() {
    let mut spec = shell("api", "echo \"$GREETING/$FORCE_COLOR\"; sleep 5");
    spec.env.insert("GREETING".to_string(), "hello".to_string());
    let sup = supervisor(vec![spec]);
    let mut status_rx = sup.subscribe_status();

    sup.start_all(&targets(&["api"])).await.unwrap();
    await_status(&mut status_rx, "api", ServiceStatus::Running).await;
    assert_eq!(sup.output_lines("api", LogChannel::Combined, None), vec!["hello/1"]);

    sup.stop_all().await;
}

#[tokio::test]
async fn services_start_hidden_and_unhide_on_first_start() {
    let sup = supervisor(vec![shell("api", "sleep 5"), shell("db", "sleep 5")]);
    assert_eq!(sup.hidden_services().len(), 2);
    assert!(sup.visible_services().is_empty());

    let mut hidden_rx = sup.subscribe_hidden();
    let mut status_rx = sup.subscribe_status();
    sup.start_all(&targets(&["api"])).await.unwrap();
    await_status(&mut status_rx, "api", ServiceStatus::Running).await;

    let ev = timeout(EVENT_WAIT, hidden_rx.recv()).await.unwrap().unwrap();
    assert_eq!((ev.id.as_str(), ev.hidden), ("api", false));

    assert_eq!(sup.visible_services().len(), 1);
    assert_eq!(sup.hidden_services().len(), 1);
    // Stopping does not re-hide.
    sup.stop_all().await;
    assert_eq!(sup.visible_services().len(), 1);
}
