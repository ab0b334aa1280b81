// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rig_core::CommandStatus;
use tokio::time::timeout;

const EVENT_WAIT: Duration = Duration::from_secs(10);

async fn wait_for_exit_event(rx: &mut broadcast::Receiver<CommandEvent>) -> (Option<i32>, Option<i32>) {
    loop {
        let ev = timeout(EVENT_WAIT, rx.recv())
            .await
            .expect("timed out waiting for command event")
            .expect("command channel closed");
        if let CommandEvent::Exit { code, signal } = ev {
            return (code, signal);
        }
    }
}

#[tokio::test]
async fn successful_command_streams_and_classifies() {
    let runner = CommandRunner::new(100);
    assert_eq!(runner.status(), CommandStatus::Idle);

    let mut rx = runner.subscribe();
    runner.run(RunRequest::new("echo one; echo two")).await;

    let (code, signal) = wait_for_exit_event(&mut rx).await;
    assert_eq!(code, Some(0));
    assert_eq!(signal, None);
    assert_eq!(runner.status(), CommandStatus::Success);
    assert_eq!(runner.exit_code(), Some(0));
    assert_eq!(runner.output_lines(), vec!["one", "two"]);
    assert!(runner.duration_ms().is_some());
}

#[tokio::test]
async fn failing_command_is_error() {
    let runner = CommandRunner::new(100);
    let mut rx = runner.subscribe();
    runner.run(RunRequest::new("exit 7")).await;

    let (code, _) = wait_for_exit_event(&mut rx).await;
    assert_eq!(code, Some(7));
    assert_eq!(runner.status(), CommandStatus::Error);
    assert_eq!(runner.exit_code(), Some(7));
}

#[tokio::test]
async fn env_and_cwd_are_applied() {
    let temp = tempfile::tempdir().unwrap();
    let mut request = RunRequest::new("echo \"$MARK:$(pwd)\"");
    request.cwd = Some(temp.path().to_path_buf());
    request.env.insert("MARK".to_string(), "x".to_string());

    let runner = CommandRunner::new(100);
    let mut rx = runner.subscribe();
    runner.run(request).await;
    wait_for_exit_event(&mut rx).await;

    let lines = runner.output_lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("x:"));
    assert!(lines[0].contains(&*temp.path().to_string_lossy()));
}

#[tokio::test]
async fn output_is_capped() {
    let runner = CommandRunner::new(5);
    let mut rx = runner.subscribe();
    runner.run(RunRequest::new("i=0; while [ $i -lt 50 ]; do echo line $i; i=$((i+1)); done")).await;
    wait_for_exit_event(&mut rx).await;

    let lines = runner.output_lines();
    assert_eq!(lines.len(), 5);
    assert_eq!(lines.last().map(String::as_str), Some("line 49"));
}

#[tokio::test]
async fn cancel_kills_the_group() {
    let runner = CommandRunner::new(100);
    let mut rx = runner.subscribe();
    runner.run(RunRequest::new("sleep 30 & sleep 30 & wait")).await;
    assert_eq!(runner.status(), CommandStatus::Running);

    runner.cancel().await;
    assert_eq!(runner.status(), CommandStatus::Error);

    let (code, signal) = wait_for_exit_event(&mut rx).await;
    assert_eq!(code, None);
    assert!(signal.is_some());
}

#[tokio::test]
async fn cancel_is_idempotent_and_safe_when_idle() {
    let runner = CommandRunner::new(100);
    runner.cancel().await;

    let mut rx = runner.subscribe();
    runner.run(RunRequest::new("sleep 30")).await;
    runner.cancel().await;
    runner.cancel().await;
    wait_for_exit_event(&mut rx).await;
    assert_eq!(runner.status(), CommandStatus::Error);
}

#[tokio::test]
async fn reset_returns_to_idle() {
    let runner = CommandRunner::new(100);
    let mut rx = runner.subscribe();
    runner.run(RunRequest::new("echo done")).await;
    wait_for_exit_event(&mut rx).await;

    runner.reset().await;
    assert_eq!(runner.status(), CommandStatus::Idle);
    assert!(runner.output_lines().is_empty());
    assert!(runner.exit_code().is_none());
    assert!(runner.started_at().is_none());
}

#[tokio::test]
async fn run_cancels_a_still_running_predecessor() {
    let runner = CommandRunner::new(100);
    runner.run(RunRequest::new("sleep 30")).await;
    assert_eq!(runner.status(), CommandStatus::Running);

    // The old command's exit event also lands on the channel, so poll
    // the runner state instead of counting events.
    runner.run(RunRequest::new("echo fresh")).await;
    poll_status(&runner, CommandStatus::Success).await;
    assert_eq!(runner.output_lines(), vec!["fresh"]);
}

/// Poll until the runner reaches `wanted`.
async fn poll_status(runner: &CommandRunner, wanted: CommandStatus) {
    let deadline = tokio::time::Instant::now() + EVENT_WAIT;
    while runner.status() != wanted {
        assert!(
            tokio::time::Instant::now() < deadline,
            "runner stuck in {:?}, wanted {wanted:?}",
            runner.status()
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn spawn_failure_is_error() {
    let mut request = RunRequest::new("echo unreachable");
    request.cwd = Some("/definitely/not/a/real/directory".into());

    let runner = CommandRunner::new(100);
    let mut rx = runner.subscribe();
    runner.run(request).await;

    let (code, signal) = wait_for_exit_event(&mut rx).await;
    assert_eq!((code, signal), (None, None));
    assert_eq!(runner.status(), CommandStatus::Error);
}

#[tokio::test]
async fn minimize_swaps_listeners_without_disturbing_the_process() {
    let runner = CommandRunner::new(1000);
    let mut foreground_rx = runner.subscribe();
    runner
        .run(RunRequest::new(
            "i=0; while [ $i -lt 20 ]; do echo line $i; i=$((i+1)); sleep 0.05; done",
        ))
        .await;

    // Foreground observes the early output.
    let first = timeout(EVENT_WAIT, foreground_rx.recv()).await.unwrap().unwrap();
    assert!(matches!(first, CommandEvent::Output { .. }));

    // Minimize: detach the foreground listener, hand off.
    drop(foreground_rx);
    let background = BackgroundCommands::new();
    let id = background.adopt(runner.clone(), "counter");

    // The background listener keeps the entry current through to exit.
    let deadline = tokio::time::Instant::now() + EVENT_WAIT;
    loop {
        let view = background.get(&id).expect("entry exists");
        if view.status == CommandStatus::Success {
            assert_eq!(view.exit_code, Some(0));
            assert!(view.finished_at.is_some());
            assert!(!view.tail.is_empty());
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "command never finished");
        tokio::time::sleep(Duration::from_millis(25)).await;
    }

    assert_eq!(background.list().len(), 1);
    assert!(background.remove(&id));
    assert!(background.get(&id).is_none());
}

#[tokio::test]
async fn background_cancel_still_works_after_handoff() {
    let runner = CommandRunner::new(100);
    runner.run(RunRequest::new("sleep 30")).await;

    let background = BackgroundCommands::new();
    let id = background.adopt(runner, "sleeper");

    assert!(background.cancel(&id).await);
    assert_eq!(background.get(&id).expect("entry exists").status, CommandStatus::Error);

    // The background listener records completion; it runs a hair behind
    // the status flip.
    let deadline = tokio::time::Instant::now() + EVENT_WAIT;
    while background.get(&id).and_then(|view| view.finished_at).is_none() {
        assert!(tokio::time::Instant::now() < deadline, "finish never recorded");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert!(!background.cancel("no-such-id").await);
}
