// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ephemeral one-shot command execution.
//!
//! A [`CommandRunner`] launches ad-hoc commands under the same shell and
//! process-group discipline as supervised services, streams output over
//! its own broadcast channel, and supports cancellation with a shorter
//! escalation window. "Minimizing" a foreground command is a listener
//! swap: the UI hands the runner to [`BackgroundCommands`], which
//! attaches its own listeners; no process state is disturbed.

use crate::process::signal_group;
use crate::state::epoch_millis;
use indexmap::IndexMap;
use nix::sys::signal::Signal;
use parking_lot::Mutex;
use rig_core::{CommandStatus, RingBuffer};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::broadcast;

/// SIGTERM → SIGKILL escalation window for cancellation.
const CANCEL_GRACE: Duration = Duration::from_secs(2);

/// Output lines shown in background entry views.
const BACKGROUND_TAIL_LINES: usize = 10;

const EVENT_CAPACITY: usize = 1024;

/// Events published by one runner.
#[derive(Debug, Clone)]
pub enum CommandEvent {
    Output { line: String },
    Exit { code: Option<i32>, signal: Option<i32> },
}

/// What to run.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub command: String,
    pub cwd: Option<PathBuf>,
    pub env: IndexMap<String, String>,
}

impl RunRequest {
    pub fn new(command: impl Into<String>) -> Self {
        Self { command: command.into(), ..Default::default() }
    }
}

#[derive(Debug)]
struct RunnerState {
    status: CommandStatus,
    exit_code: Option<i32>,
    pid: Option<u32>,
    started_at: Option<u64>,
    duration_ms: Option<u64>,
    epoch: u64,
}

struct RunnerInner {
    id: String,
    output: Mutex<RingBuffer<String>>,
    state: Mutex<RunnerState>,
    events: broadcast::Sender<CommandEvent>,
}

/// One-shot command runner. Cloning shares the underlying command; the
/// same contract holds in the foreground and after a background
/// hand-off.
#[derive(Clone)]
pub struct CommandRunner {
    inner: Arc<RunnerInner>,
}

impl CommandRunner {
    /// `max_output_lines` caps the output buffer, same default as
    /// supervised services.
    pub fn new(max_output_lines: usize) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(RunnerInner {
                id: uuid::Uuid::new_v4().to_string(),
                output: Mutex::new(RingBuffer::new(max_output_lines)),
                state: Mutex::new(RunnerState {
                    status: CommandStatus::Idle,
                    exit_code: None,
                    pid: None,
                    started_at: None,
                    duration_ms: None,
                    epoch: 0,
                }),
                events,
            }),
        }
    }

    /// Unique within the process lifetime.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn status(&self) -> CommandStatus {
        self.inner.state.lock().status
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.inner.state.lock().exit_code
    }

    pub fn started_at(&self) -> Option<u64> {
        self.inner.state.lock().started_at
    }

    pub fn duration_ms(&self) -> Option<u64> {
        self.inner.state.lock().duration_ms
    }

    pub fn output_lines(&self) -> Vec<String> {
        self.inner.output.lock().to_vec()
    }

    pub fn output_tail(&self, n: usize) -> Vec<String> {
        self.inner.output.lock().tail(n)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CommandEvent> {
        self.inner.events.subscribe()
    }

    /// Launch a command. A still-running previous command is cancelled
    /// first; the output buffer starts fresh.
    pub async fn run(&self, request: RunRequest) {
        self.cancel().await;

        let epoch = {
            let mut state = self.inner.state.lock();
            state.epoch += 1;
            state.exit_code = None;
            state.duration_ms = None;
            state.started_at = Some(epoch_millis());
            state.epoch
        };
        self.inner.output.lock().clear();

        let mut command = Command::new("sh");
        command
            .arg("-c")
            .arg(&request.command)
            .envs(request.env.iter())
            .env("FORCE_COLOR", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0);
        if let Some(cwd) = &request.cwd {
            command.current_dir(cwd);
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!(command = %request.command, error = %e, "spawn failed");
                let mut state = self.inner.state.lock();
                if state.epoch == epoch {
                    state.status = CommandStatus::Error;
                }
                let _ = self.inner.events.send(CommandEvent::Exit { code: None, signal: None });
                return;
            }
        };

        {
            let mut state = self.inner.state.lock();
            state.status = CommandStatus::Running;
            state.pid = child.id();
        }

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(read_stream(Arc::clone(&self.inner), epoch, stdout));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(read_stream(Arc::clone(&self.inner), epoch, stderr));
        }

        let waiter_inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let result = child.wait().await;
            let (code, signal) = match &result {
                Ok(exit) => {
                    use std::os::unix::process::ExitStatusExt;
                    (exit.code(), exit.signal())
                }
                Err(_) => (None, None),
            };
            {
                let mut state = waiter_inner.state.lock();
                if state.epoch != epoch {
                    return;
                }
                state.pid = None;
                state.exit_code = code;
                state.duration_ms =
                    state.started_at.map(|started| epoch_millis().saturating_sub(started));
                state.status = if code == Some(0) {
                    CommandStatus::Success
                } else {
                    CommandStatus::Error
                };
            }
            let _ = waiter_inner.events.send(CommandEvent::Exit { code, signal });
        });
    }

    /// Kill the running command: SIGTERM to the group, SIGKILL after
    /// [`CANCEL_GRACE`]. Safe to call repeatedly and when idle.
    pub async fn cancel(&self) {
        let pid = {
            let state = self.inner.state.lock();
            if state.status != CommandStatus::Running {
                return;
            }
            match state.pid {
                Some(pid) => pid,
                None => return,
            }
        };
        let mut rx = self.inner.events.subscribe();
        signal_group(pid, Signal::SIGTERM);
        if !self.wait_for_exit(&mut rx, CANCEL_GRACE).await {
            tracing::warn!(pid, "cancel timed out, escalating to SIGKILL");
            signal_group(pid, Signal::SIGKILL);
            self.wait_for_exit(&mut rx, CANCEL_GRACE).await;
        }
    }

    /// Clear output and return to `idle`. Cancels first when running.
    pub async fn reset(&self) {
        self.cancel().await;
        self.inner.output.lock().clear();
        let mut state = self.inner.state.lock();
        state.status = CommandStatus::Idle;
        state.exit_code = None;
        state.started_at = None;
        state.duration_ms = None;
    }

    async fn wait_for_exit(
        &self,
        rx: &mut broadcast::Receiver<CommandEvent>,
        limit: Duration,
    ) -> bool {
        let deadline = tokio::time::Instant::now() + limit;
        loop {
            if self.status() != CommandStatus::Running {
                return true;
            }
            match tokio::time::timeout_at(deadline, rx.recv()).await {
                Ok(Ok(CommandEvent::Exit { .. })) => return true,
                Ok(Ok(CommandEvent::Output { .. })) => {}
                Ok(Err(broadcast::error::RecvError::Lagged(_))) => continue,
                Ok(Err(broadcast::error::RecvError::Closed)) => return false,
                Err(_) => return false,
            }
        }
    }
}

async fn read_stream<R>(inner: Arc<RunnerInner>, epoch: u64, stream: R)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.is_empty() {
            continue;
        }
        if inner.state.lock().epoch != epoch {
            break;
        }
        inner.output.lock().push(line.clone());
        let _ = inner.events.send(CommandEvent::Output { line });
    }
}

/// Snapshot of one background entry.
#[derive(Debug, Clone)]
pub struct BackgroundView {
    pub id: String,
    pub command: String,
    pub status: CommandStatus,
    pub exit_code: Option<i32>,
    pub finished_at: Option<u64>,
    pub tail: Vec<String>,
}

struct BackgroundSlot {
    command: String,
    runner: CommandRunner,
    finished_at: Arc<Mutex<Option<u64>>>,
    watcher: tokio::task::JoinHandle<()>,
}

/// Minimized commands, keyed by a fresh id per hand-off. Holds its own
/// cancellation handle for each entry.
#[derive(Default)]
pub struct BackgroundCommands {
    entries: Mutex<IndexMap<String, BackgroundSlot>>,
}

impl BackgroundCommands {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take over a runner after the foreground UI detached its
    /// listeners. Attaches a background listener that keeps the entry
    /// current; the process itself is untouched.
    pub fn adopt(&self, runner: CommandRunner, command: impl Into<String>) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let finished_at = Arc::new(Mutex::new(None));

        let mut rx = runner.subscribe();
        let watcher_finished = Arc::clone(&finished_at);
        let watcher = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(CommandEvent::Exit { .. }) => {
                        *watcher_finished.lock() = Some(epoch_millis());
                        break;
                    }
                    Ok(CommandEvent::Output { .. }) => {}
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        let slot = BackgroundSlot { command: command.into(), runner, finished_at, watcher };
        // A command that already exited before adoption is finished now.
        if !matches!(slot.runner.status(), CommandStatus::Running | CommandStatus::Idle) {
            *slot.finished_at.lock() = Some(epoch_millis());
        }
        self.entries.lock().insert(id.clone(), slot);
        id
    }

    pub fn get(&self, id: &str) -> Option<BackgroundView> {
        self.entries.lock().get(id).map(|slot| view(id, slot))
    }

    /// All entries, oldest hand-off first.
    pub fn list(&self) -> Vec<BackgroundView> {
        self.entries.lock().iter().map(|(id, slot)| view(id, slot)).collect()
    }

    /// Cancel a background command. Returns false for unknown ids.
    pub async fn cancel(&self, id: &str) -> bool {
        let runner = {
            let entries = self.entries.lock();
            match entries.get(id) {
                Some(slot) => slot.runner.clone(),
                None => return false,
            }
        };
        runner.cancel().await;
        true
    }

    /// Drop an entry. The process, if still running, is not killed;
    /// callers cancel first when that is intended.
    pub fn remove(&self, id: &str) -> bool {
        match self.entries.lock().shift_remove(id) {
            Some(slot) => {
                slot.watcher.abort();
                true
            }
            None => false,
        }
    }
}

fn view(id: &str, slot: &BackgroundSlot) -> BackgroundView {
    BackgroundView {
        id: id.to_string(),
        command: slot.command.clone(),
        status: slot.runner.status(),
        exit_code: slot.runner.exit_code(),
        finished_at: *slot.finished_at.lock(),
        tail: slot.runner.output_tail(BACKGROUND_TAIL_LINES),
    }
}

#[cfg(test)]
#[path = "ephemeral_tests.rs"]
mod tests;
