// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-runnable process lifecycle.
//!
//! One child per start epoch: spawned under `sh -c` in its own process
//! group, stdout/stderr piped into the log store line by line, readiness
//! established either by the `ready_when` predicate or a grace timer,
//! exits classified against the stop protocol.

use crate::spec::EnvSink;
use crate::state::{epoch_millis, Inner};
use indexmap::IndexMap;
use nix::errno::Errno;
use nix::sys::signal::{kill, killpg, Signal};
use nix::unistd::Pid;
use rig_core::{strip_ansi, LogChannel, OutputLine, OutputStream, ServiceStatus, StatusChange};
use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// SIGTERM → SIGKILL escalation window for service stops.
pub(crate) const STOP_GRACE: Duration = Duration::from_secs(5);

/// How much combined tail the readiness predicate and `on_ready`
/// snapshot see.
const READY_SNAPSHOT_LINES: usize = 500;

/// Spawn a fresh epoch for `id`. No-op when the service is already
/// starting or running. Spawn failures surface as an `error` status
/// change, not as a return value.
pub(crate) async fn start_service(
    inner: &Arc<Inner>,
    id: &str,
    inherited: IndexMap<String, String>,
) {
    let Some(spec) = inner.specs.get(id) else {
        return;
    };

    // Epoch reset: cancel timers from the previous epoch, clear the
    // buffers, error, runtime env, and once-per-epoch marks, and claim
    // the `starting` state, all under one lock. A concurrent start
    // observes `starting` and backs off.
    let (epoch, cancel) = {
        let mut state = inner.state.lock();
        let Some(cell) = state.get_mut(id) else {
            return;
        };
        if cell.status.is_live() {
            return;
        }
        cell.cancel.cancel();
        cell.cancel = CancellationToken::new();
        cell.epoch += 1;
        cell.error = None;
        cell.on_ready_called = false;
        cell.stopping = false;
        cell.waiting_for.clear();
        cell.pid = None;
        cell.started_at = Some(epoch_millis());
        inner.logs.clear(id);
        inner.runtime_env.lock().remove(id);
        if cell.hidden {
            cell.hidden = false;
            inner.bus.emit_hidden(rig_core::HiddenChange { id: id.to_string(), hidden: false });
        }
        cell.status = ServiceStatus::Starting;
        inner.bus.emit_status(StatusChange {
            id: id.to_string(),
            status: ServiceStatus::Starting,
            error: None,
        });
        (cell.epoch, cell.cancel.clone())
    };
    tracing::debug!(id, epoch, command = %spec.command, "spawning service");

    let mut command = Command::new("sh");
    command.arg("-c").arg(&spec.command);
    if let Some(cwd) = &spec.cwd {
        command.current_dir(cwd);
    }
    // Env precedence, later wins: process env (inherited by default),
    // workspace defaults, definition env, runtime env from deps, then
    // the unconditional color override.
    command
        .envs(inner.defaults_env.iter())
        .envs(spec.env.iter())
        .envs(inherited.iter())
        .env("FORCE_COLOR", "1")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0);

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            transition_exited(inner, id, epoch, ServiceStatus::Error, Some(e.to_string()));
            return;
        }
    };

    let pid = child.id();
    inner.with_cell(id, |cell| {
        if cell.epoch == epoch {
            cell.pid = pid;
        }
    });

    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(read_stream(
            Arc::clone(inner),
            id.to_string(),
            epoch,
            stdout,
            OutputStream::Stdout,
        ));
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(read_stream(
            Arc::clone(inner),
            id.to_string(),
            epoch,
            stderr,
            OutputStream::Stderr,
        ));
    }

    if spec.ready_when.is_none() {
        let grace = spec.grace;
        let timer_inner = Arc::clone(inner);
        let timer_id = id.to_string();
        let timer_cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = timer_cancel.cancelled() => {}
                _ = tokio::time::sleep(grace) => {
                    fire_ready(&timer_inner, &timer_id, epoch).await;
                }
            }
        });
    }

    tokio::spawn(watch_exit(Arc::clone(inner), id.to_string(), epoch, child, cancel));
}

/// Stop a live service: SIGTERM to the group, SIGKILL after
/// [`STOP_GRACE`]. Resolution is the child's exit event; stopping a
/// non-running service is a no-op.
pub(crate) async fn stop_service(inner: &Arc<Inner>, id: &str) {
    // Subscribe before signaling so the exit event cannot be missed.
    let mut rx = inner.bus.subscribe_status();
    let pid = {
        let mut state = inner.state.lock();
        let Some(cell) = state.get_mut(id) else {
            return;
        };
        if !cell.status.is_live() {
            return;
        }
        let Some(pid) = cell.pid else {
            return;
        };
        cell.stopping = true;
        pid
    };

    signal_group(pid, Signal::SIGTERM);
    if !wait_for_exit(inner, &mut rx, id, STOP_GRACE).await {
        tracing::warn!(id, pid, "graceful stop timed out, escalating to SIGKILL");
        signal_group(pid, Signal::SIGKILL);
        wait_for_exit(inner, &mut rx, id, STOP_GRACE).await;
    }
}

/// Signal a process group, falling back to the leader pid when the
/// group signal fails. A vanished process is success.
pub(crate) fn signal_group(pid: u32, signal: Signal) {
    let target = Pid::from_raw(pid as i32);
    match killpg(target, signal) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(group_err) => {
            tracing::debug!(pid, %signal, error = %group_err, "killpg failed, signaling leader");
            match kill(target, signal) {
                Ok(()) | Err(Errno::ESRCH) => {}
                Err(e) => tracing::warn!(pid, %signal, error = %e, "failed to signal process"),
            }
        }
    }
}

/// Wait until `id` leaves its live state, up to `limit`.
async fn wait_for_exit(
    inner: &Arc<Inner>,
    rx: &mut broadcast::Receiver<StatusChange>,
    id: &str,
    limit: Duration,
) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    loop {
        if !matches!(inner.status_of(id), Some(status) if status.is_live()) {
            return true;
        }
        match tokio::time::timeout_at(deadline, rx.recv()).await {
            Ok(Ok(ev)) => {
                if ev.id == id && !ev.status.is_live() {
                    return true;
                }
            }
            Ok(Err(broadcast::error::RecvError::Lagged(_))) => continue,
            Ok(Err(broadcast::error::RecvError::Closed)) => return false,
            Err(_) => return false,
        }
    }
}

async fn read_stream<R>(inner: Arc<Inner>, id: String, epoch: u64, stream: R, tag: OutputStream)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.is_empty() {
                    continue;
                }
                // A restart cleared the buffers; drop stragglers from
                // the old pipe instead of polluting the new epoch.
                let current = inner.with_cell(&id, |cell| cell.epoch);
                if current != Some(epoch) {
                    break;
                }
                inner.logs.push(&id, &line, tag);
                inner.bus.emit_output(OutputLine {
                    id: id.clone(),
                    line: line.clone(),
                    stream: tag,
                });
                check_ready(&inner, &id, epoch).await;
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(id = %id, error = %e, "output reader error");
                break;
            }
        }
    }
}

/// Evaluate `ready_when` against the ANSI-stripped combined tail.
/// Runs on every appended line while the service is still starting.
async fn check_ready(inner: &Arc<Inner>, id: &str, epoch: u64) {
    let Some(spec) = inner.specs.get(id) else {
        return;
    };
    let Some(pattern) = &spec.ready_when else {
        return;
    };
    let pending = inner
        .with_cell(id, |cell| {
            cell.epoch == epoch
                && cell.status == ServiceStatus::Starting
                && !cell.on_ready_called
        })
        .unwrap_or(false);
    if !pending {
        return;
    }
    let tail = inner.logs.tail(id, LogChannel::Combined, READY_SNAPSHOT_LINES).join("\n");
    if pattern.is_match(&strip_ansi(&tail)) {
        fire_ready(inner, id, epoch).await;
    }
}

/// Establish readiness: run the `on_ready` hook (at most once per
/// epoch), publish its runtime env, then transition to `running`.
async fn fire_ready(inner: &Arc<Inner>, id: &str, epoch: u64) {
    // Claim the once-per-epoch slot before any await point.
    let claimed = inner
        .with_cell(id, |cell| {
            if cell.epoch == epoch
                && cell.status == ServiceStatus::Starting
                && !cell.on_ready_called
            {
                cell.on_ready_called = true;
                true
            } else {
                false
            }
        })
        .unwrap_or(false);
    if !claimed {
        return;
    }

    let Some(spec) = inner.specs.get(id) else {
        return;
    };
    if let Some(hook) = &spec.on_ready {
        let tail = inner.logs.tail(id, LogChannel::Combined, READY_SNAPSHOT_LINES).join("\n");
        let snapshot = strip_ansi(&tail);
        let mut sink = EnvSink::new();
        match hook.on_ready(&snapshot, &mut sink).await {
            Ok(()) => {
                if !sink.is_empty() {
                    inner.runtime_env.lock().insert(id.to_string(), sink.into_entries());
                }
            }
            // Best-effort: the runnable still becomes running.
            Err(e) => tracing::warn!(id, error = %e, "on_ready hook failed"),
        }
    }

    // The child may have exited while the hook ran; only a service
    // still in this epoch's `starting` state becomes `running`.
    let mut state = inner.state.lock();
    let Some(cell) = state.get_mut(id) else {
        return;
    };
    if cell.epoch == epoch && cell.status == ServiceStatus::Starting {
        cell.status = ServiceStatus::Running;
        cell.error = None;
        inner.bus.emit_status(StatusChange {
            id: id.to_string(),
            status: ServiceStatus::Running,
            error: None,
        });
    }
}

async fn watch_exit(
    inner: Arc<Inner>,
    id: String,
    epoch: u64,
    mut child: tokio::process::Child,
    cancel: CancellationToken,
) {
    let result = child.wait().await;
    cancel.cancel();

    let (status, error) = {
        let mut state = inner.state.lock();
        let Some(cell) = state.get_mut(&id) else {
            return;
        };
        if cell.epoch != epoch {
            return;
        }
        cell.pid = None;
        let (status, error) = match &result {
            Ok(exit) => classify_exit(*exit, cell.stopping),
            Err(e) => (ServiceStatus::Error, Some(e.to_string())),
        };
        cell.status = status;
        cell.error = error.clone();
        inner.bus.emit_status(StatusChange { id: id.clone(), status, error: error.clone() });
        (status, error)
    };
    tracing::debug!(id = %id, epoch, %status, error = ?error, "service exited");
}

/// Map an exit status to the service's terminal state.
///
/// Zero exits and the supervisor's own stop signals (SIGTERM, SIGINT)
/// are clean; while a stop is in flight every exit is clean, including
/// the SIGKILL escalation.
fn classify_exit(exit: ExitStatus, stopping: bool) -> (ServiceStatus, Option<String>) {
    if let Some(code) = exit.code() {
        return if code == 0 || stopping {
            (ServiceStatus::Stopped, None)
        } else {
            (ServiceStatus::Error, Some(format!("Exited with code {code}")))
        };
    }
    match exit.signal() {
        Some(_) if stopping => (ServiceStatus::Stopped, None),
        Some(sig) if sig == Signal::SIGTERM as i32 || sig == Signal::SIGINT as i32 => {
            (ServiceStatus::Stopped, None)
        }
        Some(sig) => (ServiceStatus::Error, Some(format!("Exited with signal {sig}"))),
        None => (ServiceStatus::Stopped, None),
    }
}

/// Publish a terminal transition for a child that never became live.
fn transition_exited(
    inner: &Arc<Inner>,
    id: &str,
    epoch: u64,
    status: ServiceStatus,
    error: Option<String>,
) {
    let mut state = inner.state.lock();
    let Some(cell) = state.get_mut(id) else {
        return;
    };
    if cell.epoch != epoch {
        return;
    }
    cell.pid = None;
    cell.status = status;
    cell.error = error.clone();
    inner.bus.emit_status(StatusChange { id: id.to_string(), status, error });
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
