// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State exporter: a JSON snapshot for external inspectors.
//!
//! An opt-in bus subscriber that materializes status plus a log tail to
//! a deterministic per-project file on every status change. Output
//! events never trigger a write. The file is deleted on supervisor
//! shutdown; readers treat a dead `pid` as a stale file and delete it
//! themselves.

use crate::state::Inner;
use chrono::Utc;
use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use rig_core::{LogChannel, ServiceStatus};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Combined-buffer lines included per service.
const STATE_LOG_LINES: usize = 100;

/// Hex chars of the project-root digest used in the filename. External
/// readers rely on this staying put.
const STATE_NAME_LEN: usize = 12;

/// Where and for which project the exporter writes.
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    pub state_dir: PathBuf,
    pub config_path: PathBuf,
    pub project_root: PathBuf,
}

/// The exported document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateFile {
    /// Supervisor pid; readers probe it to detect staleness.
    pub pid: u32,
    pub config_path: PathBuf,
    pub project_root: PathBuf,
    /// ISO-8601.
    pub updated_at: String,
    pub services: BTreeMap<String, ServiceEntry>,
    /// Most recent combined lines per service, from the log store.
    pub logs: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceEntry {
    pub status: ServiceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<u64>,
}

impl StateFile {
    /// A file whose writer is no longer alive.
    pub fn is_stale(&self) -> bool {
        !pid_alive(self.pid)
    }
}

/// Deterministic state-file name for a project root. External readers
/// derive it knowing only the root path.
pub fn state_file_name(project_root: &Path) -> String {
    let digest = Sha256::digest(project_root.to_string_lossy().as_bytes());
    let hex: String = digest.iter().map(|byte| format!("{byte:02x}")).collect();
    format!("{}.json", &hex[..STATE_NAME_LEN])
}

pub fn state_file_path(state_dir: &Path, project_root: &Path) -> PathBuf {
    state_dir.join(state_file_name(project_root))
}

/// OS state directory for rig (`~/.local/state/rig` or platform
/// equivalent).
pub fn default_state_dir() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .map(|dir| dir.join("rig"))
        .unwrap_or_else(|| PathBuf::from(".rig-state"))
}

/// Parse a state file from disk.
pub fn read_state_file(path: &Path) -> std::io::Result<StateFile> {
    let content = std::fs::read(path)?;
    serde_json::from_slice(&content).map_err(std::io::Error::other)
}

/// Zero-signal liveness probe. EPERM means the pid exists but belongs
/// to someone else; that still counts as alive.
pub fn pid_alive(pid: u32) -> bool {
    match kill(Pid::from_raw(pid as i32), None::<Signal>) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

/// Handle owned by the supervisor; deletes the file on shutdown.
pub(crate) struct ExporterHandle {
    path: PathBuf,
    cancel: CancellationToken,
}

impl ExporterHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to remove state file");
            }
        }
    }
}

/// Subscribe to status changes and rewrite the snapshot on each one.
pub(crate) fn spawn_exporter(inner: &Arc<Inner>, config: ExporterConfig) -> ExporterHandle {
    let path = state_file_path(&config.state_dir, &config.project_root);
    let cancel = CancellationToken::new();
    let weak = Arc::downgrade(inner);
    let mut rx = inner.bus.subscribe_status();
    let task_cancel = cancel.clone();
    let task_path = path.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = task_cancel.cancelled() => break,
                ev = rx.recv() => match ev {
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {
                        let Some(inner) = weak.upgrade() else {
                            break;
                        };
                        write_snapshot(&inner, &config, &task_path);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    });
    ExporterHandle { path, cancel }
}

/// Write errors are logged and ignored; supervision continues.
fn write_snapshot(inner: &Arc<Inner>, config: &ExporterConfig, path: &Path) {
    let mut services = BTreeMap::new();
    let mut logs = BTreeMap::new();
    for view in inner.views() {
        logs.insert(
            view.id.clone(),
            inner.logs.tail(&view.id, LogChannel::Combined, STATE_LOG_LINES),
        );
        services.insert(
            view.id,
            ServiceEntry { status: view.status, error: view.error, started_at: view.started_at },
        );
    }
    let snapshot = StateFile {
        pid: std::process::id(),
        config_path: config.config_path.clone(),
        project_root: config.project_root.clone(),
        updated_at: Utc::now().to_rfc3339(),
        services,
        logs,
    };
    if let Err(e) = write_json(path, &snapshot) {
        tracing::warn!(path = %path.display(), error = %e, "failed to write state file");
    }
}

fn write_json(path: &Path, snapshot: &StateFile) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let body = serde_json::to_vec_pretty(snapshot).map_err(std::io::Error::other)?;
    std::fs::write(path, body)
}

#[cfg(test)]
#[path = "export_tests.rs"]
mod tests;
