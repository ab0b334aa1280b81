// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared supervisor state: per-service mutable cells and read snapshots.
//!
//! Status and hidden transitions are applied and published under the
//! same lock, so `status-change` events observe transition order per id.

use crate::bus::EventBus;
use crate::spec::RunnableSpec;
use indexmap::IndexMap;
use parking_lot::Mutex;
use rig_core::{HiddenChange, LogStore, ServiceStatus};
use serde::Serialize;
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio_util::sync::CancellationToken;

/// Mutable record for one service, keyed by id in [`Inner::state`].
#[derive(Debug)]
pub(crate) struct ServiceCell {
    pub status: ServiceStatus,
    /// True until the service is first explicitly started.
    pub hidden: bool,
    /// Process-group leader pid while a child is live.
    pub pid: Option<u32>,
    /// Wall-clock epoch millis of the last spawn.
    pub started_at: Option<u64>,
    /// Present iff `status` is `error`.
    pub error: Option<String>,
    /// Dependencies gating a `waiting` service. Retained across a dep
    /// failure so UIs can explain the wait.
    pub waiting_for: Vec<String>,
    /// Incremented on every start; stale async work compares its epoch
    /// before touching the cell.
    pub epoch: u64,
    pub on_ready_called: bool,
    /// Set by the stop path so the exit watcher classifies the exit as
    /// `stopped` rather than `error`.
    pub stopping: bool,
    /// Cancels this epoch's grace timer when the child exits or stops.
    pub cancel: CancellationToken,
}

impl Default for ServiceCell {
    fn default() -> Self {
        Self {
            status: ServiceStatus::Stopped,
            hidden: true,
            pid: None,
            started_at: None,
            error: None,
            waiting_for: Vec::new(),
            epoch: 0,
            on_ready_called: false,
            stopping: false,
            cancel: CancellationToken::new(),
        }
    }
}

/// Immutable status snapshot handed to read-API callers.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceView {
    pub id: String,
    pub name: String,
    pub status: ServiceStatus,
    pub hidden: bool,
    pub pid: Option<u32>,
    pub started_at: Option<u64>,
    pub error: Option<String>,
    pub waiting_for: Vec<String>,
}

/// State shared by the facade, the scheduler, and per-child tasks.
pub(crate) struct Inner {
    /// Immutable definitions, in manifest declaration order.
    pub specs: IndexMap<String, RunnableSpec>,
    /// Workspace default env, below each definition's env.
    pub defaults_env: IndexMap<String, String>,
    pub state: Mutex<HashMap<String, ServiceCell>>,
    pub logs: LogStore,
    pub bus: EventBus,
    /// Runtime env published by each service's `on_ready`, consumed by
    /// dependents at spawn time.
    pub runtime_env: Mutex<HashMap<String, IndexMap<String, String>>>,
}

impl Inner {
    /// Run a closure over the cell for `id`. Returns `None` for ids the
    /// supervisor does not manage.
    pub fn with_cell<T>(&self, id: &str, f: impl FnOnce(&mut ServiceCell) -> T) -> Option<T> {
        let mut state = self.state.lock();
        state.get_mut(id).map(f)
    }

    pub fn status_of(&self, id: &str) -> Option<ServiceStatus> {
        self.state.lock().get(id).map(|cell| cell.status)
    }

    /// Flip the hidden flag, publishing only on actual change.
    pub fn set_hidden(&self, id: &str, hidden: bool) {
        let mut state = self.state.lock();
        let Some(cell) = state.get_mut(id) else {
            return;
        };
        if cell.hidden != hidden {
            cell.hidden = hidden;
            self.bus.emit_hidden(HiddenChange { id: id.to_string(), hidden });
        }
    }

    pub fn view(&self, id: &str) -> Option<ServiceView> {
        let spec = self.specs.get(id)?;
        let state = self.state.lock();
        let cell = state.get(id)?;
        Some(ServiceView {
            id: id.to_string(),
            name: spec.name.clone(),
            status: cell.status,
            hidden: cell.hidden,
            pid: cell.pid,
            started_at: cell.started_at,
            error: cell.error.clone(),
            waiting_for: cell.waiting_for.clone(),
        })
    }

    /// All services, in manifest declaration order.
    pub fn views(&self) -> Vec<ServiceView> {
        self.specs.keys().filter_map(|id| self.view(id)).collect()
    }
}

/// Wall clock as epoch milliseconds.
pub(crate) fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
