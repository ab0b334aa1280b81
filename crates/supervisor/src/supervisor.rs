// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The supervisor facade.
//!
//! Owns the shared state, installs the recovery watcher and optional
//! state exporter at construction, and exposes the control surface
//! (start/stop/restart, suspending) plus the read APIs (snapshots,
//! non-suspending) that UIs combine with bus subscriptions.

use crate::bus::EventBus;
use crate::error::SupervisorError;
use crate::export::{spawn_exporter, ExporterConfig, ExporterHandle};
use crate::process;
use crate::scheduler;
use crate::spec::RunnableSpec;
use crate::state::{Inner, ServiceCell, ServiceView};
use indexmap::IndexMap;
use parking_lot::Mutex;
use rig_core::{
    HiddenChange, LogChannel, LogStore, OutputLine, StatusChange, DEFAULT_MAX_OUTPUT_LINES,
};
use rig_manifest::{Manifest, ManifestError};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinSet;

/// Construction-time configuration.
pub struct SupervisorConfig {
    pub specs: Vec<RunnableSpec>,
    /// Workspace default env, below each definition's env.
    pub defaults_env: IndexMap<String, String>,
    /// Per-buffer output line cap.
    pub max_output_lines: usize,
    /// When set, a state exporter is attached at init.
    pub exporter: Option<ExporterConfig>,
}

impl SupervisorConfig {
    pub fn new(specs: Vec<RunnableSpec>) -> Self {
        Self {
            specs,
            defaults_env: IndexMap::new(),
            max_output_lines: DEFAULT_MAX_OUTPUT_LINES,
            exporter: None,
        }
    }

    /// Everything the manifest declares: specs in declaration order,
    /// default env, output cap.
    pub fn from_manifest(manifest: &Manifest) -> Result<Self, ManifestError> {
        Ok(Self {
            specs: RunnableSpec::from_manifest(manifest)?,
            defaults_env: manifest.defaults.env.clone(),
            max_output_lines: manifest.defaults.max_output_lines(),
            exporter: None,
        })
    }

    pub fn with_exporter(mut self, exporter: ExporterConfig) -> Self {
        self.exporter = Some(exporter);
        self
    }
}

/// The runnable supervisor. Construction is `Init`: every declared
/// service gets an instance (`stopped`, hidden), the recovery watcher is
/// installed, and the exporter (if configured) starts listening.
///
/// Must be created inside a tokio runtime; the watcher and exporter are
/// spawned tasks.
pub struct Supervisor {
    inner: Arc<Inner>,
    exporter: Mutex<Option<ExporterHandle>>,
}

impl Supervisor {
    pub fn new(config: SupervisorConfig) -> Self {
        let specs: IndexMap<String, RunnableSpec> =
            config.specs.into_iter().map(|spec| (spec.id.clone(), spec)).collect();
        let state: HashMap<String, ServiceCell> =
            specs.keys().map(|id| (id.clone(), ServiceCell::default())).collect();
        let inner = Arc::new(Inner {
            specs,
            defaults_env: config.defaults_env,
            state: Mutex::new(state),
            logs: LogStore::new(config.max_output_lines),
            bus: EventBus::new(),
            runtime_env: Mutex::new(HashMap::new()),
        });
        scheduler::install_recovery_watcher(&inner);
        let exporter = config.exporter.map(|cfg| spawn_exporter(&inner, cfg));
        Self { inner, exporter: Mutex::new(exporter) }
    }

    // -- bus --

    pub fn subscribe_status(&self) -> broadcast::Receiver<StatusChange> {
        self.inner.bus.subscribe_status()
    }

    pub fn subscribe_output(&self) -> broadcast::Receiver<OutputLine> {
        self.inner.bus.subscribe_output()
    }

    pub fn subscribe_hidden(&self) -> broadcast::Receiver<HiddenChange> {
        self.inner.bus.subscribe_hidden()
    }

    // -- control surface (suspending) --

    /// Start the given targets plus their dependency closure, in
    /// dependency order. Validation failures (dangling dep, cycle) are
    /// fatal and nothing is spawned.
    pub async fn start_all(&self, targets: &[String]) -> Result<(), SupervisorError> {
        scheduler::start_all(&self.inner, targets).await
    }

    /// Start one service through the gated path: waits for its declared
    /// dependencies to be `running` (without starting them) and then
    /// spawns. No-op when already starting or running.
    pub async fn start(&self, id: &str) -> Result<(), SupervisorError> {
        self.known(id)?;
        scheduler::gated_start(&self.inner, id).await;
        Ok(())
    }

    /// Unhide `id` and its dependency closure, then start whichever
    /// members are not already engaged.
    pub async fn start_with_dependencies(&self, id: &str) -> Result<(), SupervisorError> {
        scheduler::start_with_dependencies(&self.inner, id).await
    }

    /// SIGTERM the service's process group, SIGKILL after 5s. No-op for
    /// services that are not live.
    pub async fn stop(&self, id: &str) -> Result<(), SupervisorError> {
        self.known(id)?;
        process::stop_service(&self.inner, id).await;
        Ok(())
    }

    /// Stop then start, this service only; dependents are not restarted.
    pub async fn restart(&self, id: &str) -> Result<(), SupervisorError> {
        self.stop(id).await?;
        self.start(id).await
    }

    /// Stop every live service concurrently.
    pub async fn stop_all(&self) {
        let live: Vec<String> = self
            .inner
            .views()
            .into_iter()
            .filter(|view| view.status.is_live())
            .map(|view| view.id)
            .collect();
        let mut stops = JoinSet::new();
        for id in live {
            let inner = Arc::clone(&self.inner);
            stops.spawn(async move {
                process::stop_service(&inner, &id).await;
            });
        }
        while stops.join_next().await.is_some() {}
    }

    /// Stop everything and retire the state file.
    pub async fn shutdown(&self) {
        self.stop_all().await;
        if let Some(exporter) = self.exporter.lock().take() {
            exporter.shutdown();
        }
    }

    // -- read APIs (non-suspending) --

    pub fn get(&self, id: &str) -> Option<ServiceView> {
        self.inner.view(id)
    }

    /// All services in declaration order.
    pub fn get_all(&self) -> Vec<ServiceView> {
        self.inner.views()
    }

    /// Stored output for a service; `limit` selects the most recent
    /// lines.
    pub fn output_lines(&self, id: &str, channel: LogChannel, limit: Option<usize>) -> Vec<String> {
        match limit {
            Some(n) => self.inner.logs.tail(id, channel, n),
            None => self.inner.logs.lines(id, channel),
        }
    }

    pub fn output_len(&self, id: &str, channel: LogChannel) -> usize {
        self.inner.logs.len(id, channel)
    }

    pub fn hidden_services(&self) -> Vec<ServiceView> {
        self.inner.views().into_iter().filter(|view| view.hidden).collect()
    }

    pub fn visible_services(&self) -> Vec<ServiceView> {
        self.inner.views().into_iter().filter(|view| !view.hidden).collect()
    }

    /// Path of the state file, when an exporter is attached.
    pub fn state_file(&self) -> Option<PathBuf> {
        self.exporter.lock().as_ref().map(|handle| handle.path().to_path_buf())
    }

    fn known(&self, id: &str) -> Result<(), SupervisorError> {
        if self.inner.specs.contains_key(id) {
            Ok(())
        } else {
            Err(SupervisorError::UnknownRunnable { id: id.to_string() })
        }
    }
}

#[cfg(test)]
#[path = "supervisor_tests/mod.rs"]
mod tests;
