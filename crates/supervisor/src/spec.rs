// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor-facing runnable definitions and readiness hooks.
//!
//! A [`RunnableSpec`] is the immutable definition the supervisor works
//! from: a shell command (containers were flattened by the manifest
//! layer), dependencies, a readiness predicate, and an optional
//! [`ReadyHook`]. Manifest-declared `on_ready.env` exports become an
//! [`EnvExportHook`]; library users can install arbitrary hooks.

use async_trait::async_trait;
use indexmap::IndexMap;
use regex::Regex;
use rig_manifest::{template, Manifest, ManifestError, RunnableDef};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Error surfaced by a [`ReadyHook`]. Hook failures are logged and the
/// runnable proceeds to `running` anyway; readiness is best-effort.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct HookError(pub String);

impl From<String> for HookError {
    fn from(message: String) -> Self {
        HookError(message)
    }
}

impl From<&str> for HookError {
    fn from(message: &str) -> Self {
        HookError(message.to_string())
    }
}

/// Sink for runtime env entries published during `on_ready`.
///
/// Entries land in the supervisor's runtime-env map for the runnable and
/// are inherited by dependents at their spawn time.
#[derive(Debug, Default)]
pub struct EnvSink {
    entries: IndexMap<String, String>,
}

impl EnvSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish one runtime env entry. Later writes win.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn into_entries(self) -> IndexMap<String, String> {
        self.entries
    }
}

/// Callback invoked exactly once per start epoch, after readiness is
/// established and before the `running` status is emitted.
#[async_trait]
pub trait ReadyHook: Send + Sync {
    /// `output` is the ANSI-stripped tail of the combined buffer at the
    /// moment readiness fired.
    async fn on_ready(&self, output: &str, env: &mut EnvSink) -> Result<(), HookError>;
}

/// The declarative hook: exports fixed env entries, with `${name}`
/// placeholders filled from the named captures of the runnable's
/// `ready_when` regex applied to the output snapshot.
pub struct EnvExportHook {
    exports: IndexMap<String, String>,
    pattern: Option<Regex>,
}

impl EnvExportHook {
    pub fn new(exports: IndexMap<String, String>, pattern: Option<Regex>) -> Self {
        Self { exports, pattern }
    }
}

#[async_trait]
impl ReadyHook for EnvExportHook {
    async fn on_ready(&self, output: &str, env: &mut EnvSink) -> Result<(), HookError> {
        let mut vars = HashMap::new();
        if let Some(pattern) = &self.pattern {
            // The last match carries the freshest values when the
            // pattern fired more than once in the snapshot.
            if let Some(caps) = pattern.captures_iter(output).last() {
                for name in pattern.capture_names().flatten() {
                    if let Some(value) = caps.name(name) {
                        vars.insert(name.to_string(), value.as_str().to_string());
                    }
                }
            }
        }
        for (key, value) in &self.exports {
            env.set(key.clone(), template::interpolate(value, &vars));
        }
        Ok(())
    }
}

/// Immutable definition of one supervised runnable.
#[derive(Clone)]
pub struct RunnableSpec {
    /// Stable key; also the log-store key.
    pub id: String,
    /// Display label; defaults to the id.
    pub name: String,
    /// Shell command executed via `sh -c`.
    pub command: String,
    pub cwd: Option<PathBuf>,
    /// Definition env, above the workspace defaults.
    pub env: IndexMap<String, String>,
    /// Ids that must be `running` before this one starts.
    pub depends_on: Vec<String>,
    /// Readiness predicate over the ANSI-stripped combined tail. When
    /// absent, readiness is the grace period.
    pub ready_when: Option<Regex>,
    /// Grace period for runnables without `ready_when`.
    pub grace: Duration,
    pub on_ready: Option<Arc<dyn ReadyHook>>,
}

impl std::fmt::Debug for RunnableSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunnableSpec")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("command", &self.command)
            .field("cwd", &self.cwd)
            .field("depends_on", &self.depends_on)
            .field("ready_when", &self.ready_when.as_ref().map(Regex::as_str))
            .field("grace", &self.grace)
            .field("on_ready", &self.on_ready.as_ref().map(|_| "<hook>"))
            .finish()
    }
}

impl RunnableSpec {
    /// Minimal spec for a plain shell command; used by tests and
    /// programmatic embedders.
    pub fn shell(id: impl Into<String>, command: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            command: command.into(),
            cwd: None,
            env: IndexMap::new(),
            depends_on: Vec::new(),
            ready_when: None,
            grace: Duration::from_millis(rig_core::DEFAULT_GRACE_MS),
            on_ready: None,
        }
    }

    /// Build a spec from a manifest definition. Container definitions
    /// are flattened to their `docker run` command here; declarative
    /// `on_ready.env` exports become an [`EnvExportHook`].
    pub fn from_def(id: &str, def: &RunnableDef) -> Result<Self, ManifestError> {
        let command = def.resolved_command(id)?;
        let ready_when = match &def.ready_when {
            Some(pattern) => Some(Regex::new(pattern).map_err(|e| {
                ManifestError::InvalidReadyWhen { id: id.to_string(), source: Box::new(e) }
            })?),
            None => None,
        };
        let on_ready: Option<Arc<dyn ReadyHook>> = match &def.on_ready {
            Some(on_ready) if !on_ready.env.is_empty() => Some(Arc::new(EnvExportHook::new(
                on_ready.env.clone(),
                ready_when.clone(),
            ))),
            _ => None,
        };
        Ok(Self {
            id: id.to_string(),
            name: def.display_name(id),
            command,
            cwd: def.cwd.clone(),
            env: def.env.clone(),
            depends_on: def.depends_on.clone(),
            ready_when,
            grace: Duration::from_millis(def.grace_ms()),
            on_ready,
        })
    }

    /// Build the full spec list from a manifest, in declaration order.
    pub fn from_manifest(manifest: &Manifest) -> Result<Vec<Self>, ManifestError> {
        manifest
            .runnables
            .iter()
            .map(|(id, def)| Self::from_def(id, def))
            .collect()
    }
}

#[cfg(test)]
#[path = "spec_tests.rs"]
mod tests;
