// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Manifest schema: runnable definitions, groups, defaults.

use crate::error::ManifestError;
use indexmap::IndexMap;
use rig_core::{ContainerSpec, DEFAULT_GRACE_MS, DEFAULT_MAX_OUTPUT_LINES};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The parsed `rig.toml`.
///
/// ```toml
/// [runnable.db]
/// container = { image = "postgres:16", ports = ["5432:5432"] }
/// ready_when = "ready to accept connections"
///
/// [runnable.api]
/// command = "cargo run -p api"
/// depends_on = ["db"]
///
/// [group]
/// backend = ["db", "api"]
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Manifest {
    #[serde(default, rename = "runnable")]
    pub runnables: IndexMap<String, RunnableDef>,

    #[serde(default, rename = "group")]
    pub groups: IndexMap<String, Vec<String>>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Command-name prefixes surfaced by the UI layer; not consumed by the core.
    #[serde(default)]
    pub shell_commands: Vec<String>,

    /// Script-source producers for the UI layer; not consumed by the core.
    #[serde(default, rename = "script")]
    pub scripts: Vec<ScriptSource>,
}

impl Manifest {
    /// Parse a manifest from TOML and validate every runnable.
    pub fn parse(content: &str) -> Result<Self, ManifestError> {
        let manifest: Manifest = toml::from_str(content).map_err(Box::new)?;
        for (id, def) in &manifest.runnables {
            def.validate(id)?;
        }
        Ok(manifest)
    }
}

/// Workspace-wide defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Defaults {
    /// Environment applied to every runnable, below its own `env`.
    #[serde(default)]
    pub env: IndexMap<String, String>,

    /// Per-buffer output line cap; 1000 when absent.
    #[serde(default)]
    pub max_output_lines: Option<usize>,
}

impl Defaults {
    pub fn max_output_lines(&self) -> usize {
        self.max_output_lines.unwrap_or(DEFAULT_MAX_OUTPUT_LINES)
    }
}

/// A directory of user scripts, surfaced by the UI layer.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScriptSource {
    pub dir: PathBuf,
}

/// What kind of child a runnable spawns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnableKind {
    Shell,
    Container,
}

/// One managed process, as declared by the user.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RunnableDef {
    /// Display label; the id is used when absent.
    #[serde(default)]
    pub name: Option<String>,

    /// Shell command. Exactly one of `command` / `container` must be set.
    #[serde(default)]
    pub command: Option<String>,

    /// Container invocation, flattened into a `docker run` command.
    #[serde(default)]
    pub container: Option<ContainerSpec>,

    #[serde(default)]
    pub cwd: Option<PathBuf>,

    #[serde(default)]
    pub env: IndexMap<String, String>,

    /// Ids that must be `running` before this runnable starts.
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Readiness regex over the ANSI-stripped combined output. When
    /// absent, the grace period decides readiness.
    #[serde(default)]
    pub ready_when: Option<String>,

    /// Grace period in milliseconds for runnables without `ready_when`.
    #[serde(default)]
    pub grace_ms: Option<u64>,

    #[serde(default)]
    pub on_ready: Option<OnReadyDef>,
}

/// Declarative `on_ready` behavior: runtime env published to dependents.
///
/// Values are templates; `${name}` refers to a named capture of the
/// runnable's `ready_when` regex, matched against the output snapshot.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OnReadyDef {
    #[serde(default)]
    pub env: IndexMap<String, String>,
}

impl RunnableDef {
    pub fn kind(&self) -> RunnableKind {
        if self.container.is_some() {
            RunnableKind::Container
        } else {
            RunnableKind::Shell
        }
    }

    /// Display label for UIs; falls back to the id.
    pub fn display_name(&self, id: &str) -> String {
        self.name.clone().unwrap_or_else(|| id.to_string())
    }

    /// The shell command this runnable executes, with container specs
    /// flattened at definition time.
    pub fn resolved_command(&self, id: &str) -> Result<String, ManifestError> {
        let command = match (&self.command, &self.container) {
            (Some(_), Some(_)) => {
                return Err(ManifestError::AmbiguousKind { id: id.to_string() });
            }
            (Some(command), None) => command.clone(),
            (None, Some(container)) => container.to_command(),
            (None, None) => String::new(),
        };
        if command.trim().is_empty() {
            return Err(ManifestError::EmptyCommand { id: id.to_string() });
        }
        Ok(command)
    }

    pub fn grace_ms(&self) -> u64 {
        self.grace_ms.unwrap_or(DEFAULT_GRACE_MS)
    }

    /// Validate the definition: command shape and `ready_when` syntax.
    pub fn validate(&self, id: &str) -> Result<(), ManifestError> {
        self.resolved_command(id)?;
        if let Some(pattern) = &self.ready_when {
            regex::Regex::new(pattern).map_err(|e| ManifestError::InvalidReadyWhen {
                id: id.to_string(),
                source: Box::new(e),
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
