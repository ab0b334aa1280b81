// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container runnable configuration.
//!
//! Containers are not a separate execution path: the spec of a container
//! is flattened into a `docker run` shell command at definition time, so
//! the scheduler and process lifecycle only ever see shell commands.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Declarative container invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
    /// Image reference (e.g. "postgres:16").
    pub image: String,
    /// Port mappings in `host:container` form.
    #[serde(default)]
    pub ports: Vec<String>,
    /// Volume mounts in `host:container` form.
    #[serde(default)]
    pub volumes: Vec<String>,
    /// Environment passed with `-e KEY=VALUE`.
    #[serde(default)]
    pub env: IndexMap<String, String>,
    /// Trailing arguments after the image.
    #[serde(default)]
    pub args: Vec<String>,
}

impl ContainerSpec {
    /// Synthesize the `docker run` command line for this container.
    ///
    /// `--rm` so stopped containers do not accumulate; `--init` so the
    /// in-container PID 1 forwards the SIGTERM our stop protocol sends.
    pub fn to_command(&self) -> String {
        let mut parts = vec!["docker".to_string(), "run".to_string(), "--rm".to_string(), "--init".to_string()];
        for port in &self.ports {
            parts.push("-p".to_string());
            parts.push(shell_word(port));
        }
        for volume in &self.volumes {
            parts.push("-v".to_string());
            parts.push(shell_word(volume));
        }
        for (key, value) in &self.env {
            parts.push("-e".to_string());
            parts.push(shell_word(&format!("{key}={value}")));
        }
        parts.push(shell_word(&self.image));
        for arg in &self.args {
            parts.push(shell_word(arg));
        }
        parts.join(" ")
    }
}

/// Quote a word for `sh -c` if it contains anything beyond safe
/// characters. Single quotes in the value use the `'\''` idiom.
fn shell_word(s: &str) -> String {
    let safe = !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | '=' | ','));
    if safe {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', "'\\''"))
    }
}

#[cfg(test)]
#[path = "container_tests.rs"]
mod tests;
