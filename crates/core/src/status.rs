// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle status enums for services and ephemeral commands.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a supervised service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    /// Not running and not requested to run.
    Stopped,
    /// Requested to start, gated on dependencies that are not all running.
    Waiting,
    /// Process spawned, readiness not yet established.
    Starting,
    /// Ready: readiness predicate fired or the grace period elapsed.
    Running,
    /// Exited abnormally or failed to spawn.
    Error,
}

impl ServiceStatus {
    /// True while a start is underway or complete (`starting` or `running`).
    ///
    /// A `Start` on a service in one of these states is a no-op.
    pub fn is_live(&self) -> bool {
        matches!(self, ServiceStatus::Starting | ServiceStatus::Running)
    }

    /// True for states a gated start must not disturb
    /// (`starting`, `running`, or already `waiting`).
    pub fn is_engaged(&self) -> bool {
        matches!(
            self,
            ServiceStatus::Starting | ServiceStatus::Running | ServiceStatus::Waiting
        )
    }
}

impl std::fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceStatus::Stopped => write!(f, "stopped"),
            ServiceStatus::Waiting => write!(f, "waiting"),
            ServiceStatus::Starting => write!(f, "starting"),
            ServiceStatus::Running => write!(f, "running"),
            ServiceStatus::Error => write!(f, "error"),
        }
    }
}

impl Default for ServiceStatus {
    fn default() -> Self {
        ServiceStatus::Stopped
    }
}

/// Status of a one-shot ephemeral command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandStatus {
    /// Created or reset; nothing spawned yet.
    Idle,
    /// Child process is live.
    Running,
    /// Exited with code 0.
    Success,
    /// Non-zero exit, terminating signal, or spawn failure.
    Error,
}

impl std::fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandStatus::Idle => write!(f, "idle"),
            CommandStatus::Running => write!(f, "running"),
            CommandStatus::Success => write!(f, "success"),
            CommandStatus::Error => write!(f, "error"),
        }
    }
}

impl Default for CommandStatus {
    fn default() -> Self {
        CommandStatus::Idle
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
