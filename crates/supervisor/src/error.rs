// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor error types.
//!
//! Config errors (missing dependency, cycle, unknown runnable) are
//! terminal for the operation that raised them. Spawn and runtime exit
//! faults are not errors at this level; they surface as `error` status
//! changes on the bus and are recoverable by another start.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error(
        "runnable '{id}' depends on unknown runnable '{dependency}' (known runnables: {})",
        .known.join(", ")
    )]
    MissingDependency { id: String, dependency: String, known: Vec<String> },

    #[error("Dependency cycle detected: {}", .ids.join(", "))]
    Cycle { ids: Vec<String> },

    #[error("unknown runnable '{id}'")]
    UnknownRunnable { id: String },
}
