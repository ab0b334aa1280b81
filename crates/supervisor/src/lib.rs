// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rig-supervisor: the runnable supervisor core.
//!
//! Owns the dependency-aware scheduler, the per-runnable process
//! lifecycle, readiness detection, the shutdown protocol, the ephemeral
//! command runner, and the state exporter. All UIs consume state through
//! the event bus plus the read APIs on [`Supervisor`]; none of them hold
//! references into the supervisor's mutable state.

pub mod bus;
pub mod ephemeral;
pub mod error;
pub mod export;
mod process;
mod scheduler;
pub mod spec;
mod state;
mod supervisor;

pub use bus::EventBus;
pub use ephemeral::{BackgroundCommands, BackgroundView, CommandEvent, CommandRunner, RunRequest};
pub use error::SupervisorError;
pub use export::{
    default_state_dir, read_state_file, state_file_name, state_file_path, ExporterConfig,
    ServiceEntry, StateFile,
};
pub use spec::{EnvExportHook, EnvSink, HookError, ReadyHook, RunnableSpec};
pub use state::ServiceView;
pub use supervisor::{Supervisor, SupervisorConfig};
