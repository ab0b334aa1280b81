// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rig-manifest: the user-facing configuration surface.
//!
//! A manifest (`rig.toml`) declares the runnables the supervisor manages,
//! optional groups, and workspace defaults. This crate owns parsing,
//! file discovery, validation, and target resolution; it knows nothing
//! about processes.

pub mod error;
pub mod find;
pub mod target;
pub mod template;
pub mod types;

pub use error::ManifestError;
pub use find::{find_manifest, load_manifest, ManifestFile, MANIFEST_FILE_NAME};
pub use target::resolve_targets;
pub use types::{Defaults, Manifest, OnReadyDef, RunnableDef, RunnableKind, ScriptSource};
