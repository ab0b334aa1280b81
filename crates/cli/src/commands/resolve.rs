// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `rig resolve` - show target resolution without starting anything.

use anyhow::Result;
use clap::Args;
use rig_manifest::{find_manifest, load_manifest, resolve_targets};
use std::path::Path;

#[derive(Args)]
pub struct ResolveArgs {
    /// Service or group names; empty resolves to every runnable
    pub targets: Vec<String>,
}

pub fn resolve(args: ResolveArgs, start_dir: &Path) -> Result<()> {
    let found = find_manifest(start_dir)?;
    let manifest = load_manifest(&found.path)?;
    for id in resolve_targets(&manifest, &args.targets)? {
        println!("{id}");
    }
    Ok(())
}
