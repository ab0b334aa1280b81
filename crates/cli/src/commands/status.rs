// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `rig status` - read the exported state file.
//!
//! This is the external-inspector path: it never talks to a running
//! supervisor, only to the snapshot it exports.

use anyhow::Result;
use clap::Args;
use rig_manifest::find_manifest;
use rig_supervisor::{default_state_dir, read_state_file, state_file_path};
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct StatusArgs {
    /// Project root (default: discovered from the manifest)
    #[arg(long)]
    pub project: Option<PathBuf>,

    /// Log lines to show per service
    #[arg(long, default_value = "0")]
    pub logs: usize,
}

pub fn status(args: StatusArgs, start_dir: &Path) -> Result<()> {
    let project_root = match args.project {
        Some(root) => root,
        None => find_manifest(start_dir)?.project_root,
    };
    let path = state_file_path(&default_state_dir(), &project_root);

    let state = match read_state_file(&path) {
        Ok(state) => state,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            println!("no supervisor running for {}", project_root.display());
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    // A dead writer left the file behind; clean it up for them.
    if state.is_stale() {
        std::fs::remove_file(&path)?;
        println!(
            "no supervisor running for {} (removed stale state file)",
            project_root.display()
        );
        return Ok(());
    }

    println!("supervisor pid {} (updated {})", state.pid, state.updated_at);
    for (id, entry) in &state.services {
        match &entry.error {
            Some(error) => println!("  {id:<20} {} ({error})", entry.status),
            None => println!("  {id:<20} {}", entry.status),
        }
        if args.logs > 0 {
            if let Some(lines) = state.logs.get(id) {
                for line in lines.iter().rev().take(args.logs).rev() {
                    println!("    | {line}");
                }
            }
        }
    }
    Ok(())
}
