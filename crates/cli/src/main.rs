// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! rig - a supervisor for a project's local dev services.
//!
//! `rig up` brings the manifest's runnables up in dependency order and
//! streams their status and output until interrupted; `rig run` executes
//! one-shot commands under the same process-group discipline; `rig
//! status` reads the state file an `up` session exports for external
//! inspectors.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rig", version, about = "Supervise a project's local dev services")]
struct Cli {
    /// Directory to start manifest discovery from (default: cwd)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start services (all, or the named services/groups) and stream
    /// their output until interrupted
    Up(commands::up::UpArgs),
    /// Run a one-shot command under rig's process-group discipline
    Run(commands::run::RunArgs),
    /// Inspect the state file of a running supervisor
    Status(commands::status::StatusArgs),
    /// Show which runnables a set of target names resolves to
    Resolve(commands::resolve::ResolveArgs),
}

#[tokio::main]
async fn main() {
    // RIG_LOG controls supervisor tracing; the CLI's own output goes to
    // stdout untouched.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("RIG_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let start_dir = match resolve_start_dir(cli.dir) {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("rig: {e:#}");
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Up(args) => commands::up::up(args, &start_dir).await.map(|()| 0),
        Command::Run(args) => commands::run::run(args, &start_dir).await,
        Command::Status(args) => commands::status::status(args, &start_dir).map(|()| 0),
        Command::Resolve(args) => commands::resolve::resolve(args, &start_dir).map(|()| 0),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("rig: {e:#}");
            std::process::exit(1);
        }
    }
}

fn resolve_start_dir(dir: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    match dir {
        Some(dir) => Ok(dir),
        None => Ok(std::env::current_dir()?),
    }
}
