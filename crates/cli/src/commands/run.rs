// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `rig run` - one-shot command execution.

use anyhow::Result;
use clap::Args;
use rig_core::DEFAULT_MAX_OUTPUT_LINES;
use rig_supervisor::{CommandEvent, CommandRunner, RunRequest};
use std::path::Path;

#[derive(Args)]
pub struct RunArgs {
    /// Working directory (default: where rig was invoked)
    #[arg(long)]
    pub cwd: Option<std::path::PathBuf>,

    /// The command line to run, passed to `sh -c`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
    pub command: Vec<String>,
}

/// Runs the command in the foreground; the exit code mirrors the
/// child's (1 for signals and spawn failures). Ctrl-C cancels with the
/// group-kill protocol before returning.
pub async fn run(args: RunArgs, start_dir: &Path) -> Result<i32> {
    let runner = CommandRunner::new(DEFAULT_MAX_OUTPUT_LINES);
    let mut events = runner.subscribe();

    let request = RunRequest {
        command: args.command.join(" "),
        cwd: Some(args.cwd.unwrap_or_else(|| start_dir.to_path_buf())),
        env: indexmap::IndexMap::new(),
    };
    runner.run(request).await;

    loop {
        tokio::select! {
            ev = events.recv() => match ev {
                Ok(CommandEvent::Output { line }) => println!("{line}"),
                Ok(CommandEvent::Exit { code, .. }) => return Ok(code.unwrap_or(1)),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => return Ok(1),
            },
            _ = tokio::signal::ctrl_c() => {
                eprintln!("rig: cancelling");
                runner.cancel().await;
                return Ok(runner.exit_code().unwrap_or(1));
            }
        }
    }
}
