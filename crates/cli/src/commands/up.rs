// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `rig up` - supervise services in the foreground.

use anyhow::Result;
use clap::Args;
use rig_manifest::{find_manifest, load_manifest, resolve_targets};
use rig_supervisor::{default_state_dir, ExporterConfig, Supervisor, SupervisorConfig};
use std::path::Path;
use tokio::signal::unix::{signal, SignalKind};

#[derive(Args)]
pub struct UpArgs {
    /// Service or group names; empty starts everything
    pub targets: Vec<String>,
}

pub async fn up(args: UpArgs, start_dir: &Path) -> Result<()> {
    let found = find_manifest(start_dir)?;
    let manifest = load_manifest(&found.path)?;
    let resolved = resolve_targets(&manifest, &args.targets)?;

    let mut config = SupervisorConfig::from_manifest(&manifest)?.with_exporter(ExporterConfig {
        state_dir: default_state_dir(),
        config_path: found.path.clone(),
        project_root: found.project_root.clone(),
    });
    // Relative working directories are rooted at the project, and
    // runnables without one run from the project root.
    for spec in &mut config.specs {
        spec.cwd = Some(match spec.cwd.take() {
            Some(cwd) if cwd.is_relative() => found.project_root.join(cwd),
            Some(cwd) => cwd,
            None => found.project_root.clone(),
        });
    }

    let supervisor = Supervisor::new(config);
    spawn_printers(&supervisor);

    supervisor.start_all(&resolved).await?;
    println!("rig: supervising {} (ctrl-c to stop)", resolved.join(", "));

    // SIGINT and SIGTERM both mean: stop everything, exit 0.
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }

    println!("rig: stopping services");
    supervisor.shutdown().await;
    Ok(())
}

/// Stream status transitions and output lines to the terminal. The
/// printers die with the process; they hold no supervisor references
/// beyond the receivers.
fn spawn_printers(supervisor: &Supervisor) {
    let mut status_rx = supervisor.subscribe_status();
    tokio::spawn(async move {
        loop {
            match status_rx.recv().await {
                Ok(ev) => match &ev.error {
                    Some(error) => println!("[{}] {} ({error})", ev.id, ev.status),
                    None => println!("[{}] {}", ev.id, ev.status),
                },
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let mut output_rx = supervisor.subscribe_output();
    tokio::spawn(async move {
        loop {
            match output_rx.recv().await {
                Ok(ev) => println!("[{}] {}", ev.id, ev.line),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(dropped = n, "terminal printer lagging behind output");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}
