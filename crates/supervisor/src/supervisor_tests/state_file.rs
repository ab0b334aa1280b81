// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State exporter end-to-end: snapshots on status changes, deletion on
//! shutdown.

use super::*;
use crate::export::{read_state_file, state_file_path, ExporterConfig};
use rig_core::ServiceStatus;

fn exporter_config(temp: &tempfile::TempDir) -> ExporterConfig {
    ExporterConfig {
        state_dir: temp.path().join("state"),
        config_path: temp.path().join("rig.toml"),
        project_root: temp.path().to_path_buf(),
    }
}

#[tokio::test]
async fn snapshot_tracks_status_and_logs() {
    let temp = tempfile::tempdir().unwrap();
    let config = exporter_config(&temp);
    let path = state_file_path(&config.state_dir, &config.project_root);

    let sup = Supervisor::new(
        SupervisorConfig::new(vec![shell("api", "echo hello; sleep 5")])
            .with_exporter(config),
    );
    assert_eq!(sup.state_file().as_deref(), Some(path.as_path()));

    let mut status_rx = sup.subscribe_status();
    sup.start_all(&targets(&["api"])).await.unwrap();
    await_status(&mut status_rx, "api", ServiceStatus::Running).await;

    // The exporter writes asynchronously; give it a beat.
    let snapshot = poll_for_status(&path, ServiceStatus::Running).await;
    assert_eq!(snapshot.pid, std::process::id());
    assert_eq!(snapshot.project_root, temp.path());
    assert!(!snapshot.is_stale());
    assert_eq!(snapshot.logs["api"], vec!["hello"]);
    assert!(snapshot.services["api"].started_at.is_some());

    sup.stop("api").await.unwrap();
    let snapshot = poll_for_status(&path, ServiceStatus::Stopped).await;
    assert!(snapshot.services["api"].error.is_none());

    sup.shutdown().await;
    assert!(!path.exists(), "state file must be deleted on shutdown");
}

#[tokio::test]
async fn shutdown_without_any_start_still_cleans_up() {
    let temp = tempfile::tempdir().unwrap();
    let config = exporter_config(&temp);
    let path = state_file_path(&config.state_dir, &config.project_root);

    let sup = Supervisor::new(
        SupervisorConfig::new(vec![shell("api", "sleep 5")]).with_exporter(config),
    );
    sup.shutdown().await;
    assert!(!path.exists());
}

/// Wait until the exporter has flushed a snapshot where `api` has the
/// wanted status.
async fn poll_for_status(
    path: &std::path::Path,
    wanted: ServiceStatus,
) -> crate::export::StateFile {
    let deadline = tokio::time::Instant::now() + EVENT_WAIT;
    loop {
        if let Ok(snapshot) = read_state_file(path) {
            if snapshot.services.get("api").map(|entry| entry.status) == Some(wanted) {
                return snapshot;
            }
        }
        if tokio::time::Instant::now() > deadline {
            panic!("state file never reached {wanted} at {}", path.display());
        }
        tokio::time::sleep(std::time::Duration::from_millis(25)).await;
    }
}
