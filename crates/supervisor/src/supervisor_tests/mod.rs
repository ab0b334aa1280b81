// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end supervisor scenarios driving real `sh` children.

use super::*;
use crate::spec::EnvExportHook;
use rig_core::ServiceStatus;
use std::time::Duration;
use tokio::time::timeout;

mod dependencies;
mod lifecycle;
mod state_file;

/// Generous ceiling for event waits; tests fail fast on real hangs.
const EVENT_WAIT: Duration = Duration::from_secs(10);

/// Shell spec with a short grace so grace-path tests stay fast.
fn shell(id: &str, command: &str) -> RunnableSpec {
    let mut spec = RunnableSpec::shell(id, command);
    spec.grace = Duration::from_millis(100);
    spec
}

fn supervisor(specs: Vec<RunnableSpec>) -> Supervisor {
    Supervisor::new(SupervisorConfig::new(specs))
}

fn targets(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Next status event for `id`, skipping other services.
async fn next_status(rx: &mut broadcast::Receiver<StatusChange>, id: &str) -> StatusChange {
    loop {
        let ev = timeout(EVENT_WAIT, rx.recv())
            .await
            .expect("timed out waiting for status event")
            .expect("status channel closed");
        if ev.id == id {
            return ev;
        }
    }
}

/// Skip events until `id` reaches `status`; panics on a terminal
/// divergence so failures are readable.
async fn await_status(
    rx: &mut broadcast::Receiver<StatusChange>,
    id: &str,
    status: ServiceStatus,
) -> StatusChange {
    loop {
        let ev = next_status(rx, id).await;
        if ev.status == status {
            return ev;
        }
        if matches!(ev.status, ServiceStatus::Error) && status != ServiceStatus::Error {
            panic!("{id} reached error instead of {status}: {:?}", ev.error);
        }
    }
}

/// Assert no further status event for `id` arrives within `window`.
async fn assert_no_status(
    rx: &mut broadcast::Receiver<StatusChange>,
    id: &str,
    window: Duration,
) {
    let deadline = tokio::time::Instant::now() + window;
    loop {
        match tokio::time::timeout_at(deadline, rx.recv()).await {
            Ok(Ok(ev)) => {
                assert_ne!(ev.id, id, "unexpected status event for {id}: {:?}", ev);
            }
            Ok(Err(_)) => return,
            Err(_) => return,
        }
    }
}
