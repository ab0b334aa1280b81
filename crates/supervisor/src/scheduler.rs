// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dependency-aware startup.
//!
//! Targets are expanded to their transitive dependency closure,
//! validated (dangling deps, cycles), topologically ordered, and started
//! through the gated path: each runnable is launched in its own task and
//! only waits for the dependencies it is gated on, so independent
//! branches start in parallel.

use crate::error::SupervisorError;
use crate::process;
use crate::spec::RunnableSpec;
use crate::state::Inner;
use indexmap::IndexMap;
use rig_core::{ServiceStatus, StatusChange};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::broadcast;

/// A dependency a waiter was gated on reached `error` or `stopped`
/// instead of `running`. The waiter stays in `waiting`; the recovery
/// watcher retries when the dependency comes back.
#[derive(Debug)]
pub(crate) struct DepFailed;

/// Transitive closure of `targets` over `depends_on`, BFS order.
/// Unknown dependency ids are carried through for validation to report.
pub(crate) fn expand_targets(
    specs: &IndexMap<String, RunnableSpec>,
    targets: &[String],
) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut closure = Vec::new();
    let mut queue: VecDeque<String> = targets.iter().cloned().collect();
    while let Some(id) = queue.pop_front() {
        if !seen.insert(id.clone()) {
            continue;
        }
        if let Some(spec) = specs.get(&id) {
            for dep in &spec.depends_on {
                queue.push_back(dep.clone());
            }
        }
        closure.push(id);
    }
    closure
}

/// Every `depends_on` entry of every id in `subset` must name a known
/// definition, not merely a member of the subset.
pub(crate) fn validate_dependencies(
    specs: &IndexMap<String, RunnableSpec>,
    subset: &[String],
) -> Result<(), SupervisorError> {
    for id in subset {
        let Some(spec) = specs.get(id) else {
            continue;
        };
        for dep in &spec.depends_on {
            if !specs.contains_key(dep) {
                return Err(SupervisorError::MissingDependency {
                    id: id.clone(),
                    dependency: dep.clone(),
                    known: specs.keys().cloned().collect(),
                });
            }
        }
    }
    Ok(())
}

/// Kahn's algorithm over `subset`, restricted to edges inside it.
pub(crate) fn topo_order(
    specs: &IndexMap<String, RunnableSpec>,
    subset: &[String],
) -> Result<Vec<String>, SupervisorError> {
    let members: HashSet<&str> = subset.iter().map(String::as_str).collect();
    let mut indegree: HashMap<&str, usize> =
        subset.iter().map(|id| (id.as_str(), 0)).collect();
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();

    for id in subset {
        let Some(spec) = specs.get(id) else {
            continue;
        };
        for dep in &spec.depends_on {
            if members.contains(dep.as_str()) {
                if let Some(count) = indegree.get_mut(id.as_str()) {
                    *count += 1;
                }
                dependents.entry(dep.as_str()).or_default().push(id.as_str());
            }
        }
    }

    let mut queue: VecDeque<&str> = subset
        .iter()
        .map(String::as_str)
        .filter(|id| indegree.get(id).copied() == Some(0))
        .collect();
    let mut order = Vec::with_capacity(subset.len());
    while let Some(id) = queue.pop_front() {
        order.push(id.to_string());
        for dependent in dependents.get(id).into_iter().flatten() {
            if let Some(count) = indegree.get_mut(dependent) {
                *count -= 1;
                if *count == 0 {
                    queue.push_back(dependent);
                }
            }
        }
    }

    if order.len() != subset.len() {
        let mut remaining: Vec<String> = subset
            .iter()
            .filter(|id| !order.contains(*id))
            .cloned()
            .collect();
        remaining.sort();
        return Err(SupervisorError::Cycle { ids: remaining });
    }
    Ok(order)
}

/// Start every target (plus its dependency closure) in topological
/// order. Individual starts run unawaited; ordering is enforced by the
/// dependency gate, so independent branches start in parallel.
pub(crate) async fn start_all(
    inner: &Arc<Inner>,
    targets: &[String],
) -> Result<(), SupervisorError> {
    for target in targets {
        if !inner.specs.contains_key(target) {
            return Err(SupervisorError::UnknownRunnable { id: target.clone() });
        }
    }
    let closure = expand_targets(&inner.specs, targets);
    validate_dependencies(&inner.specs, &closure)?;
    let order = topo_order(&inner.specs, &closure)?;

    for id in order {
        inner.set_hidden(&id, false);
        let task_inner = Arc::clone(inner);
        tokio::spawn(async move {
            gated_start(&task_inner, &id).await;
        });
    }
    Ok(())
}

/// UI affordance: unhide `id` and its whole dependency closure, then
/// start the members that are not already engaged.
pub(crate) async fn start_with_dependencies(
    inner: &Arc<Inner>,
    id: &str,
) -> Result<(), SupervisorError> {
    if !inner.specs.contains_key(id) {
        return Err(SupervisorError::UnknownRunnable { id: id.to_string() });
    }
    let closure = expand_targets(&inner.specs, &[id.to_string()]);
    validate_dependencies(&inner.specs, &closure)?;
    let order = topo_order(&inner.specs, &closure)?;

    for member in &order {
        inner.set_hidden(member, false);
    }
    for member in order {
        let engaged = matches!(inner.status_of(&member), Some(status) if status.is_engaged());
        if engaged {
            continue;
        }
        let task_inner = Arc::clone(inner);
        tokio::spawn(async move {
            gated_start(&task_inner, &member).await;
        });
    }
    Ok(())
}

/// The gated start path: wait for every dependency to be `running`,
/// then spawn with the inherited runtime env.
pub(crate) async fn gated_start(inner: &Arc<Inner>, id: &str) {
    let Some(spec) = inner.specs.get(id) else {
        return;
    };
    inner.set_hidden(id, false);
    let deps = spec.depends_on.clone();

    let all_running = deps
        .iter()
        .all(|dep| inner.status_of(dep) == Some(ServiceStatus::Running));
    if !all_running {
        // Gate: mark waiting with the full dependency list, then await
        // each dep. The list is retained on failure so UIs can explain
        // why the service is parked.
        {
            let mut state = inner.state.lock();
            let Some(cell) = state.get_mut(id) else {
                return;
            };
            if cell.status.is_live() {
                return;
            }
            cell.status = ServiceStatus::Waiting;
            cell.error = None;
            cell.waiting_for = deps.clone();
            inner.bus.emit_status(StatusChange {
                id: id.to_string(),
                status: ServiceStatus::Waiting,
                error: None,
            });
        }
        for dep in &deps {
            if wait_for_running(inner, dep).await.is_err() {
                tracing::debug!(id, dep = %dep, "dependency failed while waiting");
                return;
            }
        }
        inner.with_cell(id, |cell| cell.waiting_for.clear());
    }

    let inherited = collect_runtime_env(inner, &deps);
    process::start_service(inner, id, inherited).await;
}

/// Resolve when `id` reaches `running`; fail when it transitions to
/// `error` or `stopped` first. A dep that is merely `stopped` right now
/// does not fail the wait; its own start may still be in flight.
pub(crate) async fn wait_for_running(inner: &Arc<Inner>, id: &str) -> Result<(), DepFailed> {
    let mut rx = inner.bus.subscribe_status();
    if inner.status_of(id) == Some(ServiceStatus::Running) {
        return Ok(());
    }
    loop {
        match rx.recv().await {
            Ok(ev) if ev.id == id => match ev.status {
                ServiceStatus::Running => return Ok(()),
                ServiceStatus::Error | ServiceStatus::Stopped => return Err(DepFailed),
                ServiceStatus::Waiting | ServiceStatus::Starting => {}
            },
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(_)) => {
                if inner.status_of(id) == Some(ServiceStatus::Running) {
                    return Ok(());
                }
            }
            Err(broadcast::error::RecvError::Closed) => return Err(DepFailed),
        }
    }
}

/// Overlay union of the runtime env of `deps`, in dependency order,
/// last writer wins.
pub(crate) fn collect_runtime_env(inner: &Inner, deps: &[String]) -> IndexMap<String, String> {
    let runtime = inner.runtime_env.lock();
    let mut merged = IndexMap::new();
    for dep in deps {
        if let Some(entries) = runtime.get(dep) {
            for (key, value) in entries {
                merged.insert(key.clone(), value.clone());
            }
        }
    }
    merged
}

/// Install the single recovery watcher: whenever any service becomes
/// `running`, re-issue the gated start for every waiter whose gate is
/// now fully satisfied.
pub(crate) fn install_recovery_watcher(inner: &Arc<Inner>) {
    let weak = Arc::downgrade(inner);
    let mut rx = inner.bus.subscribe_status();
    tokio::spawn(async move {
        loop {
            let ev = match rx.recv().await {
                Ok(ev) => ev,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            };
            if ev.status != ServiceStatus::Running {
                continue;
            }
            let Some(inner) = weak.upgrade() else {
                break;
            };
            for id in ready_waiters(&inner) {
                tracing::debug!(id = %id, recovered = %ev.id, "dependencies satisfied, restarting waiter");
                let task_inner = Arc::clone(&inner);
                tokio::spawn(async move {
                    gated_start(&task_inner, &id).await;
                });
            }
        }
    });
}

/// Waiters whose entire `waiting_for` gate is currently `running`.
fn ready_waiters(inner: &Inner) -> Vec<String> {
    let state = inner.state.lock();
    let mut ready = Vec::new();
    for (id, cell) in state.iter() {
        if cell.status != ServiceStatus::Waiting {
            continue;
        }
        let satisfied = cell.waiting_for.iter().all(|dep| {
            state
                .get(dep)
                .map(|dep_cell| dep_cell.status == ServiceStatus::Running)
                .unwrap_or(false)
        });
        if satisfied {
            ready.push(id.clone());
        }
    }
    ready
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
