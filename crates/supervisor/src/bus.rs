// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event bus for supervisor consumers.
//!
//! One broadcast channel per topic. Emission happens after (or under the
//! same lock as) the mutation that caused the event, so a subscriber that
//! queries the log store or the read APIs upon receiving an event
//! observes at least that mutation. The bus does not persist past
//! events; late subscribers read current state through the query APIs.

use rig_core::{HiddenChange, OutputLine, StatusChange};
use tokio::sync::broadcast;

/// Queued events per topic before slow subscribers start lagging.
const TOPIC_CAPACITY: usize = 1024;

/// Topic-typed publish/subscribe surface.
///
/// Cloning is cheap; all clones share the same channels.
#[derive(Debug, Clone)]
pub struct EventBus {
    status_tx: broadcast::Sender<StatusChange>,
    output_tx: broadcast::Sender<OutputLine>,
    hidden_tx: broadcast::Sender<HiddenChange>,
}

impl EventBus {
    pub fn new() -> Self {
        let (status_tx, _) = broadcast::channel(TOPIC_CAPACITY);
        let (output_tx, _) = broadcast::channel(TOPIC_CAPACITY);
        let (hidden_tx, _) = broadcast::channel(TOPIC_CAPACITY);
        Self { status_tx, output_tx, hidden_tx }
    }

    pub fn subscribe_status(&self) -> broadcast::Receiver<StatusChange> {
        self.status_tx.subscribe()
    }

    pub fn subscribe_output(&self) -> broadcast::Receiver<OutputLine> {
        self.output_tx.subscribe()
    }

    pub fn subscribe_hidden(&self) -> broadcast::Receiver<HiddenChange> {
        self.hidden_tx.subscribe()
    }

    /// Publish a status transition. A send error only means there are no
    /// subscribers, which is fine.
    pub(crate) fn emit_status(&self, event: StatusChange) {
        let _ = self.status_tx.send(event);
    }

    pub(crate) fn emit_output(&self, event: OutputLine) {
        let _ = self.output_tx.send(event);
    }

    pub(crate) fn emit_hidden(&self, event: HiddenChange) {
        let _ = self.hidden_tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
