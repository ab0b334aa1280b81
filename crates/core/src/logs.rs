// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded per-service log storage.
//!
//! Logs are keyed by service id rather than stored on the instance, so
//! readers, the event bus, and the state exporter can all reach them
//! without holding a reference to the supervisor's mutable state.

use crate::event::{LogChannel, OutputStream};
use crate::ring::RingBuffer;
use parking_lot::Mutex;
use std::collections::HashMap;

/// The three ring buffers kept for one service.
#[derive(Debug)]
struct ServiceLogs {
    stdout: RingBuffer<String>,
    stderr: RingBuffer<String>,
    combined: RingBuffer<String>,
}

impl ServiceLogs {
    fn new(capacity: usize) -> Self {
        Self {
            stdout: RingBuffer::new(capacity),
            stderr: RingBuffer::new(capacity),
            combined: RingBuffer::new(capacity),
        }
    }

    fn channel(&self, channel: LogChannel) -> &RingBuffer<String> {
        match channel {
            LogChannel::Stdout => &self.stdout,
            LogChannel::Stderr => &self.stderr,
            LogChannel::Combined => &self.combined,
        }
    }
}

/// Shared store of bounded output buffers, keyed by service id.
///
/// `push` before a query means the query observes the line; the mutex
/// around the map is what provides that external consistency.
#[derive(Debug)]
pub struct LogStore {
    inner: Mutex<HashMap<String, ServiceLogs>>,
    capacity: usize,
}

impl LogStore {
    pub fn new(capacity: usize) -> Self {
        Self { inner: Mutex::new(HashMap::new()), capacity }
    }

    /// Per-buffer line capacity this store was created with.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a line to the stream buffer and the combined buffer.
    pub fn push(&self, id: &str, line: &str, stream: OutputStream) {
        let mut inner = self.inner.lock();
        let logs = inner
            .entry(id.to_string())
            .or_insert_with(|| ServiceLogs::new(self.capacity));
        match stream {
            OutputStream::Stdout => logs.stdout.push(line.to_string()),
            OutputStream::Stderr => logs.stderr.push(line.to_string()),
        }
        logs.combined.push(line.to_string());
    }

    /// Drop all buffered lines for a service.
    pub fn clear(&self, id: &str) {
        if let Some(logs) = self.inner.lock().get_mut(id) {
            logs.stdout.clear();
            logs.stderr.clear();
            logs.combined.clear();
        }
    }

    /// All stored lines for a channel, oldest first.
    pub fn lines(&self, id: &str, channel: LogChannel) -> Vec<String> {
        self.inner
            .lock()
            .get(id)
            .map(|logs| logs.channel(channel).to_vec())
            .unwrap_or_default()
    }

    /// The most recent `min(n, len)` lines for a channel, in insertion order.
    pub fn tail(&self, id: &str, channel: LogChannel, n: usize) -> Vec<String> {
        self.inner
            .lock()
            .get(id)
            .map(|logs| logs.channel(channel).tail(n))
            .unwrap_or_default()
    }

    /// Number of stored lines for a channel.
    pub fn len(&self, id: &str, channel: LogChannel) -> usize {
        self.inner
            .lock()
            .get(id)
            .map(|logs| logs.channel(channel).len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
#[path = "logs_tests.rs"]
mod tests;
