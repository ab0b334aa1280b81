// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event vocabulary for the supervisor bus.
//!
//! Three topics exist: status changes, output lines, and hidden-flag
//! flips. Each topic has its own payload struct; [`Event`] is the tagged
//! union used wherever a single stream of everything is convenient
//! (logging, serialization).

use crate::status::ServiceStatus;
use serde::{Deserialize, Serialize};

/// Which pipe a line of output arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl std::fmt::Display for OutputStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputStream::Stdout => write!(f, "stdout"),
            OutputStream::Stderr => write!(f, "stderr"),
        }
    }
}

/// Addressable log buffer: one of the two stream buffers, or the
/// interleaved combined buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogChannel {
    Stdout,
    Stderr,
    Combined,
}

impl From<OutputStream> for LogChannel {
    fn from(stream: OutputStream) -> Self {
        match stream {
            OutputStream::Stdout => LogChannel::Stdout,
            OutputStream::Stderr => LogChannel::Stderr,
        }
    }
}

/// Emitted after a service's status transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub id: String,
    pub status: ServiceStatus,
    /// Present iff `status` is `error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Emitted after a line is appended to the log store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLine {
    pub id: String,
    pub line: String,
    pub stream: OutputStream,
}

/// Emitted after a service's hidden flag flips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HiddenChange {
    pub id: String,
    pub hidden: bool,
}

/// Tagged union over the three bus topics.
///
/// Serializes with `{"type": "status-change", ...fields}` format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "status-change")]
    StatusChange(StatusChange),
    #[serde(rename = "output")]
    Output(OutputLine),
    #[serde(rename = "hidden-change")]
    HiddenChange(HiddenChange),
}

impl From<StatusChange> for Event {
    fn from(ev: StatusChange) -> Self {
        Event::StatusChange(ev)
    }
}

impl From<OutputLine> for Event {
    fn from(ev: OutputLine) -> Self {
        Event::Output(ev)
    }
}

impl From<HiddenChange> for Event {
    fn from(ev: HiddenChange) -> Self {
        Event::HiddenChange(ev)
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
