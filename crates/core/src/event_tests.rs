// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn status_change_tagged_serialization() {
    let ev = Event::from(StatusChange {
        id: "api".to_string(),
        status: ServiceStatus::Running,
        error: None,
    });
    let json = serde_json::to_value(&ev).unwrap();
    assert_eq!(json["type"], "status-change");
    assert_eq!(json["id"], "api");
    assert_eq!(json["status"], "running");
    assert!(json.get("error").is_none());
}

#[test]
fn error_field_present_on_error_status() {
    let ev = Event::from(StatusChange {
        id: "db".to_string(),
        status: ServiceStatus::Error,
        error: Some("Exited with code 1".to_string()),
    });
    let json = serde_json::to_value(&ev).unwrap();
    assert_eq!(json["error"], "Exited with code 1");
}

#[test]
fn output_event_roundtrip() {
    let ev = Event::from(OutputLine {
        id: "api".to_string(),
        line: "listening on 8080".to_string(),
        stream: OutputStream::Stdout,
    });
    let json = serde_json::to_string(&ev).unwrap();
    let parsed: Event = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, ev);
}

#[test]
fn hidden_change_tag() {
    let ev = Event::from(HiddenChange { id: "api".to_string(), hidden: false });
    let json = serde_json::to_value(&ev).unwrap();
    assert_eq!(json["type"], "hidden-change");
    assert_eq!(json["hidden"], false);
}

#[test]
fn stream_maps_to_channel() {
    assert_eq!(LogChannel::from(OutputStream::Stdout), LogChannel::Stdout);
    assert_eq!(LogChannel::from(OutputStream::Stderr), LogChannel::Stderr);
}
