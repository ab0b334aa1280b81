// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn push_lands_in_stream_and_combined() {
    let store = LogStore::new(10);
    store.push("api", "out line", OutputStream::Stdout);
    store.push("api", "err line", OutputStream::Stderr);

    assert_eq!(store.lines("api", LogChannel::Stdout), vec!["out line"]);
    assert_eq!(store.lines("api", LogChannel::Stderr), vec!["err line"]);
    assert_eq!(store.lines("api", LogChannel::Combined), vec!["out line", "err line"]);
}

#[test]
fn services_are_isolated() {
    let store = LogStore::new(10);
    store.push("a", "from a", OutputStream::Stdout);
    store.push("b", "from b", OutputStream::Stdout);

    assert_eq!(store.lines("a", LogChannel::Combined), vec!["from a"]);
    assert_eq!(store.lines("b", LogChannel::Combined), vec!["from b"]);
}

#[test]
fn unknown_service_reads_empty() {
    let store = LogStore::new(10);
    assert!(store.lines("ghost", LogChannel::Combined).is_empty());
    assert_eq!(store.len("ghost", LogChannel::Stdout), 0);
    assert!(store.tail("ghost", LogChannel::Stderr, 5).is_empty());
}

#[test]
fn capacity_bounds_every_channel() {
    let store = LogStore::new(3);
    for i in 0..10 {
        store.push("api", &format!("line {i}"), OutputStream::Stdout);
    }
    assert_eq!(store.len("api", LogChannel::Stdout), 3);
    assert_eq!(store.len("api", LogChannel::Combined), 3);
    assert_eq!(
        store.lines("api", LogChannel::Combined),
        vec!["line 7", "line 8", "line 9"]
    );
}

#[test]
fn tail_returns_recent_lines() {
    let store = LogStore::new(100);
    for i in 0..5 {
        store.push("api", &format!("{i}"), OutputStream::Stdout);
    }
    assert_eq!(store.tail("api", LogChannel::Combined, 2), vec!["3", "4"]);
}

#[test]
fn clear_resets_all_channels() {
    let store = LogStore::new(10);
    store.push("api", "x", OutputStream::Stdout);
    store.push("api", "y", OutputStream::Stderr);
    store.clear("api");
    assert_eq!(store.len("api", LogChannel::Stdout), 0);
    assert_eq!(store.len("api", LogChannel::Stderr), 0);
    assert_eq!(store.len("api", LogChannel::Combined), 0);
}
