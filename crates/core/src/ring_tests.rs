// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn push_within_capacity_keeps_all() {
    let mut ring = RingBuffer::new(3);
    ring.push(1);
    ring.push(2);
    assert_eq!(ring.to_vec(), vec![1, 2]);
    assert_eq!(ring.len(), 2);
}

#[test]
fn push_beyond_capacity_drops_oldest() {
    let mut ring = RingBuffer::new(3);
    for i in 1..=5 {
        ring.push(i);
    }
    assert_eq!(ring.to_vec(), vec![3, 4, 5]);
    assert_eq!(ring.len(), 3);
}

#[test]
fn len_never_exceeds_capacity() {
    let mut ring = RingBuffer::new(10);
    for i in 0..1000 {
        ring.push(i);
        assert!(ring.len() <= 10);
    }
}

#[test]
fn zero_capacity_discards_everything() {
    let mut ring = RingBuffer::new(0);
    ring.push("a");
    ring.push("b");
    assert!(ring.is_empty());
    assert_eq!(ring.to_vec(), Vec::<&str>::new());
    assert_eq!(ring.tail(5), Vec::<&str>::new());
}

#[test]
fn tail_returns_most_recent_in_insertion_order() {
    let mut ring = RingBuffer::new(5);
    for i in 1..=5 {
        ring.push(i);
    }
    assert_eq!(ring.tail(2), vec![4, 5]);
    assert_eq!(ring.tail(0), Vec::<i32>::new());
}

#[test]
fn tail_larger_than_len_returns_all() {
    let mut ring = RingBuffer::new(5);
    ring.push(1);
    ring.push(2);
    assert_eq!(ring.tail(100), vec![1, 2]);
}

#[test]
fn clear_empties_buffer() {
    let mut ring = RingBuffer::new(3);
    ring.push(1);
    ring.clear();
    assert!(ring.is_empty());
    assert_eq!(ring.capacity(), 3);
}
