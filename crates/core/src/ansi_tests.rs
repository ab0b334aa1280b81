// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn plain_text_unchanged() {
    assert_eq!(strip_ansi("listening on 5432"), "listening on 5432");
}

#[test]
fn color_codes_removed() {
    assert_eq!(strip_ansi("\x1b[32mready\x1b[0m to accept"), "ready to accept");
}

#[test]
fn cursor_sequences_removed() {
    assert_eq!(strip_ansi("\x1b[2K\x1b[1Gserver up"), "server up");
}
