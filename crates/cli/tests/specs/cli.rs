// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI surface: argument handling, resolution, error exit codes.

use crate::specs::prelude::*;

const MANIFEST: &str = r#"
[runnable.db]
command = "sleep 5"

[runnable.api]
command = "sleep 5"
depends_on = ["db"]

[runnable.worker]
command = "sleep 5"

[group]
backend = ["db", "api"]
"#;

#[test]
fn help_describes_the_tool() {
    Project::empty()
        .rig()
        .args(&["--help"])
        .passes()
        .stdout_has("Supervise a project's local dev services")
        .stdout_has("up")
        .stdout_has("run")
        .stdout_has("status");
}

#[test]
fn resolve_defaults_to_all_runnables() {
    Project::with_manifest(MANIFEST)
        .rig()
        .args(&["resolve"])
        .passes()
        .stdout_is("db\napi\nworker\n");
}

#[test]
fn resolve_expands_groups() {
    Project::with_manifest(MANIFEST)
        .rig()
        .args(&["resolve", "backend"])
        .passes()
        .stdout_is("db\napi\n");
}

#[test]
fn resolve_deduplicates_targets() {
    Project::with_manifest(MANIFEST)
        .rig()
        .args(&["resolve", "api", "backend"])
        .passes()
        .stdout_is("api\ndb\n");
}

#[test]
fn unknown_target_exits_one_with_suggestion() {
    Project::with_manifest(MANIFEST)
        .rig()
        .args(&["resolve", "wor"])
        .fails_with(1)
        .stderr_has("Unknown target 'wor'")
        .stderr_has("worker");
}

#[test]
fn group_with_unknown_member_exits_one() {
    Project::with_manifest(
        "[runnable.a]\ncommand = \"sleep 1\"\n\n[group]\nbroken = [\"a\", \"ghost\"]\n",
    )
    .rig()
    .args(&["resolve", "broken"])
    .fails_with(1)
    .stderr_has("Group broken references unknown service ghost");
}

#[test]
fn missing_manifest_exits_one() {
    Project::empty().rig().args(&["resolve"]).fails_with(1).stderr_has("rig.toml");
}

#[test]
fn invalid_manifest_exits_one() {
    Project::with_manifest("[runnable.x]\ncommand = \"\"\n")
        .rig()
        .args(&["resolve"])
        .fails_with(1)
        .stderr_has("empty command");
}

#[test]
fn run_streams_output_and_exits_zero() {
    Project::empty().rig().args(&["run", "--", "echo", "hi"]).passes().stdout_has("hi");
}

#[test]
fn run_mirrors_the_child_exit_code() {
    Project::empty().rig().args(&["run", "--", "exit 3"]).fails_with(3);
}

#[test]
fn status_without_supervisor_reports_cleanly() {
    Project::with_manifest(MANIFEST)
        .rig()
        .args(&["status"])
        .passes()
        .stdout_has("no supervisor running");
}
