// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for binary specs.

use std::path::Path;
use std::process::Output;

/// A throwaway project directory the `rig` binary runs against.
pub struct Project {
    temp: tempfile::TempDir,
}

impl Project {
    pub fn empty() -> Self {
        Self { temp: tempfile::tempdir().expect("create temp project") }
    }

    /// Project with a `rig.toml`.
    pub fn with_manifest(manifest: &str) -> Self {
        let project = Self::empty();
        project.file("rig.toml", manifest);
        project
    }

    #[allow(dead_code)]
    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub fn file(&self, rel: &str, content: &str) {
        let path = self.temp.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dirs");
        }
        std::fs::write(path, content).expect("write project file");
    }

    /// A `rig` invocation rooted at this project.
    pub fn rig(&self) -> Spec {
        let mut cmd = assert_cmd::Command::cargo_bin("rig").expect("rig binary built");
        cmd.current_dir(self.temp.path());
        Spec { cmd }
    }
}

/// One `rig` invocation under test.
pub struct Spec {
    cmd: assert_cmd::Command,
}

impl Spec {
    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    /// Run and require exit 0.
    pub fn passes(mut self) -> SpecOutput {
        let output = self.cmd.output().expect("run rig");
        assert!(
            output.status.success(),
            "expected success, got {:?}\nstdout: {}\nstderr: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
        SpecOutput { output }
    }

    /// Run and require the given non-zero exit code.
    pub fn fails_with(mut self, code: i32) -> SpecOutput {
        let output = self.cmd.output().expect("run rig");
        assert_eq!(
            output.status.code(),
            Some(code),
            "expected exit {code}\nstdout: {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
        SpecOutput { output }
    }
}

pub struct SpecOutput {
    output: Output,
}

impl SpecOutput {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).to_string()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).to_string()
    }

    pub fn stdout_has(self, needle: &str) -> Self {
        assert!(
            self.stdout().contains(needle),
            "stdout missing {needle:?}:\n{}",
            self.stdout()
        );
        self
    }

    pub fn stdout_is(self, expected: &str) -> Self {
        assert_eq!(self.stdout(), expected);
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        assert!(
            self.stderr().contains(needle),
            "stderr missing {needle:?}:\n{}",
            self.stderr()
        );
        self
    }
}
