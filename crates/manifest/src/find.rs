// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Manifest file discovery.

use crate::error::ManifestError;
use crate::types::Manifest;
use std::path::{Path, PathBuf};

/// The manifest file name searched for, starting at the working
/// directory and walking toward the filesystem root.
pub const MANIFEST_FILE_NAME: &str = "rig.toml";

/// A located manifest file.
#[derive(Debug, Clone)]
pub struct ManifestFile {
    /// Absolute path to the manifest file.
    pub path: PathBuf,
    /// The directory containing the manifest. This is the project root
    /// used for state-file identity.
    pub project_root: PathBuf,
}

/// Walk upward from `start` looking for [`MANIFEST_FILE_NAME`].
pub fn find_manifest(start: &Path) -> Result<ManifestFile, ManifestError> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        let candidate = current.join(MANIFEST_FILE_NAME);
        if candidate.is_file() {
            return Ok(ManifestFile {
                path: candidate,
                project_root: current.to_path_buf(),
            });
        }
        dir = current.parent();
    }
    Err(ManifestError::NotFound { file: MANIFEST_FILE_NAME, start: start.to_path_buf() })
}

/// Read and parse a manifest from disk.
pub fn load_manifest(path: &Path) -> Result<Manifest, ManifestError> {
    let content = std::fs::read_to_string(path)?;
    let manifest = Manifest::parse(&content)?;
    tracing::debug!(
        path = %path.display(),
        runnables = manifest.runnables.len(),
        groups = manifest.groups.len(),
        "loaded manifest"
    );
    Ok(manifest)
}

#[cfg(test)]
#[path = "find_tests.rs"]
mod tests;
