// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Manifest error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from parsing, discovering, or resolving against a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse manifest: {0}")]
    Parse(#[from] Box<toml::de::Error>),

    #[error("no {file} found in {} or any parent directory", .start.display())]
    NotFound { file: &'static str, start: PathBuf },

    #[error("runnable '{id}' has an empty command")]
    EmptyCommand { id: String },

    #[error("runnable '{id}' declares both a command and a container")]
    AmbiguousKind { id: String },

    #[error("runnable '{id}' has an invalid ready_when pattern: {source}")]
    InvalidReadyWhen {
        id: String,
        #[source]
        source: Box<regex::Error>,
    },

    #[error("Unknown target '{name}'{}", suggestion_fragment(.suggestion))]
    UnknownTarget { name: String, suggestion: Option<String> },

    #[error("Group {group} references unknown service {service}")]
    GroupUnknownService { group: String, service: String },
}

fn suggestion_fragment(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(" (did you mean '{s}'?)"),
        None => String::new(),
    }
}
