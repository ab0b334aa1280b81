// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Target resolution: names on the command line → runnable ids.

use crate::error::ManifestError;
use crate::types::Manifest;

/// Maximum edit distance for a "did you mean" suggestion.
const MAX_SUGGESTION_DISTANCE: usize = 3;

/// Resolve target names to runnable ids.
///
/// Resolution is case-sensitive and tries groups before runnables. An
/// empty name list selects every runnable, in declaration order. The
/// result is deduplicated, preserving first occurrence.
pub fn resolve_targets(manifest: &Manifest, names: &[String]) -> Result<Vec<String>, ManifestError> {
    if names.is_empty() {
        return Ok(manifest.runnables.keys().cloned().collect());
    }

    let mut resolved = Vec::new();
    for name in names {
        if let Some(members) = manifest.groups.get(name) {
            for member in members {
                if !manifest.runnables.contains_key(member) {
                    return Err(ManifestError::GroupUnknownService {
                        group: name.clone(),
                        service: member.clone(),
                    });
                }
                push_unique(&mut resolved, member);
            }
        } else if manifest.runnables.contains_key(name) {
            push_unique(&mut resolved, name);
        } else {
            return Err(ManifestError::UnknownTarget {
                name: name.clone(),
                suggestion: suggest(manifest, name),
            });
        }
    }
    Ok(resolved)
}

fn push_unique(resolved: &mut Vec<String>, id: &str) {
    if !resolved.iter().any(|existing| existing == id) {
        resolved.push(id.to_string());
    }
}

/// Suggest the closest known name: prefix match first, then the best
/// Levenshtein candidate within [`MAX_SUGGESTION_DISTANCE`].
fn suggest(manifest: &Manifest, name: &str) -> Option<String> {
    let known = manifest.runnables.keys().chain(manifest.groups.keys());

    if let Some(prefix_match) = known.clone().find(|k| k.starts_with(name)) {
        return Some(prefix_match.clone());
    }

    known
        .map(|k| (strsim::levenshtein(k, name), k))
        .filter(|(distance, _)| *distance <= MAX_SUGGESTION_DISTANCE)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, k)| k.clone())
}

#[cfg(test)]
#[path = "target_tests.rs"]
mod tests;
