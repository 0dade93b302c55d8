// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod add;
pub mod download;
pub mod export;
pub mod init;
pub mod list;
pub mod remove;

use std::path::PathBuf;

/// Default scratch directory for staging intermediate files.
pub(crate) fn default_tmp_dir() -> PathBuf {
    std::env::temp_dir().join("sqd")
}

/// Compile user-supplied patterns, warning about (and skipping) invalid ones.
pub(crate) fn compile_patterns(patterns: &[String]) -> Vec<regex::Regex> {
    patterns
        .iter()
        .filter_map(|pattern| match regex::Regex::new(pattern) {
            Ok(regex) => Some(regex),
            Err(_) => {
                tracing::warn!("invalid regular expression {pattern:?}, not used for search");
                None
            }
        })
        .collect()
}
