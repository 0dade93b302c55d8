// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Register: accessions grouped by container, persisted two ways.
//!
//! - Register directory: one `<container>.txt` per non-empty container,
//!   one accession per line. The working format mutated by `add`/`remove`.
//! - Register file: a single versioned export (`version <major>.<minor>`,
//!   then `<container>\t<count>` headers followed by `count` accession
//!   lines) for moving a dataset definition between machines.
//!
//! Blank lines and `#` comments are skipped in both formats.

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Register format version written by this tool.
pub const MAJOR_VERSION: u32 = 0;
pub const MINOR_VERSION: u32 = 0;

#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("a register is already present at location {0}")]
    AlreadyExists(PathBuf),
    #[error("missing version number at the beginning of the register file")]
    MissingVersion,
    #[error("malformed version line: {0:?}")]
    BadVersion(String),
    #[error(
        "incompatible register version {found}, this tool supports \
         up to {MAJOR_VERSION}.{MINOR_VERSION}"
    )]
    UnsupportedVersion { found: String },
    #[error("malformed container header: {0:?}")]
    BadHeader(String),
    #[error("unknown container {0:?} in register file")]
    UnknownContainer(String),
    #[error("container {name} declares {expected} accessions but the file ends after {got}")]
    TruncatedContainer { name: String, expected: usize, got: usize },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Accessions grouped by container name.
#[derive(Debug, Default)]
pub struct Register {
    accessions: BTreeMap<String, BTreeSet<String>>,
}

impl Register {
    /// An empty register knowing the given container keys.
    pub fn empty(keys: &[&str]) -> Self {
        let accessions = keys.iter().map(|key| (key.to_string(), BTreeSet::new())).collect();
        Self { accessions }
    }

    /// Load the per-container files found under `dirpath`. Missing files
    /// mean empty containers.
    pub fn load_from_dir(dirpath: &Path, keys: &[&str]) -> Result<Self, RegisterError> {
        let mut register = Self::empty(keys);
        for (name, accessions) in &mut register.accessions {
            let file = dirpath.join(format!("{name}.txt"));
            if !file.is_file() {
                continue;
            }
            for line in fs::read_to_string(&file)?.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                accessions.insert(line.to_string());
            }
        }
        tracing::debug!("register loaded from {}", dirpath.display());
        Ok(register)
    }

    /// Write one file per non-empty container under `dirpath`, removing
    /// files for containers that have become empty.
    pub fn save_to_dir(&self, dirpath: &Path) -> Result<(), RegisterError> {
        for (name, accessions) in &self.accessions {
            let file = dirpath.join(format!("{name}.txt"));
            if accessions.is_empty() {
                if file.exists() {
                    fs::remove_file(&file)?;
                }
                continue;
            }
            let mut contents = String::new();
            for acc in accessions {
                contents.push_str(acc);
                contents.push('\n');
            }
            fs::write(&file, contents)?;
        }
        tracing::debug!("register saved to {}", dirpath.display());
        Ok(())
    }

    /// Parse a versioned register export. Rejects registers written by a
    /// different major version or a newer minor version.
    pub fn load_from_file(path: &Path, keys: &[&str]) -> Result<Self, RegisterError> {
        let contents = fs::read_to_string(path)?;
        let mut lines = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'));

        let version_line = lines.next().ok_or(RegisterError::MissingVersion)?;
        check_version(version_line)?;

        let mut register = Self::empty(keys);
        while let Some(header) = lines.next() {
            let (name, count) = header
                .split_once('\t')
                .and_then(|(name, count)| Some((name, count.parse::<usize>().ok()?)))
                .ok_or_else(|| RegisterError::BadHeader(header.to_string()))?;
            let container = register
                .accessions
                .get_mut(name)
                .ok_or_else(|| RegisterError::UnknownContainer(name.to_string()))?;
            for read in 0..count {
                let acc = lines.next().ok_or_else(|| RegisterError::TruncatedContainer {
                    name: name.to_string(),
                    expected: count,
                    got: read,
                })?;
                container.insert(acc.to_string());
            }
        }
        Ok(register)
    }

    /// Write the versioned single-file export.
    pub fn save_to_file(&self, path: &Path) -> Result<(), RegisterError> {
        let mut contents = format!("version {MAJOR_VERSION}.{MINOR_VERSION}\n");
        for (name, accessions) in &self.accessions {
            if accessions.is_empty() {
                continue;
            }
            contents.push_str(&format!("{name}\t{}\n", accessions.len()));
            for acc in accessions {
                contents.push_str(acc);
                contents.push('\n');
            }
        }
        fs::write(path, contents)?;
        Ok(())
    }

    pub fn container_names(&self) -> impl Iterator<Item = &str> {
        self.accessions.keys().map(String::as_str)
    }

    pub fn accessions(&self, container: &str) -> Vec<String> {
        self.accessions.get(container).map(|set| set.iter().cloned().collect()).unwrap_or_default()
    }

    pub fn len(&self, container: &str) -> usize {
        self.accessions.get(container).map_or(0, BTreeSet::len)
    }

    pub fn is_empty(&self) -> bool {
        self.accessions.values().all(BTreeSet::is_empty)
    }

    /// Add accessions to a container. Returns how many were new.
    pub fn add(&mut self, container: &str, accessions: impl IntoIterator<Item = String>) -> usize {
        let Some(set) = self.accessions.get_mut(container) else {
            tracing::error!("container {container} not found in the register");
            return 0;
        };
        let before = set.len();
        set.extend(accessions);
        set.len() - before
    }

    pub fn remove_accession(&mut self, container: &str, accession: &str) -> bool {
        match self.accessions.get_mut(container) {
            Some(set) => set.remove(accession),
            None => false,
        }
    }

    /// Accessions of `container` matching at least one of the regexes.
    pub fn filter_accessions(&self, container: &str, regexps: &[Regex]) -> Vec<String> {
        let Some(set) = self.accessions.get(container) else {
            return Vec::new();
        };
        set.iter()
            .filter(|acc| regexps.iter().any(|re| re.is_match(acc)))
            .cloned()
            .collect()
    }
}

fn check_version(line: &str) -> Result<(), RegisterError> {
    let version = line
        .strip_prefix("version ")
        .ok_or_else(|| RegisterError::BadVersion(line.to_string()))?;
    let (major, minor) = version
        .split_once('.')
        .and_then(|(major, minor)| Some((major.parse::<u32>().ok()?, minor.parse::<u32>().ok()?)))
        .ok_or_else(|| RegisterError::BadVersion(line.to_string()))?;
    if major != MAJOR_VERSION || minor > MINOR_VERSION {
        return Err(RegisterError::UnsupportedVersion { found: version.to_string() });
    }
    Ok(())
}

/// Create a fresh register directory. Refuses to overwrite an existing one
/// unless `force` is set.
pub fn create_register(dirpath: &Path, keys: &[&str], force: bool) -> Result<Register, RegisterError> {
    if force && dirpath.exists() {
        fs::remove_dir_all(dirpath)?;
    }
    if dirpath.exists() {
        return Err(RegisterError::AlreadyExists(dirpath.to_path_buf()));
    }
    fs::create_dir_all(dirpath)?;
    let register = Register::empty(keys);
    register.save_to_dir(dirpath)?;
    Ok(register)
}

#[cfg(test)]
#[path = "register_tests.rs"]
mod tests;
