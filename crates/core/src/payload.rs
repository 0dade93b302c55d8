// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Staging payloads executed by the isolated payload worker.
//!
//! Source adapters finish their pipelines with an in-process routine that
//! moves artifacts out of a per-accession staging directory into the final
//! data directory. Those routines run in a separate OS process (re-entering
//! the binary via [`crate::PAYLOAD_WORKER_ARG`]) so a fault in staging logic
//! cannot kill the scheduler and a stuck move can be terminated. `Payload`
//! is the serialized form that crosses the process boundary.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("md5 mismatch for {file}: expected {expected}, got {actual}")]
    ChecksumMismatch { file: String, expected: String, actual: String },
    #[error("staging directory {0} has no basename")]
    BadStagingDir(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A staging routine plus its arguments. The checksum map is always a
/// per-call value; nothing here is shared between invocations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Payload {
    /// Optionally verify md5 sums, then move the staged files into
    /// `final_dir/<staging basename>` and remove the staging directory.
    /// A mismatch removes the staging directory and fails, leaving clean
    /// state for a rerun.
    MoveAndClean {
        staging_dir: PathBuf,
        final_dir: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        checksums: Option<BTreeMap<String, String>>,
    },
    /// Move compressed read files (`*.gz`) flat into `final_dir`, then
    /// remove the whole scratch directory.
    MoveReads {
        staging_dir: PathBuf,
        final_dir: PathBuf,
        scratch_dir: PathBuf,
    },
    /// Move each dataset directory out of an unzipped assembly catalog
    /// (`<unzip_dir>/ncbi_dataset/data/*`) into `final_dir`, then remove
    /// the scratch directory.
    PromoteAssemblies {
        unzip_dir: PathBuf,
        final_dir: PathBuf,
        scratch_dir: PathBuf,
    },
}

impl Payload {
    pub fn name(&self) -> &'static str {
        match self {
            Payload::MoveAndClean { .. } => "move_and_clean",
            Payload::MoveReads { .. } => "move_reads",
            Payload::PromoteAssemblies { .. } => "promote_assemblies",
        }
    }

    pub fn execute(&self) -> Result<(), PayloadError> {
        match self {
            Payload::MoveAndClean { staging_dir, final_dir, checksums } => {
                move_and_clean(staging_dir, final_dir, checksums.as_ref())
            }
            Payload::MoveReads { staging_dir, final_dir, scratch_dir } => {
                move_reads(staging_dir, final_dir, scratch_dir)
            }
            Payload::PromoteAssemblies { unzip_dir, final_dir, scratch_dir } => {
                promote_assemblies(unzip_dir, final_dir, scratch_dir)
            }
        }
    }
}

/// Entry point for the isolated worker process. Writes the framing header
/// to stdout (redirected into the job's log file), runs the payload, and
/// maps the outcome to the process exit code.
pub fn worker_main(raw: &str) -> i32 {
    let payload: Payload = match serde_json::from_str(raw) {
        Ok(payload) => payload,
        Err(err) => {
            eprintln!("invalid payload: {err}");
            return 2;
        }
    };
    println!("{} {}", payload.name(), raw);
    match payload.execute() {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("{err}");
            1
        }
    }
}

fn move_and_clean(
    staging_dir: &Path,
    final_dir: &Path,
    checksums: Option<&BTreeMap<String, String>>,
) -> Result<(), PayloadError> {
    if let Some(checksums) = checksums {
        for (file, expected) in checksums {
            let actual = md5_of(&staging_dir.join(file))?;
            if &actual != expected {
                // Leave nothing behind so a rerun starts from scratch.
                let _ = fs::remove_dir_all(staging_dir);
                return Err(PayloadError::ChecksumMismatch {
                    file: file.clone(),
                    expected: expected.clone(),
                    actual,
                });
            }
        }
    }

    let basename = staging_dir
        .file_name()
        .ok_or_else(|| PayloadError::BadStagingDir(staging_dir.to_path_buf()))?;
    let dest = final_dir.join(basename);
    fs::create_dir_all(&dest)?;

    let filenames: Vec<PathBuf> = match checksums {
        Some(checksums) => checksums.keys().map(PathBuf::from).collect(),
        None => fs::read_dir(staging_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| PathBuf::from(entry.file_name()))
            .collect(),
    };
    for filename in filenames {
        move_path(&staging_dir.join(&filename), &dest.join(&filename))?;
    }
    fs::remove_dir_all(staging_dir)?;
    Ok(())
}

fn move_reads(staging_dir: &Path, final_dir: &Path, scratch_dir: &Path) -> Result<(), PayloadError> {
    for entry in fs::read_dir(staging_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if name.to_string_lossy().ends_with(".gz") {
            move_path(&entry.path(), &final_dir.join(&name))?;
        }
    }
    fs::remove_dir_all(scratch_dir)?;
    Ok(())
}

fn promote_assemblies(
    unzip_dir: &Path,
    final_dir: &Path,
    scratch_dir: &Path,
) -> Result<(), PayloadError> {
    let data_dir = unzip_dir.join("ncbi_dataset").join("data");
    for entry in fs::read_dir(&data_dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            move_path(&entry.path(), &final_dir.join(entry.file_name()))?;
        }
    }
    fs::remove_dir_all(scratch_dir)?;
    Ok(())
}

/// Move a file or directory, falling back to copy-and-remove when the
/// rename crosses filesystems (staging lives under the system tmpdir).
fn move_path(src: &Path, dst: &Path) -> Result<(), PayloadError> {
    if fs::rename(src, dst).is_ok() {
        return Ok(());
    }
    if src.is_dir() {
        copy_dir(src, dst)?;
        fs::remove_dir_all(src)?;
    } else {
        fs::copy(src, dst)?;
        fs::remove_file(src)?;
    }
    Ok(())
}

fn copy_dir(src: &Path, dst: &Path) -> Result<(), PayloadError> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let to = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &to)?;
        } else {
            fs::copy(entry.path(), &to)?;
        }
    }
    Ok(())
}

fn md5_of(path: &Path) -> Result<String, PayloadError> {
    let mut file = fs::File::open(path)?;
    let mut context = md5::Context::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        context.consume(&buf[..n]);
    }
    Ok(format!("{:x}", context.compute()))
}

#[cfg(test)]
#[path = "payload_tests.rs"]
mod tests;
