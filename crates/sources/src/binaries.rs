// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! External tool probing and download helpers shared by adapters that
//! depend on archive CLIs.

use crate::subprocess::{run_with_timeout, INSTALL_TIMEOUT, QUERY_TIMEOUT};
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// True when `binary --version` runs and exits 0.
pub async fn check_binary(binary: impl AsRef<Path>) -> bool {
    let mut cmd = Command::new(binary.as_ref());
    cmd.arg("--version");
    match run_with_timeout(cmd, QUERY_TIMEOUT, "version probe").await {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}

/// Resolve a tool by name: `PATH` first, then `bin_dir/<name>`.
pub async fn resolve_binary(name: &str, bin_dir: &Path) -> Option<PathBuf> {
    if check_binary(name).await {
        return Some(PathBuf::from(name));
    }
    let local = bin_dir.join(name);
    if check_binary(&local).await {
        return Some(local);
    }
    None
}

/// Fetch `url` into `dest` with curl. Returns false on any failure.
pub async fn download_file(url: &str, dest: &Path) -> bool {
    let mut cmd = Command::new("curl");
    cmd.arg("-sL").arg("-o").arg(dest).arg(url);
    match run_with_timeout(cmd, INSTALL_TIMEOUT, "binary download").await {
        Ok(output) => output.status.success(),
        Err(err) => {
            tracing::error!("download of {url} failed: {err}");
            false
        }
    }
}

/// Mark a downloaded binary executable.
pub fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = std::fs::metadata(path)?.permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms)
}
