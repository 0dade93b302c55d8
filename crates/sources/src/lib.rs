// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sqd-sources: the source adapters.
//!
//! One adapter per archive kind. Each knows how to validate accessions of
//! its kind, how to pace queries against its origin server, and how to
//! expand accessions into the job DAG that downloads them.

pub mod binaries;
pub mod ena;
pub mod logan;
pub mod ncbi;
pub mod sra;
pub mod subprocess;
pub mod url;

use sqd_core::SourceAdapter;
use std::path::PathBuf;
use std::sync::Arc;

/// Container keys in register order.
pub const CONTAINER_KEYS: [&str; 5] = ["ena", "logan", "ncbi", "sra", "url"];

/// Directories shared by every adapter: a scratch area for staging and a
/// directory for locally installed helper tools.
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub tmp_dir: PathBuf,
    pub bin_dir: PathBuf,
}

/// Adapter construction options fixed for the lifetime of the adapters.
#[derive(Debug, Clone, Default)]
pub struct SourceOptions {
    /// Download unitigs instead of contigs for logan accessions.
    pub logan_unitigs: bool,
}

/// Instantiate the adapter serving one container key. Adapters that need
/// external tools probe for them here (and attempt an install when
/// missing); the outcome is reported through `is_ready`.
pub async fn adapter_for(
    key: &str,
    ctx: &SourceContext,
    opts: &SourceOptions,
) -> Option<Arc<dyn SourceAdapter>> {
    let adapter: Arc<dyn SourceAdapter> = match key {
        "ena" => Arc::new(ena::Ena::new(ctx.clone())),
        "logan" => Arc::new(logan::Logan::new(ctx.clone(), opts.logan_unitigs)),
        "ncbi" => Arc::new(ncbi::Ncbi::new(ctx.clone()).await),
        "sra" => Arc::new(sra::Sra::new(ctx.clone()).await),
        "url" => Arc::new(url::UrlSource::new()),
        _ => return None,
    };
    Some(adapter)
}

/// Recreate a per-accession staging directory, wiping leftovers from an
/// interrupted run.
pub(crate) fn recreate_staging(dir: &std::path::Path) -> std::io::Result<()> {
    if dir.exists() {
        std::fs::remove_dir_all(dir)?;
    }
    std::fs::create_dir_all(dir)
}

/// Names already present in the data directory; used to skip accessions
/// that a previous run fully downloaded.
pub(crate) fn downloaded_names(datadir: &std::path::Path) -> std::collections::BTreeSet<String> {
    match std::fs::read_dir(datadir) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Default::default(),
    }
}
