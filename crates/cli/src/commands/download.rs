// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `sqd download`: materialize every registered accession.

use anyhow::Result;
use clap::Args;
use sqd_core::ContainerSet;
use sqd_engine::DownloadManager;
use sqd_sources::{adapter_for, SourceContext, SourceOptions, CONTAINER_KEYS};
use sqd_storage::Register;
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct DownloadArgs {
    /// Directory where all the data will be downloaded
    #[arg(short, long, default_value = "data")]
    pub download_directory: PathBuf,

    /// Number of processes to run in parallel
    #[arg(short = 'p', long, default_value_t = default_processes())]
    pub max_processes: usize,

    /// Temporary directory to store and organize the downloaded files
    #[arg(short, long, default_value_os_t = super::default_tmp_dir())]
    pub tmp_directory: PathBuf,

    /// Directory where all the logs will be stored
    #[arg(long, default_value = "logs")]
    pub log_directory: PathBuf,
}

/// Half the available cores, at least one.
fn default_processes() -> usize {
    (available_threads() / 2).max(1)
}

fn available_threads() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get).max(1)
}

pub async fn run(args: &DownloadArgs, location: &Path) -> Result<()> {
    let mut max_processes = args.max_processes.max(1);
    let available = available_threads();
    if max_processes > available {
        tracing::warn!(
            "the maximal number of threads available is {available}, \
             set '--max-processes {available}'"
        );
        max_processes = available;
    }

    let ctx = SourceContext {
        tmp_dir: args.tmp_directory.clone(),
        bin_dir: location.join("bin"),
    };
    let register = Register::load_from_dir(location, &CONTAINER_KEYS)?;

    // Only build adapters for populated containers: constructing the NCBI
    // and SRA adapters probes (and may install) their external tools.
    let mut containers: Vec<ContainerSet> = Vec::new();
    for key in CONTAINER_KEYS {
        let accessions = register.accessions(key);
        if accessions.is_empty() {
            continue;
        }
        if let Some(adapter) = adapter_for(key, &ctx, &SourceOptions::default()).await {
            containers.push(ContainerSet::new(adapter, accessions));
        }
    }

    DownloadManager::new(containers)
        .download_to(&args.download_directory, &args.log_directory, max_processes)
        .await?;
    Ok(())
}
