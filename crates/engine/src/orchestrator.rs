// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Download orchestration: one `download` invocation end to end.

use sqd_core::container::ContainerSet;
use sqd_core::job::Job;
use std::collections::VecDeque;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::scheduler::JobManager;

/// How often the orchestrator polls the scheduler for completion.
const DRAIN_POLL: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("failed to prepare {dir}: {source}")]
    Prepare {
        dir: String,
        #[source]
        source: std::io::Error,
    },
}

/// Drives the containers of one register through the scheduler.
pub struct DownloadManager {
    containers: Vec<ContainerSet>,
}

impl DownloadManager {
    pub fn new(containers: Vec<ContainerSet>) -> Self {
        Self { containers }
    }

    /// Download every registered dataset into `datadir`, writing one log
    /// file per started job under `logdir`.
    ///
    /// Individual job failures never surface here: the run completes
    /// normally and failures are reported through the logs and per-job
    /// return codes. Only being unable to prepare the directories is an
    /// error.
    pub async fn download_to(
        &self,
        datadir: &Path,
        logdir: &Path,
        max_process: usize,
    ) -> Result<(), DownloadError> {
        prepare_dirs(datadir, logdir).await?;

        // One job list per downloadable container.
        let mut job_lists: Vec<VecDeque<Job>> = Vec::new();
        for set in &self.containers {
            if set.accessions.is_empty() {
                continue;
            }
            if !set.adapter.is_ready() {
                tracing::warn!(
                    "{} accessions from {} cannot be downloaded: required tools are missing. Skipping.",
                    set.accessions.len(),
                    set.name
                );
                continue;
            }
            let jobs = set.adapter.jobs_from_accessions(&set.accessions, datadir).await;
            tracing::info!("{} datasets from {} will be downloaded.", set.accessions.len(), set.name);
            job_lists.push(jobs.into());
        }

        let manager = JobManager::start(max_process, logdir.to_path_buf());

        // Interleave submissions across containers so the head of the
        // waiting queue spans sources: under a tight parallelism cap every
        // source still makes progress from the first tick.
        loop {
            let mut submitted = false;
            for list in &mut job_lists {
                if let Some(job) = list.pop_front() {
                    manager.submit(job);
                    submitted = true;
                }
            }
            if !submitted {
                break;
            }
        }

        while manager.remaining() > 0 {
            tokio::time::sleep(DRAIN_POLL).await;
        }

        manager.stop();
        manager.join().await;
        Ok(())
    }
}

/// Create the data directory and a fresh log directory. A run always
/// starts with an empty `logdir`.
async fn prepare_dirs(datadir: &Path, logdir: &Path) -> Result<(), DownloadError> {
    let ctx = |dir: &Path| {
        let dir = dir.display().to_string();
        move |source| DownloadError::Prepare { dir, source }
    };
    tokio::fs::create_dir_all(datadir).await.map_err(ctx(datadir))?;
    if logdir.exists() {
        tokio::fs::remove_dir_all(logdir).await.map_err(ctx(logdir))?;
    }
    tokio::fs::create_dir_all(logdir).await.map_err(ctx(logdir))?;
    Ok(())
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
