// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! NCBI assembly catalog adapter.
//!
//! Downloads genome assemblies through the `datasets` CLI in batches:
//! a dehydrated archive is fetched, unzipped, rehydrated, and the dataset
//! directories are promoted into the data directory. Queries against NCBI
//! are paced to one per second.

use crate::binaries::{check_binary, download_file, make_executable, resolve_binary};
use crate::subprocess::{run_with_timeout, QUERY_TIMEOUT};
use crate::{recreate_staging, SourceContext};
use async_trait::async_trait;
use regex::Regex;
use sqd_core::{Job, Pacer, Payload, SourceAdapter};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::process::Command;

const MIN_DELAY: Duration = Duration::from_secs(1);
/// Accessions bundled into one dehydrated download.
const BATCH_SIZE: usize = 5;
/// Accessions validated per summary query.
const ACCESSIONS_PER_QUERY: usize = 32;

const DOWNLOAD_LINKS: &[(&str, &str)] = &[
    ("x86_64", "https://ftp.ncbi.nlm.nih.gov/pub/datasets/command-line/v2/linux-amd64/datasets"),
    ("aarch64", "https://ftp.ncbi.nlm.nih.gov/pub/datasets/command-line/v2/linux-arm64/datasets"),
];

fn accession_format() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^GC[AF]_[0-9]{9}\.[0-9]+$").unwrap_or_else(|_| unreachable!()))
}

pub struct Ncbi {
    ctx: SourceContext,
    pacer: Arc<Pacer>,
    bin: Option<PathBuf>,
    batch_seq: AtomicU64,
}

impl Ncbi {
    /// Probe for the `datasets` CLI, attempting a local install when it is
    /// missing. An unresolved binary leaves the adapter unready.
    pub async fn new(ctx: SourceContext) -> Self {
        let bin = match resolve_binary("datasets", &ctx.bin_dir).await {
            Some(bin) => Some(bin),
            None => install_datasets(&ctx.bin_dir).await,
        };
        Self { ctx, pacer: Arc::new(Pacer::new(MIN_DELAY)), bin, batch_seq: AtomicU64::new(0) }
    }

    pub fn is_valid_format(accession: &str) -> bool {
        accession_format().is_match(accession)
    }

    /// Ask NCBI which of the well-formed accessions actually exist.
    async fn validate_on_server(&self, bin: &Path, accessions: &[String]) -> Vec<String> {
        let mut valid = Vec::new();
        let mut unknown: BTreeSet<String> = BTreeSet::new();

        for chunk in accessions.chunks(ACCESSIONS_PER_QUERY) {
            let mut cmd = Command::new(bin);
            cmd.args(["summary", "genome", "accession"]).args(chunk);

            let turn = self.pacer.wait_my_turn().await;
            let output = run_with_timeout(cmd, QUERY_TIMEOUT, "datasets summary").await;
            drop(turn);

            let output = match output {
                Ok(output) if output.status.success() => output,
                _ => {
                    tracing::error!("failed to query NCBI for accessions: {}", chunk.join(", "));
                    continue;
                }
            };

            let mut pending: BTreeSet<&str> = chunk.iter().map(String::as_str).collect();
            match serde_json::from_slice::<serde_json::Value>(&output.stdout) {
                Ok(summary) => {
                    for report in summary["reports"].as_array().into_iter().flatten() {
                        if let Some(acc) = report["accession"].as_str() {
                            if pending.remove(acc) {
                                valid.push(acc.to_string());
                            }
                        }
                    }
                    unknown.extend(pending.iter().map(|acc| acc.to_string()));
                }
                Err(_) => {
                    tracing::error!(
                        "failed to parse the NCBI response for accessions: {}",
                        chunk.join(", ")
                    );
                }
            }
        }

        if !unknown.is_empty() {
            tracing::warn!(
                "unknown accessions: {}",
                unknown.into_iter().collect::<Vec<_>>().join(", ")
            );
        }
        valid
    }
}

#[async_trait]
impl SourceAdapter for Ncbi {
    fn name(&self) -> &'static str {
        "ncbi"
    }

    fn is_ready(&self) -> bool {
        self.bin.is_some()
    }

    fn pacer(&self) -> &Arc<Pacer> {
        &self.pacer
    }

    async fn jobs_from_accessions(&self, accessions: &[String], datadir: &Path) -> Vec<Job> {
        let Some(bin) = &self.bin else {
            return Vec::new();
        };

        let mut jobs = Vec::with_capacity(accessions.len() / BATCH_SIZE * 4 + 4);
        for batch in accessions.chunks(BATCH_SIZE) {
            let batch_name = format!("ncbi_job_{}", self.batch_seq.fetch_add(1, Ordering::Relaxed));
            let scratch = self.ctx.tmp_dir.join(&batch_name);
            if let Err(err) = recreate_staging(&scratch) {
                tracing::error!("cannot create staging directory {}: {err}", scratch.display());
                continue;
            }

            let archive = scratch.join(format!("{batch_name}.zip"));
            let download = Job::command(
                format!("{batch_name}_download"),
                format!(
                    "{} download genome accession --dehydrated --no-progressbar --filename {} {}",
                    bin.display(),
                    archive.display(),
                    batch.join(" ")
                ),
            )
            .with_gate(self.pacer.gate());

            let unzip_dir = scratch.join(&batch_name);
            let unzip = Job::command(
                format!("{batch_name}_unzip"),
                format!("unzip -n {} -d {}", archive.display(), unzip_dir.display()),
            )
            .with_parents(&[&download]);

            let rehydrate = Job::command(
                format!("{batch_name}_rehydrate"),
                format!(
                    "{} rehydrate --gzip --no-progressbar --directory {}",
                    bin.display(),
                    unzip_dir.display()
                ),
            )
            .with_parents(&[&unzip])
            .with_gate(self.pacer.gate());

            let promote = Job::function(
                format!("{batch_name}_clean"),
                Payload::PromoteAssemblies {
                    unzip_dir,
                    final_dir: datadir.to_path_buf(),
                    scratch_dir: scratch,
                },
            )
            .with_parents(&[&rehydrate]);

            jobs.extend([download, unzip, rehydrate, promote]);
        }
        jobs
    }

    async fn filter_valid(&self, accessions: Vec<String>) -> Vec<String> {
        let (well_formed, malformed): (Vec<String>, Vec<String>) =
            accessions.into_iter().partition(|acc| Self::is_valid_format(acc));
        if !malformed.is_empty() {
            tracing::warn!(
                "wrong format accessions: {}. Expecting GCA_XXXXXXXXX.Y or GCF_XXXXXXXXX.Y",
                malformed.join(", ")
            );
        }
        match &self.bin {
            Some(bin) => self.validate_on_server(bin, &well_formed).await,
            None => {
                tracing::warn!("datasets tool unavailable, skipping NCBI server validation");
                well_formed
            }
        }
    }
}

/// Download the `datasets` CLI into the local bin directory.
async fn install_datasets(bin_dir: &Path) -> Option<PathBuf> {
    if std::env::consts::OS != "linux" {
        tracing::error!(
            "ncbi datasets auto-install is not supported on {}; install the datasets CLI yourself",
            std::env::consts::OS
        );
        return None;
    }
    let link = DOWNLOAD_LINKS
        .iter()
        .find(|(arch, _)| *arch == std::env::consts::ARCH)
        .map(|(_, link)| *link)?;

    tracing::info!("downloading the ncbi datasets CLI...");
    if let Err(err) = std::fs::create_dir_all(bin_dir) {
        tracing::error!("cannot create {}: {err}", bin_dir.display());
        return None;
    }
    let dest = bin_dir.join("datasets");
    if !download_file(link, &dest).await {
        tracing::error!("failed to download the ncbi datasets CLI from {link}");
        return None;
    }
    if let Err(err) = make_executable(&dest) {
        tracing::error!("failed to set executable permissions on {}: {err}", dest.display());
        return None;
    }
    if !check_binary(&dest).await {
        tracing::error!("downloaded datasets CLI at {} does not run", dest.display());
        return None;
    }
    tracing::info!("ncbi datasets CLI installed at {}", dest.display());
    Some(dest)
}

#[cfg(test)]
#[path = "ncbi_tests.rs"]
mod tests;
