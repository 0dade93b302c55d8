// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sequence Read Archive adapter.
//!
//! Each accession is an independent pipeline: `prefetch` the run, split it
//! into fastq files with `fasterq-dump`, compress them, and move the
//! compressed reads into the data directory. Requires the SRA toolkit;
//! when absent, a Linux build is installed under the register's bin
//! directory.

use crate::binaries::{check_binary, download_file, resolve_binary};
use crate::subprocess::{run_with_timeout, INSTALL_TIMEOUT};
use crate::{recreate_staging, SourceContext};
use async_trait::async_trait;
use regex::Regex;
use sqd_core::{Job, Pacer, Payload, SourceAdapter};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::process::Command;

const MIN_DELAY: Duration = Duration::from_millis(500);
const SRATOOLKIT_VERSION: &str = "3.1.1";

/// Run, study, sample, experiment, submission, project, and biosample
/// identifiers of the three INSDC read archives.
fn accession_format() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([EDS]R[RPSXA][0-9]{6,}|PRJ[EDN][A-Z][0-9]+|SAM[EDN][A-Z]?[0-9]+)$")
            .unwrap_or_else(|_| unreachable!())
    })
}

struct Toolkit {
    prefetch: PathBuf,
    fasterq_dump: PathBuf,
}

pub struct Sra {
    ctx: SourceContext,
    pacer: Arc<Pacer>,
    toolkit: Option<Toolkit>,
}

impl Sra {
    /// Probe for `prefetch` and `fasterq-dump`, installing the toolkit
    /// when either is missing.
    pub async fn new(ctx: SourceContext) -> Self {
        let toolkit = match resolve_toolkit(&ctx).await {
            Some(toolkit) => Some(toolkit),
            None => install_sratoolkit(&ctx).await,
        };
        Self { ctx, pacer: Arc::new(Pacer::new(MIN_DELAY)), toolkit }
    }

    pub fn is_valid_format(accession: &str) -> bool {
        accession_format().is_match(accession)
    }
}

#[async_trait]
impl SourceAdapter for Sra {
    fn name(&self) -> &'static str {
        "sra"
    }

    fn is_ready(&self) -> bool {
        self.toolkit.is_some()
    }

    fn pacer(&self) -> &Arc<Pacer> {
        &self.pacer
    }

    async fn jobs_from_accessions(&self, accessions: &[String], datadir: &Path) -> Vec<Job> {
        let Some(toolkit) = &self.toolkit else {
            return Vec::new();
        };

        let mut jobs = Vec::with_capacity(accessions.len() * 4);
        for acc in accessions {
            let scratch = self.ctx.tmp_dir.join(acc);
            if let Err(err) = recreate_staging(&scratch) {
                tracing::error!("cannot create staging directory {}: {err}", scratch.display());
                continue;
            }
            let job_name = format!("sra_{acc}");
            let accession_dir = scratch.join(acc);

            let prefetch = Job::command(
                format!("{job_name}_prefetch"),
                format!(
                    "{} --max-size u --output-directory {} {acc}",
                    toolkit.prefetch.display(),
                    scratch.display()
                ),
            )
            .with_gate(self.pacer.gate());

            let split = Job::command(
                format!("{job_name}_fasterqdump"),
                format!(
                    "{} --split-3 --skip-technical --outdir {} {}",
                    toolkit.fasterq_dump.display(),
                    accession_dir.display(),
                    accession_dir.display()
                ),
            )
            .with_parents(&[&prefetch])
            .with_gate(self.pacer.gate());

            let compress = Job::command(
                format!("{job_name}_compress"),
                format!("gzip {}/*.fastq", accession_dir.display()),
            )
            .with_parents(&[&split]);

            let clean = Job::function(
                format!("{job_name}_clean"),
                Payload::MoveReads {
                    staging_dir: accession_dir,
                    final_dir: datadir.to_path_buf(),
                    scratch_dir: scratch,
                },
            )
            .with_parents(&[&compress]);

            jobs.extend([prefetch, split, compress, clean]);
        }
        jobs
    }

    async fn filter_valid(&self, accessions: Vec<String>) -> Vec<String> {
        let (valid, invalid): (Vec<String>, Vec<String>) =
            accessions.into_iter().partition(|acc| Self::is_valid_format(acc));
        if !invalid.is_empty() {
            tracing::warn!("invalid read-archive accessions: {}", invalid.join(", "));
        }
        valid
    }
}

async fn resolve_toolkit(ctx: &SourceContext) -> Option<Toolkit> {
    let prefetch = resolve_binary("prefetch", &ctx.bin_dir).await?;
    let fasterq_dump = resolve_binary("fasterq-dump", &ctx.bin_dir).await?;
    Some(Toolkit { prefetch, fasterq_dump })
}

/// Download and unpack the SRA toolkit, then link its binaries into the
/// bin directory.
async fn install_sratoolkit(ctx: &SourceContext) -> Option<Toolkit> {
    if std::env::consts::OS != "linux" {
        tracing::error!(
            "sratoolkit auto-install is not supported on {}; install the SRA toolkit yourself",
            std::env::consts::OS
        );
        return None;
    }

    let dirname = format!("sratoolkit.{SRATOOLKIT_VERSION}-ubuntu64");
    let link = format!(
        "https://ftp-trace.ncbi.nlm.nih.gov/sra/sdk/{SRATOOLKIT_VERSION}/{dirname}.tar.gz"
    );

    if let Err(err) =
        std::fs::create_dir_all(&ctx.tmp_dir).and_then(|()| std::fs::create_dir_all(&ctx.bin_dir))
    {
        tracing::error!("cannot prepare install directories: {err}");
        return None;
    }
    let tarball = ctx.tmp_dir.join(format!("{dirname}.tar.gz"));

    tracing::info!("downloading the sratoolkit binaries...");
    if !download_file(&link, &tarball).await {
        tracing::error!("unable to download the sratoolkit; SRA downloads stay unavailable");
        return None;
    }

    let mut cmd = Command::new("tar");
    cmd.arg("-xzf").arg(&tarball).arg("-C").arg(&ctx.bin_dir);
    let unpacked = matches!(
        run_with_timeout(cmd, INSTALL_TIMEOUT, "sratoolkit unpack").await,
        Ok(output) if output.status.success()
    );
    let _ = std::fs::remove_file(&tarball);
    if !unpacked {
        tracing::error!("unable to unpack the sratoolkit archive");
        return None;
    }

    let mut resolved = Vec::with_capacity(2);
    for name in ["prefetch", "fasterq-dump"] {
        let target = ctx.bin_dir.join(&dirname).join("bin").join(name);
        let linkpath = ctx.bin_dir.join(name);
        if std::os::unix::fs::symlink(&target, &linkpath).is_err() || !check_binary(&linkpath).await
        {
            tracing::error!("unable to link {name}; SRA downloads stay unavailable");
            return None;
        }
        resolved.push(linkpath);
    }
    tracing::info!("SRA toolkit binaries installed under {}", ctx.bin_dir.display());

    let mut resolved = resolved.into_iter();
    Some(Toolkit { prefetch: resolved.next()?, fasterq_dump: resolved.next()? })
}

#[cfg(test)]
#[path = "sra_tests.rs"]
mod tests;
