// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Logan adapter: assemblies computed on top of SRA runs, served from a
//! public S3 bucket. Whether a register tracks contigs or unitigs is fixed
//! when the adapter is built; stored accessions carry the choice as a
//! suffix so a download always fetches exactly what was registered.

use crate::subprocess::{run_with_timeout, QUERY_TIMEOUT};
use crate::{downloaded_names, recreate_staging, SourceContext};
use async_trait::async_trait;
use regex::Regex;
use sqd_core::{Job, Pacer, Payload, SourceAdapter};
use std::path::Path;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::process::Command;

const MIN_DELAY: Duration = Duration::from_millis(350);
const BUCKET: &str = "https://s3.amazonaws.com/logan-pub";

fn accession_format() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^SRR[0-9]{6,}$").unwrap_or_else(|_| unreachable!()))
}

/// S3 object URL for one accession's assembly.
fn object_url(accession: &str, unitigs: bool) -> (String, String) {
    let (prefix, kind) = if unitigs { ("u", "unitigs") } else { ("c", "contigs") };
    let filename = format!("{accession}.{kind}.fa.zst");
    let url = format!("{BUCKET}/{prefix}/{accession}/{filename}");
    (url, filename)
}

pub struct Logan {
    ctx: SourceContext,
    pacer: Arc<Pacer>,
    unitigs: bool,
}

impl Logan {
    pub fn new(ctx: SourceContext, unitigs: bool) -> Self {
        Self { ctx, pacer: Arc::new(Pacer::new(MIN_DELAY)), unitigs }
    }

    pub fn is_valid_format(accession: &str) -> bool {
        accession_format().is_match(accession)
    }

    /// Head the S3 object to confirm the assembly exists.
    async fn exists_on_bucket(&self, url: &str) -> bool {
        let mut cmd = Command::new("curl");
        cmd.arg("-s").arg("-I").arg(url);

        let turn = self.pacer.wait_my_turn().await;
        let output = run_with_timeout(cmd, QUERY_TIMEOUT, "logan head").await;
        drop(turn);

        match output {
            Ok(output) if output.status.success() => {
                let head = String::from_utf8_lossy(&output.stdout);
                head.lines().next().is_some_and(|status| status.contains(" 200"))
            }
            _ => {
                tracing::error!("error querying the logan bucket: {url}");
                false
            }
        }
    }
}

#[async_trait]
impl SourceAdapter for Logan {
    fn name(&self) -> &'static str {
        "logan"
    }

    /// curl only, always ready.
    fn is_ready(&self) -> bool {
        true
    }

    fn pacer(&self) -> &Arc<Pacer> {
        &self.pacer
    }

    async fn jobs_from_accessions(&self, accessions: &[String], datadir: &Path) -> Vec<Job> {
        let downloaded = downloaded_names(datadir);
        let mut jobs = Vec::new();

        for acc in accessions {
            let dirname = format!("logan_{acc}");
            if downloaded.contains(&dirname) {
                continue;
            }
            // Stored accessions look like SRR000001_contigs.
            let Some((run, kind)) = acc.rsplit_once('_') else {
                tracing::warn!("malformed logan accession: {acc}");
                continue;
            };
            let staging = self.ctx.tmp_dir.join(&dirname);
            if let Err(err) = recreate_staging(&staging) {
                tracing::error!("cannot create staging directory {}: {err}", staging.display());
                continue;
            }

            let (url, filename) = object_url(run, kind == "unitigs");
            let fetch = Job::command(
                format!("{dirname}_download"),
                format!("curl -s -o {} \"{url}\"", staging.join(&filename).display()),
            )
            .with_gate(self.pacer.gate());

            let store = Job::function(
                format!("{dirname}_move"),
                Payload::MoveAndClean {
                    staging_dir: staging,
                    final_dir: datadir.to_path_buf(),
                    checksums: None,
                },
            )
            .with_parents(&[&fetch]);

            jobs.extend([fetch, store]);
        }
        jobs
    }

    async fn filter_valid(&self, accessions: Vec<String>) -> Vec<String> {
        let mut valid = Vec::new();
        for acc in accessions {
            if !Self::is_valid_format(&acc) {
                tracing::warn!("invalid logan accession: {acc}");
                continue;
            }
            let (url, _) = object_url(&acc, self.unitigs);
            if !self.exists_on_bucket(&url).await {
                tracing::warn!("assembly not found on the logan bucket: {acc}");
                continue;
            }
            let kind = if self.unitigs { "unitigs" } else { "contigs" };
            valid.push(format!("{acc}_{kind}"));
        }
        valid
    }
}

#[cfg(test)]
#[path = "logan_tests.rs"]
mod tests;
