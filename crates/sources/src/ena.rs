// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! European Nucleotide Archive adapter.
//!
//! Assembly accessions download as a single fasta through the browser API
//! (curl, gzip, move). Read accessions are resolved to their submitted
//! files first: the browser API yields per-file FTP URLs and md5 sums, one
//! curl job is emitted per file, and a final move step verifies the sums
//! before anything reaches the data directory.

use crate::subprocess::{run_with_timeout, QUERY_TIMEOUT};
use crate::{downloaded_names, recreate_staging, SourceContext};
use async_trait::async_trait;
use regex::Regex;
use sqd_core::{Job, Pacer, Payload, SourceAdapter};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::process::Command;

const MIN_DELAY: Duration = Duration::from_millis(350);
const ACCESSIONS_PER_QUERY: usize = 32;
const BROWSER_API: &str = "https://www.ebi.ac.uk/ena/browser/api";

/// ENA accession classes and the patterns that recognize them.
const ACCESSION_PATTERNS: &[(&str, &str)] = &[
    ("study", r"^([EDS]RP[0-9]{6,}|PRJ[EDN][A-Z][0-9]+)$"),
    ("sample", r"^([EDS]RS[0-9]{6,}|SAM[EDN][A-Z]?[0-9]+)$"),
    ("run", r"^[EDS]RR[0-9]{6,}$"),
    ("experiment", r"^[EDS]RX[0-9]{6,}$"),
    ("assembly", r"^GCA_[0-9]{9}\.[0-9]+$"),
    ("submission", r"^[EDS]RA[0-9]{6,}$"),
];

fn compiled_patterns() -> &'static Vec<(&'static str, Regex)> {
    static PATTERNS: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        ACCESSION_PATTERNS
            .iter()
            .map(|(kind, pattern)| {
                (*kind, Regex::new(pattern).unwrap_or_else(|_| unreachable!()))
            })
            .collect()
    })
}

fn submitted_ftp_id() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"<ID><!\[CDATA\[(https?://[^\]]+submitted_ftp[^\]]*)\]\]></ID>")
            .unwrap_or_else(|_| unreachable!())
    })
}

pub struct Ena {
    ctx: SourceContext,
    pacer: Arc<Pacer>,
}

impl Ena {
    pub fn new(ctx: SourceContext) -> Self {
        Self { ctx, pacer: Arc::new(Pacer::new(MIN_DELAY)) }
    }

    /// Classify an accession, or `None` when no class matches.
    pub fn accession_kind(accession: &str) -> Option<&'static str> {
        compiled_patterns()
            .iter()
            .find(|(_, regex)| regex.is_match(accession))
            .map(|(kind, _)| *kind)
    }

    /// One paced GET against an ENA endpoint, returning stdout.
    async fn query(&self, url: &str) -> Option<String> {
        let mut cmd = Command::new("curl");
        cmd.arg("-s").arg(url);

        let turn = self.pacer.wait_my_turn().await;
        let output = run_with_timeout(cmd, QUERY_TIMEOUT, "ena query").await;
        drop(turn);

        match output {
            Ok(output) if output.status.success() => {
                Some(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            _ => {
                tracing::error!("error querying ENA: {url}");
                None
            }
        }
    }

    /// Resolve a read accession to its submitted files: `(url, md5)` pairs.
    async fn submitted_files(&self, accession: &str) -> Vec<(String, String)> {
        let query = format!(
            "{BROWSER_API}/xml/{accession}?download=false&gzip=false&includeLinks=false"
        );
        let Some(response) = self.query(&query).await else {
            return Vec::new();
        };
        let Some(report_url) = submitted_ftp_id()
            .captures(&response)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
        else {
            tracing::error!("no submitted files found for accession {accession}");
            return Vec::new();
        };

        let Some(report) = self.query(&report_url).await else {
            return Vec::new();
        };
        parse_file_report(&report)
    }

    /// Assembly shape: fetch the fasta, compress it, move it in place.
    fn assembly_jobs(&self, accession: &str, staging: &Path, datadir: &Path) -> Vec<Job> {
        let job_name = format!("ena_{accession}");
        let url = format!("{BROWSER_API}/fasta/{accession}");
        let fasta = staging.join(format!("{accession}.fa"));

        let fetch = Job::command(
            format!("{job_name}_download"),
            format!("curl -s -o {} \"{url}\"", fasta.display()),
        )
        .with_gate(self.pacer.gate());

        let compress =
            Job::command(format!("{job_name}_gzip"), format!("gzip {}", fasta.display()))
                .with_parents(&[&fetch]);

        let store = Job::function(
            format!("{job_name}_move"),
            Payload::MoveAndClean {
                staging_dir: staging.to_path_buf(),
                final_dir: datadir.to_path_buf(),
                checksums: None,
            },
        )
        .with_parents(&[&compress]);

        vec![fetch, compress, store]
    }
}

#[async_trait]
impl SourceAdapter for Ena {
    fn name(&self) -> &'static str {
        "ena"
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
        let pending: Vec<&str> = accessions
            .iter()
            .map(String::as_str)
            .filter(|acc| !downloaded.contains(*acc))
            .collect();
        tracing::info!("creating jobs for {} ENA accessions", pending.len());

        let mut jobs = Vec::new();
        for acc in pending {
            let staging = self.ctx.tmp_dir.join(acc);
            if let Err(err) = recreate_staging(&staging) {
                tracing::error!("cannot create staging directory {}: {err}", staging.display());
                continue;
            }

            if acc.starts_with("GCA") {
                jobs.extend(self.assembly_jobs(acc, &staging, datadir));
                continue;
            }

            let files = self.submitted_files(acc).await;
            if files.is_empty() {
                continue;
            }
            let job_name = format!("ena_{acc}");
            let mut checksums = BTreeMap::new();
            let mut fetches = Vec::with_capacity(files.len());
            for (url, md5) in files {
                let filename = url.rsplit('/').next().unwrap_or(&url).to_string();
                let output = staging.join(&filename);
                fetches.push(
                    Job::command(
                        format!("{job_name}_{filename}"),
                        format!("curl -s -o {} \"{url}\"", output.display()),
                    )
                    .with_gate(self.pacer.gate()),
                );
                checksums.insert(filename, md5);
            }

            let parents: Vec<&Job> = fetches.iter().collect();
            let store = Job::function(
                format!("{job_name}_move"),
                Payload::MoveAndClean {
                    staging_dir: staging.clone(),
                    final_dir: datadir.to_path_buf(),
                    checksums: Some(checksums),
                },
            )
            .with_parents(&parents);

            jobs.extend(fetches);
            jobs.push(store);
        }
        jobs
    }

    async fn filter_valid(&self, accessions: Vec<String>) -> Vec<String> {
        let (classified, invalid): (Vec<String>, Vec<String>) =
            accessions.into_iter().partition(|acc| Self::accession_kind(acc).is_some());
        if !invalid.is_empty() {
            tracing::warn!("invalid ENA accessions: {}", invalid.join(", "));
        }

        let mut valid = Vec::new();
        for chunk in classified.chunks(ACCESSIONS_PER_QUERY) {
            let query = format!(
                "{BROWSER_API}/xml/{}?download=false&gzip=false&includeLinks=false",
                chunk.join(",")
            );
            let Some(response) = self.query(&query).await else {
                continue;
            };
            if response.contains("ErrorDetails") {
                tracing::error!("error querying ENA for accessions: {}", chunk.join(", "));
                continue;
            }
            valid.extend(chunk.iter().filter(|acc| response.contains(acc.as_str())).cloned());
        }

        let not_found: Vec<&str> = classified
            .iter()
            .map(String::as_str)
            .filter(|acc| !valid.iter().any(|v| v == acc))
            .collect();
        if !not_found.is_empty() {
            tracing::warn!("accession(s) not found on ENA servers: {}", not_found.join(", "));
        }
        valid
    }
}

/// Parse the tabular file report: a header naming `submitted_ftp` and
/// `submitted_md5` columns, then one row per run with `;`-separated lists.
fn parse_file_report(report: &str) -> Vec<(String, String)> {
    let mut lines = report.trim().lines();
    let Some(header) = lines.next() else {
        return Vec::new();
    };
    let columns: Vec<&str> = header.split('\t').collect();
    let (Some(ftp_index), Some(md5_index)) = (
        columns.iter().position(|col| *col == "submitted_ftp"),
        columns.iter().position(|col| *col == "submitted_md5"),
    ) else {
        tracing::error!("file report lacks submitted_ftp/submitted_md5 columns");
        return Vec::new();
    };

    let mut files = Vec::new();
    for line in lines {
        let fields: Vec<&str> = line.split('\t').collect();
        let (Some(urls), Some(md5s)) = (fields.get(ftp_index), fields.get(md5_index)) else {
            continue;
        };
        for (url, md5) in urls.split(';').zip(md5s.split(';')) {
            if !url.is_empty() {
                files.push((url.to_string(), md5.to_string()));
            }
        }
    }
    files
}

#[cfg(test)]
#[path = "ena_tests.rs"]
mod tests;
