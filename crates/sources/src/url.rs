// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Direct-URL adapter: one curl job per registered URL, written straight
//! into the data directory as `url<idx>_<filename>`.

use crate::subprocess::{run_with_timeout, QUERY_TIMEOUT};
use async_trait::async_trait;
use sqd_core::{Job, Pacer, SourceAdapter};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

const MIN_DELAY: Duration = Duration::from_millis(500);
const CURL_SCHEMES: [&str; 3] = ["http", "https", "ftp"];

/// What a HEAD probe tells us about a URL.
#[derive(Debug, Default)]
struct HeadReport {
    status: Option<u32>,
    content_length: Option<u64>,
    filename: Option<String>,
}

pub struct UrlSource {
    pacer: Arc<Pacer>,
}

impl Default for UrlSource {
    fn default() -> Self {
        Self::new()
    }
}

impl UrlSource {
    pub fn new() -> Self {
        Self { pacer: Arc::new(Pacer::new(MIN_DELAY)) }
    }

    /// Paced HEAD request against the server.
    async fn head(&self, url: &str) -> Option<HeadReport> {
        let mut cmd = Command::new("curl");
        cmd.arg("-s").arg("-I").arg(url);

        let turn = self.pacer.wait_my_turn().await;
        let output = run_with_timeout(cmd, QUERY_TIMEOUT, "url head").await;
        drop(turn);

        match output {
            Ok(output) if output.status.success() => {
                Some(parse_head(&String::from_utf8_lossy(&output.stdout)))
            }
            _ => None,
        }
    }

    /// Name the downloaded file: the server's `filename=` wins, the last
    /// path segment of the URL is the fallback.
    async fn filename_for(&self, url: &str) -> String {
        if let Some(report) = self.head(url).await {
            if matches!(report.status, Some(200)) {
                if let Some(filename) = report.filename {
                    return filename;
                }
            }
        }
        let path = url.split_once("://").map_or(url, |(_, rest)| rest);
        let path = path.split(['?', '#']).next().unwrap_or(path);
        path.rsplit('/').next().unwrap_or(path).to_string()
    }
}

#[async_trait]
impl SourceAdapter for UrlSource {
    fn name(&self) -> &'static str {
        "url"
    }

    /// curl only, always ready.
    fn is_ready(&self) -> bool {
        true
    }

    fn pacer(&self) -> &Arc<Pacer> {
        &self.pacer
    }

    async fn jobs_from_accessions(&self, urls: &[String], datadir: &Path) -> Vec<Job> {
        let mut jobs = Vec::with_capacity(urls.len());
        for (idx, url) in urls.iter().enumerate() {
            let filename = self.filename_for(url).await;
            let target = format!("url{idx}_{filename}");
            let output = datadir.join(&target);
            jobs.push(
                Job::command(target, format!("curl -s -o {} \"{url}\"", output.display()))
                    .with_gate(self.pacer.gate()),
            );
        }
        jobs
    }

    async fn filter_valid(&self, urls: Vec<String>) -> Vec<String> {
        let mut valid = Vec::new();
        for url in urls {
            let scheme = url.split(':').next().unwrap_or("").to_ascii_lowercase();
            if !CURL_SCHEMES.contains(&scheme.as_str()) {
                tracing::warn!("scheme {scheme:?} not supported, url ignored: {url}");
                continue;
            }
            let Some(report) = self.head(&url).await else {
                tracing::error!("cannot reach {url}, skipping");
                continue;
            };
            match report.status {
                Some(200) => valid.push(url),
                Some(code) => {
                    tracing::error!("cannot download from {url}: status {code}, skipping")
                }
                // Some servers answer headers without a status line; a
                // positive content length is good enough.
                None if report.content_length.unwrap_or(0) > 0 => valid.push(url),
                None => tracing::error!("no usable response from {url}, skipping"),
            }
        }
        valid
    }
}

fn parse_head(raw: &str) -> HeadReport {
    let mut report = HeadReport::default();
    for line in raw.lines() {
        let line = line.trim();
        if line.starts_with("HTTP") && report.status.is_none() {
            report.status = line.split_whitespace().nth(1).and_then(|code| code.parse().ok());
        } else if let Some((key, value)) = line.split_once(':') {
            if key.eq_ignore_ascii_case("content-length") {
                report.content_length = value.trim().parse().ok();
            } else if key.eq_ignore_ascii_case("content-disposition") {
                report.filename = value
                    .split("filename=")
                    .nth(1)
                    .map(|name| name.trim().trim_matches('"').to_string());
            }
        }
    }
    report
}

#[cfg(test)]
#[path = "url_tests.rs"]
mod tests;
