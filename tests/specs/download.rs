//! Download specs: full runs through the scheduler with stubbed tools.

use crate::prelude::*;

#[test]
#[serial]
fn url_container_downloads_to_the_data_directory() {
    let mut p = Project::empty();
    p.stub_tool("curl", CURL_OK);
    p.sqd().args(["init"]).passes();
    p.sqd().args(["add", "-s", "url", "-a", "https://example.org/genome.fa.gz"]).passes();

    p.sqd()
        .args(["download", "-t", "tmp"])
        .passes()
        .stderr_has("1 datasets from url will be downloaded.");

    assert_eq!(p.read("data/url0_genome.fa.gz"), "DATA\n");
    // One log file per started job, named after the job.
    assert!(p.exists("logs/url0_genome.fa.gz.log"));
}

#[test]
#[serial]
fn logan_pipeline_runs_the_isolated_move_worker() {
    let mut p = Project::empty();
    p.stub_tool("curl", CURL_OK);
    p.sqd().args(["init"]).passes();
    p.sqd().args(["add", "-s", "logan", "-a", "SRR000001"]).passes();

    p.sqd().args(["download", "-t", "tmp"]).passes();

    // The curl job staged the object, then the payload worker moved the
    // staging directory under the data directory and cleaned up.
    assert_eq!(p.read("data/logan_SRR000001_contigs/SRR000001.contigs.fa.zst"), "DATA\n");
    assert!(!p.exists("tmp/logan_SRR000001_contigs"));
    assert!(p.exists("logs/logan_SRR000001_contigs_download.log"));
    assert!(p.exists("logs/logan_SRR000001_contigs_move.log"));
}

#[test]
#[serial]
fn a_failed_download_cancels_the_move_step() {
    let mut p = Project::empty();
    p.stub_tool("curl", CURL_BROKEN_DOWNLOADS);
    p.sqd().args(["init"]).passes();
    // Register the accession directly; the broken curl would fail `add`.
    p.file(".register/logan.txt", "SRR000009_contigs\n");

    // Job failures are reported through logs, never the exit code.
    p.sqd()
        .args(["download", "-t", "tmp"])
        .passes()
        .stderr_has("ERROR logan_SRR000009_contigs_download")
        .stderr_has("CANCEL logan_SRR000009_contigs_move")
        .stderr_has("Please check the log file for more details");

    assert!(!p.exists("data/logan_SRR000009_contigs"));
    assert!(p.exists("logs/logan_SRR000009_contigs_download.log"));
    assert!(!p.exists("logs/logan_SRR000009_contigs_move.log"));
}

#[test]
#[serial]
fn a_fresh_run_wipes_the_previous_log_directory() {
    let mut p = Project::empty();
    p.stub_tool("curl", CURL_OK);
    p.sqd().args(["init"]).passes();
    p.sqd().args(["add", "-s", "url", "-a", "https://example.org/a.fa"]).passes();
    p.file("logs/stale.log", "from an earlier run");

    p.sqd().args(["download", "-t", "tmp"]).passes();

    assert!(!p.exists("logs/stale.log"));
    assert!(p.exists("logs/url0_a.fa.log"));
}

#[test]
#[serial]
fn already_downloaded_logan_accessions_are_skipped() {
    let mut p = Project::empty();
    p.stub_tool("curl", CURL_OK);
    p.sqd().args(["init"]).passes();
    p.sqd().args(["add", "-s", "logan", "-a", "SRR000001"]).passes();
    p.file("data/logan_SRR000001_contigs/SRR000001.contigs.fa.zst", "already here");

    p.sqd().args(["download", "-t", "tmp"]).passes();

    // The pre-existing artifact is untouched and no job ran for it.
    assert_eq!(p.read("data/logan_SRR000001_contigs/SRR000001.contigs.fa.zst"), "already here");
    assert!(!p.exists("logs/logan_SRR000001_contigs_download.log"));
}
