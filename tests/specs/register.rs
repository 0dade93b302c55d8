//! Register lifecycle specs: init, add, list, remove, export.

use crate::prelude::*;

#[test]
fn commands_require_an_initialized_register() {
    let p = Project::empty();
    p.sqd()
        .args(["list"])
        .fails_with(1)
        .stderr_has("No data register found. Please first run the init command.");
}

#[test]
fn init_creates_the_register_directory() {
    let p = Project::empty();
    p.sqd().args(["init"]).passes();
    assert!(p.exists(".register"));
    p.sqd().args(["list"]).passes();
}

#[test]
fn init_refuses_to_overwrite_unless_forced() {
    let p = Project::empty();
    p.sqd().args(["init"]).passes();
    p.sqd().args(["init"]).fails_with(1).stderr_has("already present");
    p.sqd().args(["init", "--force"]).passes();
}

#[test]
fn add_validates_read_archive_accessions() {
    let mut p = Project::empty();
    p.stub_tool("prefetch", TOOL_OK);
    p.stub_tool("fasterq-dump", TOOL_OK);
    p.sqd().args(["init"]).passes();

    p.sqd()
        .args(["add", "-s", "sra", "-a", "SRR000001", "ERR164407", "not&an$acc"])
        .passes();

    let stored = p.read(".register/sra.txt");
    assert!(stored.contains("SRR000001"));
    assert!(stored.contains("ERR164407"));
    assert!(!stored.contains("not&an$acc"));

    p.sqd().args(["list"]).passes().stdout_has("- sra:").stdout_has("SRR000001");
}

#[test]
fn add_reads_accessions_from_a_file() {
    let mut p = Project::empty();
    p.stub_tool("prefetch", TOOL_OK);
    p.stub_tool("fasterq-dump", TOOL_OK);
    p.sqd().args(["init"]).passes();
    p.file("accessions.txt", "SRR000010\n\nSRR000011\n");

    p.sqd().args(["add", "-s", "sra", "-f", "accessions.txt"]).passes();

    let stored = p.read(".register/sra.txt");
    assert!(stored.contains("SRR000010"));
    assert!(stored.contains("SRR000011"));
}

#[test]
fn unitigs_flag_is_logan_only() {
    let mut p = Project::empty();
    p.stub_tool("prefetch", TOOL_OK);
    p.stub_tool("fasterq-dump", TOOL_OK);
    p.sqd().args(["init"]).passes();
    p.sqd()
        .args(["add", "-s", "sra", "-a", "SRR000001", "--unitigs"])
        .fails_with(1)
        .stderr_has("--unitigs is only available for the logan source");
}

#[test]
fn logan_accessions_are_stored_with_their_kind() {
    let mut p = Project::empty();
    p.stub_tool("curl", CURL_OK);
    p.sqd().args(["init"]).passes();

    p.sqd().args(["add", "-s", "logan", "-a", "SRR000001"]).passes();
    assert!(p.read(".register/logan.txt").contains("SRR000001_contigs"));

    p.sqd().args(["add", "-s", "logan", "-a", "SRR000002", "--unitigs"]).passes();
    assert!(p.read(".register/logan.txt").contains("SRR000002_unitigs"));
}

#[test]
fn url_accessions_are_probed_and_filtered_by_scheme() {
    let mut p = Project::empty();
    p.stub_tool("curl", CURL_OK);
    p.sqd().args(["init"]).passes();

    p.sqd()
        .args(["add", "-s", "url", "-a", "https://example.org/genome.fa.gz", "s3://bucket/key"])
        .passes();

    let stored = p.read(".register/url.txt");
    assert!(stored.contains("https://example.org/genome.fa.gz"));
    assert!(!stored.contains("s3://bucket/key"));
}

#[test]
fn remove_deletes_matching_accessions() {
    let mut p = Project::empty();
    p.stub_tool("prefetch", TOOL_OK);
    p.stub_tool("fasterq-dump", TOOL_OK);
    p.sqd().args(["init"]).passes();
    p.sqd().args(["add", "-s", "sra", "-a", "SRR000001", "SRR999999", "ERR164407"]).passes();

    p.sqd().args(["remove", "-s", "sra", "-a", "SRR[0-9]+"]).passes();

    let stored = p.read(".register/sra.txt");
    assert!(!stored.contains("SRR000001"));
    assert!(!stored.contains("SRR999999"));
    assert!(stored.contains("ERR164407"));
}

#[test]
fn export_round_trips_through_a_register_file() {
    let mut p = Project::empty();
    p.stub_tool("prefetch", TOOL_OK);
    p.stub_tool("fasterq-dump", TOOL_OK);
    p.sqd().args(["init"]).passes();
    p.sqd().args(["add", "-s", "sra", "-a", "SRR000001", "SRR000002"]).passes();

    p.sqd().args(["export", "-o", "datasets.reg"]).passes();
    let exported = p.read("datasets.reg");
    assert!(exported.starts_with("version 0.0\n"));
    assert!(exported.contains("sra\t2"));

    // A second register initialized from the export sees the same data.
    p.sqd()
        .args(["init", "-r", "datasets.reg", "--register-location", "replica"])
        .passes();
    p.sqd()
        .args(["list", "--register-location", "replica"])
        .passes()
        .stdout_has("SRR000001")
        .stdout_has("SRR000002");
}

#[test]
fn export_rejects_registers_from_a_newer_tool() {
    let p = Project::empty();
    p.file("future.reg", "version 0.1\nsra\t1\nSRR000001\n");
    p.sqd().args(["init", "-r", "future.reg"]).fails_with(1).stderr_has("incompatible");
}
