// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    run = { "SRR000001", true },
    long_run = { "SRR28830788", true },
    ena_run = { "ERR164407", false },
    suffixed = { "SRR000001_contigs", false },
    short_id = { "SRR123", false },
)]
fn accession_format_validation(accession: &str, expected: bool) {
    assert_eq!(Logan::is_valid_format(accession), expected);
}

#[test]
fn object_urls_encode_the_assembly_kind() {
    let (contigs, contigs_name) = object_url("SRR000001", false);
    assert_eq!(contigs, "https://s3.amazonaws.com/logan-pub/c/SRR000001/SRR000001.contigs.fa.zst");
    assert_eq!(contigs_name, "SRR000001.contigs.fa.zst");

    let (unitigs, unitigs_name) = object_url("SRR000001", true);
    assert_eq!(unitigs, "https://s3.amazonaws.com/logan-pub/u/SRR000001/SRR000001.unitigs.fa.zst");
    assert_eq!(unitigs_name, "SRR000001.unitigs.fa.zst");
}

fn test_adapter(root: &Path, unitigs: bool) -> Logan {
    Logan {
        ctx: SourceContext { tmp_dir: root.join("tmp"), bin_dir: root.join("bin") },
        pacer: Arc::new(Pacer::new(Duration::ZERO)),
        unitigs,
    }
}

#[tokio::test]
async fn stored_accessions_expand_to_fetch_and_move() {
    let root = tempfile::tempdir().unwrap();
    let adapter = test_adapter(root.path(), false);
    let datadir = root.path().join("data");

    let jobs =
        adapter.jobs_from_accessions(&["SRR000001_contigs".to_string()], &datadir).await;

    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0].name(), "logan_SRR000001_contigs_download");
    assert_eq!(jobs[1].name(), "logan_SRR000001_contigs_move");
    assert_eq!(jobs[1].parents(), &[jobs[0].id()]);
    assert!(root.path().join("tmp").join("logan_SRR000001_contigs").is_dir());
}

#[tokio::test]
async fn the_stored_suffix_wins_over_the_adapter_option() {
    // A register written with contigs accessions downloads contigs even if
    // the adapter was later built with the unitigs option.
    let root = tempfile::tempdir().unwrap();
    let adapter = test_adapter(root.path(), true);
    let datadir = root.path().join("data");

    let jobs =
        adapter.jobs_from_accessions(&["SRR000001_contigs".to_string()], &datadir).await;
    assert_eq!(jobs.len(), 2);
    let log = jobs[0].name().to_string();
    assert!(log.contains("contigs"));
}

#[tokio::test]
async fn downloaded_accessions_are_skipped() {
    let root = tempfile::tempdir().unwrap();
    let adapter = test_adapter(root.path(), false);
    let datadir = root.path().join("data");
    std::fs::create_dir_all(datadir.join("logan_SRR000001_contigs")).unwrap();

    let jobs =
        adapter.jobs_from_accessions(&["SRR000001_contigs".to_string()], &datadir).await;
    assert!(jobs.is_empty());
}

#[tokio::test]
async fn malformed_stored_accessions_are_ignored() {
    let root = tempfile::tempdir().unwrap();
    let adapter = test_adapter(root.path(), false);
    let jobs =
        adapter.jobs_from_accessions(&["nosuffix".to_string()], &root.path().join("data")).await;
    assert!(jobs.is_empty());
}
