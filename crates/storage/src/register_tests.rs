// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

const KEYS: &[&str] = &["ena", "logan", "ncbi", "sra", "url"];

fn sample() -> Register {
    let mut register = Register::empty(KEYS);
    register.add("ncbi", ["GCA_000001405.15".to_string(), "GCF_000005845.2".to_string()]);
    register.add("sra", ["SRR000001".to_string()]);
    register
}

#[test]
fn empty_register_knows_its_containers() {
    let register = Register::empty(KEYS);
    assert!(register.is_empty());
    assert_eq!(register.container_names().count(), KEYS.len());
}

#[test]
fn add_reports_only_new_accessions() {
    let mut register = sample();
    let added = register.add("sra", ["SRR000001".to_string(), "SRR000002".to_string()]);
    assert_eq!(added, 1);
    assert_eq!(register.len("sra"), 2);
}

#[test]
fn add_to_unknown_container_is_rejected() {
    let mut register = Register::empty(KEYS);
    assert_eq!(register.add("genbank", ["X".to_string()]), 0);
}

#[test]
fn directory_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let register = sample();
    register.save_to_dir(dir.path()).unwrap();

    assert!(dir.path().join("ncbi.txt").is_file());
    assert!(!dir.path().join("url.txt").exists(), "empty containers write no file");

    let loaded = Register::load_from_dir(dir.path(), KEYS).unwrap();
    assert_eq!(loaded.accessions("ncbi"), register.accessions("ncbi"));
    assert_eq!(loaded.accessions("sra"), register.accessions("sra"));
}

#[test]
fn saving_an_emptied_container_removes_its_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut register = sample();
    register.save_to_dir(dir.path()).unwrap();

    assert!(register.remove_accession("sra", "SRR000001"));
    register.save_to_dir(dir.path()).unwrap();
    assert!(!dir.path().join("sra.txt").exists());
}

#[test]
fn directory_loader_skips_blanks_and_comments() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("sra.txt"), "# seeded\n\nSRR000001\n  \nSRR000002\n").unwrap();
    let register = Register::load_from_dir(dir.path(), KEYS).unwrap();
    assert_eq!(register.accessions("sra"), ["SRR000001", "SRR000002"]);
}

#[test]
fn file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("datasets.reg");
    sample().save_to_file(&file).unwrap();

    let contents = std::fs::read_to_string(&file).unwrap();
    assert!(contents.starts_with("version 0.0\n"));
    assert!(contents.contains("ncbi\t2\n"));

    let loaded = Register::load_from_file(&file, KEYS).unwrap();
    assert_eq!(loaded.accessions("ncbi"), sample().accessions("ncbi"));
    assert_eq!(loaded.accessions("sra"), ["SRR000001"]);
}

#[parameterized(
    newer_major = { "version 1.0" },
    newer_minor = { "version 0.1" },
)]
fn incompatible_versions_are_rejected(line: &str) {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("datasets.reg");
    std::fs::write(&file, format!("{line}\nsra\t1\nSRR000001\n")).unwrap();
    let err = Register::load_from_file(&file, KEYS).unwrap_err();
    assert!(matches!(err, RegisterError::UnsupportedVersion { .. }));
}

#[parameterized(
    missing = { "" },
    not_a_version = { "sra\t1" },
    garbage = { "version x.y" },
)]
fn malformed_version_lines_are_rejected(first_line: &str) {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("datasets.reg");
    std::fs::write(&file, format!("{first_line}\n")).unwrap();
    assert!(Register::load_from_file(&file, KEYS).is_err());
}

#[test]
fn unknown_container_in_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("datasets.reg");
    std::fs::write(&file, "version 0.0\ngenbank\t1\nX68309\n").unwrap();
    let err = Register::load_from_file(&file, KEYS).unwrap_err();
    assert!(matches!(err, RegisterError::UnknownContainer(name) if name == "genbank"));
}

#[test]
fn truncated_container_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("datasets.reg");
    std::fs::write(&file, "version 0.0\nsra\t3\nSRR000001\n").unwrap();
    let err = Register::load_from_file(&file, KEYS).unwrap_err();
    assert!(matches!(err, RegisterError::TruncatedContainer { expected: 3, got: 1, .. }));
}

#[test]
fn file_loader_skips_blanks_and_comments() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("datasets.reg");
    std::fs::write(&file, "# export\nversion 0.0\n\nsra\t2\nSRR000001\n# middle\nSRR000002\n")
        .unwrap();
    let register = Register::load_from_file(&file, KEYS).unwrap();
    assert_eq!(register.accessions("sra"), ["SRR000001", "SRR000002"]);
}

#[test]
fn filter_accessions_matches_any_regex() {
    let register = sample();
    let regexps = vec![Regex::new("^GCF_").unwrap()];
    assert_eq!(register.filter_accessions("ncbi", &regexps), ["GCF_000005845.2"]);
    assert!(register.filter_accessions("url", &regexps).is_empty());
}

#[test]
fn create_register_refuses_to_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let location = dir.path().join(".register");
    create_register(&location, KEYS, false).unwrap();
    let err = create_register(&location, KEYS, false).unwrap_err();
    assert!(matches!(err, RegisterError::AlreadyExists(_)));
    // force wipes and recreates
    create_register(&location, KEYS, true).unwrap();
}
