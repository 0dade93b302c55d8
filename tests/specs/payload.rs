//! Payload-worker specs: the hidden re-entry point the engine uses to run
//! staging routines in an isolated process.

use crate::prelude::*;
use serde_json::json;

#[test]
fn worker_moves_staged_files_and_exits_zero() {
    let p = Project::empty();
    p.file("tmp/ERR000001/reads.fastq.gz", "payload");
    p.file("data/.keep", "");

    let payload = json!({
        "op": "move_and_clean",
        "staging_dir": p.path().join("tmp/ERR000001"),
        "final_dir": p.path().join("data"),
    });

    p.sqd()
        .args(["payload-worker", &payload.to_string()])
        .passes()
        .stdout_has("move_and_clean");

    assert!(p.exists("data/ERR000001/reads.fastq.gz"));
    assert!(!p.exists("tmp/ERR000001"));
}

#[test]
fn worker_fails_on_checksum_mismatch_and_cleans_staging() {
    let p = Project::empty();
    p.file("tmp/ERR000002/reads.fastq.gz", "corrupted contents");
    p.file("data/.keep", "");

    let payload = json!({
        "op": "move_and_clean",
        "staging_dir": p.path().join("tmp/ERR000002"),
        "final_dir": p.path().join("data"),
        "checksums": { "reads.fastq.gz": "d41d8cd98f00b204e9800998ecf8427e" },
    });

    p.sqd()
        .args(["payload-worker", &payload.to_string()])
        .fails_with(1)
        .stderr_has("md5 mismatch");

    assert!(!p.exists("tmp/ERR000002"), "staging must be removed on mismatch");
    assert!(!p.exists("data/ERR000002"));
}

#[test]
fn worker_rejects_malformed_payloads() {
    let p = Project::empty();
    p.sqd()
        .args(["payload-worker", "{\"op\":\"no_such_op\"}"])
        .fails_with(2)
        .stderr_has("invalid payload");
}
