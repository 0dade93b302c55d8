//! Shared spec harness: a temp project directory, tool stubbing, and a
//! thin wrapper around the sqd binary.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

pub use serial_test::serial;

/// Stub curl: HEAD probes answer 200 with a content length, downloads
/// write a fixed payload to the `-o` target.
pub const CURL_OK: &str = r#"out=""
head=no
while [ $# -gt 0 ]; do
  case "$1" in
    -o) out="$2"; shift 2 ;;
    -I) head=yes; shift ;;
    *) shift ;;
  esac
done
if [ "$head" = yes ]; then
  printf 'HTTP/1.1 200 OK\r\n'
  printf 'Content-Length: 5\r\n'
  exit 0
fi
[ -n "$out" ] && printf 'DATA\n' > "$out"
exit 0
"#;

/// Stub curl whose downloads fail; HEAD probes still answer 200 so
/// accessions pass validation at add time.
pub const CURL_BROKEN_DOWNLOADS: &str = r#"head=no
for arg in "$@"; do
  [ "$arg" = "-I" ] && head=yes
done
if [ "$head" = yes ]; then
  printf 'HTTP/1.1 200 OK\r\n'
  exit 0
fi
exit 1
"#;

/// Stub for version-probed tools: succeeds on `--version`, records any
/// other invocation and exits 0.
pub const TOOL_OK: &str = r#"exit 0
"#;

pub struct Project {
    dir: tempfile::TempDir,
    stub_bin: Option<PathBuf>,
}

impl Project {
    pub fn empty() -> Self {
        Self { dir: tempfile::tempdir().unwrap(), stub_bin: None }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(&self, rel: &str, contents: &str) {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }

    pub fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.path().join(rel)).unwrap()
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path().join(rel).exists()
    }

    /// Install an executable stub shell script shadowing `name` on PATH.
    pub fn stub_tool(&mut self, name: &str, body: &str) {
        use std::os::unix::fs::PermissionsExt;
        let bin = self.path().join("stub-bin");
        std::fs::create_dir_all(&bin).unwrap();
        let script = bin.join(name);
        std::fs::write(&script, format!("#!/bin/sh\n{body}")).unwrap();
        let mut perms = std::fs::metadata(&script).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&script, perms).unwrap();
        self.stub_bin = Some(bin);
    }

    /// The sqd binary, run from the project directory with stubs on PATH.
    pub fn sqd(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::Command::cargo_bin("sqd").unwrap();
        cmd.current_dir(self.path());
        if let Some(bin) = &self.stub_bin {
            let path = std::env::var("PATH").unwrap_or_default();
            cmd.env("PATH", format!("{}:{path}", bin.display()));
        }
        cmd
    }
}

pub struct RunResult {
    output: std::process::Output,
}

impl RunResult {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    pub fn stdout_has(self, needle: &str) -> Self {
        assert!(
            self.stdout().contains(needle),
            "stdout missing {needle:?}:\n{}\n--- stderr:\n{}",
            self.stdout(),
            self.stderr()
        );
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        assert!(self.stderr().contains(needle), "stderr missing {needle:?}:\n{}", self.stderr());
        self
    }
}

pub trait SqdCommand {
    fn passes(&mut self) -> RunResult;
    fn fails_with(&mut self, code: i32) -> RunResult;
}

impl SqdCommand for assert_cmd::Command {
    fn passes(&mut self) -> RunResult {
        let output = self.output().unwrap();
        assert!(
            output.status.success(),
            "expected success, got {:?}\n--- stdout:\n{}\n--- stderr:\n{}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunResult { output }
    }

    fn fails_with(&mut self, code: i32) -> RunResult {
        let output = self.output().unwrap();
        assert_eq!(
            output.status.code(),
            Some(code),
            "--- stdout:\n{}\n--- stderr:\n{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunResult { output }
    }
}
