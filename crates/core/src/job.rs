// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job: a scheduled unit of work backed by an OS worker process.
//!
//! A job is either a shell-invokable command line or a staging [`Payload`]
//! executed by re-entering the current executable with the hidden
//! [`PAYLOAD_WORKER_ARG`] argument. Both run in their own process group with
//! stdout/stderr redirected into the job's log file, so a stuck or crashing
//! worker can always be torn down without taking the scheduler with it.

use crate::payload::Payload;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::process::{Child, Command};

/// Synthesized return code for jobs that were cancelled or stopped before
/// producing an exit status of their own.
pub const CANCEL_EXIT_CODE: i32 = -1;

/// Hidden argv marker that re-enters the binary as an isolated payload worker.
pub const PAYLOAD_WORKER_ARG: &str = "payload-worker";

/// Grace period between SIGTERM and SIGKILL when stopping a worker.
const STOP_GRACE: Duration = Duration::from_secs(5);

static NEXT_JOB_ID: AtomicU64 = AtomicU64::new(0);

/// Identifier for a submitted job. Job names are for logs; ordering and
/// dependency tracking go through ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(u64);

impl JobId {
    fn next() -> Self {
        JobId(NEXT_JOB_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Admission predicate re-evaluated on every scheduler tick. Returning false
/// defers the job without removing it from the waiting queue.
pub type StartGate = Arc<dyn Fn() -> bool + Send + Sync>;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("payload serialization failed: {0}")]
    Payload(#[from] serde_json::Error),
}

/// What the worker process actually runs.
enum Work {
    /// Shell command line, run via `sh -c`.
    Command(String),
    /// Staging payload, run by re-entering the current executable.
    Function(Payload),
}

/// A single unit of work with a lifecycle and a return status.
pub struct Job {
    id: JobId,
    name: String,
    log_file: PathBuf,
    parents: Vec<JobId>,
    gate: Option<StartGate>,
    work: Work,
    child: Option<Child>,
    is_over: bool,
    return_code: Option<i32>,
}

impl Job {
    /// A job that runs an external command line.
    pub fn command(name: impl Into<String>, command_line: impl Into<String>) -> Self {
        Self::new(name.into(), Work::Command(command_line.into()))
    }

    /// A job that runs a staging payload in an isolated worker process.
    pub fn function(name: impl Into<String>, payload: Payload) -> Self {
        Self::new(name.into(), Work::Function(payload))
    }

    fn new(name: String, work: Work) -> Self {
        let log_file = PathBuf::from(format!("{name}.log"));
        Self {
            id: JobId::next(),
            name,
            log_file,
            parents: Vec::new(),
            gate: None,
            work,
            child: None,
            is_over: false,
            return_code: None,
        }
    }

    /// Declare the jobs whose successful completion this job requires.
    pub fn with_parents(mut self, parents: &[&Job]) -> Self {
        self.parents = parents.iter().map(|p| p.id).collect();
        self
    }

    /// Attach an admission gate (typically [`crate::Pacer::gate`]).
    pub fn with_gate(mut self, gate: StartGate) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    pub fn parents(&self) -> &[JobId] {
        &self.parents
    }

    pub fn is_over(&self) -> bool {
        self.is_over
    }

    /// `None` iff the job has not started or its worker is still alive.
    pub fn return_code(&self) -> Option<i32> {
        self.return_code
    }

    /// Evaluate the admission gate. Gateless jobs are always admissible.
    pub fn can_start(&self) -> bool {
        self.gate.as_ref().map_or(true, |gate| gate())
    }

    /// Rewrite the log file to live under `folder`, preserving the basename.
    pub fn route_log(&mut self, folder: &Path) {
        if let Some(basename) = self.log_file.file_name() {
            self.log_file = folder.join(basename);
        }
    }

    /// Spawn the worker process with stdout/stderr redirected into the log
    /// file (truncated on open). The worker gets its own process group so
    /// [`Job::stop`] can terminate the whole tree.
    pub fn start(&mut self) -> Result<(), JobError> {
        let log = File::create(&self.log_file)?;
        let log_err = log.try_clone()?;

        let mut cmd = match &self.work {
            Work::Command(line) => {
                let mut cmd = Command::new("sh");
                cmd.arg("-c").arg(line);
                cmd
            }
            Work::Function(payload) => {
                let exe = std::env::current_exe()?;
                let mut cmd = Command::new(exe);
                cmd.arg(PAYLOAD_WORKER_ARG).arg(serde_json::to_string(payload)?);
                cmd
            }
        };
        cmd.stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err))
            .process_group(0);

        self.child = Some(cmd.spawn()?);
        Ok(())
    }

    /// Non-blocking liveness check. When the worker has exited, the return
    /// code is finalized and `is_over` flips.
    pub fn poll_alive(&mut self) -> bool {
        if self.is_over {
            return false;
        }
        let Some(child) = self.child.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                self.finish(exit_code(status));
                false
            }
            Err(_) => {
                self.finish(CANCEL_EXIT_CODE);
                false
            }
        }
    }

    /// Block until the worker has exited. No-op for unstarted jobs.
    pub async fn join(&mut self) {
        if let Some(child) = self.child.as_mut() {
            if let Ok(status) = child.wait().await {
                self.finish(exit_code(status));
            }
        }
    }

    /// Best-effort termination: SIGTERM to the process group, a bounded
    /// wait, then SIGKILL. Idempotent; leaves `is_over = true` and a
    /// synthesized return code on jobs that never finished on their own.
    pub async fn stop(&mut self) {
        self.finish(CANCEL_EXIT_CODE);
        let Some(child) = self.child.as_mut() else {
            return;
        };
        let Some(pid) = child.id() else {
            // Worker already reaped.
            return;
        };
        let pgid = Pid::from_raw(pid as i32);
        let _ = killpg(pgid, Signal::SIGTERM);
        if tokio::time::timeout(STOP_GRACE, child.wait()).await.is_err() {
            let _ = killpg(pgid, Signal::SIGKILL);
            let _ = child.wait().await;
        }
    }

    /// Mark the job over without touching its worker. Used for waiting jobs
    /// swept up by a transitive cancellation: they never started, so there
    /// is nothing to kill.
    pub fn mark_cancelled(&mut self) {
        self.finish(CANCEL_EXIT_CODE);
    }

    fn finish(&mut self, code: i32) {
        // is_over flips exactly once; the first recorded code wins.
        if !self.is_over {
            self.is_over = true;
            self.return_code = Some(code);
        }
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("parents", &self.parents)
            .field("is_over", &self.is_over)
            .field("return_code", &self.return_code)
            .finish()
    }
}

/// Exit code of a worker, mapping death-by-signal to a negative code the
/// way the scheduler expects (any non-zero value is a failure).
fn exit_code(status: std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status.code().or_else(|| status.signal().map(|sig| -sig)).unwrap_or(CANCEL_EXIT_CODE)
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
