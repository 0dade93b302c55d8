// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dependency-aware job scheduler.
//!
//! A single loop task owns all scheduling state: jobs are submitted over a
//! channel, promoted from `waiting` to `running` in submission order when
//! their parents have succeeded, their start gate admits them, and a worker
//! slot is free. A failing job cancels its transitive descendants
//! pre-emptively, tearing down even running workers.

use sqd_core::job::{Job, JobId};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Scheduler tick interval. Start gates are re-evaluated at this cadence.
const TICK: Duration = Duration::from_millis(100);

/// Handle to the scheduler loop. Dropping the handle does not stop the
/// loop; call [`JobManager::stop`] and [`JobManager::join`].
pub struct JobManager {
    submit_tx: mpsc::UnboundedSender<Job>,
    remaining: Arc<AtomicUsize>,
    stopped: CancellationToken,
    handle: JoinHandle<()>,
}

impl JobManager {
    /// Launch the scheduler loop with a worker cap and a log directory.
    /// Job log files are rewritten into `log_folder` before they start.
    pub fn start(max_process: usize, log_folder: PathBuf) -> Self {
        let (submit_tx, submit_rx) = mpsc::unbounded_channel();
        let remaining = Arc::new(AtomicUsize::new(0));
        let stopped = CancellationToken::new();

        let scheduler = Scheduler {
            submit_rx,
            max_process: max_process.max(1),
            log_folder,
            remaining: Arc::clone(&remaining),
            stopped: stopped.clone(),
            jobs: HashMap::new(),
            waiting: Vec::new(),
            running: Vec::new(),
            children: HashMap::new(),
        };
        let handle = tokio::spawn(scheduler.run());

        Self { submit_tx, remaining, stopped, handle }
    }

    /// Queue a job. No eligibility check happens here; the loop decides.
    pub fn submit(&self, job: Job) {
        self.remaining.fetch_add(1, Ordering::SeqCst);
        let _ = self.submit_tx.send(job);
    }

    pub fn submit_many(&self, jobs: impl IntoIterator<Item = Job>) {
        for job in jobs {
            self.submit(job);
        }
    }

    /// Jobs not yet finished or cancelled: `|waiting| + |running|`.
    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::SeqCst)
    }

    /// Signal the loop to drain: still-running jobs are stop-joined.
    pub fn stop(&self) {
        self.stopped.cancel();
    }

    /// Wait for the loop to exit.
    pub async fn join(self) {
        let _ = self.handle.await;
    }
}

struct Scheduler {
    submit_rx: mpsc::UnboundedReceiver<Job>,
    max_process: usize,
    log_folder: PathBuf,
    remaining: Arc<AtomicUsize>,
    stopped: CancellationToken,
    /// Every submitted job, keyed by id. Entries are never removed during
    /// a run; finished and cancelled jobs stay for parent lookups.
    jobs: HashMap<JobId, Job>,
    /// Submission order; scanned front to back each tick.
    waiting: Vec<JobId>,
    running: Vec<JobId>,
    /// Reverse dependency index: parent id to the jobs that list it.
    children: HashMap<JobId, Vec<JobId>>,
}

impl Scheduler {
    async fn run(mut self) {
        let stopped = self.stopped.clone();
        let mut tick = tokio::time::interval(TICK);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = stopped.cancelled() => break,
                _ = tick.tick() => {
                    self.ingest();
                    self.reap().await;
                    self.promote().await;
                }
            }
        }

        self.drain().await;
    }

    /// Pull newly submitted jobs into the waiting queue and index their
    /// parent edges.
    fn ingest(&mut self) {
        while let Ok(job) = self.submit_rx.try_recv() {
            for parent in job.parents() {
                debug_assert!(
                    self.jobs.contains_key(parent),
                    "parent {parent} submitted after child {}",
                    job.id()
                );
                self.children.entry(*parent).or_default().push(job.id());
            }
            self.waiting.push(job.id());
            self.jobs.insert(job.id(), job);
        }
    }

    /// Collect finished workers, log their outcome, and cancel the
    /// descendants of any job that failed.
    async fn reap(&mut self) {
        let running = std::mem::take(&mut self.running);
        let mut finished = Vec::new();
        for id in running {
            let alive = self.jobs.get_mut(&id).is_some_and(Job::poll_alive);
            if alive {
                self.running.push(id);
            } else {
                finished.push(id);
            }
        }

        for id in finished {
            if let Some(job) = self.jobs.get_mut(&id) {
                job.join().await;
            }
            let (name, code, log_file) = match self.jobs.get(&id) {
                Some(job) => (
                    job.name().to_string(),
                    job.return_code().unwrap_or(sqd_core::CANCEL_EXIT_CODE),
                    job.log_file().display().to_string(),
                ),
                None => continue,
            };
            self.remaining.fetch_sub(1, Ordering::SeqCst);
            if code == 0 {
                tracing::info!("DONE {name}");
            } else {
                tracing::error!("ERROR {name} (return code {code})");
                tracing::error!("Please check the log file for more details: {log_file}");
                self.cancel(id).await;
            }
        }
    }

    /// Scan the waiting queue in submission order and start every job whose
    /// parents have finished, whose gate admits it, and for which a worker
    /// slot is free.
    async fn promote(&mut self) {
        // Jobs whose descendants still need cancelling after the scan.
        let mut cascade = Vec::new();
        let mut idx = 0;
        while idx < self.waiting.len() {
            if self.running.len() >= self.max_process {
                break;
            }
            let id = self.waiting[idx];
            let Some(job) = self.jobs.get(&id) else {
                self.waiting.remove(idx);
                continue;
            };

            let parents = job.parents().to_vec();
            let parents_over = parents
                .iter()
                .all(|parent| self.jobs.get(parent).is_none_or(Job::is_over));
            if !parents_over {
                idx += 1;
                continue;
            }
            // Normally a failed parent cancels this job out of the waiting
            // queue before we get here; the check covers jobs submitted
            // after their ancestor already failed.
            let parent_failed = parents
                .iter()
                .any(|parent| {
                    self.jobs
                        .get(parent)
                        .and_then(Job::return_code)
                        .is_some_and(|code| code != 0)
                });
            if !parent_failed && !job.can_start() {
                idx += 1;
                continue;
            }

            self.waiting.remove(idx);
            if let Some(job) = self.jobs.get_mut(&id) {
                if parent_failed {
                    tracing::warn!("CANCEL {}", job.name());
                    job.mark_cancelled();
                    self.remaining.fetch_sub(1, Ordering::SeqCst);
                    cascade.push(id);
                    continue;
                }
                job.route_log(&self.log_folder);
                match job.start() {
                    Ok(()) => {
                        tracing::info!("START {}", job.name());
                        self.running.push(id);
                    }
                    Err(err) => {
                        tracing::error!("ERROR {} failed to start: {err}", job.name());
                        job.mark_cancelled();
                        self.remaining.fetch_sub(1, Ordering::SeqCst);
                        cascade.push(id);
                    }
                }
            }
        }

        for id in cascade {
            self.cancel(id).await;
        }
    }

    /// Cancel `root`'s transitive descendants (and `root` itself when it is
    /// still queued). Running descendants are torn down mid-flight;
    /// waiting descendants are marked over with the sentinel code and will
    /// never start.
    async fn cancel(&mut self, root: JobId) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if let Some(children) = self.children.get(&id) {
                stack.extend(children.iter().copied());
            }

            let was_waiting = remove_id(&mut self.waiting, id);
            let was_running = remove_id(&mut self.running, id);
            if let Some(job) = self.jobs.get_mut(&id) {
                if !job.is_over() {
                    tracing::warn!("CANCEL {}", job.name());
                    if was_running {
                        job.stop().await;
                        job.join().await;
                    } else {
                        job.mark_cancelled();
                    }
                }
            }
            if was_waiting || was_running {
                self.remaining.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }

    /// Stop-join every running worker on shutdown.
    async fn drain(&mut self) {
        for id in std::mem::take(&mut self.running) {
            if let Some(job) = self.jobs.get_mut(&id) {
                if !job.is_over() {
                    tracing::warn!("STOP {}", job.name());
                }
                job.stop().await;
                job.join().await;
            }
            self.remaining.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

fn remove_id(queue: &mut Vec<JobId>, id: JobId) -> bool {
    match queue.iter().position(|other| *other == id) {
        Some(pos) => {
            queue.remove(pos);
            true
        }
        None => false,
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
