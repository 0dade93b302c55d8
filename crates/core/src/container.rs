// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Contract between the download engine and source adapters.

use crate::job::Job;
use crate::pacer::Pacer;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// A source adapter turns accessions of one kind into a DAG of jobs and
/// paces queries to that kind's origin server.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Container key this adapter serves (register file basename).
    fn name(&self) -> &'static str;

    /// Whether the adapter can download at all (required tools present).
    fn is_ready(&self) -> bool;

    /// The per-source pacer shared by this adapter's paced jobs.
    fn pacer(&self) -> &Arc<Pacer>;

    /// Expand accessions into jobs realizing their download into `datadir`.
    /// Parent edges reference only jobs within the returned sequence.
    /// Returns an empty sequence when there is nothing to do.
    async fn jobs_from_accessions(&self, accessions: &[String], datadir: &Path) -> Vec<Job>;

    /// Validate accessions before they enter the register. The default
    /// accepts everything; adapters override with format checks and, where
    /// the source supports it, server-side validation.
    async fn filter_valid(&self, accessions: Vec<String>) -> Vec<String> {
        accessions
    }
}

/// A container from the register paired with its adapter: the unit the
/// orchestrator schedules.
pub struct ContainerSet {
    pub name: String,
    pub adapter: Arc<dyn SourceAdapter>,
    pub accessions: Vec<String>,
}

impl ContainerSet {
    pub fn new(adapter: Arc<dyn SourceAdapter>, accessions: Vec<String>) -> Self {
        Self { name: adapter.name().to_string(), adapter, accessions }
    }
}
