// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sqd-core: job model, pacing, and staging payloads for the sqd downloader

pub mod container;
pub mod job;
pub mod pacer;
pub mod payload;

pub use container::{ContainerSet, SourceAdapter};
pub use job::{Job, JobError, JobId, StartGate, CANCEL_EXIT_CODE, PAYLOAD_WORKER_ARG};
pub use pacer::{Pacer, Turn};
pub use payload::{Payload, PayloadError};
