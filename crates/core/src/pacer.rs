// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pacer: per-source minimum inter-query delay.
//!
//! Two usage modes share one timestamp:
//! - [`Pacer::delay_ready`] is a cheap non-blocking predicate used as a job's
//!   start gate, re-evaluated on every scheduler tick.
//! - [`Pacer::wait_my_turn`] blocks adapter code that performs a synchronous
//!   query, holding an exclusive turn across the I/O. The returned [`Turn`]
//!   guard re-stamps the timestamp and releases on drop, so no code path can
//!   leak the turn.

use crate::job::StartGate;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex as TurnLock, MutexGuard};

pub struct Pacer {
    min_delay: Duration,
    last_query: parking_lot::Mutex<Option<Instant>>,
    turn: TurnLock<()>,
}

impl Pacer {
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            last_query: parking_lot::Mutex::new(None),
            turn: TurnLock::new(()),
        }
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// Non-blocking: true when no query turn is in flight and `min_delay`
    /// has elapsed since the last query. A true result stamps the timestamp,
    /// so the caller is committed to starting its operation now.
    pub fn delay_ready(&self) -> bool {
        match self.turn.try_lock() {
            Ok(_turn) => self.ready_and_stamp(),
            Err(_) => false,
        }
    }

    /// Wait for an exclusive query turn. The guard must be held across the
    /// query; dropping it records the query time and frees the turn.
    pub async fn wait_my_turn(&self) -> Turn<'_> {
        let guard = self.turn.lock().await;
        loop {
            let remaining = {
                let last = self.last_query.lock();
                last.map_or(Duration::ZERO, |at| self.min_delay.saturating_sub(at.elapsed()))
            };
            if remaining.is_zero() {
                break;
            }
            tokio::time::sleep(remaining.max(Duration::from_millis(1))).await;
        }
        Turn { pacer: self, _turn: guard }
    }

    /// Build a job start gate borrowing this pacer.
    pub fn gate(self: &Arc<Self>) -> StartGate {
        let pacer = Arc::clone(self);
        Arc::new(move || pacer.delay_ready())
    }

    fn ready_and_stamp(&self) -> bool {
        let mut last = self.last_query.lock();
        match *last {
            Some(at) if at.elapsed() < self.min_delay => false,
            _ => {
                *last = Some(Instant::now());
                true
            }
        }
    }
}

/// Exclusive query turn on a [`Pacer`]. Dropping the guard stamps
/// `last_query`, so the next turn waits `min_delay` from the moment the
/// current query finished.
pub struct Turn<'a> {
    pacer: &'a Pacer,
    _turn: MutexGuard<'a, ()>,
}

impl Drop for Turn<'_> {
    fn drop(&mut self) {
        *self.pacer.last_query.lock() = Some(Instant::now());
    }
}

#[cfg(test)]
#[path = "pacer_tests.rs"]
mod tests;
