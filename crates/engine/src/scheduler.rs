// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Generic timer bookkeeping shared by the allocation loop's pending-test
//! printer and diagnostic clock (§4.3), and the session plugin's
//! runtime-info updater (§4.4).

use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
struct Timer {
    fires_at: Instant,
}

/// Tracks named one-shot/reschedulable deadlines against an injected
/// clock reading, so callers never call `Instant::now()` directly and can
/// be driven by a fake clock in tests.
#[derive(Debug, Default)]
pub struct Scheduler {
    timers: HashMap<String, Timer>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_timer(&mut self, id: impl Into<String>, duration: Duration, now: Instant) {
        self.timers.insert(
            id.into(),
            Timer {
                fires_at: now + duration,
            },
        );
    }

    pub fn cancel_timer(&mut self, id: &str) {
        self.timers.remove(id);
    }

    /// Returns the ids of every timer whose deadline has passed, removing
    /// them from the scheduler.
    pub fn fired(&mut self, now: Instant) -> Vec<String> {
        let fired: Vec<String> = self
            .timers
            .iter()
            .filter(|(_, t)| t.fires_at <= now)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &fired {
            self.timers.remove(id);
        }
        fired
    }

    pub fn is_armed(&self, id: &str) -> bool {
        self.timers.contains_key(id)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.values().map(|t| t.fires_at).min()
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
