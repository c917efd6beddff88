// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rate-limited warning gate.
//!
//! Heartbeat (§4.1) and runtime-info (§4.4) transport errors are swallowed
//! and logged at most once per interval, rather than once per failed send.

use crate::clock::Clock;
use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Gate that allows at most one "should I log" signal per `interval`.
pub struct RateLimiter {
    interval: Duration,
    last_fired: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_fired: Mutex::new(None),
        }
    }

    /// Returns true if the caller should log now, given the clock's current
    /// instant. Updates internal state as a side effect when it returns
    /// true.
    pub fn should_fire(&self, now: Instant) -> bool {
        let mut last = self.last_fired.lock();
        match *last {
            Some(t) if now.duration_since(t) < self.interval => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }

    /// Convenience wrapper pulling `now` from a [`Clock`].
    pub fn should_fire_with(&self, clock: &impl Clock) -> bool {
        self.should_fire(clock.now())
    }
}

#[cfg(test)]
#[path = "ratelog_tests.rs"]
mod tests;
