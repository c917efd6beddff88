// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction so the allocation loop, diagnostician, and heartbeat
//! intervals (§4.1, §4.3) are deterministic under test.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// A source of time. Production code uses [`SystemClock`]; tests use
/// [`FakeClock`] to advance time deterministically without sleeping.
pub trait Clock: Clone + Send + Sync + 'static {
    /// Monotonic instant, used for interval/timeout arithmetic.
    fn now(&self) -> Instant;

    /// Wall-clock milliseconds since the Unix epoch, used for timestamps
    /// that must survive process restarts (step history, invocation start
    /// times).
    fn epoch_ms(&self) -> u64;
}

/// Real wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

#[derive(Debug)]
struct FakeClockState {
    now: Instant,
    epoch_ms: u64,
}

/// Deterministic clock for tests: starts pinned at construction time and
/// only moves when [`FakeClock::advance`] is called.
#[derive(Debug, Clone)]
pub struct FakeClock {
    state: Arc<Mutex<FakeClockState>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeClockState {
                now: Instant::now(),
                epoch_ms: 0,
            })),
        }
    }

    pub fn with_epoch_ms(epoch_ms: u64) -> Self {
        let clock = Self::new();
        clock.state.lock().epoch_ms = epoch_ms;
        clock
    }

    /// Advance both the monotonic and epoch clocks by `d`.
    pub fn advance(&self, d: Duration) {
        let mut state = self.state.lock();
        state.now += d;
        state.epoch_ms += d.as_millis() as u64;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.state.lock().now
    }

    fn epoch_ms(&self) -> u64 {
        self.state.lock().epoch_ms
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
