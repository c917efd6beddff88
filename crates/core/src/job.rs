// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job and Test state machine types (§3 Data Model, §4.3 Job Runner).

use crate::error::JobErrorId;
use crate::ids::{JobLocatorId, TestLocatorId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// A Test's lifecycle status. Monotone prefix of `New → Assigned →
/// Running → Done`, with two accepted shortcuts: `New → Suspended →
/// Done` and `New → Done` directly (§8 testable properties).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TestStatus {
    New,
    Assigned,
    Suspended,
    Running,
    Done,
}

impl TestStatus {
    /// Whether `self -> next` is an allowed transition.
    pub fn can_advance_to(self, next: TestStatus) -> bool {
        use TestStatus::*;
        matches!(
            (self, next),
            (New, Assigned) | (New, Suspended) | (New, Done)
                | (Assigned, Running) | (Assigned, Done)
                | (Suspended, Done)
                | (Running, Done)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TestStatus::Done)
    }
}

/// Terminal classification of a Test's outcome. `Unknown` until the job
/// runner (or a test runner) explicitly sets it; see
/// [`Test::try_set_result`] for the write-once discipline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestResult {
    Unknown,
    Pass,
    Fail,
    Error,
    Timeout,
    Abort,
    Skip,
}

impl Default for TestResult {
    fn default() -> Self {
        TestResult::Unknown
    }
}

impl TestResult {
    pub fn is_unknown(self) -> bool {
        matches!(self, TestResult::Unknown)
    }
}

/// Identifies a Test and carries its display name (§3 Job & Test).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestLocator {
    pub id: TestLocatorId,
    pub name: String,
}

/// A single Test belonging to a Job (§3 Job & Test).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Test {
    pub locator: TestLocator,
    pub job_id: JobLocatorId,
    pub status: TestStatus,
    pub result: TestResult,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl Test {
    pub fn new(locator: TestLocator, job_id: JobLocatorId) -> Self {
        Self {
            locator,
            job_id,
            status: TestStatus::New,
            result: TestResult::Unknown,
            warnings: Vec::new(),
            properties: BTreeMap::new(),
        }
    }

    /// Advances `status`, rejecting transitions `TestStatus::can_advance_to`
    /// disallows. Returns `false` (no-op) on a disallowed transition rather
    /// than panicking, since the job runner treats an illegal transition as
    /// a caller bug it logs and skips, not a crash.
    pub fn advance_status(&mut self, next: TestStatus) -> bool {
        if self.status.can_advance_to(next) {
            self.status = next;
            true
        } else {
            false
        }
    }

    /// Sets `result` only if it is currently `Unknown` (§3 invariant: once
    /// non-`Unknown`, never overwritten by the job runner). Returns
    /// `false` if the result was already decided.
    pub fn try_set_result(&mut self, result: TestResult) -> bool {
        if self.result.is_unknown() {
            self.result = result;
            true
        } else {
            false
        }
    }
}

/// Timing bounds for a Job's allocation and execution window (§4.3
/// allocation loop).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct JobTiming {
    pub start_epoch_ms: u64,
    pub end_epoch_ms: Option<u64>,
    pub start_timeout: Duration,
    pub job_timeout: Duration,
}

impl JobTiming {
    pub fn expire_epoch_ms(&self) -> u64 {
        self.start_epoch_ms + self.start_timeout.as_millis() as u64
    }
}

/// Terminal classification of a Job's outcome, with an attached cause
/// code once non-`Unknown` (§4.3 post-run finalization table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobResult {
    Unknown,
    Pass,
    /// Every test was skipped by a pre-run plugin's "skip job" signal.
    Skip,
    Fail(JobErrorId),
    Error(JobErrorId),
    Timeout(JobErrorId),
    Abort(JobErrorId),
}

impl Default for JobResult {
    fn default() -> Self {
        JobResult::Unknown
    }
}

impl JobResult {
    pub fn is_unknown(self) -> bool {
        matches!(self, JobResult::Unknown)
    }
}

/// Identifies a Job and carries its display name (§3 Job & Test).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobLocator {
    pub id: JobLocatorId,
    pub name: String,
}

/// A Job: one xTS invocation unit within a session, owning an ordered set
/// of Tests (§3 Job & Test, §4.3 Job Runner).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub locator: JobLocator,
    #[serde(default)]
    pub dimensions: BTreeMap<String, String>,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    pub timing: JobTiming,
    #[serde(default)]
    pub result: JobResult,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub tagged_files: BTreeMap<String, Vec<PathBuf>>,
    pub tests: Vec<Test>,
}

impl Job {
    /// Sets `result` only if currently `Unknown` (§4.3: "Do not overwrite
    /// an already non-UNKNOWN job result").
    pub fn try_set_result(&mut self, result: JobResult) -> bool {
        if self.result.is_unknown() {
            self.result = result;
            true
        } else {
            false
        }
    }

    pub fn all_tests_done(&self) -> bool {
        self.tests.iter().all(|t| t.status.is_terminal())
    }

    /// Forces every non-`Done` `New` test to `Abort`, per the manual-abort
    /// override in post-run finalization.
    pub fn abort_new_tests(&mut self) {
        for test in &mut self.tests {
            if test.status == TestStatus::New {
                test.advance_status(TestStatus::Done);
                test.try_set_result(TestResult::Abort);
            }
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
