// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test Manager and Direct Test Runners (§4.3 allocation loop step 5):
//! starts a test once a device is allocated to it, tracks which tests
//! are in flight, and lets the job runner cooperatively cancel them.

use ats_core::allocation::Allocation;
use ats_core::ids::TestLocatorId;
use ats_core::job::TestResult;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Everything a direct test runner needs to execute one test (§4.3 step
/// 5: "build a DirectTestRunnerSetting").
#[derive(Debug, Clone)]
pub struct DirectTestRunnerSetting {
    pub test_id: TestLocatorId,
    pub allocation: Allocation,
    pub test_plan: String,
}

#[derive(Debug, Error)]
pub enum TestRunnerStartError {
    #[error("test runner failed to start: {0}")]
    StartFailed(String),
}

/// Runs a single test to completion against its allocated device(s).
#[async_trait]
pub trait DirectTestRunner: Send + Sync {
    async fn run(&self, setting: DirectTestRunnerSetting) -> TestResult;
    /// Requests cooperative cancellation; the runner decides when (or
    /// whether) it can honor it before completion.
    async fn cancel(&self);
}

struct RunningTest {
    handle: tokio::task::JoinHandle<TestResult>,
    runner: Arc<dyn DirectTestRunner>,
}

/// Tracks in-flight tests started via direct test runners, so the
/// allocation loop's exit condition
/// (`jobInfo.tests().allDone() && !testManager.isAnyTestRunning()`) can be
/// evaluated, and so `kill_all_tests` can request cancellation of every
/// runner at once (§4.3 Contract: `kill_all_tests()`).
#[derive(Clone, Default)]
pub struct TestManager {
    running: Arc<Mutex<HashMap<TestLocatorId, RunningTest>>>,
}

impl TestManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_any_test_running(&self) -> bool {
        !self.running.lock().is_empty()
    }

    pub fn running_count(&self) -> usize {
        self.running.lock().len()
    }

    /// Spawns `runner` against `setting` on the current tokio runtime,
    /// tracking the join handle under `setting.test_id`.
    pub fn start(
        &self,
        runner: Arc<dyn DirectTestRunner>,
        setting: DirectTestRunnerSetting,
    ) -> Result<(), TestRunnerStartError> {
        let test_id = setting.test_id.clone();
        let runner_for_task = runner.clone();
        let handle = tokio::spawn(async move { runner_for_task.run(setting).await });
        self.running.lock().insert(test_id, RunningTest { handle, runner });
        Ok(())
    }

    /// Requests cooperative cancellation of every in-flight test (§4.3
    /// Contract: `kill_all_tests()`). Does not wait for the runners to
    /// actually stop; the allocation loop's exit condition and post-run
    /// finalization's bounded thread-pool wait handle that.
    pub async fn cancel_all(&self) {
        let runners: Vec<Arc<dyn DirectTestRunner>> = self
            .running
            .lock()
            .values()
            .map(|rt| rt.runner.clone())
            .collect();
        for runner in runners {
            runner.cancel().await;
        }
    }

    /// Awaits completion of every test that has finished, removing them
    /// from the running set and returning `(test_id, result)` pairs.
    /// Tests still in flight are left untouched.
    pub async fn drain_finished(&self) -> Vec<(TestLocatorId, TestResult)> {
        let finished_ids: Vec<TestLocatorId> = {
            let running = self.running.lock();
            running
                .iter()
                .filter(|(_, rt)| rt.handle.is_finished())
                .map(|(id, _)| id.clone())
                .collect()
        };

        let mut results = Vec::new();
        for id in finished_ids {
            let handle = self.running.lock().remove(&id).map(|rt| rt.handle);
            if let Some(handle) = handle {
                if let Ok(result) = handle.await {
                    results.push((id, result));
                }
            }
        }
        results
    }

    pub fn remove(&self, test_id: &TestLocatorId) {
        self.running.lock().remove(test_id);
    }
}

#[cfg(test)]
#[path = "test_manager_tests.rs"]
mod tests;
