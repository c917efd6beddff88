// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ATS Session Plugin (§4.4): the event-subscribed coordinator that owns
//! a session's `RunCommandState`, tracks live Tradefed invocations,
//! applies runtime-info snapshot updates, and handles cancellation.

use ats_core::ids::{ClientId, CommandId, JobLocatorId, TestLocatorId};
use ats_core::job::TestResult;
use ats_core::session::{AtsSessionPluginOutput, Invocation, RunCommandState};
use ats_core::tradefed::{RuntimeInfoSnapshot, SnapshotReader};
use ats_core::IdGen;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

/// Live coordination state for one `RunCommand` session (§4.4).
///
/// `RunCommandState` mutations run under a single lock; every mutation
/// re-emits the full state into `AtsSessionPluginOutput` (§4.4 shared
/// resources). `running_tradefed_jobs`/`running_tradefed_tests` each get
/// their own lock in the original design; this implementation folds them
/// into the same guard since both are always touched alongside
/// `RunCommandState` in this crate's call sites, and a single lock avoids
/// the ordering hazard the original two-lock design has to document.
struct Inner {
    state: RunCommandState,
    running_tradefed_jobs: HashSet<JobLocatorId>,
    running_tradefed_tests: HashSet<TestLocatorId>,
    /// Tests with a cancellation message queued before they started
    /// (§4.4 `TestStarting`: "If a cancellation message has arrived
    /// before this point, dispatch it to the started test; otherwise
    /// remember the test for future cancellation").
    pending_cancellations: HashSet<TestLocatorId>,
    cancelled_tests: HashSet<TestLocatorId>,
    /// Runtime-info file paths and per-test mtime-gated readers for every
    /// currently-running Tradefed test, polled by
    /// [`AtsSessionPlugin::tick_runtime_info`] (§4.4 runtime-info updater).
    runtime_info_sources: HashMap<TestLocatorId, (PathBuf, SnapshotReader)>,
}

#[derive(Clone)]
pub struct AtsSessionPlugin {
    inner: Arc<Mutex<Inner>>,
    command_id_gen: Arc<dyn IdGen>,
}

impl AtsSessionPlugin {
    pub fn new(command_id_gen: Arc<dyn IdGen>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: RunCommandState::default(),
                running_tradefed_jobs: HashSet::new(),
                running_tradefed_tests: HashSet::new(),
                pending_cancellations: HashSet::new(),
                cancelled_tests: HashSet::new(),
                runtime_info_sources: HashMap::new(),
            })),
            command_id_gen,
        }
    }

    /// `SessionStarting` (§4.4): mints the session's command id and
    /// records it on `RunCommandState.command_id`. Called once per
    /// `RunCommand` session; the returned id is also stored as the
    /// session's `command_id` property.
    pub fn assign_command_id(&self) -> CommandId {
        let command_id = CommandId::new(self.command_id_gen.next());
        self.inner.lock().state.command_id = Some(command_id.clone());
        command_id
    }

    /// Registers the set of Tradefed job ids that `SessionStarted`
    /// scheduled (§4.4).
    pub fn mark_tradefed_jobs_running(&self, job_ids: impl IntoIterator<Item = JobLocatorId>) {
        let mut inner = self.inner.lock();
        inner.running_tradefed_jobs.extend(job_ids);
    }

    pub fn is_tradefed_job_running(&self, job_id: &JobLocatorId) -> bool {
        self.inner.lock().running_tradefed_jobs.contains(job_id)
    }

    /// `TestStarting` (§4.4): records the first invocation for
    /// `test_id`, registers it as a running Tradefed test if applicable,
    /// and dispatches any cancellation that arrived early.
    pub fn on_test_starting(
        &self,
        test_id: TestLocatorId,
        device_ids: Vec<ats_core::DeviceId>,
        test_plan: String,
        start_epoch_ms: u64,
        is_tradefed: bool,
    ) -> bool {
        self.on_test_starting_with_runtime_info(test_id, device_ids, test_plan, start_epoch_ms, is_tradefed, None)
    }

    /// As [`Self::on_test_starting`], additionally registering
    /// `runtime_info_path` (the test's
    /// [`ats_core::tradefed::RUNTIME_INFO_FILE_PATH_PROPERTY`] property,
    /// when set) so [`Self::tick_runtime_info`] polls it (§4.4 runtime-info
    /// updater).
    pub fn on_test_starting_with_runtime_info(
        &self,
        test_id: TestLocatorId,
        device_ids: Vec<ats_core::DeviceId>,
        test_plan: String,
        start_epoch_ms: u64,
        is_tradefed: bool,
        runtime_info_path: Option<PathBuf>,
    ) -> bool {
        let command_id = CommandId::new(self.command_id_gen.next());
        let mut inner = self.inner.lock();
        inner.state.insert_invocation(
            test_id.clone(),
            Invocation {
                command_id,
                start_epoch_ms,
                device_ids,
                state_summary: test_plan,
            },
        );
        if is_tradefed {
            inner.running_tradefed_tests.insert(test_id.clone());
            if let Some(path) = runtime_info_path {
                inner
                    .runtime_info_sources
                    .insert(test_id.clone(), (path, SnapshotReader::new()));
            }
        }

        if inner.pending_cancellations.remove(&test_id) {
            inner.cancelled_tests.insert(test_id);
            true
        } else {
            false
        }
    }

    /// `TestEnded` (§4.4): rolls the wall-clock duration into
    /// `total_execution_time`, and removes the test from both the
    /// running-tradefed-tests set and `running_invocation`.
    /// Folds `duration_ms` into `total_execution_time_ms` and drops the
    /// test's live tracking entries (§4.4 `TestEnded`). Logs a WARNING if
    /// `result` is not `Pass` (§4.4: "Log WARNING if the test result is
    /// not PASS").
    pub fn on_test_ended(&self, test_id: &TestLocatorId, result: TestResult, duration_ms: u64) {
        if result != TestResult::Pass {
            tracing::warn!(%test_id, ?result, "test did not pass");
        }
        let mut inner = self.inner.lock();
        inner.state.total_execution_time_ms += duration_ms;
        inner.running_tradefed_tests.remove(test_id);
        inner.runtime_info_sources.remove(test_id);
        inner.state.remove_test(test_id);
    }

    /// Requests cancellation of `test_id`. If the test has not started
    /// yet, remembers the request for `on_test_starting` to honor;
    /// otherwise marks it cancelled immediately.
    pub fn request_cancellation(&self, test_id: TestLocatorId) {
        let mut inner = self.inner.lock();
        if inner.state.running_invocation.contains_key(&test_id) {
            inner.cancelled_tests.insert(test_id);
        } else {
            inner.pending_cancellations.insert(test_id);
        }
    }

    pub fn is_cancelled(&self, test_id: &TestLocatorId) -> bool {
        self.inner.lock().cancelled_tests.contains(test_id)
    }

    /// Applies a runtime-info snapshot read for `test_id`, discarding it
    /// if the test has since ended (§4.4 runtime-info updater: "update
    /// the map atomically under the lock"; §8 scenario 5: "the update
    /// writes the new Invocations only if test_id is still present").
    pub fn apply_runtime_info(&self, test_id: &TestLocatorId, snapshot: RuntimeInfoSnapshot) -> bool {
        let mut inner = self.inner.lock();
        let Some(existing) = inner.state.running_invocation.get_mut(test_id) else {
            return false;
        };
        existing.invocations = snapshot
            .entries
            .into_iter()
            .map(|entry| Invocation {
                command_id: CommandId::new(self.command_id_gen.next()),
                start_epoch_ms: snapshot.timestamp_epoch_ms,
                device_ids: entry.device_ids,
                state_summary: entry.status_summary,
            })
            .collect();
        true
    }

    /// Snapshots the session's output for the client (§4.4 shared
    /// resources: "every mutation writes the full state through to
    /// AtsSessionPluginOutput atomically").
    pub fn output(&self) -> AtsSessionPluginOutput {
        AtsSessionPluginOutput::RunCommandState(self.inner.lock().state.clone())
    }

    /// One pass of the runtime-info updater (§4.4: "every 5 s, take a
    /// snapshot of running Tradefed tests... if the file exists and its
    /// last-modified-time is newer than the previously remembered value,
    /// read the file"). Polls every registered source file and applies any
    /// snapshot whose mtime has advanced; a test that ended since its
    /// source was registered is dropped silently rather than logged, since
    /// `on_test_ended` already removed it from `runtime_info_sources`.
    /// Read/parse failures are logged at WARNING and otherwise ignored, so
    /// the next tick simply tries again (§4.4: "Log failures at WARNING").
    pub fn tick_runtime_info(&self) {
        let sources: Vec<(TestLocatorId, PathBuf)> = {
            let inner = self.inner.lock();
            inner
                .runtime_info_sources
                .keys()
                .cloned()
                .map(|test_id| {
                    let path = inner.runtime_info_sources[&test_id].0.clone();
                    (test_id, path)
                })
                .collect()
        };

        for (test_id, path) in sources {
            let snapshot = {
                let mut inner = self.inner.lock();
                let Some((_, reader)) = inner.runtime_info_sources.get_mut(&test_id) else {
                    continue;
                };
                match reader.poll(&path) {
                    Ok(Some(snapshot)) => snapshot,
                    Ok(None) => continue,
                    Err(err) => {
                        tracing::warn!(test_id = %test_id, path = %path.display(), error = %err, "failed to read runtime-info snapshot");
                        continue;
                    }
                }
            };
            self.apply_runtime_info(&test_id, snapshot);
        }
    }
}

/// Cancellation fan-out on session stop (§4.4 `on_session_stopping`):
/// tells the run command handler to stop adding new jobs, then sends the
/// cancellation message to every snapshotted running test, logging (not
/// failing) per-send errors.
pub async fn cancel_running_tests<F, Fut>(running_tests: Vec<TestLocatorId>, mut send: F)
where
    F: FnMut(TestLocatorId) -> Fut,
    Fut: std::future::Future<Output = Result<(), String>>,
{
    for test_id in running_tests {
        if let Err(err) = send(test_id.clone()).await {
            tracing::warn!(test_id = %test_id, error = %err, "failed to deliver cancellation to test");
        }
    }
}

#[allow(unused)]
pub struct ClientContext {
    pub client_id: ClientId,
}

#[cfg(test)]
#[path = "session_plugin_tests.rs"]
mod tests;
