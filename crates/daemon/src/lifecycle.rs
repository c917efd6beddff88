// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server-side lifecycle: the control/session service implementation
//! that backs [`crate::protocol::Request`]/[`crate::protocol::Response`],
//! and the per-session orchestration that turns a submitted `RunCommand`
//! into running jobs (§4.4 ATS Session Plugin, §6 External Interfaces).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ats_adapters::device_querier::{DeviceQueryFilter, DeviceQuerier, NoOpDeviceQuerier};
use ats_core::clock::{Clock, SystemClock};
use ats_core::event::{Event, Scope};
use ats_core::ids::{ClientId, JobLocatorId, SessionId};
use ats_core::job::{Job, JobResult, TestResult};
use ats_core::session::{
    AtsSessionPluginConfig, AtsSessionPluginOutput, DumpCommand, ListCommand, Session,
    SessionStatus,
};
use ats_core::{IdGen, SequentialIdGen, UuidIdGen};
use ats_engine::allocator::{DeviceAllocator, ProxyMediatedAllocator, SchedulerMediatedAllocator};
use ats_engine::event_bus::{EventBus, FnSubscriber};
use ats_engine::job_runner::{
    AllocationExitStrategy, FilterFactory, JobRunner, JobRunnerConfig, TestRunnerFactory,
};
use ats_engine::run_command_handler::{ResolvedModule, RunCommandHandler};
use ats_engine::session_plugin::AtsSessionPlugin;
use ats_engine::test_manager::{DirectTestRunner, DirectTestRunnerSetting, TestManager};
use parking_lot::Mutex;

use crate::config::DaemonConfig;
use crate::protocol::{KillFailure, Request, Response, SessionSummary, UnfinishedSessionEntry};

/// `GetVersion`'s version string for this build. Client and server are
/// built from the same crate graph here, so there is no separate release
/// skew to simulate; §8's round-trip law over `GetVersionResponse` still
/// exercises the comparison machinery.
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// A stand-in for the out-of-scope external collaborator that actually
/// runs Tradefed inside a worker subprocess (§1 Non-goals: "Tradefed
/// subprocess internals"). Returns `result` once run, or aborts
/// immediately if cancelled first.
struct TradefedStubRunner {
    result: TestResult,
    cancelled: Arc<std::sync::atomic::AtomicBool>,
}

#[async_trait::async_trait]
impl DirectTestRunner for TradefedStubRunner {
    async fn run(&self, _setting: DirectTestRunnerSetting) -> TestResult {
        if self.cancelled.load(std::sync::atomic::Ordering::SeqCst) {
            return TestResult::Abort;
        }
        self.result
    }

    async fn cancel(&self) {
        self.cancelled.store(true, std::sync::atomic::Ordering::SeqCst);
    }
}

struct StubRunnerFactory;

impl TestRunnerFactory for StubRunnerFactory {
    fn build(&self) -> Arc<dyn DirectTestRunner> {
        Arc::new(TradefedStubRunner {
            result: TestResult::Pass,
            cancelled: Arc::new(std::sync::atomic::AtomicBool::new(false)),
        })
    }
}

struct NoNarrowingFilters;

impl FilterFactory for NoNarrowingFilters {
    fn filters(&self) -> Vec<DeviceQueryFilter> {
        vec![DeviceQueryFilter::default()]
    }
}

/// One tracked session: its public record plus, for `RunCommand`
/// sessions, the live plugin driving `RunCommandState`.
struct SessionRecord {
    session: Session,
    plugin: Option<AtsSessionPlugin>,
}

/// Server-side state backing the control and session services (§6).
///
/// `clients` tracks the last heartbeat per [`ClientId`] (§4.1 heartbeat:
/// the server uses its absence to judge whether a kill request is safe);
/// `sessions` holds every session from submission until its ended-event
/// has been observed (§3 Session).
pub struct ServerState {
    config: DaemonConfig,
    process_id: u32,
    id_gen: UuidIdGen,
    command_id_gen: Arc<SequentialIdGen>,
    querier: Arc<dyn DeviceQuerier>,
    clients: Mutex<HashMap<ClientId, Instant>>,
    sessions: Mutex<HashMap<SessionId, SessionRecord>>,
    event_bus: Arc<EventBus>,
}

impl ServerState {
    pub fn new(config: DaemonConfig) -> Arc<Self> {
        let querier: Arc<dyn DeviceQuerier> = Arc::new(NoOpDeviceQuerier::new());
        Self::with_querier(config, querier)
    }

    /// Constructs with an injected querier (tests supply a
    /// `FakeDeviceQuerier`; a real fleet backend is out of scope, §4.5).
    pub fn with_querier(config: DaemonConfig, querier: Arc<dyn DeviceQuerier>) -> Arc<Self> {
        Arc::new(Self {
            config,
            process_id: std::process::id(),
            id_gen: UuidIdGen,
            command_id_gen: Arc::new(SequentialIdGen::new("cmd")),
            querier,
            clients: Mutex::new(HashMap::new()),
            sessions: Mutex::new(HashMap::new()),
            event_bus: Arc::new(EventBus::new()),
        })
    }

    /// Dispatches one request to its handler (§6 control-service and
    /// session-service RPCs). `SubmitSession` kicks off its run in the
    /// background so the caller gets `session_id` back immediately.
    pub async fn handle_request(self: &Arc<Self>, request: Request) -> Response {
        match request {
            Request::GetVersion => Response::GetVersion(ats_core::version::GetVersionResponse::new(
                SERVER_VERSION,
                self.process_id,
            )),
            Request::Heartbeat { client_id } => {
                self.clients.lock().insert(client_id, Instant::now());
                Response::HeartbeatAck
            }
            Request::KillServer { client_id } => self.handle_kill_server(client_id),
            Request::SubmitSession { client_id, config } => {
                self.handle_submit_session(client_id, config).await
            }
            Request::GetAllSessions { name_filter, status_filter } => {
                self.handle_get_all_sessions(name_filter, status_filter)
            }
            Request::AbortSessions { session_ids } => self.handle_abort_sessions(session_ids),
            Request::GetSessionOutput { session_id } => self.handle_get_session_output(&session_id),
        }
    }

    /// `KillServer` (§4.1 kill algorithm): refuses if any session is
    /// unfinished or any other client has heartbeated within the last
    /// three missed beats (30 s), reporting both as a [`KillFailure`]
    /// table (§7 `CannotKillExisting`). The preparer decides whether to
    /// retry, wait, or escalate to SIGKILL; this service only ever
    /// reports the reasons.
    fn handle_kill_server(&self, requesting_client: ClientId) -> Response {
        let unfinished_sessions: Vec<UnfinishedSessionEntry> = self
            .sessions
            .lock()
            .values()
            .filter(|r| r.session.status != SessionStatus::Finished)
            .map(|r| UnfinishedSessionEntry {
                session_id: r.session.session_id.clone(),
                name: session_name(&r.session.config),
                status: r.session.status,
                submitted_epoch_ms: 0,
            })
            .collect();

        let stale_after = Duration::from_secs(30);
        let now = Instant::now();
        let alive_clients: Vec<ClientId> = self
            .clients
            .lock()
            .iter()
            .filter(|(id, last_seen)| **id != requesting_client && now.duration_since(**last_seen) < stale_after)
            .map(|(id, _)| (*id).clone())
            .collect();

        if unfinished_sessions.is_empty() && alive_clients.is_empty() {
            Response::KillServerSuccess { server_pid: self.process_id }
        } else {
            Response::KillServerFailure(KillFailure {
                unfinished_sessions,
                alive_clients,
                server_pid: self.process_id,
            })
        }
    }

    fn handle_get_all_sessions(
        &self,
        name_filter: Option<String>,
        status_filter: Option<SessionStatus>,
    ) -> Response {
        let sessions = self
            .sessions
            .lock()
            .values()
            .filter(|r| {
                name_filter
                    .as_ref()
                    .map(|f| session_name(&r.session.config).contains(f.as_str()))
                    .unwrap_or(true)
            })
            .filter(|r| status_filter.map(|s| r.session.status == s).unwrap_or(true))
            .map(|r| SessionSummary {
                session_id: r.session.session_id.clone(),
                status: r.session.status,
            })
            .collect();
        Response::AllSessions { sessions }
    }

    fn handle_get_session_output(&self, session_id: &SessionId) -> Response {
        let sessions = self.sessions.lock();
        Response::SessionOutput(sessions.get(session_id).and_then(|r| r.session.output.clone()))
    }

    /// `AbortSessions` (§4.4 cancellation): for every found `RunCommand`
    /// session, requests cancellation of every test still recorded in its
    /// `RunCommandState`. Tests already running are cancelled
    /// immediately; tests not yet started receive the cancellation on
    /// their `TestStarting` hook via the plugin's pending-cancellation
    /// set (§4.4, §8 scenario 4).
    fn handle_abort_sessions(&self, session_ids: Vec<SessionId>) -> Response {
        let mut found = Vec::new();
        let sessions = self.sessions.lock();
        for session_id in session_ids {
            let Some(record) = sessions.get(&session_id) else {
                continue;
            };
            found.push(session_id);
            let Some(plugin) = &record.plugin else {
                continue;
            };
            let AtsSessionPluginOutput::RunCommandState(state) = plugin.output() else {
                continue;
            };
            for test_id in state.running_invocation.into_keys() {
                plugin.request_cancellation(test_id);
            }
        }
        Response::AbortedSessions { session_ids: found }
    }

    /// `SubmitSession` (§4.4 `SessionStarting`/`SessionStarted`): mints a
    /// session id, dispatches the start events, and — for `RunCommand` —
    /// spawns the background orchestration that drives every resulting
    /// job to completion and finally writes `AtsSessionPluginOutput`.
    async fn handle_submit_session(
        self: &Arc<Self>,
        client_id: ClientId,
        config: AtsSessionPluginConfig,
    ) -> Response {
        self.clients.lock().entry(client_id.clone()).or_insert_with(Instant::now);

        let session_id = SessionId::new(self.id_gen.next());
        let mut session = Session::new(session_id.clone(), client_id, config.clone());

        self.event_bus
            .dispatch(&Event::SessionStarting { session_id: session_id.clone() });

        match config {
            AtsSessionPluginConfig::RunCommand(run_command) => {
                let plugin = AtsSessionPlugin::new(self.command_id_gen.clone());
                let command_id = plugin.assign_command_id();
                session.properties.insert(
                    ats_core::session::reserved_properties::COMMAND_ID.to_string(),
                    command_id.as_str().to_string(),
                );
                session.status = SessionStatus::Running;

                let handler = RunCommandHandler::new(&self.id_gen);
                let start_epoch_ms = SystemClock.epoch_ms();
                let modules = vec![ResolvedModule { name: run_command.test_plan.clone(), is_tradefed: true }];
                let built = handler.build_jobs(&run_command, &modules, start_epoch_ms);
                let jobs: Vec<Job> = built.tradefed_jobs.into_iter().chain(built.non_tradefed_jobs).collect();
                let job_ids: Vec<JobLocatorId> = jobs.iter().map(|j| j.locator.id.clone()).collect();
                plugin.mark_tradefed_jobs_running(job_ids);

                self.event_bus
                    .dispatch(&Event::SessionStarted { session_id: session_id.clone() });

                self.sessions
                    .lock()
                    .insert(session_id.clone(), SessionRecord { session, plugin: Some(plugin.clone()) });

                let this = self.clone();
                let session_id_for_task = session_id.clone();
                tokio::spawn(async move {
                    this.drive_run_command_session(session_id_for_task, plugin, jobs).await;
                });
            }
            AtsSessionPluginConfig::ListCommand(list_command) => {
                session.status = SessionStatus::Finished;
                session.output = Some(self.handle_list_command(&list_command));
                self.event_bus
                    .dispatch(&Event::SessionStarted { session_id: session_id.clone() });
                self.event_bus
                    .dispatch(&Event::SessionEnded { session_id: session_id.clone() });
                self.sessions
                    .lock()
                    .insert(session_id.clone(), SessionRecord { session, plugin: None });
            }
            AtsSessionPluginConfig::DumpCommand(dump_command) => {
                session.status = SessionStatus::Finished;
                session.output = Some(self.handle_dump_command(&dump_command));
                self.event_bus
                    .dispatch(&Event::SessionStarted { session_id: session_id.clone() });
                self.event_bus
                    .dispatch(&Event::SessionEnded { session_id: session_id.clone() });
                self.sessions
                    .lock()
                    .insert(session_id.clone(), SessionRecord { session, plugin: None });
            }
        }

        Response::SubmitSession { session_id }
    }

    /// `ListCommand` delegation (§4.4: "delegate to the corresponding
    /// handler and set the final output directly"). Enumerating modules
    /// against a real xTS tree is out of scope (§1 Non-goals); this
    /// reports the request was accepted.
    fn handle_list_command(&self, list_command: &ListCommand) -> AtsSessionPluginOutput {
        AtsSessionPluginOutput::Success {
            output_message: format!(
                "listed modules under {} ({})",
                list_command.xts_root_dir, list_command.xts_type
            ),
        }
    }

    fn handle_dump_command(&self, dump_command: &DumpCommand) -> AtsSessionPluginOutput {
        AtsSessionPluginOutput::Success {
            output_message: format!("dumped environment for {}", dump_command.xts_root_dir),
        }
    }

    /// Drives every job of a `RunCommand` session to completion
    /// concurrently, wiring the session's [`AtsSessionPlugin`] into each
    /// job's event bus so `TestStarting`/`TestEnded` keep
    /// `RunCommandState` current, then finalizes the session (§4.4
    /// `handleResultProcessing`, `SessionEnded`).
    async fn drive_run_command_session(
        self: Arc<Self>,
        session_id: SessionId,
        plugin: AtsSessionPlugin,
        jobs: Vec<Job>,
    ) {
        let proxy = if self.config.enable_proxy_mode {
            Some(Arc::new(ProxyMediatedAllocator::new(self.querier.clone(), false)))
        } else {
            None
        };

        // Runtime-info updater (§4.4 `SessionStarted`: "Schedule the
        // runtime-info updater at 5 s fixed delay"). One ticker per
        // session, covering every job's Tradefed tests; cancelled once all
        // jobs finish.
        let updater_plugin = plugin.clone();
        let updater_handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(RUNTIME_INFO_UPDATER_INTERVAL);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                updater_plugin.tick_runtime_info();
            }
        });

        let mut handles = Vec::new();
        for mut job in jobs {
            let plugin = plugin.clone();
            let config = self.config.clone();
            let querier = self.querier.clone();
            let proxy = proxy.clone();
            let runtime_info_paths: HashMap<_, _> = job
                .tests
                .iter()
                .filter_map(|t| {
                    t.properties
                        .get(ats_core::tradefed::RUNTIME_INFO_FILE_PATH_PROPERTY)
                        .map(|p| (t.locator.id.clone(), std::path::PathBuf::from(p)))
                })
                .collect();
            handles.push(tokio::spawn(async move {
                let mut event_bus = EventBus::new();
                wire_test_lifecycle(&mut event_bus, plugin.clone(), runtime_info_paths);

                let allocator: Arc<dyn DeviceAllocator> = match &proxy {
                    Some(proxy) => {
                        for test in &job.tests {
                            proxy.try_lease(test.locator.id.clone(), &DeviceQueryFilter::default()).await;
                        }
                        proxy.clone()
                    }
                    None => Arc::new(SchedulerMediatedAllocator::new()),
                };

                let clock = SystemClock;
                let runner = JobRunner {
                    clock: &clock,
                    allocator,
                    test_manager: TestManager::new(),
                    event_bus: &event_bus,
                    querier: Some(&*querier),
                    filters: &NoNarrowingFilters,
                    runner_factory: &StubRunnerFactory,
                    config: JobRunnerConfig {
                        allocation_exit_strategy: AllocationExitStrategy::Normal,
                        real_time_mode: config.real_time_job,
                        is_local_allocator: false,
                        configured_heap_bytes: config.configured_heap_bytes,
                        min_diagnostic_heap_bytes: config.min_diagnostic_heap_bytes,
                    },
                };
                runner.run(&mut job).await;
                job
            }));
        }

        let mut finished_jobs = Vec::new();
        for handle in handles {
            if let Ok(job) = handle.await {
                finished_jobs.push(job);
            }
        }
        updater_handle.abort();

        self.finalize_run_command_session(session_id, finished_jobs);
    }

    fn finalize_run_command_session(self: &Arc<Self>, session_id: SessionId, jobs: Vec<Job>) {
        let any_error = jobs.iter().any(|j| {
            matches!(
                j.result,
                JobResult::Fail(_) | JobResult::Error(_) | JobResult::Timeout(_) | JobResult::Abort(_)
            )
        });

        let output = if any_error {
            AtsSessionPluginOutput::Failure {
                error_message: format!("run command completed with {} job(s) failing", jobs.len()),
            }
        } else {
            AtsSessionPluginOutput::Success {
                output_message: format!("run command completed: {} job(s)", jobs.len()),
            }
        };

        if let Some(record) = self.sessions.lock().get_mut(&session_id) {
            record.session.status = SessionStatus::Finished;
            record.session.output = Some(output);
        }

        self.event_bus
            .dispatch(&Event::SessionEnded { session_id });
    }
}

/// Cadence of the session-level runtime-info updater (§4.4 `SessionStarted`:
/// "Schedule the runtime-info updater at 5 s fixed delay").
const RUNTIME_INFO_UPDATER_INTERVAL: Duration = Duration::from_secs(5);

/// Subscribes `plugin` to `TestStarting`/`TestEnded` so a single job's
/// event bus keeps `RunCommandState` current (§4.4, §5 ordering
/// guarantees). The session plugin is a single coordinator, not one
/// instance per scope, so each subscriber is registered at exactly one
/// scope (`CLASS_INTERNAL`) — `EventBus::dispatch` already walks every
/// scope in `event.dispatch_order()`, and a subscriber registered at all
/// five would observe the same event five times. `runtime_info_paths`
/// carries each Tradefed test's `TRADEFED_RUNTIME_INFO_FILE_PATH`
/// property, registered with the plugin as the test starts so the
/// session's runtime-info updater polls it.
fn wire_test_lifecycle(
    event_bus: &mut EventBus,
    plugin: AtsSessionPlugin,
    runtime_info_paths: HashMap<ats_core::ids::TestLocatorId, std::path::PathBuf>,
) {
    let start_plugin = plugin.clone();
    let start_subscriber = Arc::new(FnSubscriber(move |event: &Event| {
        if let Event::TestStarting {
            test_id,
            device_ids,
            test_plan,
            start_epoch_ms,
            ..
        } = event
        {
            let is_tradefed = runtime_info_paths.contains_key(test_id);
            let path = runtime_info_paths.get(test_id).cloned();
            start_plugin.on_test_starting_with_runtime_info(
                test_id.clone(),
                device_ids.clone(),
                test_plan.clone(),
                *start_epoch_ms,
                is_tradefed,
                path,
            );
        }
    }));
    event_bus.subscribe(Scope::ClassInternal, start_subscriber);

    let end_subscriber = Arc::new(FnSubscriber(move |event: &Event| {
        if let Event::TestEnded {
            test_id,
            result,
            duration_ms,
            ..
        } = event
        {
            plugin.on_test_ended(test_id, *result, *duration_ms);
        }
    }));
    event_bus.subscribe(Scope::ClassInternal, end_subscriber);
}

fn session_name(config: &AtsSessionPluginConfig) -> String {
    match config {
        AtsSessionPluginConfig::RunCommand(cmd) => cmd.test_plan.clone(),
        AtsSessionPluginConfig::ListCommand(_) => "list".to_string(),
        AtsSessionPluginConfig::DumpCommand(_) => "dump".to_string(),
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
