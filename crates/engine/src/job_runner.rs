// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job Runner (§4.3): the state machine driving one xTS job through
//! pre-run plugin dispatch, device allocation polling with backoff,
//! allocation diagnostics on stall, per-test runner spawning, and
//! post-run result finalization.

use crate::allocator::DeviceAllocator;
use crate::diagnostician::{AllocationDiagnostician, DiagnosticReport, MAX_DIAGNOSTIC_RUNS};
use crate::event_bus::EventBus;
use crate::suitable_device_checker::{SubDeviceQuery, SuitabilityGraph};
use crate::test_manager::{DirectTestRunner, DirectTestRunnerSetting, TestManager};
use ats_adapters::DeviceQueryFilter;
use ats_core::allocation::AllocationStallReason;
use ats_core::clock::Clock;
use ats_core::error::JobErrorId;
use ats_core::event::{Event, Scope};
use ats_core::ids::TestLocatorId;
use ats_core::job::{Job, JobResult, TestResult, TestStatus};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Base allocation-poll sleep (§4.3 allocation loop, step 1).
pub const BASE_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Cadence of the pending-test printer while the allocation loop spins
/// (§4.3 allocation loop preamble).
pub const PENDING_TEST_PRINTER_INTERVAL: Duration = Duration::from_secs(30);

/// `ALLOCATION_DIAGNOSE_INTERVAL`, `N = 3` (§4.3 allocation loop: the
/// `diagnostic_time` formula and the 60 s re-arm in step 6).
pub const ALLOCATION_DIAGNOSE_INTERVAL: Duration = Duration::from_secs(60);
const DIAGNOSE_INTERVAL_COUNT: u32 = 3;

/// Consecutive unsatisfiable Suitable-Device Checker ticks (§4.3.1:
/// "query-times threshold") before `onJobStartTimeout(isStartTimeoutExpired
/// = false)` fires. Query failures don't count toward this; only ticks
/// where every sub-device query answered but no full matching existed.
const SUITABLE_DEVICE_CHECK_THRESHOLD: u32 = 3;

/// Allocation-exit strategy, controlling the device-query filter and
/// retry policy while no allocation has landed (§4.3 "Allocation-exit
/// strategies").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationExitStrategy {
    FailFastNoIdle,
    FailFastNoMatch,
    Normal,
}

impl AllocationExitStrategy {
    pub fn runs_suitable_device_checker(self) -> bool {
        self != AllocationExitStrategy::Normal
    }
}

/// Inputs to the poll-interval multiplier table (§4.3 allocation loop,
/// step 4).
#[derive(Debug, Clone, Copy)]
pub struct PollContext {
    pub is_local_allocator: bool,
    pub no_new_tests_pending: bool,
    pub real_time_mode: bool,
    /// Number of polls already performed in this allocation loop.
    pub polls_so_far: u32,
}

/// Computes the next-poll multiplier against [`BASE_POLL_INTERVAL`],
/// following the table in §4.3 step 4 in its stated priority order.
pub fn poll_interval_multiplier(ctx: PollContext) -> u32 {
    if ctx.is_local_allocator {
        return 1;
    }
    if ctx.no_new_tests_pending {
        return 40;
    }
    if ctx.real_time_mode {
        return if ctx.polls_so_far < 15 { 4 } else { 16 };
    }
    if ctx.polls_so_far < 4 {
        2
    } else {
        16
    }
}

pub fn next_poll_interval(ctx: PollContext) -> Duration {
    BASE_POLL_INTERVAL * poll_interval_multiplier(ctx)
}

/// Computes `expire_time` and `diagnostic_time` from a job's start and
/// start-timeout (§4.3 allocation loop preamble).
///
/// `start_timeout = 0` collapses both times to `start`, producing an
/// immediate timeout on the first poll (§8 edge cases). When
/// `start_timeout <= 2 * ALLOCATION_DIAGNOSE_INTERVAL`, the diagnostic
/// time lands exactly halfway between start and expiry.
pub fn allocation_deadlines(start_epoch_ms: u64, start_timeout: Duration) -> (u64, u64) {
    let start_timeout_ms = start_timeout.as_millis() as u64;
    let expire = start_epoch_ms + start_timeout_ms;
    let diag_interval_ms =
        ALLOCATION_DIAGNOSE_INTERVAL.as_millis() as u64 * (DIAGNOSE_INTERVAL_COUNT - 1) as u64;
    let half_timeout_ms = start_timeout_ms / 2;
    let backoff = diag_interval_ms.min(half_timeout_ms);
    (expire, expire - backoff)
}

/// Dominant allocation-failure classification among not-yet-allocated
/// tests at finalization time, derived from the cached diagnostic report
/// (§4.3.2, finalization table).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocDominant {
    None,
    Error,
    Fail,
}

pub fn alloc_dominant_from_stall_reason(reason: Option<AllocationStallReason>) -> AllocDominant {
    match reason {
        None => AllocDominant::None,
        Some(AllocationStallReason::UserConfigError) => AllocDominant::Error,
        Some(AllocationStallReason::InfraError) => AllocDominant::Error,
        Some(AllocationStallReason::NoCapacity) => AllocDominant::Fail,
    }
}

/// Terminal result for a job-start timeout (§4.3 steps 2 and 6, §4.3.1
/// `onJobStartTimeout`), classified by the cached allocation-diagnosis
/// report rather than a bare `TIMEOUT{CLIENT_JR_JOB_EXPIRED}` (§8 scenario
/// 3: "terminal job result is `ERROR{CLIENT_JR_ALLOC_USER_CONFIG_ERROR}` if
/// diagnostic classified it as such, else `UNKNOWN_ERROR`"). A cached
/// `InfraError` classification maps to the matching `INFRA_ERROR` bucket
/// named alongside the other two in §4.3.2; no report (diagnostics never
/// ran, or every run was inconclusive) falls through to `UNKNOWN_ERROR`.
pub fn job_start_timeout_result(report: Option<&DiagnosticReport>) -> JobResult {
    match report.map(|r| r.reason) {
        Some(AllocationStallReason::UserConfigError) => {
            JobResult::Error(JobErrorId::ClientJrAllocUserConfigError)
        }
        Some(AllocationStallReason::InfraError) => {
            JobResult::Error(JobErrorId::ClientJrAllocInfraError)
        }
        Some(AllocationStallReason::NoCapacity) | None => {
            JobResult::Error(JobErrorId::ClientJrAllocUnknownError)
        }
    }
}

/// Whether the allocator's `setUp()` fail-fasted, skipping the
/// allocation loop entirely (§4.3: "if it returns a fail-fast exception,
/// skip the loop entirely and proceed to post-run").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetUpOutcome {
    Ok,
    FailFast,
}

/// Assigns the terminal job result by scanning test statuses, following
/// the finalization table in priority order (§4.3 post-run finalization).
/// Never overwrites an already non-`Unknown` result.
pub fn finalize_job_result(
    job: &mut Job,
    set_up_outcome: SetUpOutcome,
    alloc_dominant: AllocDominant,
    job_error_on_fail_fast: Option<JobErrorId>,
) {
    if !job.result.is_unknown() {
        return;
    }

    let result = compute_job_result(job, set_up_outcome, alloc_dominant, job_error_on_fail_fast);
    job.try_set_result(result);
}

fn compute_job_result(
    job: &Job,
    set_up_outcome: SetUpOutcome,
    alloc_dominant: AllocDominant,
    job_error_on_fail_fast: Option<JobErrorId>,
) -> JobResult {
    if job.tests.is_empty() {
        return JobResult::Error(JobErrorId::ClientJrJobStartWithoutTest);
    }

    let has_infra_error_test = job
        .tests
        .iter()
        .any(|t| matches!(t.result, TestResult::Error | TestResult::Timeout | TestResult::Unknown))
        && alloc_dominant == AllocDominant::Error;
    if has_infra_error_test {
        return JobResult::Error(JobErrorId::ClientJrJobHasInfraErrorTest);
    }

    if job
        .tests
        .iter()
        .any(|t| matches!(t.result, TestResult::Error | TestResult::Timeout | TestResult::Unknown))
    {
        return JobResult::Error(JobErrorId::ClientJrJobHasErrorTest);
    }

    if job.tests.iter().any(|t| t.result == TestResult::Fail) {
        return JobResult::Fail(JobErrorId::ClientJrJobHasFailTest);
    }

    if alloc_dominant == AllocDominant::Error {
        return JobResult::Error(JobErrorId::ClientJrJobHasAllocErrorTest);
    }
    if alloc_dominant == AllocDominant::Fail {
        return JobResult::Error(JobErrorId::ClientJrJobHasAllocFailTest);
    }
    if job.tests.iter().any(|t| t.status == TestStatus::Suspended) {
        return JobResult::Error(JobErrorId::ClientJrJobHasAllocFailTest);
    }

    if set_up_outcome == SetUpOutcome::FailFast {
        return JobResult::Error(
            job_error_on_fail_fast.unwrap_or(JobErrorId::ClientJrAllocUnknownError),
        );
    }

    if job.tests.iter().all(|t| t.result == TestResult::Skip) {
        return JobResult::Skip;
    }

    JobResult::Pass
}

/// Produces a per-test device query filter for the allocation diagnostician
/// and the Suitable-Device Checker; callers supply a narrowing sequence
/// tailored to the job's device-type requirement.
pub trait FilterFactory: Send + Sync {
    fn filters(&self) -> Vec<DeviceQueryFilter>;
}

/// Builds a `DirectTestRunner` for a newly allocated test.
pub trait TestRunnerFactory: Send + Sync {
    fn build(&self) -> Arc<dyn DirectTestRunner>;
}

/// Per-run configuration the allocation loop consults (§4.3 allocation-exit
/// strategies, §4.3 step 4 poll multiplier inputs).
#[derive(Debug, Clone, Copy)]
pub struct JobRunnerConfig {
    pub allocation_exit_strategy: AllocationExitStrategy,
    pub real_time_mode: bool,
    pub is_local_allocator: bool,
    /// JVM-max-heap proxy gating the allocation diagnostician (§4.3.2).
    pub configured_heap_bytes: u64,
    pub min_diagnostic_heap_bytes: u64,
}

/// Drives one Job through the full state machine (§4.3). Construct fresh
/// per job; `run()` consumes it.
pub struct JobRunner<'a> {
    pub clock: &'a dyn Clock,
    pub allocator: Arc<dyn DeviceAllocator>,
    pub test_manager: TestManager,
    pub event_bus: &'a EventBus,
    pub querier: Option<&'a dyn ats_adapters::DeviceQuerier>,
    pub filters: &'a dyn FilterFactory,
    pub runner_factory: &'a dyn TestRunnerFactory,
    pub config: JobRunnerConfig,
}

impl<'a> JobRunner<'a> {
    /// Requests cooperative shutdown of every in-flight test (§4.3
    /// Contract). Callers typically invoke this from outside `run`'s
    /// task in response to a session cancellation or daemon shutdown;
    /// `run` itself observes the effect only through its tests reaching
    /// a terminal result sooner.
    pub async fn kill_all_tests(&self) {
        self.test_manager.cancel_all().await;
    }

    /// Runs `job` to a terminal result (§4.3 pre-run, allocation loop,
    /// post-run finalization). Interruption (the caller's future being
    /// dropped or cancelled) is the caller's concern; `run()` itself never
    /// observes cancellation signals beyond what `kill_all_tests` sets on
    /// shared state before `run()` is invoked.
    pub async fn run(&self, job: &mut Job) {
        self.event_bus.dispatch(&Event::JobStart { job_id: job.locator.id.clone() });

        let (expire_ms, mut diagnostic_ms) =
            allocation_deadlines(job.timing.start_epoch_ms, job.timing.start_timeout);

        let set_up_outcome = match self.allocator.set_up().await {
            Ok(()) => SetUpOutcome::Ok,
            Err(_) => SetUpOutcome::FailFast,
        };

        let mut alloc_dominant = AllocDominant::None;
        let mut ever_allocated = false;
        let mut polls_so_far: u32 = 0;
        let mut diagnostic_report = None;
        let mut diagnostic_runs: u32 = 0;
        let mut last_pending_print_ms = job.timing.start_epoch_ms;
        let mut suitable_device_check_misses: u32 = 0;
        let runs_suitable_device_checker = self.config.allocation_exit_strategy.runs_suitable_device_checker();
        // When the next poll is actually due (§4.3 step 3: "If the current
        // time is before the scheduled next poll, loop"). The first
        // iteration is always due; each real poll reschedules this via the
        // step-4 multiplier table, which is the allocation loop's only
        // back-pressure mechanism (§5).
        let mut next_poll_due_ms = job.timing.start_epoch_ms;
        let mut test_start_ms: HashMap<TestLocatorId, u64> = HashMap::new();

        if set_up_outcome == SetUpOutcome::Ok {
            while !(job.all_tests_done() && !self.test_manager.is_any_test_running()) {
                tokio::time::sleep(BASE_POLL_INTERVAL).await;

                let now_ms = self.clock.epoch_ms();
                if now_ms >= job.timing.expire_epoch_ms() {
                    job.try_set_result(job_start_timeout_result(diagnostic_report.as_ref()));
                    break;
                }
                if now_ms < next_poll_due_ms {
                    continue;
                }

                let ctx = PollContext {
                    is_local_allocator: self.config.is_local_allocator,
                    no_new_tests_pending: job.tests.iter().all(|t| t.status != TestStatus::New),
                    real_time_mode: self.config.real_time_mode,
                    polls_so_far,
                };
                polls_so_far = polls_so_far.saturating_add(1);
                next_poll_due_ms = now_ms + next_poll_interval(ctx).as_millis() as u64;

                for allocation in self.allocator.poll_allocations().await {
                    let Some(test) = job
                        .tests
                        .iter_mut()
                        .find(|t| t.locator.id == allocation.test_id)
                    else {
                        self.allocator.release_allocation(allocation.allocation, false).await;
                        continue;
                    };
                    if test.status != TestStatus::New {
                        self.allocator.release_allocation(allocation.allocation, false).await;
                        continue;
                    }

                    if !ever_allocated {
                        ever_allocated = true;
                        self.event_bus.dispatch_to(
                            Scope::ApiPlugin,
                            &Event::JobFirstAllocation { job_id: job.locator.id.clone() },
                        );
                    }

                    test.advance_status(TestStatus::Assigned);
                    let device_ids = allocation.allocation.device_ids();
                    let runner = self.runner_factory.build();
                    let setting = DirectTestRunnerSetting {
                        test_id: test.locator.id.clone(),
                        allocation: allocation.allocation,
                        test_plan: test.locator.name.clone(),
                    };
                    if self.test_manager.start(runner, setting).is_err() {
                        test.try_set_result(TestResult::Error);
                        continue;
                    }
                    test.advance_status(TestStatus::Running);
                    test_start_ms.insert(test.locator.id.clone(), now_ms);
                    self.event_bus.dispatch(&Event::TestStarting {
                        job_id: job.locator.id.clone(),
                        test_id: test.locator.id.clone(),
                        device_ids,
                        test_plan: test.locator.name.clone(),
                        start_epoch_ms: now_ms,
                    });
                }

                if !ever_allocated {
                    if now_ms > expire_ms {
                        job.try_set_result(job_start_timeout_result(diagnostic_report.as_ref()));
                        break;
                    }
                    if now_ms > diagnostic_ms {
                        if let Some(querier) = self.querier {
                            if diagnostic_runs < MAX_DIAGNOSTIC_RUNS {
                                diagnostic_runs += 1;
                                let diagnostician = AllocationDiagnostician::new(
                                    querier,
                                    self.config.min_diagnostic_heap_bytes,
                                );
                                diagnostic_report = diagnostician
                                    .diagnose(self.config.configured_heap_bytes, &self.filters.filters())
                                    .await;
                                alloc_dominant = alloc_dominant_from_stall_reason(
                                    diagnostic_report.as_ref().map(|r| r.reason),
                                );
                            }
                        }
                        diagnostic_ms += ALLOCATION_DIAGNOSE_INTERVAL.as_millis() as u64;
                    }

                    let mut suitable_device_check_gave_up = false;
                    if runs_suitable_device_checker {
                        if let Some(querier) = self.querier {
                            let queries: Vec<SubDeviceQuery> = self
                                .filters
                                .filters()
                                .into_iter()
                                .enumerate()
                                .map(|(slot_index, filter)| SubDeviceQuery { slot_index, filter })
                                .collect();
                            let (graph, query_failures) = SuitabilityGraph::build(&queries, querier).await;
                            if graph.proves_satisfiable() {
                                suitable_device_check_misses = 0;
                            } else if query_failures == 0 {
                                // Only genuine "no match" results count toward the
                                // threshold (§4.3.1: "Query failures are ignored
                                // (re-counted)").
                                suitable_device_check_misses += 1;
                                if suitable_device_check_misses >= SUITABLE_DEVICE_CHECK_THRESHOLD {
                                    job.try_set_result(job_start_timeout_result(diagnostic_report.as_ref()));
                                    suitable_device_check_gave_up = true;
                                }
                            }
                        }
                    }
                    if suitable_device_check_gave_up {
                        break;
                    }
                }

                if now_ms.saturating_sub(last_pending_print_ms)
                    >= PENDING_TEST_PRINTER_INTERVAL.as_millis() as u64
                {
                    let pending = job.tests.iter().filter(|t| t.status == TestStatus::New).count();
                    if pending > 0 {
                        tracing::info!(pending, "tests still awaiting allocation");
                    }
                    last_pending_print_ms = now_ms;
                }

                for finished in self.test_manager.drain_finished().await {
                    if let Some(test) = job.tests.iter_mut().find(|t| t.locator.id == finished.0) {
                        test.try_set_result(finished.1);
                        test.advance_status(TestStatus::Done);
                        let start = test_start_ms.remove(&test.locator.id).unwrap_or(now_ms);
                        self.event_bus.dispatch(&Event::TestEnded {
                            job_id: job.locator.id.clone(),
                            test_id: test.locator.id.clone(),
                            result: test.result,
                            duration_ms: now_ms.saturating_sub(start),
                        });
                    }
                }
            }
        }

        let now_ms = self.clock.epoch_ms();
        for finished in self.test_manager.drain_finished().await {
            if let Some(test) = job.tests.iter_mut().find(|t| t.locator.id == finished.0) {
                test.try_set_result(finished.1);
                test.advance_status(TestStatus::Done);
                let start = test_start_ms.remove(&test.locator.id).unwrap_or(now_ms);
                self.event_bus.dispatch(&Event::TestEnded {
                    job_id: job.locator.id.clone(),
                    test_id: test.locator.id.clone(),
                    result: test.result,
                    duration_ms: now_ms.saturating_sub(start),
                });
            }
        }

        finalize_job_result(job, set_up_outcome, alloc_dominant, None);
        job.abort_new_tests();
        self.event_bus.dispatch(&Event::JobEnd { job_id: job.locator.id.clone() });
    }
}

#[cfg(test)]
#[path = "job_runner_tests.rs"]
mod tests;
