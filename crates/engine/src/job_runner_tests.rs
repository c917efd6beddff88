// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ats_core::clock::{Clock, SystemClock};
use ats_core::ids::{JobLocatorId, TestLocatorId};
use ats_core::job::{JobLocator, JobTiming, Test, TestLocator};
use std::collections::BTreeMap;
use yare::parameterized;

#[parameterized(
    local_wins_over_everything = {
        PollContext { is_local_allocator: true, no_new_tests_pending: true, real_time_mode: true, polls_so_far: 100 },
        1
    },
    no_new_tests_pending = {
        PollContext { is_local_allocator: false, no_new_tests_pending: true, real_time_mode: false, polls_so_far: 0 },
        40
    },
    real_time_early = {
        PollContext { is_local_allocator: false, no_new_tests_pending: false, real_time_mode: true, polls_so_far: 14 },
        4
    },
    real_time_late = {
        PollContext { is_local_allocator: false, no_new_tests_pending: false, real_time_mode: true, polls_so_far: 15 },
        16
    },
    default_early = {
        PollContext { is_local_allocator: false, no_new_tests_pending: false, real_time_mode: false, polls_so_far: 3 },
        2
    },
    default_late = {
        PollContext { is_local_allocator: false, no_new_tests_pending: false, real_time_mode: false, polls_so_far: 4 },
        16
    },
)]
fn poll_multiplier_table(ctx: PollContext, expected: u32) {
    assert_eq!(poll_interval_multiplier(ctx), expected);
}

#[test]
fn zero_start_timeout_collapses_both_deadlines_to_start() {
    let (expire, diagnostic) = allocation_deadlines(1_000, Duration::ZERO);
    assert_eq!(expire, 1_000);
    assert_eq!(diagnostic, 1_000);
}

#[test]
fn short_start_timeout_puts_diagnostic_time_at_the_midpoint() {
    let start_timeout = Duration::from_secs(60);
    let (expire, diagnostic) = allocation_deadlines(0, start_timeout);
    assert_eq!(expire, 60_000);
    assert_eq!(diagnostic, 30_000);
}

#[test]
fn long_start_timeout_backs_off_by_the_full_diagnose_window() {
    let start_timeout = Duration::from_secs(600);
    let (expire, diagnostic) = allocation_deadlines(0, start_timeout);
    assert_eq!(expire, 600_000);
    // backoff = min(120_000, 300_000) = 120_000
    assert_eq!(diagnostic, 480_000);
}

fn locator(id: &str) -> TestLocator {
    TestLocator {
        id: TestLocatorId::from(id),
        name: id.to_string(),
    }
}

fn job_with(tests: Vec<Test>) -> Job {
    Job {
        locator: JobLocator {
            id: JobLocatorId::from("job-1"),
            name: "cts-run".into(),
        },
        dimensions: BTreeMap::new(),
        parameters: BTreeMap::new(),
        timing: JobTiming {
            start_epoch_ms: SystemClock.epoch_ms(),
            end_epoch_ms: None,
            start_timeout: Duration::from_secs(120),
            job_timeout: Duration::from_secs(3600),
        },
        result: JobResult::Unknown,
        warnings: Vec::new(),
        properties: BTreeMap::new(),
        tagged_files: BTreeMap::new(),
        tests,
    }
}

fn finished_test(id: &str, result: TestResult) -> Test {
    let mut t = Test::new(locator(id), JobLocatorId::from("job-1"));
    t.advance_status(TestStatus::Assigned);
    t.advance_status(TestStatus::Running);
    t.advance_status(TestStatus::Done);
    t.try_set_result(result);
    t
}

#[test]
fn zero_tests_yields_start_without_test() {
    let mut job = job_with(Vec::new());
    finalize_job_result(&mut job, SetUpOutcome::Ok, AllocDominant::None, None);
    assert_eq!(job.result, JobResult::Error(JobErrorId::ClientJrJobStartWithoutTest));
}

#[test]
fn error_test_with_infra_alloc_dominant_is_infra_error() {
    let mut job = job_with(vec![finished_test("t1", TestResult::Error)]);
    finalize_job_result(&mut job, SetUpOutcome::Ok, AllocDominant::Error, None);
    assert_eq!(
        job.result,
        JobResult::Error(JobErrorId::ClientJrJobHasInfraErrorTest)
    );
}

#[test]
fn error_test_without_infra_dominant_is_plain_error() {
    let mut job = job_with(vec![
        finished_test("t1", TestResult::Pass),
        finished_test("t2", TestResult::Timeout),
    ]);
    finalize_job_result(&mut job, SetUpOutcome::Ok, AllocDominant::None, None);
    assert_eq!(job.result, JobResult::Error(JobErrorId::ClientJrJobHasErrorTest));
}

#[test]
fn fail_test_dominates_over_pass() {
    let mut job = job_with(vec![
        finished_test("t1", TestResult::Pass),
        finished_test("t2", TestResult::Fail),
    ]);
    finalize_job_result(&mut job, SetUpOutcome::Ok, AllocDominant::None, None);
    assert_eq!(job.result, JobResult::Fail(JobErrorId::ClientJrJobHasFailTest));
}

#[test]
fn alloc_error_dominant_with_all_passing_tests() {
    let mut job = job_with(vec![finished_test("t1", TestResult::Pass)]);
    finalize_job_result(&mut job, SetUpOutcome::Ok, AllocDominant::Error, None);
    assert_eq!(
        job.result,
        JobResult::Error(JobErrorId::ClientJrJobHasAllocErrorTest)
    );
}

#[test]
fn suspended_test_maps_to_alloc_fail_test_error() {
    let mut suspended = Test::new(locator("t1"), JobLocatorId::from("job-1"));
    suspended.advance_status(TestStatus::Suspended);
    let mut job = job_with(vec![suspended]);
    finalize_job_result(&mut job, SetUpOutcome::Ok, AllocDominant::None, None);
    assert_eq!(
        job.result,
        JobResult::Error(JobErrorId::ClientJrJobHasAllocFailTest)
    );
}

#[test]
fn fail_fast_set_up_carries_through_the_original_job_error() {
    let mut job = job_with(vec![finished_test("t1", TestResult::Skip)]);
    finalize_job_result(
        &mut job,
        SetUpOutcome::FailFast,
        AllocDominant::None,
        Some(JobErrorId::ClientJrAllocInfraError),
    );
    assert_eq!(job.result, JobResult::Error(JobErrorId::ClientJrAllocInfraError));
}

#[test]
fn all_tests_skipped_yields_skip() {
    let mut job = job_with(vec![
        finished_test("t1", TestResult::Skip),
        finished_test("t2", TestResult::Skip),
    ]);
    finalize_job_result(&mut job, SetUpOutcome::Ok, AllocDominant::None, None);
    assert_eq!(job.result, JobResult::Skip);
}

#[test]
fn otherwise_passes() {
    let mut job = job_with(vec![finished_test("t1", TestResult::Pass)]);
    finalize_job_result(&mut job, SetUpOutcome::Ok, AllocDominant::None, None);
    assert_eq!(job.result, JobResult::Pass);
}

#[test]
fn finalize_never_overwrites_an_already_decided_result() {
    let mut job = job_with(vec![finished_test("t1", TestResult::Fail)]);
    job.try_set_result(JobResult::Timeout(JobErrorId::ClientJrJobExpired));
    finalize_job_result(&mut job, SetUpOutcome::Ok, AllocDominant::None, None);
    assert_eq!(job.result, JobResult::Timeout(JobErrorId::ClientJrJobExpired));
}

mod driver {
    use super::*;
    use crate::allocator::{AllocationWithStats, SchedulerMediatedAllocator};
    use crate::event_bus::EventBus;
    use crate::test_manager::{DirectTestRunner, TestManager};
    use ats_core::allocation::Allocation;
    use ats_core::clock::SystemClock;
    use async_trait::async_trait;

    struct AlwaysPass;

    #[async_trait]
    impl DirectTestRunner for AlwaysPass {
        async fn run(&self, _setting: DirectTestRunnerSetting) -> TestResult {
            TestResult::Pass
        }
        async fn cancel(&self) {}
    }

    struct AlwaysPassFactory;

    impl TestRunnerFactory for AlwaysPassFactory {
        fn build(&self) -> Arc<dyn DirectTestRunner> {
            Arc::new(AlwaysPass)
        }
    }

    struct NoFilters;

    impl FilterFactory for NoFilters {
        fn filters(&self) -> Vec<DeviceQueryFilter> {
            Vec::new()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn runs_an_already_queued_allocation_to_a_passing_job_result() {
        let allocator = Arc::new(SchedulerMediatedAllocator::new());
        allocator.deliver(AllocationWithStats {
            test_id: TestLocatorId::from("t1"),
            allocation: Allocation { sub_devices: vec![] },
            wait_ms: 0,
        });

        let clock = SystemClock;
        let event_bus = EventBus::new();
        let runner = JobRunner {
            clock: &clock,
            allocator,
            test_manager: TestManager::new(),
            event_bus: &event_bus,
            querier: None,
            filters: &NoFilters,
            runner_factory: &AlwaysPassFactory,
            config: JobRunnerConfig {
                allocation_exit_strategy: AllocationExitStrategy::Normal,
                real_time_mode: false,
                is_local_allocator: true,
                configured_heap_bytes: 0,
                min_diagnostic_heap_bytes: 0,
            },
        };

        let mut job = job_with(vec![Test::new(locator("t1"), JobLocatorId::from("job-1"))]);
        runner.run(&mut job).await;

        assert_eq!(job.result, JobResult::Pass);
        assert_eq!(job.tests[0].status, TestStatus::Done);
        assert_eq!(job.tests[0].result, TestResult::Pass);
    }

    #[tokio::test(start_paused = true)]
    async fn job_timeout_fires_when_the_expiry_elapses_with_no_allocation() {
        let allocator = Arc::new(SchedulerMediatedAllocator::new());
        let clock = SystemClock;
        let event_bus = EventBus::new();
        let runner = JobRunner {
            clock: &clock,
            allocator,
            test_manager: TestManager::new(),
            event_bus: &event_bus,
            querier: None,
            filters: &NoFilters,
            runner_factory: &AlwaysPassFactory,
            config: JobRunnerConfig {
                allocation_exit_strategy: AllocationExitStrategy::Normal,
                real_time_mode: false,
                is_local_allocator: true,
                configured_heap_bytes: 0,
                min_diagnostic_heap_bytes: 0,
            },
        };

        let mut job = job_with(vec![Test::new(locator("t1"), JobLocatorId::from("job-1"))]);
        job.timing.start_timeout = Duration::ZERO;
        runner.run(&mut job).await;

        // No querier means no diagnostic classification is ever cached, so
        // the timeout falls back to the unknown-error bucket (§8 Scenario 3).
        assert_eq!(
            job.result,
            JobResult::Error(JobErrorId::ClientJrAllocUnknownError)
        );
    }

    struct CancelAware(Arc<std::sync::atomic::AtomicBool>);

    #[async_trait]
    impl DirectTestRunner for CancelAware {
        async fn run(&self, _setting: DirectTestRunnerSetting) -> TestResult {
            while !self.0.load(std::sync::atomic::Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
            TestResult::Abort
        }
        async fn cancel(&self) {
            self.0.store(true, std::sync::atomic::Ordering::SeqCst);
        }
    }

    struct CancelAwareFactory(Arc<std::sync::atomic::AtomicBool>);

    impl TestRunnerFactory for CancelAwareFactory {
        fn build(&self) -> Arc<dyn DirectTestRunner> {
            Arc::new(CancelAware(self.0.clone()))
        }
    }

    #[tokio::test]
    async fn kill_all_tests_unblocks_a_cooperatively_cancellable_runner() {
        let allocator = Arc::new(SchedulerMediatedAllocator::new());
        allocator.deliver(AllocationWithStats {
            test_id: TestLocatorId::from("t1"),
            allocation: Allocation { sub_devices: vec![] },
            wait_ms: 0,
        });

        let clock = SystemClock;
        let event_bus = EventBus::new();
        let cancelled = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let factory = CancelAwareFactory(cancelled.clone());
        let runner = JobRunner {
            clock: &clock,
            allocator,
            test_manager: TestManager::new(),
            event_bus: &event_bus,
            querier: None,
            filters: &NoFilters,
            runner_factory: &factory,
            config: JobRunnerConfig {
                allocation_exit_strategy: AllocationExitStrategy::Normal,
                real_time_mode: false,
                is_local_allocator: true,
                configured_heap_bytes: 0,
                min_diagnostic_heap_bytes: 0,
            },
        };

        let mut job = job_with(vec![Test::new(locator("t1"), JobLocatorId::from("job-1"))]);
        let run_fut = runner.run(&mut job);
        tokio::pin!(run_fut);

        // Let the allocation loop assign and start the test, then request
        // cooperative shutdown before the job would otherwise finish.
        tokio::time::sleep(Duration::from_millis(20)).await;
        runner.kill_all_tests().await;
        run_fut.await;

        assert_eq!(job.tests[0].result, TestResult::Abort);
        assert_eq!(job.result, JobResult::Pass);
    }
}
