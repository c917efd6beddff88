// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! §8 end-to-end scenarios for the Job Runner's allocation loop: a
//! `FailFastNoMatch` job with a device fleet that never satisfies its
//! filters times out via the Suitable-Device Checker rather than hanging
//! until its start-timeout expires, and a job runner backed by a fleet
//! that *can* satisfy the request still allocates and finishes normally
//! even under a non-`Normal` exit strategy.

use ats_adapters::{DeviceQueryFilter, FakeDeviceQuerier};
use ats_core::allocation::Allocation;
use ats_core::clock::{Clock, SystemClock};
use ats_core::error::JobErrorId;
use ats_core::ids::{JobLocatorId, TestLocatorId};
use ats_core::job::{Job, JobLocator, JobResult, JobTiming, Test, TestLocator, TestResult, TestStatus};
use ats_engine::allocator::{AllocationWithStats, SchedulerMediatedAllocator};
use ats_engine::event_bus::EventBus;
use ats_engine::job_runner::{AllocationExitStrategy, FilterFactory, JobRunner, JobRunnerConfig, TestRunnerFactory};
use ats_engine::test_manager::{DirectTestRunner, DirectTestRunnerSetting, TestManager};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

struct NoFilters;

impl FilterFactory for NoFilters {
    fn filters(&self) -> Vec<DeviceQueryFilter> {
        vec![DeviceQueryFilter::default()]
    }
}

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

fn job_with_one_test(start_timeout: Duration) -> Job {
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
            start_timeout,
            job_timeout: Duration::from_secs(3600),
        },
        result: JobResult::Unknown,
        warnings: Vec::new(),
        properties: BTreeMap::new(),
        tagged_files: BTreeMap::new(),
        tests: vec![Test::new(
            TestLocator { id: TestLocatorId::from("t1"), name: "t1".into() },
            JobLocatorId::from("job-1"),
        )],
    }
}

#[tokio::test(start_paused = true)]
async fn unsatisfiable_fleet_times_out_via_the_suitable_device_checker() {
    let allocator = Arc::new(SchedulerMediatedAllocator::new());
    let clock = SystemClock;
    let event_bus = EventBus::new();
    // No devices in the fleet at all, so every Suitable-Device Checker
    // tick reports a genuine "no match", never a query failure.
    let querier = FakeDeviceQuerier::new();

    let runner = JobRunner {
        clock: &clock,
        allocator,
        test_manager: TestManager::new(),
        event_bus: &event_bus,
        querier: Some(&querier),
        filters: &NoFilters,
        runner_factory: &AlwaysPassFactory,
        config: JobRunnerConfig {
            allocation_exit_strategy: AllocationExitStrategy::FailFastNoMatch,
            real_time_mode: false,
            is_local_allocator: true,
            configured_heap_bytes: 0,
            min_diagnostic_heap_bytes: 0,
        },
    };

    // Long enough that the job-level expiry never fires first; the
    // checker's own 3-consecutive-miss threshold must be what ends it.
    let mut job = job_with_one_test(Duration::from_secs(3600));
    runner.run(&mut job).await;

    // The checker's give-up fires long before the diagnostician's first
    // scheduled run, so no diagnosis is cached and the classification
    // falls back to the unknown-error bucket (§8 Scenario 3).
    assert_eq!(
        job.result,
        JobResult::Error(JobErrorId::ClientJrAllocUnknownError)
    );
    assert_eq!(job.tests[0].status, TestStatus::Done);
    assert_eq!(job.tests[0].result, TestResult::Abort);
}

#[tokio::test(start_paused = true)]
async fn satisfiable_fleet_still_allocates_under_a_fail_fast_strategy() {
    let allocator = Arc::new(SchedulerMediatedAllocator::new());
    allocator.deliver(AllocationWithStats {
        test_id: TestLocatorId::from("t1"),
        allocation: Allocation { sub_devices: vec![] },
        wait_ms: 0,
    });

    let clock = SystemClock;
    let event_bus = EventBus::new();
    let querier = FakeDeviceQuerier::new();

    let runner = JobRunner {
        clock: &clock,
        allocator,
        test_manager: TestManager::new(),
        event_bus: &event_bus,
        querier: Some(&querier),
        filters: &NoFilters,
        runner_factory: &AlwaysPassFactory,
        config: JobRunnerConfig {
            allocation_exit_strategy: AllocationExitStrategy::FailFastNoIdle,
            real_time_mode: false,
            is_local_allocator: true,
            configured_heap_bytes: 0,
            min_diagnostic_heap_bytes: 0,
        },
    };

    let mut job = job_with_one_test(Duration::from_secs(3600));
    runner.run(&mut job).await;

    assert_eq!(job.result, JobResult::Pass);
    assert_eq!(job.tests[0].result, TestResult::Pass);
}
