// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestration engine: the Job Runner state machine and the components
//! it drives (device allocation, allocation diagnostics, scope-ordered
//! event dispatch, direct test execution, and the ATS Session Plugin's
//! `RunCommandState` bookkeeping).

#![cfg_attr(test, allow(clippy::panic, clippy::unwrap_used, clippy::expect_used))]

pub mod allocator;
pub mod diagnostician;
pub mod event_bus;
pub mod job_runner;
pub mod run_command_handler;
pub mod scheduler;
pub mod session_plugin;
pub mod suitable_device_checker;
pub mod test_manager;

pub use allocator::{
    AllocationWithStats, DeviceAllocator, FailFastError, ProxyMediatedAllocator,
    SchedulerMediatedAllocator,
};
pub use diagnostician::{AllocationDiagnostician, DiagnosticReport, MAX_DIAGNOSTIC_RUNS};
pub use event_bus::{EventBus, EventSubscriber, FnSubscriber};
pub use job_runner::{
    allocation_deadlines, alloc_dominant_from_stall_reason, finalize_job_result,
    job_start_timeout_result, next_poll_interval, poll_interval_multiplier, AllocDominant,
    AllocationExitStrategy, PollContext, SetUpOutcome, ALLOCATION_DIAGNOSE_INTERVAL,
    BASE_POLL_INTERVAL, PENDING_TEST_PRINTER_INTERVAL,
};
pub use run_command_handler::{BuiltJobs, ResolvedModule, RunCommandHandler};
pub use scheduler::Scheduler;
pub use session_plugin::{cancel_running_tests, AtsSessionPlugin};
pub use suitable_device_checker::{SubDeviceQuery, SuitabilityGraph};
pub use test_manager::{
    DirectTestRunner, DirectTestRunnerSetting, TestManager, TestRunnerStartError,
};
