// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared data model and primitives for the ATS control plane: ids,
//! clocks, the Job/Test state machine, session types, plugin events, and
//! the error taxonomy used across `ats-adapters`, `ats-engine`,
//! `ats-daemon`, and `ats-cli`.
#![cfg_attr(test, allow(clippy::panic, clippy::unwrap_used, clippy::expect_used))]

#[macro_use]
mod id;

pub mod allocation;
pub mod clock;
pub mod error;
pub mod event;
pub mod ids;
pub mod job;
pub mod ratelog;
pub mod run_command;
pub mod session;
pub mod tradefed;
pub mod version;

pub use allocation::{Allocation, AllocationStallReason, DeviceInfo, SubDeviceSpec};
pub use clock::{Clock, FakeClock, SystemClock};
pub use error::{JobErrorId, PreparerError};
pub use event::{Event, EventKind, Scope};
pub use id::{IdGen, SequentialIdGen, ShortId, UuidIdGen};
pub use ids::{ClientId, CommandId, DeviceId, JobLocatorId, SessionId, TestLocatorId};
pub use job::{Job, JobLocator, JobResult, JobTiming, Test, TestLocator, TestResult, TestStatus};
pub use ratelog::RateLimiter;
pub use run_command::{DeviceTypeRequirement, RetrySpec, RunCommand};
pub use session::{
    AtsSessionPluginConfig, AtsSessionPluginOutput, DumpCommand, Invocation, Invocations,
    ListCommand, RunCommandState, Session, SessionStatus,
};
pub use tradefed::{RuntimeInfoEntry, RuntimeInfoSnapshot, SnapshotError, SnapshotReader};
pub use version::GetVersionResponse;
