// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plugin-callback events and dispatch scope ordering (§4.4 ATS Session
//! Plugin).

use crate::ids::{DeviceId, JobLocatorId, SessionId, TestLocatorId};
use crate::job::TestResult;
use serde::{Deserialize, Serialize};

/// Dispatch scope, ordered outside-in for `*Starting`/`*Start` events and
/// inside-out for `*Ended`/`*End` events.
///
/// Forward order at job/session start: `CLASS_INTERNAL` →
/// `GLOBAL_INTERNAL` → `INTERNAL_PLUGIN` → `API_PLUGIN` → `JAR_PLUGIN`.
/// The end-side dispatch walks [`Scope::end_order`], the exact reverse,
/// so the scope that was notified last on the way in is notified first on
/// the way out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Scope {
    ClassInternal,
    GlobalInternal,
    InternalPlugin,
    ApiPlugin,
    JarPlugin,
}

impl Scope {
    /// All scopes in start-dispatch order.
    pub const fn start_order() -> [Scope; 5] {
        [
            Scope::ClassInternal,
            Scope::GlobalInternal,
            Scope::InternalPlugin,
            Scope::ApiPlugin,
            Scope::JarPlugin,
        ]
    }

    /// All scopes in end-dispatch order (reverse of [`Scope::start_order`]).
    pub fn end_order() -> [Scope; 5] {
        let mut order = Self::start_order();
        order.reverse();
        order
    }
}

/// Coarse event kind, used by subscribers that register interest in a
/// family of events without matching the full payload (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    SessionStarting,
    SessionStarted,
    SessionEnded,
    SessionNotification,
    JobStart,
    JobFirstAllocation,
    JobEnd,
    TestStarting,
    TestEnded,
}

/// A plugin-callback event dispatched by the engine's event bus (§4.4).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    SessionStarting { session_id: SessionId },
    SessionStarted { session_id: SessionId },
    SessionEnded { session_id: SessionId },
    SessionNotification { session_id: SessionId, message: String },
    JobStart { job_id: JobLocatorId },
    /// Posted once per job, the instant its first allocation lands (§4.3
    /// allocation loop step 5). Unlike the other lifecycle events this one
    /// is delivered to a single scope (`API_PLUGIN`) rather than walked
    /// across all five; see [`ats_engine::event_bus::EventBus::dispatch_to`].
    JobFirstAllocation { job_id: JobLocatorId },
    JobEnd { job_id: JobLocatorId },
    /// Posted once a test has been allocated device(s) and its direct test
    /// runner has started (§3 Invocation: "device_id[], and a
    /// state_summary string"). Carries the allocation's device ids and the
    /// test's plan name so subscribers (the ATS Session Plugin) can record
    /// a real `Invocation` instead of a placeholder.
    TestStarting {
        job_id: JobLocatorId,
        test_id: TestLocatorId,
        device_ids: Vec<DeviceId>,
        test_plan: String,
        start_epoch_ms: u64,
    },
    /// Posted once a test reaches a terminal result (§4.4 `TestEnded`:
    /// "add the test's wall-clock duration into
    /// `RunCommandState.total_execution_time`"; "Log WARNING if the test
    /// result is not PASS").
    TestEnded {
        job_id: JobLocatorId,
        test_id: TestLocatorId,
        result: TestResult,
        duration_ms: u64,
    },
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::SessionStarting { .. } => EventKind::SessionStarting,
            Event::SessionStarted { .. } => EventKind::SessionStarted,
            Event::SessionEnded { .. } => EventKind::SessionEnded,
            Event::SessionNotification { .. } => EventKind::SessionNotification,
            Event::JobStart { .. } => EventKind::JobStart,
            Event::JobFirstAllocation { .. } => EventKind::JobFirstAllocation,
            Event::JobEnd { .. } => EventKind::JobEnd,
            Event::TestStarting { .. } => EventKind::TestStarting,
            Event::TestEnded { .. } => EventKind::TestEnded,
        }
    }

    /// True for the four "closing" events, which dispatch in
    /// [`Scope::end_order`] rather than [`Scope::start_order`].
    pub fn is_closing(&self) -> bool {
        matches!(
            self.kind(),
            EventKind::SessionEnded | EventKind::JobEnd | EventKind::TestEnded
        )
    }

    /// The scope order this event should be walked in.
    pub fn dispatch_order(&self) -> [Scope; 5] {
        if self.is_closing() {
            Scope::end_order()
        } else {
            Scope::start_order()
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
