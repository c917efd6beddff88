// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Allocation Diagnostician (§4.3.2): when a job's allocation loop stalls,
//! runs a bounded number of progressively narrower device queries to
//! localize the cause, and classifies the result for finalization.

use ats_adapters::{DeviceQueryFilter, DeviceQuerier};
use ats_core::allocation::AllocationStallReason;

/// Maximum diagnostic runs per job (§4.3.2: "Up to 6 total runs per job").
pub const MAX_DIAGNOSTIC_RUNS: u32 = 6;

/// A single diagnostic run's outcome, cached as the last report driving
/// error-id classification at finalization.
#[derive(Debug, Clone)]
pub struct DiagnosticReport {
    pub runs_attempted: u32,
    pub reason: AllocationStallReason,
    pub detail: String,
}

/// Progressive filter narrowing strategy: each step drops or tightens one
/// constraint relative to the original request, from widest to narrowest,
/// so the first step at which candidates disappear localizes the cause.
pub struct AllocationDiagnostician<'a> {
    querier: &'a dyn DeviceQuerier,
    /// `lower_limit_of_jvm_max_memory_allow_for_allocation_diagnostic`:
    /// if the process's configured max heap (bytes) is below this, the
    /// diagnostic is skipped entirely to avoid OOM on large fleets.
    min_heap_bytes: u64,
}

impl<'a> AllocationDiagnostician<'a> {
    pub fn new(querier: &'a dyn DeviceQuerier, min_heap_bytes: u64) -> Self {
        Self {
            querier,
            min_heap_bytes,
        }
    }

    /// Runs the diagnosis, or returns `None` with the caller expected to
    /// log a skip warning if `configured_heap_bytes` is too small.
    pub async fn diagnose(
        &self,
        configured_heap_bytes: u64,
        narrowing_filters: &[DeviceQueryFilter],
    ) -> Option<DiagnosticReport> {
        if configured_heap_bytes < self.min_heap_bytes {
            return None;
        }

        let steps: Vec<&DeviceQueryFilter> =
            narrowing_filters.iter().take(MAX_DIAGNOSTIC_RUNS as usize).collect();
        let mut runs_attempted = 0;
        let mut last_nonempty_step: Option<usize> = None;
        let mut saw_infra_failure = false;

        for (i, filter) in steps.iter().enumerate() {
            runs_attempted += 1;
            match self.querier.query(filter).await {
                Ok(devices) if !devices.is_empty() => last_nonempty_step = Some(i),
                Ok(_) => {}
                Err(_) => saw_infra_failure = true,
            }
        }

        let (reason, detail) = match (last_nonempty_step, saw_infra_failure) {
            (None, true) => (
                AllocationStallReason::InfraError,
                "device fleet query failed on every narrowing step".to_string(),
            ),
            (None, false) => (
                AllocationStallReason::UserConfigError,
                "no device matches even the widest filter".to_string(),
            ),
            (Some(0), false) if steps.len() > 1 => (
                AllocationStallReason::NoCapacity,
                "matching devices exist but are all held by other jobs".to_string(),
            ),
            (Some(step), false) => (
                AllocationStallReason::UserConfigError,
                format!("candidates vanished after narrowing step {step}"),
            ),
            (Some(_), true) => (
                AllocationStallReason::InfraError,
                "partial query failures alongside narrowing results".to_string(),
            ),
        };

        Some(DiagnosticReport {
            runs_attempted,
            reason,
            detail,
        })
    }
}

#[cfg(test)]
#[path = "diagnostician_tests.rs"]
mod tests;
