// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Device Allocator (§4.2): two interchangeable implementations behind
//! one trait, draining allocation results into a queue the Job Runner
//! polls.

use ats_adapters::{DeviceQueryFilter, DeviceQuerier};
use ats_core::allocation::Allocation;
use ats_core::ids::TestLocatorId;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("allocator failed fast: {0}")]
pub struct FailFastError(pub String);

/// An allocation paired with timing stats the Job Runner records as
/// allocation-time properties (§4.3 step 5).
#[derive(Debug, Clone)]
pub struct AllocationWithStats {
    pub test_id: TestLocatorId,
    pub allocation: Allocation,
    pub wait_ms: u64,
}

/// Device Allocator contract (§4.2).
#[async_trait]
pub trait DeviceAllocator: Send + Sync {
    async fn set_up(&self) -> Result<(), FailFastError>;
    async fn poll_allocations(&self) -> Vec<AllocationWithStats>;
    async fn extra_allocation(&self, test_id: TestLocatorId);
    async fn release_allocation(&self, allocation: Allocation, device_dirty: bool);
    async fn tear_down(&self);
    fn is_local(&self) -> bool;
}

struct QueueState {
    queue: VecDeque<AllocationWithStats>,
}

/// Scheduler-mediated allocator (§4.2): submits job+tests to a
/// process-wide scheduler (here, a shared in-process queue other
/// components push into) and drains it on poll.
#[derive(Clone)]
pub struct SchedulerMediatedAllocator {
    state: Arc<Mutex<QueueState>>,
}

impl Default for SchedulerMediatedAllocator {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(QueueState {
                queue: VecDeque::new(),
            })),
        }
    }
}

impl SchedulerMediatedAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues an allocation as delivered by the process-wide scheduler.
    /// Exposed so the scheduler's subscriber callback can feed this
    /// allocator without depending on its internals.
    pub fn deliver(&self, allocation: AllocationWithStats) {
        self.state.lock().queue.push_back(allocation);
    }
}

#[async_trait]
impl DeviceAllocator for SchedulerMediatedAllocator {
    async fn set_up(&self) -> Result<(), FailFastError> {
        Ok(())
    }

    async fn poll_allocations(&self) -> Vec<AllocationWithStats> {
        self.state.lock().queue.drain(..).collect()
    }

    async fn extra_allocation(&self, _test_id: TestLocatorId) {}

    async fn release_allocation(&self, _allocation: Allocation, _device_dirty: bool) {}

    async fn tear_down(&self) {}

    fn is_local(&self) -> bool {
        false
    }
}

/// Proxy-mediated allocator (§4.2): asks a device manager (here, a
/// [`DeviceQuerier`]) to lease devices per sub-device spec; each
/// completed lease synthesizes an allocation for its originating test.
#[derive(Clone)]
pub struct ProxyMediatedAllocator {
    querier: Arc<dyn DeviceQuerier>,
    state: Arc<Mutex<QueueState>>,
    local: bool,
}

impl ProxyMediatedAllocator {
    pub fn new(querier: Arc<dyn DeviceQuerier>, local: bool) -> Self {
        Self {
            querier,
            state: Arc::new(Mutex::new(QueueState {
                queue: VecDeque::new(),
            })),
            local,
        }
    }

    /// Leases a device for `test_id` against `filter`, enqueuing a
    /// synthesized single-sub-device allocation on success.
    pub async fn try_lease(&self, test_id: TestLocatorId, filter: &DeviceQueryFilter) -> bool {
        let devices = self.querier.query(filter).await.unwrap_or_default();
        let Some(device) = devices.into_iter().next() else {
            return false;
        };
        self.state.lock().queue.push_back(AllocationWithStats {
            test_id,
            allocation: Allocation {
                sub_devices: vec![ats_core::allocation::SubDeviceSpec {
                    slot_index: 0,
                    allowed_product_types: Vec::new(),
                    device: Some(device.device_id),
                }],
            },
            wait_ms: 0,
        });
        true
    }
}

#[async_trait]
impl DeviceAllocator for ProxyMediatedAllocator {
    async fn set_up(&self) -> Result<(), FailFastError> {
        Ok(())
    }

    async fn poll_allocations(&self) -> Vec<AllocationWithStats> {
        self.state.lock().queue.drain(..).collect()
    }

    async fn extra_allocation(&self, _test_id: TestLocatorId) {}

    async fn release_allocation(&self, _allocation: Allocation, _device_dirty: bool) {}

    async fn tear_down(&self) {}

    fn is_local(&self) -> bool {
        self.local
    }
}

#[cfg(test)]
#[path = "allocator_tests.rs"]
mod tests;
