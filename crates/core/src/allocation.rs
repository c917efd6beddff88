// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Device allocation types (§4.2 Scheduler & Device Allocator, §4.3.1
//! Suitable-Device Checker).

use crate::ids::DeviceId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A device as reported by the Device Querier (§4.5 External collaborators).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub device_id: DeviceId,
    pub product_type: String,
    pub sdk_level: u32,
    pub battery_level: Option<u32>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    pub available: bool,
}

impl DeviceInfo {
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

/// One slot of a multi-device job, bound to a concrete device once
/// allocation succeeds (§4.2).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubDeviceSpec {
    pub slot_index: u32,
    pub allowed_product_types: Vec<String>,
    pub device: Option<DeviceId>,
}

/// The outcome of a successful allocation attempt: every sub-device slot
/// bound to a concrete device, held until the job releases it (§4.3 Job
/// Runner allocation loop).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub sub_devices: Vec<SubDeviceSpec>,
}

impl Allocation {
    pub fn device_ids(&self) -> Vec<DeviceId> {
        self.sub_devices
            .iter()
            .filter_map(|s| s.device.clone())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        !self.sub_devices.is_empty() && self.sub_devices.iter().all(|s| s.device.is_some())
    }
}

/// Why an allocation attempt did not (yet) succeed, as surfaced by the
/// Allocation Diagnostician (§4.3.2) when a job stalls past its polling
/// threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllocationStallReason {
    /// No device in the fleet can ever satisfy the request (bad filters,
    /// unsatisfiable product-type/battery/sdk bounds).
    UserConfigError,
    /// Matching devices exist but are all currently held by other jobs.
    NoCapacity,
    /// The fleet/infra layer failed to answer the Suitable-Device Checker
    /// within its budget.
    InfraError,
}

#[cfg(test)]
#[path = "allocation_tests.rs"]
mod tests;
