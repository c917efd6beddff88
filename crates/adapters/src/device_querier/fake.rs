// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake Device Querier for testing the allocator, checker, and
//! diagnostician without a real fleet backend.

use super::{DeviceQueryFilter, DeviceQuerier, DeviceQuerierError};
use async_trait::async_trait;
use ats_core::DeviceInfo;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct DeviceQueryCall {
    pub filter: DeviceQueryFilter,
}

struct FakeState {
    devices: Vec<DeviceInfo>,
    calls: Vec<DeviceQueryCall>,
    fail_next: bool,
}

/// Records every call and returns a fixed device list (optionally
/// filtered), or an error when `fail_next` was armed.
#[derive(Clone)]
pub struct FakeDeviceQuerier {
    inner: Arc<Mutex<FakeState>>,
}

impl Default for FakeDeviceQuerier {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeState {
                devices: Vec::new(),
                calls: Vec::new(),
                fail_next: false,
            })),
        }
    }
}

impl FakeDeviceQuerier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_devices(devices: Vec<DeviceInfo>) -> Self {
        let fake = Self::default();
        fake.inner.lock().devices = devices;
        fake
    }

    pub fn set_devices(&self, devices: Vec<DeviceInfo>) {
        self.inner.lock().devices = devices;
    }

    pub fn arm_failure(&self) {
        self.inner.lock().fail_next = true;
    }

    pub fn calls(&self) -> Vec<DeviceQueryCall> {
        self.inner.lock().calls.clone()
    }
}

fn matches(device: &DeviceInfo, filter: &DeviceQueryFilter) -> bool {
    if !filter.product_types.is_empty() && !filter.product_types.contains(&device.product_type) {
        return false;
    }
    if let Some(min) = filter.min_sdk_level {
        if device.sdk_level < min {
            return false;
        }
    }
    if let Some(max) = filter.max_sdk_level {
        if device.sdk_level > max {
            return false;
        }
    }
    if let Some(min) = filter.min_battery_level {
        if device.battery_level.map_or(true, |b| b < min) {
            return false;
        }
    }
    if let Some(max) = filter.max_battery_level {
        if device.battery_level.map_or(true, |b| b > max) {
            return false;
        }
    }
    for (key, value) in &filter.required_properties {
        if device.property(key) != Some(value.as_str()) {
            return false;
        }
    }
    if filter.idle_only && !device.available {
        return false;
    }
    true
}

#[async_trait]
impl DeviceQuerier for FakeDeviceQuerier {
    async fn query(&self, filter: &DeviceQueryFilter) -> Result<Vec<DeviceInfo>, DeviceQuerierError> {
        let mut state = self.inner.lock();
        state.calls.push(DeviceQueryCall {
            filter: filter.clone(),
        });
        if state.fail_next {
            state.fail_next = false;
            return Err(DeviceQuerierError::QueryFailed("fake failure".into()));
        }
        Ok(state
            .devices
            .iter()
            .filter(|d| matches(d, filter))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
