// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op Device Querier, for `disable_device_querier=true` deployments.

use super::{DeviceQueryFilter, DeviceQuerier, DeviceQuerierError};
use async_trait::async_trait;
use ats_core::DeviceInfo;

/// Always reports an empty fleet. Used when device querying is disabled
/// by configuration; allocation then relies entirely on
/// `extraAllocation`-style direct assignment.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpDeviceQuerier;

impl NoOpDeviceQuerier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DeviceQuerier for NoOpDeviceQuerier {
    async fn query(&self, _filter: &DeviceQueryFilter) -> Result<Vec<DeviceInfo>, DeviceQuerierError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
#[path = "noop_tests.rs"]
mod tests;
