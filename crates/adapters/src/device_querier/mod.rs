// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Device Querier adapters (§4.5 External collaborators): the boundary
//! between the engine's allocator/checker/diagnostician and whatever
//! fleet-management backend actually knows which devices exist.

mod noop;

pub use noop::NoOpDeviceQuerier;

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{DeviceQueryCall, FakeDeviceQuerier};

use async_trait::async_trait;
use ats_core::DeviceInfo;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeviceQuerierError {
    #[error("device query failed: {0}")]
    QueryFailed(String),
}

/// A single sub-device filter as passed to the Suitable-Device Checker
/// and the Allocation Diagnostician (§4.3.1, §4.3.2). Empty vectors mean
/// "unconstrained" on that axis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceQueryFilter {
    pub product_types: Vec<String>,
    pub min_sdk_level: Option<u32>,
    pub max_sdk_level: Option<u32>,
    pub min_battery_level: Option<u32>,
    pub max_battery_level: Option<u32>,
    pub required_properties: std::collections::BTreeMap<String, String>,
    /// If true, only idle/unallocated devices are returned.
    pub idle_only: bool,
}

/// Queries the device fleet for devices matching a filter. Implementations
/// may be backed by a real fleet-management RPC (outside this repo's
/// scope) or, for tests and a `disable_device_querier` configuration, by
/// [`NoOpDeviceQuerier`].
#[async_trait]
pub trait DeviceQuerier: Send + Sync + 'static {
    async fn query(&self, filter: &DeviceQueryFilter) -> Result<Vec<DeviceInfo>, DeviceQuerierError>;
}
