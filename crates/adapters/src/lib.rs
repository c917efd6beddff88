// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for external I/O: device querying and subprocess execution.

pub mod device_querier;
pub mod process_output;
pub mod subprocess;

pub use device_querier::{DeviceQueryFilter, DeviceQuerier, DeviceQuerierError, NoOpDeviceQuerier};
pub use process_output::ProcessOutputCapture;

#[cfg(any(test, feature = "test-support"))]
pub use device_querier::{DeviceQueryCall, FakeDeviceQuerier};
