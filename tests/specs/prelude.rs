// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for the workspace-level behavioral specifications.

use std::collections::BTreeMap;
use std::sync::Arc;

use ats_adapters::FakeDeviceQuerier;
use ats_core::allocation::DeviceInfo;
use ats_core::ids::DeviceId;
use ats_core::run_command::{DeviceTypeRequirement, RunCommand};
use ats_daemon::{DaemonConfig, ServerState};

pub fn sample_run_command(test_plan: &str) -> RunCommand {
    RunCommand {
        test_plan: test_plan.to_string(),
        xts_root_dir: "/xts".to_string(),
        xts_type: "cts".to_string(),
        device_serials_include: Vec::new(),
        device_serials_exclude: Vec::new(),
        module_include_filters: Vec::new(),
        module_exclude_filters: Vec::new(),
        module_metadata_include_filters: BTreeMap::new(),
        module_metadata_exclude_filters: BTreeMap::new(),
        module_args: Vec::new(),
        extra_args: Vec::new(),
        retries: Vec::new(),
        device_type_requirement: DeviceTypeRequirement::default(),
        min_battery_level: None,
        max_battery_level: None,
        min_sdk_level: None,
        max_sdk_level: None,
        enable_xts_dynamic_download: false,
        initial_command_line_args: Some(format!("run {test_plan}")),
        device_property_map: BTreeMap::new(),
    }
}

pub fn available_device(id: &str) -> DeviceInfo {
    DeviceInfo {
        device_id: DeviceId::from(id),
        product_type: "walleye".to_string(),
        sdk_level: 33,
        battery_level: Some(100),
        properties: BTreeMap::new(),
        available: true,
    }
}

pub fn state_with_one_device() -> Arc<ServerState> {
    let querier = FakeDeviceQuerier::with_devices(vec![available_device("device-1")]);
    ServerState::with_querier(DaemonConfig::default(), Arc::new(querier))
}

pub fn state_with_no_devices() -> Arc<ServerState> {
    let querier = FakeDeviceQuerier::new();
    ServerState::with_querier(DaemonConfig::default(), Arc::new(querier))
}
