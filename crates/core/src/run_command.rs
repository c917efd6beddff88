// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `RunCommand`: the client-supplied description of a compatibility test
//! invocation (§3 Data Model).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Device allocation shape a job requires (§3, §4.3.1 Suitable-Device
/// Checker).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceTypeRequirement {
    /// Number of distinct physical devices the job needs bound together.
    pub sub_devices_required: u32,
    /// Per-sub-device product type allowlist, in allocation order. Empty
    /// means "any product type" for that slot.
    pub product_types: Vec<Vec<String>>,
}

impl Default for DeviceTypeRequirement {
    fn default() -> Self {
        Self {
            sub_devices_required: 1,
            product_types: vec![Vec::new()],
        }
    }
}

/// A single retry descriptor: re-run a module, optionally constrained to
/// failing test cases only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySpec {
    pub module_name: String,
    pub retry_failed_only: bool,
}

/// The full client-supplied test invocation description (§3 `RunCommand`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunCommand {
    pub test_plan: String,
    pub xts_root_dir: String,
    pub xts_type: String,

    #[serde(default)]
    pub device_serials_include: Vec<String>,
    #[serde(default)]
    pub device_serials_exclude: Vec<String>,

    #[serde(default)]
    pub module_include_filters: Vec<String>,
    #[serde(default)]
    pub module_exclude_filters: Vec<String>,
    #[serde(default)]
    pub module_metadata_include_filters: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub module_metadata_exclude_filters: BTreeMap<String, Vec<String>>,

    #[serde(default)]
    pub module_args: Vec<String>,
    #[serde(default)]
    pub extra_args: Vec<String>,

    #[serde(default)]
    pub retries: Vec<RetrySpec>,

    #[serde(default)]
    pub device_type_requirement: DeviceTypeRequirement,

    pub min_battery_level: Option<u32>,
    pub max_battery_level: Option<u32>,
    pub min_sdk_level: Option<u32>,
    pub max_sdk_level: Option<u32>,

    #[serde(default)]
    pub enable_xts_dynamic_download: bool,

    /// Verbatim command-line form, reconstructible for the Tradefed
    /// Runtime-Info Snapshot's `initial_state.command_line_args` (§4.3.2,
    /// component I).
    pub initial_command_line_args: Option<String>,

    /// Device property constraints keyed by property name, matched against
    /// each candidate device's reported properties (§4.3.1).
    #[serde(default)]
    pub device_property_map: BTreeMap<String, String>,
}

impl RunCommand {
    /// Number of physical devices this command needs allocated together.
    pub fn sub_devices_required(&self) -> u32 {
        self.device_type_requirement.sub_devices_required.max(1)
    }
}

#[cfg(test)]
#[path = "run_command_tests.rs"]
mod tests;
