// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server-side configuration knobs (§9 Design Notes: "Global mutable
//! state (`Flags.instance()`) becomes a configuration record passed in
//! at construction").
//!
//! Only the server-side subset of the recognized knobs lives here; the
//! preparer-side subset (`ats_console_olc_server_xmx`,
//! `ats_console_always_restart_olc_server`,
//! `ats_console_olc_server_output_path`) lives in `ats-cli`'s
//! `PreparerConfig`, since those are read by the client launching the
//! server, not by the server itself.

use std::time::Duration;

/// Default port the control/session services bind (§6, §9
/// `olc_server_port`).
pub const DEFAULT_PORT: u16 = 9988;

/// Literal stdout marker the in-process-supervised launch strategy
/// watches for (§4.1 step 4, §6 "Process interface").
pub const READY_MARKER: &str = "OLC server started";

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub port: u16,
    /// §9 `disable_device_querier`: fall back to [`ats_adapters::NoOpDeviceQuerier`].
    pub disable_device_querier: bool,
    /// §9 `real_time_job`: feeds the poll-interval multiplier table (§4.3 step 4).
    pub real_time_job: bool,
    /// §9 `remove_job_gen_files_when_finished`.
    pub remove_job_gen_files_when_finished: bool,
    /// §9 `lower_limit_of_jvm_max_memory_allow_for_allocation_diagnostic`
    /// (§4.3.2: "If the process's configured maximum heap is below a
    /// configured threshold, the diagnostic is skipped").
    pub min_diagnostic_heap_bytes: u64,
    /// The process's own configured maximum heap, compared against
    /// `min_diagnostic_heap_bytes`. There is no JVM in this port; this is
    /// a configured proxy value an operator sets to the same effect.
    pub configured_heap_bytes: u64,
    /// §9 `xts_disable_tf_result_log`.
    pub xts_disable_tf_result_log: bool,
    /// §9 `enable_proxy_mode`: selects `ProxyMediatedAllocator` over
    /// `SchedulerMediatedAllocator` (§4.2).
    pub enable_proxy_mode: bool,
    /// §9 `ats_device_recovery_timeout`.
    pub ats_device_recovery_timeout: Duration,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            disable_device_querier: false,
            real_time_job: false,
            remove_job_gen_files_when_finished: true,
            min_diagnostic_heap_bytes: 1 << 30,
            configured_heap_bytes: 4 << 30,
            xts_disable_tf_result_log: false,
            enable_proxy_mode: true,
            ats_device_recovery_timeout: Duration::from_secs(300),
        }
    }
}

impl DaemonConfig {
    /// Loads configuration from environment variables, falling back to
    /// [`DaemonConfig::default`] for anything unset.
    pub fn load() -> Self {
        let defaults = Self::default();
        Self {
            port: env_parsed("OLC_SERVER_PORT").unwrap_or(defaults.port),
            disable_device_querier: env_flag("DISABLE_DEVICE_QUERIER")
                .unwrap_or(defaults.disable_device_querier),
            real_time_job: env_flag("REAL_TIME_JOB").unwrap_or(defaults.real_time_job),
            remove_job_gen_files_when_finished: env_flag("REMOVE_JOB_GEN_FILES_WHEN_FINISHED")
                .unwrap_or(defaults.remove_job_gen_files_when_finished),
            min_diagnostic_heap_bytes: env_parsed(
                "LOWER_LIMIT_OF_JVM_MAX_MEMORY_ALLOW_FOR_ALLOCATION_DIAGNOSTIC",
            )
            .unwrap_or(defaults.min_diagnostic_heap_bytes),
            configured_heap_bytes: env_parsed("ATS_CONFIGURED_HEAP_BYTES")
                .unwrap_or(defaults.configured_heap_bytes),
            xts_disable_tf_result_log: env_flag("XTS_DISABLE_TF_RESULT_LOG")
                .unwrap_or(defaults.xts_disable_tf_result_log),
            enable_proxy_mode: env_flag("ENABLE_PROXY_MODE").unwrap_or(defaults.enable_proxy_mode),
            ats_device_recovery_timeout: env_parsed::<u64>("ATS_DEVICE_RECOVERY_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.ats_device_recovery_timeout),
        }
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
