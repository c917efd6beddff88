// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the CLI crate (§9 Design
//! Notes: preparer-side configuration knobs).

use std::time::Duration;

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

fn parse_flag(var: &str) -> Option<bool> {
    std::env::var(var)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

/// Port the OLC server listens on (`olc_server_port`, §9).
pub fn olc_server_port() -> Option<u16> {
    std::env::var("OLC_SERVER_PORT").ok().and_then(|s| s.parse().ok())
}

/// Configured heap max passed to the spawned server (`ats_console_olc_server_xmx`, §9).
pub fn olc_server_xmx() -> Option<String> {
    std::env::var("ATS_CONSOLE_OLC_SERVER_XMX").ok()
}

/// `ats_console_always_restart_olc_server` (§9): restart-on-first-preparation policy
/// (§4.1 step 2).
pub fn always_restart_olc_server() -> Option<bool> {
    parse_flag("ATS_CONSOLE_ALWAYS_RESTART_OLC_SERVER")
}

/// `ats_console_olc_server_output_path` (§9, §4.1 step 6 fallback chain).
pub fn olc_server_output_path() -> Option<String> {
    std::env::var("ATS_CONSOLE_OLC_SERVER_OUTPUT_PATH").ok()
}

/// Directory scanned for the most recent server log file, the last
/// fallback layer in §4.1 step 6.
pub fn olc_server_log_dir() -> Option<String> {
    std::env::var("ATS_CONSOLE_OLC_SERVER_LOG_DIR").ok()
}

/// Override for locating the `atsd` binary.
pub fn daemon_binary() -> Option<String> {
    std::env::var("ATS_DAEMON_BINARY").ok()
}

/// Whether the launch strategy is detached (`sh -c 'nohup ... &'`) rather
/// than in-process-supervised (§4.1 step 4).
pub fn detached_launch() -> Option<bool> {
    parse_flag("ATS_DETACHED_LAUNCH")
}

pub fn client_id() -> Option<String> {
    std::env::var("ATS_CLIENT_ID").ok().filter(|s| !s.is_empty())
}

pub fn connect_poll_ms() -> Option<Duration> {
    parse_duration_ms("ATS_CONNECT_POLL_MS")
}
