// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client-side configuration for the Server Preparer (§4.1, §9 "Global
//! mutable state ... becomes a configuration record").

use std::path::PathBuf;
use std::time::Duration;

/// Which launch strategy the preparer uses when it needs to start a new
/// server (§4.1 step 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchStrategy {
    /// The spawner watches the child directly and treats the readiness
    /// marker on stdout as the successful-start signal.
    InProcessSupervised,
    /// `sh -c 'nohup ... > out 2>&1 &'`; the parent exits immediately and
    /// readiness is determined only by successful `getVersion` retries.
    Detached,
}

#[derive(Debug, Clone)]
pub struct PreparerConfig {
    /// Port the OLC server is expected to listen on.
    pub port: u16,
    /// Client id this preparer's control-plane calls (heartbeat, kill) are
    /// attributed to.
    pub client_id: String,
    /// Which launch strategy to use for a fresh server (§4.1 step 4).
    pub launch_strategy: LaunchStrategy,
    /// Whether to unconditionally restart an existing server discovered on
    /// the first preparation attempt of this process, rather than warning
    /// and returning on a version match (§4.1 step 2).
    pub always_restart_on_first_preparation: bool,
    /// Heap-max argument passed to the spawned server (`ats_console_olc_server_xmx`).
    pub server_xmx: Option<String>,
    /// File the server is configured to mirror its stdout/stderr into, read
    /// as the second fallback layer in §4.1 step 6 if the in-memory stderr
    /// buffer is empty.
    pub server_output_path: Option<PathBuf>,
    /// Directory scanned for the most recent server log file, the final
    /// fallback layer in §4.1 step 6.
    pub server_log_dir: Option<PathBuf>,
    /// Extra device-infra flags forwarded verbatim to the spawned server
    /// invocation (§4.1 step 4 "client-supplied device-infra flags").
    pub extra_server_args: Vec<String>,
    /// Heartbeat cadence (§4.1 "schedule a task every 10 s").
    pub heartbeat_interval: Duration,
    /// Minimum interval between rate-limited heartbeat transport-error logs
    /// (§4.1 "no more than once per 5 minutes").
    pub heartbeat_error_log_interval: Duration,
    /// Path to the `atsd` binary to spawn.
    pub server_binary: PathBuf,
    /// This client's own version string, compared against the connected
    /// server's `GetVersionResponse` on reuse (§4.1 step 2: "warn on
    /// version mismatch").
    pub client_version: String,
}

impl Default for PreparerConfig {
    fn default() -> Self {
        Self {
            port: crate::env::olc_server_port().unwrap_or(ats_daemon::config::DEFAULT_PORT),
            client_id: crate::env::client_id().unwrap_or_else(default_client_id),
            launch_strategy: if crate::env::detached_launch().unwrap_or(false) {
                LaunchStrategy::Detached
            } else {
                LaunchStrategy::InProcessSupervised
            },
            always_restart_on_first_preparation: crate::env::always_restart_olc_server()
                .unwrap_or(false),
            server_xmx: crate::env::olc_server_xmx(),
            server_output_path: crate::env::olc_server_output_path().map(PathBuf::from),
            server_log_dir: crate::env::olc_server_log_dir().map(PathBuf::from),
            extra_server_args: Vec::new(),
            heartbeat_interval: Duration::from_secs(10),
            heartbeat_error_log_interval: Duration::from_secs(300),
            server_binary: find_server_binary(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Derive a stable per-invocation client id from the process id when the
/// operator hasn't set one explicitly.
fn default_client_id() -> String {
    format!("ats-cli-{}", std::process::id())
}

/// Locate the `atsd` binary: an explicit override, then a sibling of the
/// running `ats` executable, then a bare `atsd` resolved via `PATH`.
fn find_server_binary() -> PathBuf {
    if let Some(path) = crate::env::daemon_binary() {
        return PathBuf::from(path);
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join("atsd");
            if sibling.exists() {
                return sibling;
            }
        }
    }

    PathBuf::from("atsd")
}
