// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess execution helpers, shared by the Server Preparer's spawn
//! and kill-poll paths (§4.1).

use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

/// Startup window for the in-process-supervised launch strategy: fail
/// with `InitializeError` if the readiness marker hasn't appeared by
/// then (§4.1 step 4).
pub const SERVER_STARTUP_TIMEOUT: Duration = Duration::from_secs(40);

/// Interval between reconnect attempts after spawning a new server
/// (§4.1 step 5).
pub const CONNECT_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Reconnect attempts for the in-process-supervised strategy.
pub const CONNECT_RETRIES_IN_PROCESS: u32 = 15;

/// Reconnect attempts for the detached launch strategy.
pub const CONNECT_RETRIES_DETACHED: u32 = 25;

/// Interval between `getVersion` death-confirmation polls after a
/// successful `killServer` (§4.1 kill algorithm).
pub const KILL_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Poll budget for confirming the server died after a kill (§4.1 kill
/// algorithm: "first UNAVAILABLE confirms death").
pub const KILL_POLL_ATTEMPTS: u32 = 10;

/// Run a subprocess command with a timeout. The child is killed
/// automatically if the timeout elapses, via `tokio::process::Child`'s
/// drop behavior.
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    description: &str,
) -> Result<Output, String> {
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(io_err)) => Err(format!("{} failed: {}", description, io_err)),
        Err(_elapsed) => Err(format!(
            "{} timed out after {}s",
            description,
            timeout.as_secs()
        )),
    }
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
