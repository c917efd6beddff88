// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server Preparer (§4.1): guarantees exactly one live OLC server under
//! concurrent preparation attempts, with version negotiation, graceful and
//! forcible kill, and diagnostic capture on startup failure.

use std::net::SocketAddr;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ats_adapters::process_output::ProcessOutputCapture;
use ats_adapters::subprocess::{
    CONNECT_RETRY_INTERVAL, CONNECT_RETRIES_DETACHED, CONNECT_RETRIES_IN_PROCESS,
    KILL_POLL_ATTEMPTS, KILL_POLL_INTERVAL, SERVER_STARTUP_TIMEOUT,
};
use ats_core::error::PreparerError;
use ats_core::ids::ClientId;
use ats_core::ratelog::RateLimiter;
use ats_core::version::GetVersionResponse;
use ats_daemon::protocol::KillFailure;
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::client::ControlClient;
use crate::config::{LaunchStrategy, PreparerConfig};

/// Result of a successful preparation: either an already-running server was
/// found compatible, or a fresh one was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreparationOutcome {
    AlreadyRunning,
    Started,
}

/// Monitor-guarded single-flight guard: concurrent `prepare()` calls inside
/// one process serialize on this lock, and the "first preparation" flag
/// (§3 invariant: "observed under the preparer's monitor and never re-set
/// to true") lives behind the same lock.
struct PreparerMonitor {
    first_preparation: bool,
}

pub struct ServerPreparer {
    config: PreparerConfig,
    addr: SocketAddr,
    monitor: Mutex<PreparerMonitor>,
    heartbeat_error_log: RateLimiter,
}

impl ServerPreparer {
    pub fn new(config: PreparerConfig) -> Self {
        let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
        let heartbeat_error_log = RateLimiter::new(config.heartbeat_error_log_interval);
        Self {
            config,
            addr,
            monitor: Mutex::new(PreparerMonitor { first_preparation: true }),
            heartbeat_error_log,
        }
    }

    fn client(&self) -> ControlClient {
        ControlClient::new(self.addr)
    }

    fn client_id(&self) -> ClientId {
        ClientId::from(self.config.client_id.as_str())
    }

    /// `try_connect()`: `Some(version)` if a server answered `getVersion`,
    /// `None` if the port is simply unoccupied (§4.1 step 3 "unavailable"),
    /// `Err` for any other connect failure.
    pub async fn try_connect(&self) -> Result<Option<GetVersionResponse>, PreparerError> {
        match self.client().get_version().await {
            Ok(version) => Ok(Some(version)),
            Err(e) if e.is_connection_refused() => Ok(None),
            Err(e) => Err(PreparerError::ConnectExisting(e.to_string())),
        }
    }

    /// The full preparation algorithm (§4.1 steps 1-6), serialized by the
    /// monitor so concurrent preparation attempts in this process start at
    /// most one server.
    pub async fn prepare(&self) -> Result<PreparationOutcome, PreparerError> {
        let is_first = {
            let mut monitor = self.monitor.lock();
            let was_first = monitor.first_preparation;
            monitor.first_preparation = false;
            was_first
        };

        match self.try_connect().await? {
            Some(version) => {
                if is_first && self.config.always_restart_on_first_preparation {
                    info!("restart-on-first-preparation policy set; restarting existing server");
                } else {
                    let expected = GetVersionResponse::new(self.config.client_version.clone(), 0);
                    if !version.version_eq(&expected) {
                        warn!(
                            server_version = %version.version_info,
                            client_version = %self.config.client_version,
                            "existing server's version does not match this client; reusing it anyway"
                        );
                    } else {
                        debug!("existing server answered getVersion; reusing it");
                    }
                    return Ok(PreparationOutcome::AlreadyRunning);
                }
            }
            None => {}
        }

        self.start_new_server().await?;
        Ok(PreparationOutcome::Started)
    }

    /// §4.1 step 4-6: spawn a fresh server under the configured launch
    /// strategy, wait for readiness, then connect with retry. On any
    /// failure after spawn, kill the child and surface the most
    /// informative diagnostic available.
    async fn start_new_server(&self) -> Result<(), PreparerError> {
        match self.config.launch_strategy {
            LaunchStrategy::InProcessSupervised => self.start_in_process_supervised().await,
            LaunchStrategy::Detached => self.start_detached().await,
        }
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.config.server_binary);
        if let Some(xmx) = &self.config.server_xmx {
            cmd.arg(format!("--xmx={xmx}"));
        }
        cmd.args(&self.config.extra_server_args);
        cmd.env("OLC_SERVER_PORT", self.config.port.to_string());
        cmd
    }

    async fn start_in_process_supervised(&self) -> Result<(), PreparerError> {
        let mut cmd = self.build_command();
        cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| PreparerError::StartServer(e.to_string()))?;

        let Some(stdout) = child.stdout.take() else {
            let _ = child.start_kill();
            return Err(PreparerError::StartServer("child stdout not captured".to_string()));
        };
        let mut lines = BufReader::new(stdout).lines();

        let saw_marker = tokio::time::timeout(SERVER_STARTUP_TIMEOUT, async {
            while let Ok(Some(line)) = lines.next_line().await {
                if line.contains(ats_daemon::config::READY_MARKER) {
                    return true;
                }
            }
            false
        })
        .await
        .unwrap_or(false);

        if !saw_marker {
            return Err(self.kill_and_diagnose(&mut child, PreparerError::InitializeServer).await);
        }

        match self
            .connect_with_retry(&mut child, CONNECT_RETRIES_IN_PROCESS)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) => Err(self.kill_and_diagnose(&mut child, e).await),
        }
    }

    /// `sh -c 'nohup ... > out 2>&1 &'`: the parent exits immediately, so
    /// readiness is determined only by successful `getVersion` retries
    /// (§4.1 step 4).
    async fn start_detached(&self) -> Result<(), PreparerError> {
        let binary = self.config.server_binary.display();
        let xmx_flag = self
            .config
            .server_xmx
            .as_ref()
            .map(|xmx| format!("--xmx={xmx} "))
            .unwrap_or_default();
        let extra = self.config.extra_server_args.join(" ");
        let output_path = self
            .config
            .server_output_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "/dev/null".to_string());

        let shell_cmd = format!(
            "nohup {binary} {xmx_flag}{extra} > {output_path} 2>&1 & disown"
        );

        let status = Command::new("sh")
            .arg("-c")
            .arg(&shell_cmd)
            .env("OLC_SERVER_PORT", self.config.port.to_string())
            .status()
            .await
            .map_err(|e| PreparerError::StartServer(e.to_string()))?;

        if !status.success() {
            return Err(PreparerError::StartServer(format!(
                "detached launch exited with {status}"
            )));
        }

        self.connect_with_retry_detached(CONNECT_RETRIES_DETACHED).await
    }

    /// Connect-with-retry for the in-process-supervised strategy, which
    /// also watches for early child exit (§4.1 step 5).
    async fn connect_with_retry(
        &self,
        child: &mut Child,
        max_attempts: u32,
    ) -> Result<(), PreparerError> {
        for _ in 0..max_attempts {
            if let Ok(Some(_status)) = child.try_wait() {
                return Err(PreparerError::OlcServerAbnormalExit);
            }
            if self.try_connect().await?.is_some() {
                return Ok(());
            }
            tokio::time::sleep(CONNECT_RETRY_INTERVAL).await;
        }
        Err(PreparerError::ConnectNew)
    }

    async fn connect_with_retry_detached(&self, max_attempts: u32) -> Result<(), PreparerError> {
        for _ in 0..max_attempts {
            if self.try_connect().await?.is_some() {
                return Ok(());
            }
            tokio::time::sleep(CONNECT_RETRY_INTERVAL).await;
        }
        Err(PreparerError::ConnectNew)
    }

    /// §4.1 step 6: kill the child, then fall back through stderr → the
    /// configured server-output file → the most recent server log file
    /// (gated on mtime), returning whichever original error if none of the
    /// fallbacks produced anything.
    async fn kill_and_diagnose(&self, child: &mut Child, original: PreparerError) -> PreparerError {
        let _ = child.start_kill();
        let output = child.wait_with_output().await.ok();
        let stderr = output
            .as_ref()
            .map(|o| String::from_utf8_lossy(&o.stderr).to_string())
            .unwrap_or_default();

        let capture = ProcessOutputCapture {
            stderr: &stderr,
            server_output_path: self.config.server_output_path.as_deref(),
            server_log_dir: self.config.server_log_dir.as_deref(),
            retry_window: CONNECT_RETRY_INTERVAL * CONNECT_RETRIES_IN_PROCESS,
        };

        match capture.diagnose() {
            Some(diagnosis) => PreparerError::StartServer(diagnosis),
            None => original,
        }
    }

    /// Kill algorithm (§4.1): `killServer`, then poll `getVersion` until
    /// the first `UNAVAILABLE` confirms death. On `FAILURE`, escalate to
    /// `SIGKILL` only if `forcibly`.
    pub async fn kill_existing(&self, forcibly: bool) -> Result<(), PreparerError> {
        let failure = match self.client().kill_server(self.client_id()).await {
            Ok(Ok(_server_pid)) => None,
            Ok(Err(failure)) => Some(failure),
            Err(e) => return Err(PreparerError::ConnectExisting(e.to_string())),
        };

        if let Some(failure) = failure {
            if !forcibly {
                self.report_kill_failure(&failure);
                return Err(PreparerError::CannotKillExisting {
                    unfinished_sessions: failure.unfinished_sessions.len(),
                    alive_clients: failure.alive_clients.len(),
                });
            }
            self.send_sigkill(failure.server_pid);
        }

        for _ in 0..KILL_POLL_ATTEMPTS {
            tokio::time::sleep(KILL_POLL_INTERVAL).await;
            if self.try_connect().await?.is_none() {
                return Ok(());
            }
        }

        Err(PreparerError::StillRunning)
    }

    fn report_kill_failure(&self, failure: &KillFailure) {
        let mut buf = Vec::new();
        crate::table::render_kill_failure(failure, &mut buf);
        warn!("{}", String::from_utf8_lossy(&buf));
    }

    #[cfg(unix)]
    fn send_sigkill(&self, pid: u32) {
        let _ = std::process::Command::new("kill")
            .args(["-9", &pid.to_string()])
            .status();
    }

    #[cfg(not(unix))]
    fn send_sigkill(&self, _pid: u32) {}

    /// Heartbeat (§4.1): every `heartbeat_interval`, send
    /// `Heartbeat{client_id}`; swallow and rate-log transport errors at
    /// most once per `heartbeat_error_log_interval`.
    pub fn start_heartbeat(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(this.config.heartbeat_interval).await;
                if let Err(e) = this.client().heartbeat(this.client_id()).await {
                    if this.heartbeat_error_log.should_fire(Instant::now()) {
                        warn!(error = %e, "heartbeat failed");
                    }
                }
            }
        })
    }
}

#[cfg(test)]
#[path = "server_preparer_tests.rs"]
mod tests;
