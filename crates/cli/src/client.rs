// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control/session client stubs (§2 components A and C): typed RPC façades
//! over the daemon's TCP wire protocol.

use std::net::SocketAddr;
use std::time::Duration;

use ats_core::ids::{ClientId, SessionId};
use ats_core::session::{AtsSessionPluginConfig, AtsSessionPluginOutput, SessionStatus};
use ats_core::version::GetVersionResponse;
use ats_daemon::protocol::{KillFailure, Request, Response, SessionSummary};
use ats_daemon::wire::{self, ProtocolError};
use thiserror::Error;
use tokio::net::TcpStream;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("unexpected response from server")]
    UnexpectedResponse,

    #[error("server rejected request: {0}")]
    Rejected(String),
}

impl ClientError {
    /// True if this error means "nothing is listening there" — the signal
    /// the Server Preparer treats as "no server" rather than a real
    /// connect failure (§4.1 step 3).
    pub fn is_connection_refused(&self) -> bool {
        matches!(self, ClientError::Io(e) if e.kind() == std::io::ErrorKind::ConnectionRefused)
    }
}

/// Thin RPC stub over a freshly-dialed TCP connection per call (§6
/// "blocking unary" calls; no persistent session is assumed between
/// requests).
pub struct ControlClient {
    addr: SocketAddr,
    timeout: Duration,
}

impl ControlClient {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            timeout: wire::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(addr: SocketAddr, timeout: Duration) -> Self {
        Self { addr, timeout }
    }

    async fn send(&self, request: &Request) -> Result<Response, ClientError> {
        let mut stream = TcpStream::connect(self.addr).await?;
        wire::write_request(&mut stream, request, self.timeout).await?;
        let response = wire::read_response(&mut stream, self.timeout).await?;
        Ok(response)
    }

    pub async fn get_version(&self) -> Result<GetVersionResponse, ClientError> {
        match self.send(&Request::GetVersion).await? {
            Response::GetVersion(v) => Ok(v),
            other => Self::reject(other),
        }
    }

    pub async fn heartbeat(&self, client_id: ClientId) -> Result<(), ClientError> {
        match self.send(&Request::Heartbeat { client_id }).await? {
            Response::HeartbeatAck => Ok(()),
            other => Self::reject(other),
        }
    }

    /// Returns the server's pid on success, or the failure report the kill
    /// algorithm renders into a table (§4.1 kill algorithm).
    pub async fn kill_server(&self, client_id: ClientId) -> Result<Result<u32, KillFailure>, ClientError> {
        match self.send(&Request::KillServer { client_id }).await? {
            Response::KillServerSuccess { server_pid } => Ok(Ok(server_pid)),
            Response::KillServerFailure(failure) => Ok(Err(failure)),
            other => Self::reject(other),
        }
    }

    pub async fn submit_session(
        &self,
        client_id: ClientId,
        config: AtsSessionPluginConfig,
    ) -> Result<SessionId, ClientError> {
        match self.send(&Request::SubmitSession { client_id, config }).await? {
            Response::SubmitSession { session_id } => Ok(session_id),
            other => Self::reject(other),
        }
    }

    pub async fn get_all_sessions(
        &self,
        name_filter: Option<String>,
        status_filter: Option<SessionStatus>,
    ) -> Result<Vec<SessionSummary>, ClientError> {
        match self
            .send(&Request::GetAllSessions { name_filter, status_filter })
            .await?
        {
            Response::AllSessions { sessions } => Ok(sessions),
            other => Self::reject(other),
        }
    }

    pub async fn abort_sessions(
        &self,
        session_ids: Vec<SessionId>,
    ) -> Result<Vec<SessionId>, ClientError> {
        match self.send(&Request::AbortSessions { session_ids }).await? {
            Response::AbortedSessions { session_ids } => Ok(session_ids),
            other => Self::reject(other),
        }
    }

    pub async fn get_session_output(
        &self,
        session_id: SessionId,
    ) -> Result<Option<AtsSessionPluginOutput>, ClientError> {
        match self.send(&Request::GetSessionOutput { session_id }).await? {
            Response::SessionOutput(output) => Ok(output),
            other => Self::reject(other),
        }
    }

    fn reject<T>(resp: Response) -> Result<T, ClientError> {
        match resp {
            Response::Error { message } => Err(ClientError::Rejected(message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
