// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire-level request/response DTOs for the control and session services
//! (§6 External Interfaces).

use ats_core::ids::{ClientId, SessionId};
use ats_core::session::{AtsSessionPluginConfig, AtsSessionPluginOutput, SessionStatus};
use ats_core::version::GetVersionResponse;
use serde::{Deserialize, Serialize};

/// A session-end notification kind (§4.4 cancellation), delivered over the
/// notification stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionNotificationKind {
    SessionCancellation { reason: String },
}

/// One entry in a `KillServer` failure report (§4.1 kill algorithm, §8
/// scenario 2): `(session_id, name, status, submitted_at)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnfinishedSessionEntry {
    pub session_id: SessionId,
    pub name: String,
    pub status: SessionStatus,
    pub submitted_epoch_ms: u64,
}

/// A lightweight session summary for `GetAllSessions` (§6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub status: SessionStatus,
}

/// Every request the control/session services accept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Request {
    /// Control: version handshake (§6).
    GetVersion,
    /// Control: liveness ping, expected every 10 s (§4.1 heartbeat, §6).
    Heartbeat { client_id: ClientId },
    /// Control: request server shutdown (§4.1 kill algorithm, §6).
    KillServer { client_id: ClientId },
    /// Session: submit a new session's config, returning its id (§6).
    SubmitSession {
        client_id: ClientId,
        config: AtsSessionPluginConfig,
    },
    /// Session: list sessions matching name/status filters (§6). Filters
    /// are plain substrings rather than full regexes; `xTS` regex
    /// resolution against a file layout is out of scope (§1 Non-goals).
    GetAllSessions {
        name_filter: Option<String>,
        status_filter: Option<SessionStatus>,
    },
    /// Session: request cancellation of the named sessions, returning the
    /// ids actually found and cancelled (§4.4 cancellation, §6).
    AbortSessions { session_ids: Vec<SessionId> },
    /// Session: fetch the current output for one session, for polling
    /// clients (not itself a push notification).
    GetSessionOutput { session_id: SessionId },
}

/// `KillServer`'s non-success payload (§4.1 kill algorithm: "render the
/// failure reasons as a table").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillFailure {
    pub unfinished_sessions: Vec<UnfinishedSessionEntry>,
    pub alive_clients: Vec<ClientId>,
    pub server_pid: u32,
}

/// Every response the control/session services return.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Response {
    GetVersion(GetVersionResponse),
    HeartbeatAck,
    KillServerSuccess { server_pid: u32 },
    KillServerFailure(KillFailure),
    SubmitSession { session_id: SessionId },
    AllSessions { sessions: Vec<SessionSummary> },
    AbortedSessions { session_ids: Vec<SessionId> },
    SessionOutput(Option<AtsSessionPluginOutput>),
    Error { message: String },
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
