// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session types: submission config, live status, and plugin output (§3
//! Data Model, §4.4 ATS Session Plugin, §6 External Interfaces).

use crate::ids::{ClientId, CommandId, DeviceId, SessionId, TestLocatorId};
use crate::run_command::RunCommand;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A `ListCommand` session: enumerates known modules/plans, no device
/// allocation involved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListCommand {
    pub xts_root_dir: String,
    pub xts_type: String,
}

/// A `DumpCommand` session: dumps environment/config diagnostics, no
/// device allocation involved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DumpCommand {
    pub xts_root_dir: String,
}

/// The typed submission payload carried by a Session (§3 Session).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AtsSessionPluginConfig {
    RunCommand(RunCommand),
    ListCommand(ListCommand),
    DumpCommand(DumpCommand),
}

/// Session lifecycle status (§3 Session).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Submitted,
    Running,
    Finished,
}

/// One device-bound test invocation (§3 RunCommandState).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    pub command_id: CommandId,
    pub start_epoch_ms: u64,
    pub device_ids: Vec<DeviceId>,
    pub state_summary: String,
}

/// All invocations recorded for a single test id, in start order (§3
/// RunCommandState).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Invocations {
    pub start_epoch_ms: u64,
    pub invocations: Vec<Invocation>,
}

/// Live per-command state for a running `RunCommand` session (§3
/// RunCommandState, §4.4).
///
/// Mutated under a single lock by the ATS Session Plugin; every mutation
/// re-emits the full state into [`AtsSessionPluginOutput::RunCommandState`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RunCommandState {
    pub command_id: Option<CommandId>,
    pub total_execution_time_ms: u64,
    pub running_invocation: BTreeMap<TestLocatorId, Invocations>,
    /// The command-line form the session was submitted with, for the
    /// Tradefed Runtime-Info Snapshot's `initial_state.command_line_args`
    /// (§4.3.2, component I).
    pub initial_state: Option<String>,
}

impl RunCommandState {
    pub fn insert_invocation(&mut self, test_id: TestLocatorId, invocation: Invocation) {
        self.running_invocation
            .entry(test_id)
            .or_insert_with(|| Invocations {
                start_epoch_ms: invocation.start_epoch_ms,
                invocations: Vec::new(),
            })
            .invocations
            .push(invocation);
    }

    /// Removes `test_id` from the running set, returning whether it was
    /// still present (§4.4 runtime-info update race: "the update writes
    /// the new Invocations only if test_id is still present").
    pub fn remove_test(&mut self, test_id: &TestLocatorId) -> bool {
        self.running_invocation.remove(test_id).is_some()
    }
}

/// The session plugin's mutable output, mirrored to clients on every
/// mutation (§3 Session, §6 `AtsSessionPluginOutput`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AtsSessionPluginOutput {
    Success { output_message: String },
    Failure { error_message: String },
    RunCommandState(RunCommandState),
}

/// Reserved property-map keys carried on every Session (§3 Session).
pub mod reserved_properties {
    pub const COMMAND_ID: &str = "command_id";
    pub const SESSION_CLIENT_ID: &str = "session_client_id";
    pub const CONTAIN_STARTED_TEST: &str = "contain_started_test";
}

/// A Session: uniquely identified, carrying a typed config and a mutable
/// output, destroyed once its ended-event has been observed and results
/// written (§3 Session).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: SessionId,
    pub client_id: ClientId,
    pub config: AtsSessionPluginConfig,
    pub status: SessionStatus,
    pub output: Option<AtsSessionPluginOutput>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl Session {
    pub fn new(session_id: SessionId, client_id: ClientId, config: AtsSessionPluginConfig) -> Self {
        Self {
            session_id,
            client_id,
            config,
            status: SessionStatus::Submitted,
            output: None,
            properties: BTreeMap::new(),
        }
    }

    pub fn mark_contain_started_test(&mut self) {
        self.properties.insert(
            reserved_properties::CONTAIN_STARTED_TEST.to_string(),
            "true".to_string(),
        );
    }

    pub fn contains_started_test(&self) -> bool {
        self.properties
            .get(reserved_properties::CONTAIN_STARTED_TEST)
            .map(String::as_str)
            == Some("true")
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
