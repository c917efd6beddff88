// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Version handshake types for the control service (§6 `GetVersion`).

use serde::{Deserialize, Serialize};

/// Response to `GetVersion`. Carries the server's version string and the
/// OS process id of the OLC server, as distinct fields so that version
/// *comparisons* (§8 round-trip law) can ignore the process id while the
/// wire representation still carries it for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetVersionResponse {
    pub version_info: String,
    pub process_id: u32,
}

impl GetVersionResponse {
    pub fn new(version_info: impl Into<String>, process_id: u32) -> Self {
        Self {
            version_info: version_info.into(),
            process_id,
        }
    }

    /// Returns a copy with `process_id` zeroed, for the §8 round-trip law:
    /// `shortDebugString(GetVersionResponse)` before/after `clearProcessId`
    /// compares equal between client and server versions.
    pub fn clear_process_id(&self) -> Self {
        Self {
            version_info: self.version_info.clone(),
            process_id: 0,
        }
    }

    /// Version equality that ignores `process_id`, per §8.
    pub fn version_eq(&self, other: &Self) -> bool {
        self.clear_process_id() == other.clear_process_id()
    }
}

#[cfg(test)]
#[path = "version_tests.rs"]
mod tests;
