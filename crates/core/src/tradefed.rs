// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tradefed Runtime-Info Snapshot: a file-backed record written by worker
//! subprocesses and polled by the session plugin on a fixed cadence
//! (§3 Tradefed Runtime-Info Snapshot, §4.4 runtime-info updater,
//! component I).

use crate::ids::DeviceId;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::SystemTime;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("reading snapshot file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing snapshot file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Test property key a Tradefed job's test carries its runtime-info file
/// path under (§4.4 runtime-info updater: "consult a property
/// `TRADEFED_RUNTIME_INFO_FILE_PATH`").
pub const RUNTIME_INFO_FILE_PATH_PROPERTY: &str = "TRADEFED_RUNTIME_INFO_FILE_PATH";

/// One device-bound entry in a snapshot (§3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeInfoEntry {
    pub device_ids: Vec<DeviceId>,
    pub status_summary: String,
}

/// The full file-backed record (§3): "a list of `{device_ids[],
/// status_summary}` plus a timestamp."
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeInfoSnapshot {
    pub entries: Vec<RuntimeInfoEntry>,
    pub timestamp_epoch_ms: u64,
}

/// Polls a snapshot file, only re-reading when its mtime has advanced
/// past the last-seen value (§4.4: "if the file exists and its
/// last-modified-time is newer than the previously remembered value,
/// read the file").
#[derive(Debug, Default)]
pub struct SnapshotReader {
    last_modified: Option<SystemTime>,
}

impl SnapshotReader {
    pub fn new() -> Self {
        Self {
            last_modified: None,
        }
    }

    /// Returns `Ok(Some(snapshot))` if the file at `path` exists and its
    /// mtime has advanced since the previous call, `Ok(None)` if it
    /// hasn't (or the file is absent), and `Err` on a read/parse failure
    /// (the caller logs this at WARNING per §4.4 and keeps polling).
    pub fn poll(&mut self, path: &Path) -> Result<Option<RuntimeInfoSnapshot>, SnapshotError> {
        let metadata = match fs::metadata(path) {
            Ok(m) => m,
            Err(_) => return Ok(None),
        };
        let modified = metadata.modified().map_err(|source| SnapshotError::Read {
            path: path.display().to_string(),
            source,
        })?;
        if self.last_modified.is_some_and(|prev| modified <= prev) {
            return Ok(None);
        }

        let contents = fs::read_to_string(path).map_err(|source| SnapshotError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let snapshot: RuntimeInfoSnapshot =
            serde_json::from_str(&contents).map_err(|source| SnapshotError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        self.last_modified = Some(modified);
        Ok(Some(snapshot))
    }
}

#[cfg(test)]
#[path = "tradefed_tests.rs"]
mod tests;
