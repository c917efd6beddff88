// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Layered startup-failure diagnostics: on any failure after spawn, print
//! captured stderr; if empty, read the configured server-output file; if
//! still empty, read the most recent server log file modified within the
//! retry window (§4.1 step 6).

use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

/// Resolves the most informative available description of why a
/// freshly-spawned server process failed to become ready.
pub struct ProcessOutputCapture<'a> {
    pub stderr: &'a str,
    pub server_output_path: Option<&'a Path>,
    pub server_log_dir: Option<&'a Path>,
    pub retry_window: Duration,
}

impl<'a> ProcessOutputCapture<'a> {
    /// Walks the three fallback layers in order, returning the first
    /// non-empty description found.
    pub fn diagnose(&self) -> Option<String> {
        let trimmed = self.stderr.trim();
        if !trimmed.is_empty() {
            return Some(trimmed.to_string());
        }

        if let Some(path) = self.server_output_path {
            if let Some(contents) = read_nonempty(path) {
                return Some(contents);
            }
        }

        if let Some(dir) = self.server_log_dir {
            if let Some(contents) = self.read_most_recent_log(dir) {
                return Some(contents);
            }
        }

        None
    }

    fn read_most_recent_log(&self, dir: &Path) -> Option<String> {
        let now = SystemTime::now();
        let entries = fs::read_dir(dir).ok()?;

        let mut newest: Option<(SystemTime, std::path::PathBuf)> = None;
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            let Ok(modified) = metadata.modified() else {
                continue;
            };
            let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
            if age > self.retry_window {
                continue;
            }
            let is_newer = match &newest {
                Some((best, _)) => modified > *best,
                None => true,
            };
            if is_newer {
                newest = Some((modified, path));
            }
        }

        newest.and_then(|(_, path)| read_nonempty(&path))
    }
}

fn read_nonempty(path: &Path) -> Option<String> {
    let contents = fs::read_to_string(path).ok()?;
    let trimmed = contents.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
#[path = "process_output_tests.rs"]
mod tests;
