// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy (§7 Error Handling Design).
//!
//! [`PreparerError`] covers the eight user-discernible Server Preparer
//! failure kinds; [`JobErrorId`] covers the stable codes attached to
//! terminal job results by the Job Runner's finalization table (§4.3).

use thiserror::Error;

/// The eight user-discernible Server Preparer error kinds (§7).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PreparerError {
    #[error("failed to connect to existing server: {0}")]
    ConnectExisting(String),

    #[error("failed to start server process: {0}")]
    StartServer(String),

    #[error("server did not signal readiness within the startup window")]
    InitializeServer,

    #[error("server process exited abnormally during initialization")]
    OlcServerAbnormalExit,

    #[error("exhausted reconnect retries against the newly started server")]
    ConnectNew,

    #[error("server refused to die: {unfinished_sessions} unfinished session(s), {alive_clients} alive client(s)")]
    CannotKillExisting {
        unfinished_sessions: usize,
        alive_clients: usize,
    },

    #[error("server did not exit within the post-kill grace window")]
    StillRunning,

    #[error("allocation diagnosis failed: {0}")]
    DiagnosticError(String),
}

impl PreparerError {
    /// Stable error code, suitable for the preparer wrapper's exit status
    /// (§6 "Exit codes").
    pub fn code(&self) -> &'static str {
        match self {
            PreparerError::ConnectExisting(_) => "CONNECT_EXISTING",
            PreparerError::StartServer(_) => "START_SERVER",
            PreparerError::InitializeServer => "INITIALIZE_SERVER",
            PreparerError::OlcServerAbnormalExit => "OLC_SERVER_ABNORMAL_EXIT",
            PreparerError::ConnectNew => "CONNECT_NEW",
            PreparerError::CannotKillExisting { .. } => "CANNOT_KILL_EXISTING",
            PreparerError::StillRunning => "STILL_RUNNING",
            PreparerError::DiagnosticError(_) => "DIAGNOSTIC_ERROR",
        }
    }
}

/// Stable error codes attached to terminal job results by the Job Runner's
/// finalization table (§4.3 post-run finalization, §8 boundary behaviors).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum JobErrorId {
    /// Job start timed out waiting for the first allocation.
    ClientJrJobExpired,
    /// Interrupted while the job runner task was suspended.
    ClientJrJobExecInterrupted,
    /// At least one test finished non-UNKNOWN/ERROR/TIMEOUT and the
    /// classified job error is infra-typed.
    ClientJrJobHasInfraErrorTest,
    /// At least one test finished ERROR/TIMEOUT/UNKNOWN.
    ClientJrJobHasErrorTest,
    /// At least one test FAILed.
    ClientJrJobHasFailTest,
    /// Allocation-error classification dominant among not-started tests.
    ClientJrJobHasAllocErrorTest,
    /// Allocation-fail classification dominant, or a suspended test exists.
    ClientJrJobHasAllocFailTest,
    /// `testCount == 0` at finalization.
    ClientJrJobStartWithoutTest,
    /// Allocation diagnosis classified the stall as a user configuration
    /// error (bad filters, unsatisfiable device requirements).
    ClientJrAllocUserConfigError,
    /// Allocation diagnosis could not attribute the stall to user error or
    /// known infrastructure failure.
    ClientJrAllocUnknownError,
    /// Allocation diagnosis attributed the stall to the fleet/infra layer.
    ClientJrAllocInfraError,
}

impl JobErrorId {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobErrorId::ClientJrJobExpired => "CLIENT_JR_JOB_EXPIRED",
            JobErrorId::ClientJrJobExecInterrupted => "CLIENT_JR_JOB_EXEC_INTERRUPTED",
            JobErrorId::ClientJrJobHasInfraErrorTest => "CLIENT_JR_JOB_HAS_INFRA_ERROR_TEST",
            JobErrorId::ClientJrJobHasErrorTest => "CLIENT_JR_JOB_HAS_ERROR_TEST",
            JobErrorId::ClientJrJobHasFailTest => "CLIENT_JR_JOB_HAS_FAIL_TEST",
            JobErrorId::ClientJrJobHasAllocErrorTest => "CLIENT_JR_JOB_HAS_ALLOC_ERROR_TEST",
            JobErrorId::ClientJrJobHasAllocFailTest => "CLIENT_JR_JOB_HAS_ALLOC_FAIL_TEST",
            JobErrorId::ClientJrJobStartWithoutTest => "CLIENT_JR_JOB_START_WITHOUT_TEST",
            JobErrorId::ClientJrAllocUserConfigError => "CLIENT_JR_ALLOC_USER_CONFIG_ERROR",
            JobErrorId::ClientJrAllocUnknownError => "CLIENT_JR_ALLOC_UNKNOWN_ERROR",
            JobErrorId::ClientJrAllocInfraError => "CLIENT_JR_ALLOC_INFRA_ERROR",
        }
    }
}

impl std::fmt::Display for JobErrorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
