// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn preparer_error_codes_are_stable() {
    assert_eq!(PreparerError::ConnectExisting("x".into()).code(), "CONNECT_EXISTING");
    assert_eq!(PreparerError::StartServer("x".into()).code(), "START_SERVER");
    assert_eq!(PreparerError::InitializeServer.code(), "INITIALIZE_SERVER");
    assert_eq!(PreparerError::OlcServerAbnormalExit.code(), "OLC_SERVER_ABNORMAL_EXIT");
    assert_eq!(PreparerError::ConnectNew.code(), "CONNECT_NEW");
    assert_eq!(
        PreparerError::CannotKillExisting {
            unfinished_sessions: 1,
            alive_clients: 2,
        }
        .code(),
        "CANNOT_KILL_EXISTING"
    );
    assert_eq!(PreparerError::StillRunning.code(), "STILL_RUNNING");
    assert_eq!(PreparerError::DiagnosticError("x".into()).code(), "DIAGNOSTIC_ERROR");
}

#[test]
fn cannot_kill_existing_reports_counts_in_its_message() {
    let err = PreparerError::CannotKillExisting {
        unfinished_sessions: 3,
        alive_clients: 2,
    };
    let message = err.to_string();
    assert!(message.contains('3'));
    assert!(message.contains('2'));
}

#[test]
fn job_error_id_as_str_round_trips_through_display() {
    for id in [
        JobErrorId::ClientJrJobExpired,
        JobErrorId::ClientJrJobExecInterrupted,
        JobErrorId::ClientJrJobHasInfraErrorTest,
        JobErrorId::ClientJrJobHasErrorTest,
        JobErrorId::ClientJrJobHasFailTest,
        JobErrorId::ClientJrJobHasAllocErrorTest,
        JobErrorId::ClientJrJobHasAllocFailTest,
        JobErrorId::ClientJrJobStartWithoutTest,
        JobErrorId::ClientJrAllocUserConfigError,
        JobErrorId::ClientJrAllocUnknownError,
        JobErrorId::ClientJrAllocInfraError,
    ] {
        assert_eq!(id.to_string(), id.as_str());
    }
}

#[test]
fn job_error_id_codes_are_shouty_snake_case() {
    assert_eq!(JobErrorId::ClientJrJobExpired.as_str(), "CLIENT_JR_JOB_EXPIRED");
    assert_eq!(
        JobErrorId::ClientJrAllocUserConfigError.as_str(),
        "CLIENT_JR_ALLOC_USER_CONFIG_ERROR"
    );
}

#[test]
fn job_error_id_serializes_by_variant_name() {
    let json = serde_json::to_string(&JobErrorId::ClientJrJobHasFailTest).unwrap();
    assert_eq!(json, "\"ClientJrJobHasFailTest\"");
}
