// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! §8 end-to-end scenario: `KillServer` refuses while a session is still
//! running, reporting it in the failure's unfinished-sessions table; once
//! the session finishes, a second `KillServer` succeeds.

use crate::prelude::{sample_run_command, state_with_one_device};
use ats_core::ids::ClientId;
use ats_core::session::{AtsSessionPluginConfig, SessionStatus};
use ats_daemon::protocol::{Request, Response};
use std::time::Duration;

#[tokio::test]
async fn kill_server_refuses_while_a_session_is_unfinished() {
    let state = state_with_one_device();
    let response = state
        .handle_request(Request::SubmitSession {
            client_id: ClientId::from("client-1"),
            config: AtsSessionPluginConfig::RunCommand(sample_run_command("cts")),
        })
        .await;
    let Response::SubmitSession { session_id } = response else {
        panic!("expected SubmitSession response");
    };

    let response = state
        .handle_request(Request::KillServer {
            client_id: ClientId::from("requester"),
        })
        .await;
    match response {
        Response::KillServerFailure(failure) => {
            assert!(failure
                .unfinished_sessions
                .iter()
                .any(|entry| entry.session_id == session_id));
        }
        other => panic!("expected KillServerFailure, got {other:?}"),
    }
}

#[tokio::test]
async fn kill_server_succeeds_once_the_session_has_finished() {
    let state = state_with_one_device();
    let response = state
        .handle_request(Request::SubmitSession {
            client_id: ClientId::from("client-1"),
            config: AtsSessionPluginConfig::RunCommand(sample_run_command("cts")),
        })
        .await;
    let Response::SubmitSession { session_id } = response else {
        panic!("expected SubmitSession response");
    };

    for _ in 0..150 {
        let Response::AllSessions { sessions } = state
            .handle_request(Request::GetAllSessions {
                name_filter: None,
                status_filter: None,
            })
            .await
        else {
            panic!("expected AllSessions response");
        };
        if sessions
            .iter()
            .any(|s| s.session_id == session_id && s.status == SessionStatus::Finished)
        {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    let response = state
        .handle_request(Request::KillServer {
            client_id: ClientId::from("requester"),
        })
        .await;
    assert!(matches!(response, Response::KillServerSuccess { .. }));
}
