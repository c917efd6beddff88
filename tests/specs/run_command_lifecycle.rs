// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! §8 end-to-end scenario: submit a `RunCommand` session against a fleet
//! with one available device and drive it through to a finished,
//! successful output.

use crate::prelude::{sample_run_command, state_with_one_device};
use ats_core::ids::ClientId;
use ats_core::session::{AtsSessionPluginConfig, AtsSessionPluginOutput, SessionStatus};
use ats_daemon::protocol::{Request, Response};
use std::time::Duration;

#[tokio::test]
async fn run_command_session_allocates_runs_and_finishes_successfully() {
    let state = state_with_one_device();

    let response = state
        .handle_request(Request::SubmitSession {
            client_id: ClientId::from("client-1"),
            config: AtsSessionPluginConfig::RunCommand(sample_run_command("cts")),
        })
        .await;
    let Response::SubmitSession { session_id } = response else {
        panic!("expected SubmitSession response, got {response:?}");
    };

    // The job runner's allocation loop polls on a real one-second cadence;
    // give it headroom to allocate, run the stub test, and drain the
    // result before giving up.
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
        let found = sessions
            .iter()
            .find(|s| s.session_id == session_id)
            .expect("submitted session is tracked");
        if found.status == SessionStatus::Finished {
            let Response::SessionOutput(output) = state
                .handle_request(Request::GetSessionOutput {
                    session_id: session_id.clone(),
                })
                .await
            else {
                panic!("expected SessionOutput response");
            };
            assert!(
                matches!(output, Some(AtsSessionPluginOutput::Success { .. })),
                "expected a successful output, got {output:?}"
            );
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("run command session never finished");
}

#[tokio::test]
async fn get_all_sessions_filters_by_status() {
    let state = state_with_one_device();
    state
        .handle_request(Request::SubmitSession {
            client_id: ClientId::from("client-1"),
            config: AtsSessionPluginConfig::RunCommand(sample_run_command("cts")),
        })
        .await;

    let Response::AllSessions { sessions } = state
        .handle_request(Request::GetAllSessions {
            name_filter: None,
            status_filter: Some(SessionStatus::Finished),
        })
        .await
    else {
        panic!("expected AllSessions response");
    };
    // The submitted session has not had time to finish yet, so filtering
    // on `Finished` immediately after submission must not surface it.
    assert!(sessions.is_empty());
}
