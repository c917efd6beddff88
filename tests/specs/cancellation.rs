// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! §8 end-to-end scenario: a cancellation requested before a test has
//! started is retained and delivered the instant that test starts;
//! a cancellation requested after the test is already running is
//! delivered immediately.

use ats_core::ids::TestLocatorId;
use ats_core::session::AtsSessionPluginOutput;
use ats_core::UuidIdGen;
use ats_engine::AtsSessionPlugin;
use std::sync::Arc;

fn plugin() -> AtsSessionPlugin {
    AtsSessionPlugin::new(Arc::new(UuidIdGen))
}

#[test]
fn cancellation_before_start_is_retained_and_delivered_on_starting() {
    let plugin = plugin();
    let test_id = TestLocatorId::from("t1");

    plugin.request_cancellation(test_id.clone());
    assert!(!plugin.is_cancelled(&test_id), "not cancelled until the test starts");

    let delivered = plugin.on_test_starting(test_id.clone(), Vec::new(), "cts".into(), 0, true);
    assert!(delivered, "on_test_starting must report the pending cancellation");
    assert!(plugin.is_cancelled(&test_id));
}

#[test]
fn cancellation_after_start_is_delivered_immediately() {
    let plugin = plugin();
    let test_id = TestLocatorId::from("t2");

    let delivered_at_start =
        plugin.on_test_starting(test_id.clone(), Vec::new(), "cts".into(), 0, true);
    assert!(!delivered_at_start, "no cancellation was pending yet");

    plugin.request_cancellation(test_id.clone());
    assert!(plugin.is_cancelled(&test_id));
}

#[test]
fn unrelated_test_is_not_affected_by_another_tests_cancellation() {
    let plugin = plugin();
    let cancelled_id = TestLocatorId::from("t3");
    let other_id = TestLocatorId::from("t4");

    plugin.request_cancellation(cancelled_id.clone());
    plugin.on_test_starting(other_id.clone(), Vec::new(), "cts".into(), 0, true);

    assert!(!plugin.is_cancelled(&other_id));
    assert!(!plugin.is_cancelled(&cancelled_id), "still pending, not yet started");
}

#[test]
fn ending_a_test_clears_its_running_invocation_and_accrues_duration() {
    let plugin = plugin();
    let test_id = TestLocatorId::from("t5");
    plugin.on_test_starting(test_id.clone(), Vec::new(), "cts".into(), 1_000, false);

    plugin.on_test_ended(&test_id, 500);

    let AtsSessionPluginOutput::RunCommandState(state) = plugin.output() else {
        panic!("expected RunCommandState output");
    };
    assert!(!state.running_invocation.contains_key(&test_id));
    assert_eq!(state.total_execution_time_ms, 500);
}
