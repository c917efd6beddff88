// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn test_locator() -> TestLocator {
    TestLocator {
        id: TestLocatorId::from("test-1"),
        name: "android.test.SomeTest#method".into(),
    }
}

#[parameterized(
    new_to_assigned = { TestStatus::New, TestStatus::Assigned, true },
    new_to_suspended = { TestStatus::New, TestStatus::Suspended, true },
    new_to_done = { TestStatus::New, TestStatus::Done, true },
    assigned_to_running = { TestStatus::Assigned, TestStatus::Running, true },
    assigned_to_done = { TestStatus::Assigned, TestStatus::Done, true },
    suspended_to_done = { TestStatus::Suspended, TestStatus::Done, true },
    running_to_done = { TestStatus::Running, TestStatus::Done, true },
    new_to_running_rejected = { TestStatus::New, TestStatus::Running, false },
    done_to_new_rejected = { TestStatus::Done, TestStatus::New, false },
    running_to_assigned_rejected = { TestStatus::Running, TestStatus::Assigned, false },
)]
fn status_transitions(from: TestStatus, to: TestStatus, allowed: bool) {
    assert_eq!(from.can_advance_to(to), allowed);
}

#[test]
fn advance_status_applies_allowed_transition() {
    let mut test = Test::new(test_locator(), JobLocatorId::from("job-1"));
    assert!(test.advance_status(TestStatus::Assigned));
    assert_eq!(test.status, TestStatus::Assigned);
}

#[test]
fn advance_status_rejects_illegal_transition_without_panicking() {
    let mut test = Test::new(test_locator(), JobLocatorId::from("job-1"));
    assert!(!test.advance_status(TestStatus::Running));
    assert_eq!(test.status, TestStatus::New);
}

#[test]
fn result_is_write_once() {
    let mut test = Test::new(test_locator(), JobLocatorId::from("job-1"));
    assert!(test.try_set_result(TestResult::Pass));
    assert_eq!(test.result, TestResult::Pass);
    assert!(!test.try_set_result(TestResult::Fail));
    assert_eq!(test.result, TestResult::Pass);
}

fn job_with_tests(tests: Vec<Test>) -> Job {
    Job {
        locator: JobLocator {
            id: JobLocatorId::from("job-1"),
            name: "cts-run".into(),
        },
        dimensions: BTreeMap::new(),
        parameters: BTreeMap::new(),
        timing: JobTiming {
            start_epoch_ms: 0,
            end_epoch_ms: None,
            start_timeout: Duration::from_secs(120),
            job_timeout: Duration::from_secs(3600),
        },
        result: JobResult::Unknown,
        warnings: Vec::new(),
        properties: BTreeMap::new(),
        tagged_files: BTreeMap::new(),
        tests,
    }
}

#[test]
fn job_result_is_write_once() {
    let mut job = job_with_tests(Vec::new());
    assert!(job.try_set_result(JobResult::Pass));
    assert!(!job.try_set_result(JobResult::Error(JobErrorId::ClientJrJobHasErrorTest)));
    assert_eq!(job.result, JobResult::Pass);
}

#[test]
fn all_tests_done_is_false_until_every_test_is_done() {
    let mut t1 = Test::new(test_locator(), JobLocatorId::from("job-1"));
    let mut t2 = Test::new(
        TestLocator {
            id: TestLocatorId::from("test-2"),
            name: "other".into(),
        },
        JobLocatorId::from("job-1"),
    );
    t1.advance_status(TestStatus::Done);
    let job = job_with_tests(vec![t1.clone(), t2.clone()]);
    assert!(!job.all_tests_done());

    t2.advance_status(TestStatus::Done);
    let job = job_with_tests(vec![t1, t2]);
    assert!(job.all_tests_done());
}

#[test]
fn abort_new_tests_only_touches_new_tests() {
    let mut running = Test::new(test_locator(), JobLocatorId::from("job-1"));
    running.advance_status(TestStatus::Assigned);
    running.advance_status(TestStatus::Running);

    let fresh = Test::new(
        TestLocator {
            id: TestLocatorId::from("test-2"),
            name: "other".into(),
        },
        JobLocatorId::from("job-1"),
    );

    let mut job = job_with_tests(vec![running, fresh]);
    job.abort_new_tests();

    assert_eq!(job.tests[0].status, TestStatus::Running);
    assert_eq!(job.tests[0].result, TestResult::Unknown);
    assert_eq!(job.tests[1].status, TestStatus::Done);
    assert_eq!(job.tests[1].result, TestResult::Abort);
}

#[test]
fn expire_epoch_ms_adds_start_timeout_to_start() {
    let timing = JobTiming {
        start_epoch_ms: 1_000,
        end_epoch_ms: None,
        start_timeout: Duration::from_millis(500),
        job_timeout: Duration::from_secs(60),
    };
    assert_eq!(timing.expire_epoch_ms(), 1_500);
}
