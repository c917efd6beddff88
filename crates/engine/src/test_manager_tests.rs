// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

struct ImmediateRunner(TestResult);

#[async_trait]
impl DirectTestRunner for ImmediateRunner {
    async fn run(&self, _setting: DirectTestRunnerSetting) -> TestResult {
        self.0
    }

    async fn cancel(&self) {}
}

fn setting(id: &str) -> DirectTestRunnerSetting {
    DirectTestRunnerSetting {
        test_id: TestLocatorId::from(id),
        allocation: Allocation {
            sub_devices: vec![],
        },
        test_plan: "cts".into(),
    }
}

#[tokio::test]
async fn start_tracks_the_test_as_running_until_drained() {
    let manager = TestManager::new();
    let runner = Arc::new(ImmediateRunner(TestResult::Pass));
    manager.start(runner, setting("t1")).unwrap();

    assert!(manager.is_any_test_running());
    tokio::task::yield_now().await;
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;

    let finished = manager.drain_finished().await;
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].0, TestLocatorId::from("t1"));
    assert_eq!(finished[0].1, TestResult::Pass);
    assert!(!manager.is_any_test_running());
}

#[tokio::test]
async fn drain_finished_leaves_in_flight_tests_untouched() {
    let manager = TestManager::new();
    assert!(manager.drain_finished().await.is_empty());
    assert_eq!(manager.running_count(), 0);
}

#[tokio::test]
async fn remove_forgets_a_test_without_awaiting_it() {
    let manager = TestManager::new();
    let runner = Arc::new(ImmediateRunner(TestResult::Pass));
    manager.start(runner, setting("t1")).unwrap();
    manager.remove(&TestLocatorId::from("t1"));
    assert!(!manager.is_any_test_running());
}

struct CancelRecordingRunner {
    result: TestResult,
    cancelled: Arc<Mutex<bool>>,
}

#[async_trait]
impl DirectTestRunner for CancelRecordingRunner {
    async fn run(&self, _setting: DirectTestRunnerSetting) -> TestResult {
        std::future::pending::<()>().await;
        self.result
    }

    async fn cancel(&self) {
        *self.cancelled.lock() = true;
    }
}

#[tokio::test]
async fn cancel_all_requests_cancellation_on_every_in_flight_runner() {
    let manager = TestManager::new();
    let cancelled = Arc::new(Mutex::new(false));
    let runner = Arc::new(CancelRecordingRunner {
        result: TestResult::Abort,
        cancelled: cancelled.clone(),
    });
    manager.start(runner, setting("t1")).unwrap();

    manager.cancel_all().await;

    assert!(*cancelled.lock());
}
