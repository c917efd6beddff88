// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn fired_removes_only_expired_timers() {
    let mut scheduler = Scheduler::new();
    let t0 = Instant::now();
    scheduler.set_timer("a", Duration::from_secs(10), t0);
    scheduler.set_timer("b", Duration::from_secs(30), t0);

    let fired = scheduler.fired(t0 + Duration::from_secs(15));
    assert_eq!(fired, vec!["a".to_string()]);
    assert!(!scheduler.is_armed("a"));
    assert!(scheduler.is_armed("b"));
}

#[test]
fn cancel_timer_removes_it_before_it_fires() {
    let mut scheduler = Scheduler::new();
    let t0 = Instant::now();
    scheduler.set_timer("a", Duration::from_secs(10), t0);
    scheduler.cancel_timer("a");
    assert!(scheduler.fired(t0 + Duration::from_secs(20)).is_empty());
}

#[test]
fn next_deadline_is_the_earliest_armed_timer() {
    let mut scheduler = Scheduler::new();
    let t0 = Instant::now();
    scheduler.set_timer("a", Duration::from_secs(30), t0);
    scheduler.set_timer("b", Duration::from_secs(10), t0);
    assert_eq!(scheduler.next_deadline(), Some(t0 + Duration::from_secs(10)));
}
