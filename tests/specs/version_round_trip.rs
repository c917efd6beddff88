// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! §8 round-trip law: two `GetVersionResponse`s differing only by
//! `process_id` compare equal once that field is cleared, and differ
//! otherwise.

use ats_core::version::GetVersionResponse;

#[test]
fn same_version_different_process_id_are_version_equal() {
    let a = GetVersionResponse::new("1.0.0", 111);
    let b = GetVersionResponse::new("1.0.0", 222);
    assert!(a.version_eq(&b));
}

#[test]
fn different_version_strings_are_not_version_equal() {
    let a = GetVersionResponse::new("1.0.0", 111);
    let b = GetVersionResponse::new("1.0.1", 111);
    assert!(!a.version_eq(&b));
}

#[test]
fn clear_process_id_zeroes_the_field_without_touching_version_info() {
    let v = GetVersionResponse::new("1.0.0", 4242);
    let cleared = v.clear_process_id();
    assert_eq!(cleared.process_id, 0);
    assert_eq!(cleared.version_info, "1.0.0");
}
