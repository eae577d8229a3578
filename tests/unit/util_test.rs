//! Tests for utility functions

use foreman_recurrence::util::{new_instance_id, now_ms, now_utc};

#[test]
fn test_now_ms_is_nonzero() {
    assert!(now_ms() > 0);
}

#[test]
fn test_now_utc_matches_now_ms_scale() {
    let utc_ms = u128::try_from(now_utc().timestamp_millis()).unwrap();
    let ms = now_ms();
    // Both clocks read the same wall time, within a generous margin.
    assert!(ms.abs_diff(utc_ms) < 5_000);
}

#[test]
fn test_instance_ids_are_unique() {
    let a = new_instance_id();
    let b = new_instance_id();
    assert_ne!(a, b);
    // UUID v4 textual form.
    assert_eq!(a.len(), 36);
}
