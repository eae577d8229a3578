//! Tests for the duplicate guard's check ordering

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use foreman_recurrence::core::guard::{Candidate, DuplicateGuard, GuardVerdict};
use foreman_recurrence::core::instance::{
    recurrence_key, CreatedFrom, InstanceStatus, TemplateSnapshot, WorkInstance,
};
use foreman_recurrence::core::rule::RuleConstraints;
use foreman_recurrence::infra::store::memory::InMemoryInstanceStore;
use foreman_recurrence::infra::store::InstanceStore;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 10, 9, 0, 0).unwrap()
}

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
}

fn candidate(day: u32) -> Candidate<'static> {
    Candidate {
        rule_id: "r1",
        target_id: "pump-7",
        template_id: "tmpl-1",
        date: date(day),
    }
}

fn stored_instance(day: u32, status: InstanceStatus, created_at: DateTime<Utc>) -> WorkInstance {
    WorkInstance {
        id: format!("wi-{day}"),
        schedule_rule_id: "r1".into(),
        target_id: "pump-7".into(),
        template: TemplateSnapshot {
            template_id: "tmpl-1".into(),
            version: 1,
            content: serde_json::json!({}),
        },
        scheduled_date: date(day),
        due_date: date(day),
        assigned_to: None,
        recurrence_key: recurrence_key("r1", "pump-7", "tmpl-1", date(day)),
        status,
        created_from: CreatedFrom::Schedule,
        history: Vec::new(),
        created_at,
    }
}

fn constraints(max_open: u32, window_hours: u32) -> RuleConstraints {
    RuleConstraints {
        max_open_per_target: max_open,
        duplicate_window_hours: window_hours,
    }
}

#[tokio::test]
async fn test_unique_on_empty_store() {
    let store = Arc::new(InMemoryInstanceStore::new());
    let guard = DuplicateGuard::new(store);
    let verdict = guard
        .assess(&candidate(10), &constraints(1, 0), now())
        .await
        .unwrap();
    assert_eq!(verdict, GuardVerdict::Unique);
}

#[tokio::test]
async fn test_exact_key_is_duplicate() {
    let store = Arc::new(InMemoryInstanceStore::new());
    store
        .create(stored_instance(10, InstanceStatus::Draft, now()))
        .await
        .unwrap();
    let guard = DuplicateGuard::new(store);
    let verdict = guard
        .assess(&candidate(10), &constraints(5, 0), now())
        .await
        .unwrap();
    assert_eq!(verdict, GuardVerdict::Duplicate);
}

#[tokio::test]
async fn test_open_limit_reports_capacity() {
    let store = Arc::new(InMemoryInstanceStore::new());
    store
        .create(stored_instance(10, InstanceStatus::Open, now()))
        .await
        .unwrap();
    let guard = DuplicateGuard::new(store);
    // Different date, same triple, limit of one open instance.
    let verdict = guard
        .assess(&candidate(12), &constraints(1, 0), now())
        .await
        .unwrap();
    assert_eq!(verdict, GuardVerdict::CapacityExceeded);
}

#[tokio::test]
async fn test_exact_repeat_beats_capacity() {
    let store = Arc::new(InMemoryInstanceStore::new());
    store
        .create(stored_instance(10, InstanceStatus::Open, now()))
        .await
        .unwrap();
    let guard = DuplicateGuard::new(store);
    // Both conditions hold; the key check must win.
    let verdict = guard
        .assess(&candidate(10), &constraints(1, 0), now())
        .await
        .unwrap();
    assert_eq!(verdict, GuardVerdict::Duplicate);
}

#[tokio::test]
async fn test_closed_instances_free_capacity() {
    let store = Arc::new(InMemoryInstanceStore::new());
    store
        .create(stored_instance(10, InstanceStatus::Completed, now() - Duration::days(40)))
        .await
        .unwrap();
    let guard = DuplicateGuard::new(store);
    let verdict = guard
        .assess(&candidate(12), &constraints(1, 0), now())
        .await
        .unwrap();
    assert_eq!(verdict, GuardVerdict::Unique);
}

#[tokio::test]
async fn test_recent_creation_inside_window_is_duplicate() {
    let store = Arc::new(InMemoryInstanceStore::new());
    // Completed an hour ago, so capacity is free, but the creation falls
    // inside the 24h dedup window.
    store
        .create(stored_instance(10, InstanceStatus::Completed, now() - Duration::hours(1)))
        .await
        .unwrap();
    let guard = DuplicateGuard::new(store);
    let verdict = guard
        .assess(&candidate(12), &constraints(5, 24), now())
        .await
        .unwrap();
    assert_eq!(verdict, GuardVerdict::Duplicate);
}

#[tokio::test]
async fn test_old_creation_outside_window_is_unique() {
    let store = Arc::new(InMemoryInstanceStore::new());
    store
        .create(stored_instance(10, InstanceStatus::Completed, now() - Duration::hours(48)))
        .await
        .unwrap();
    let guard = DuplicateGuard::new(store);
    let verdict = guard
        .assess(&candidate(12), &constraints(5, 24), now())
        .await
        .unwrap();
    assert_eq!(verdict, GuardVerdict::Unique);
}
