//! Tests for audit sink

use foreman_recurrence::core::audit::{
    build_audit_event, AuditAction, GenerationAuditSink, InMemoryAuditSink, PostgresAuditSink,
};

#[test]
fn test_build_audit_event() {
    let event = build_audit_event(
        "r1-generate-1",
        "r1",
        Some("pump-7".to_string()),
        AuditAction::Generate,
        None,
    );
    assert_eq!(event.event_id, "r1-generate-1");
    assert_eq!(event.rule_id, "r1");
    assert_eq!(event.target_id.as_deref(), Some("pump-7"));
    assert_eq!(event.action, AuditAction::Generate);
    assert!(event.created_at_ms > 0);
}

#[test]
fn test_in_memory_sink_bounds_buffer() {
    let mut sink = InMemoryAuditSink::new(2);
    for i in 0..4 {
        sink.record(build_audit_event(
            format!("evt-{i}"),
            "r1",
            None,
            AuditAction::Duplicate,
            None,
        ));
    }
    let events = sink.events();
    assert_eq!(events.len(), 2);
    // Oldest events were evicted.
    assert_eq!(events[0].event_id, "evt-2");
    assert_eq!(events[1].event_id, "evt-3");
}

#[test]
fn test_action_names_are_stable() {
    assert_eq!(AuditAction::Generate.as_str(), "generate");
    assert_eq!(AuditAction::Duplicate.as_str(), "duplicate");
    assert_eq!(AuditAction::Capacity.as_str(), "capacity");
    assert_eq!(AuditAction::Error.as_str(), "error");
    assert_eq!(AuditAction::EventProcessed.as_str(), "event_processed");
    assert_eq!(AuditAction::FollowUp.as_str(), "follow_up");
}

#[test]
fn test_postgres_migrations_define_audit_table() {
    let migrations = PostgresAuditSink::migrations();
    assert_eq!(migrations.len(), 1);
    assert!(migrations[0].contains("fr_audit_events"));
    assert!(migrations[0].contains("rule_id"));
}
