//! Generation audit sink implementations.
//!
//! Provides in-memory logging and Postgres schema definitions for audit persistence.

use std::collections::VecDeque;

use crate::util::clock::now_ms;

/// What a generation pass did for one rule/target pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    /// An instance was materialized.
    Generate,
    /// Candidate skipped as a duplicate.
    Duplicate,
    /// Candidate skipped at the open-instance limit.
    Capacity,
    /// Pair processing failed.
    Error,
    /// A trigger event was consumed.
    EventProcessed,
    /// A rolling follow-up was materialized.
    FollowUp,
}

impl AuditAction {
    /// Stable string form stored in the audit log.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Generate => "generate",
            Self::Duplicate => "duplicate",
            Self::Capacity => "capacity",
            Self::Error => "error",
            Self::EventProcessed => "event_processed",
            Self::FollowUp => "follow_up",
        }
    }
}

/// Audit event structure.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    /// Event identifier.
    pub event_id: String,
    /// Rule the action belongs to.
    pub rule_id: String,
    /// Target the action concerned, when any.
    pub target_id: Option<String>,
    /// Action taken.
    pub action: AuditAction,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
    /// Additional context.
    pub detail: Option<String>,
}

/// Audit sink abstraction.
pub trait GenerationAuditSink: Send {
    /// Record an audit event.
    fn record(&mut self, event: AuditEvent);
}

/// In-memory audit sink for testing and dev.
pub struct InMemoryAuditSink {
    events: VecDeque<AuditEvent>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a new in-memory sink with a bounded buffer.
    pub fn new(max_events: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_events),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.iter().cloned().collect()
    }
}

impl GenerationAuditSink for InMemoryAuditSink {
    fn record(&mut self, event: AuditEvent) {
        if self.events.len() >= self.max_events {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

/// Postgres-backed audit sink (schema-only; DB I/O not wired).
pub struct PostgresAuditSink;

impl PostgresAuditSink {
    /// Returns SQL migration statements for the audit log.
    pub fn migrations() -> &'static [&'static str] {
        &[
            r#"
CREATE TABLE IF NOT EXISTS fr_audit_events (
    event_id TEXT PRIMARY KEY,
    rule_id TEXT NOT NULL,
    target_id TEXT,
    action TEXT NOT NULL,
    detail TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS idx_fr_audit_events_rule_created ON fr_audit_events (rule_id, created_at);
CREATE INDEX IF NOT EXISTS idx_fr_audit_events_action ON fr_audit_events (action);
"#,
        ]
    }
}

impl GenerationAuditSink for PostgresAuditSink {
    fn record(&mut self, _event: AuditEvent) {
        // Stub: actual DB writes require a runtime + client; left to integration layer.
    }
}

/// Helper to build an audit event from context.
pub fn build_audit_event(
    event_id: impl Into<String>,
    rule_id: impl Into<String>,
    target_id: Option<String>,
    action: AuditAction,
    detail: Option<String>,
) -> AuditEvent {
    AuditEvent {
        event_id: event_id.into(),
        rule_id: rule_id.into(),
        target_id,
        action,
        created_at_ms: now_ms(),
        detail,
    }
}
