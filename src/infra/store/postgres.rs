//! Postgres-backed store adapters (schema and interface stubs).
//!
//! The DDL is the contract: the unique index on `recurrence_key` is what
//! makes concurrent generation passes safe without cross-process locking.
//! Wiring to an actual client belongs to the integration layer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::core::error::EngineError;
use crate::core::event::TriggerEvent;
use crate::core::instance::WorkInstance;
use crate::infra::store::{EventQueue, InstanceStore};

/// Postgres instance-store adapter placeholder.
pub struct PostgresInstanceStore;

impl PostgresInstanceStore {
    /// Migration statements for the work-instance table.
    pub fn migrations() -> &'static [&'static str] {
        &[
            r#"
CREATE TABLE IF NOT EXISTS fr_work_instances (
    id TEXT PRIMARY KEY,
    schedule_rule_id TEXT NOT NULL,
    target_id TEXT NOT NULL,
    template_id TEXT NOT NULL,
    template_version INT NOT NULL,
    template_content JSONB NOT NULL,
    scheduled_date DATE NOT NULL,
    due_date DATE NOT NULL,
    assigned_to TEXT,
    recurrence_key TEXT NOT NULL,
    status TEXT NOT NULL,
    created_from TEXT NOT NULL,
    history JSONB NOT NULL DEFAULT '[]'::jsonb,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_fr_work_instances_recurrence_key
    ON fr_work_instances (recurrence_key);
CREATE INDEX IF NOT EXISTS idx_fr_work_instances_triple
    ON fr_work_instances (schedule_rule_id, target_id, template_id, created_at);
"#,
        ]
    }
}

#[async_trait]
impl InstanceStore for PostgresInstanceStore {
    async fn find_by_key(
        &self,
        _recurrence_key: &str,
    ) -> Result<Option<WorkInstance>, EngineError> {
        Err(EngineError::Backend(
            "postgres instance store not wired to database client".into(),
        ))
    }

    async fn query(
        &self,
        _rule_id: &str,
        _target_id: &str,
        _template_id: &str,
        _created_within: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<Vec<WorkInstance>, EngineError> {
        Err(EngineError::Backend(
            "postgres instance store not wired to database client".into(),
        ))
    }

    async fn create(&self, _instance: WorkInstance) -> Result<(), EngineError> {
        Err(EngineError::Backend(
            "postgres instance store not wired to database client".into(),
        ))
    }

    async fn update(&self, _instance: WorkInstance) -> Result<(), EngineError> {
        Err(EngineError::Backend(
            "postgres instance store not wired to database client".into(),
        ))
    }
}

/// Postgres event-queue adapter placeholder.
pub struct PostgresEventQueue;

impl PostgresEventQueue {
    /// Migration statements for the trigger-event table.
    pub fn migrations() -> &'static [&'static str] {
        &[
            r#"
CREATE TABLE IF NOT EXISTS fr_trigger_events (
    id TEXT PRIMARY KEY,
    event_type TEXT NOT NULL,
    target_id TEXT NOT NULL,
    occurred_at TIMESTAMPTZ NOT NULL,
    processed BOOLEAN NOT NULL DEFAULT FALSE
);
CREATE INDEX IF NOT EXISTS idx_fr_trigger_events_pending
    ON fr_trigger_events (event_type) WHERE NOT processed;
"#,
        ]
    }
}

#[async_trait]
impl EventQueue for PostgresEventQueue {
    async fn get_unprocessed(
        &self,
        _trigger_types: &[String],
    ) -> Result<Vec<TriggerEvent>, EngineError> {
        Err(EngineError::Backend(
            "postgres event queue not wired to database client".into(),
        ))
    }

    async fn mark_processed(&self, _event_id: &str) -> Result<(), EngineError> {
        Err(EngineError::Backend(
            "postgres event queue not wired to database client".into(),
        ))
    }
}
