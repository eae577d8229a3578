//! Builds a scheduler engine from validated configuration.

use std::sync::Arc;

use crate::config::{EngineConfig, EventBackendConfig, InstanceBackendConfig};
use crate::core::audit::InMemoryAuditSink;
use crate::core::engine::SchedulerEngine;
use crate::core::error::EngineError;
use crate::infra::store::memory::{InMemoryEventQueue, InMemoryInstanceStore};
use crate::infra::store::postgres::{PostgresEventQueue, PostgresInstanceStore};
use crate::infra::store::{
    AssignmentDirectory, EventQueue, InstanceStore, RuleStore, TargetDirectory, TemplateStore,
};

/// Build an engine from configuration and host-supplied directories.
///
/// The engine-owned backends (instance store, event queue) are selected by
/// the config; the directories (rules, templates, targets, assignments) are
/// external systems the host injects.
pub fn build_engine(
    cfg: &EngineConfig,
    rules: Arc<dyn RuleStore>,
    templates: Arc<dyn TemplateStore>,
    targets: Arc<dyn TargetDirectory>,
    assignments: Arc<dyn AssignmentDirectory>,
) -> Result<SchedulerEngine, EngineError> {
    cfg.validate()
        .map_err(|e| EngineError::Validation(format!("config invalid: {e}")))?;

    let instances: Arc<dyn InstanceStore> = match cfg.instance_backend {
        InstanceBackendConfig::InMemory => Arc::new(InMemoryInstanceStore::new()),
        InstanceBackendConfig::Postgres => Arc::new(PostgresInstanceStore),
    };
    let events: Arc<dyn EventQueue> = match cfg.event_backend {
        EventBackendConfig::InMemory => Arc::new(InMemoryEventQueue::new()),
        EventBackendConfig::Postgres => Arc::new(PostgresEventQueue),
    };

    let engine = SchedulerEngine::new(
        cfg.clone(),
        rules,
        templates,
        targets,
        instances,
        events,
        assignments,
    )
    .with_audit(Box::new(InMemoryAuditSink::new(cfg.audit_buffer)));
    Ok(engine)
}
