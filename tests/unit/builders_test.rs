//! Tests for builder modules

use std::sync::Arc;

use foreman_recurrence::builders::build_engine;
use foreman_recurrence::config::{EngineConfig, EventBackendConfig, InstanceBackendConfig};
use foreman_recurrence::core::error::EngineError;
use foreman_recurrence::infra::store::memory::{
    InMemoryAssignmentDirectory, InMemoryRuleStore, InMemoryTargetDirectory, InMemoryTemplateStore,
};

#[test]
fn test_build_engine_from_valid_config() {
    let cfg = EngineConfig::default();
    let engine = build_engine(
        &cfg,
        Arc::new(InMemoryRuleStore::new()),
        Arc::new(InMemoryTemplateStore::new()),
        Arc::new(InMemoryTargetDirectory::new()),
        Arc::new(InMemoryAssignmentDirectory::new()),
    );
    assert!(engine.is_ok());
}

#[test]
fn test_build_engine_with_postgres_backends() {
    let cfg = EngineConfig {
        instance_backend: InstanceBackendConfig::Postgres,
        event_backend: EventBackendConfig::Postgres,
        ..EngineConfig::default()
    };
    let engine = build_engine(
        &cfg,
        Arc::new(InMemoryRuleStore::new()),
        Arc::new(InMemoryTemplateStore::new()),
        Arc::new(InMemoryTargetDirectory::new()),
        Arc::new(InMemoryAssignmentDirectory::new()),
    );
    assert!(engine.is_ok());
}

#[test]
fn test_build_engine_rejects_invalid_config() {
    let cfg = EngineConfig {
        ahead_days: 0,
        ..EngineConfig::default()
    };
    let err = build_engine(
        &cfg,
        Arc::new(InMemoryRuleStore::new()),
        Arc::new(InMemoryTemplateStore::new()),
        Arc::new(InMemoryTargetDirectory::new()),
        Arc::new(InMemoryAssignmentDirectory::new()),
    )
    .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}
