//! Tests for configuration validation

use foreman_recurrence::config::{EngineConfig, EventBackendConfig, InstanceBackendConfig};

#[test]
fn test_default_config_is_valid() {
    let cfg = EngineConfig::default();
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.ahead_days, 14);
}

#[test]
fn test_zero_ahead_days_rejected() {
    let cfg = EngineConfig {
        ahead_days: 0,
        ..EngineConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_oversized_ahead_days_rejected() {
    let cfg = EngineConfig {
        ahead_days: 400,
        ..EngineConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_zero_audit_buffer_rejected() {
    let cfg = EngineConfig {
        audit_buffer: 0,
        ..EngineConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_from_json_str() {
    let cfg = EngineConfig::from_json_str(
        r#"{
            "ahead_days": 30,
            "default_assignee": "dispatch",
            "instance_backend": "postgres",
            "event_backend": "in_memory",
            "audit_buffer": 256
        }"#,
    )
    .unwrap();
    assert_eq!(cfg.ahead_days, 30);
    assert_eq!(cfg.default_assignee.as_deref(), Some("dispatch"));
    assert!(matches!(cfg.instance_backend, InstanceBackendConfig::Postgres));
    assert!(matches!(cfg.event_backend, EventBackendConfig::InMemory));
}

#[test]
fn test_from_json_str_rejects_invalid_values() {
    let result = EngineConfig::from_json_str(
        r#"{
            "ahead_days": 0,
            "instance_backend": "in_memory",
            "event_backend": "in_memory",
            "audit_buffer": 256
        }"#,
    );
    assert!(result.is_err());
}

#[test]
fn test_from_json_str_rejects_garbage() {
    assert!(EngineConfig::from_json_str("not json").is_err());
}
