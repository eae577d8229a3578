//! Tests for error types

use foreman_recurrence::core::error::EngineError;

#[test]
fn test_validation_error() {
    let err = EngineError::Validation("multiplier must be at least 1".to_string());
    assert_eq!(format!("{}", err), "invalid rule: multiplier must be at least 1");
    assert!(!err.is_retryable());
}

#[test]
fn test_resolution_error_is_retryable() {
    let err = EngineError::Resolution("directory unavailable".to_string());
    assert_eq!(format!("{}", err), "scope resolution failed: directory unavailable");
    assert!(err.is_retryable());
}

#[test]
fn test_persistence_error_is_retryable() {
    let err = EngineError::Persistence("write refused".to_string());
    assert_eq!(format!("{}", err), "persistence failure: write refused");
    assert!(err.is_retryable());
}

#[test]
fn test_conflict_error() {
    let err = EngineError::Conflict("r1:pump-7:tmpl-1:2025-06-02".to_string());
    assert_eq!(
        format!("{}", err),
        "recurrence key already materialized: r1:pump-7:tmpl-1:2025-06-02"
    );
    assert!(!err.is_retryable());
}

#[test]
fn test_backend_error() {
    let err = EngineError::Backend("connection failed".to_string());
    assert_eq!(format!("{}", err), "backend error: connection failed");
    assert!(!err.is_retryable());
}
