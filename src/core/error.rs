//! Error types for generation operations.

use thiserror::Error;

/// Errors produced by engine components.
///
/// Duplicate and capacity skips are expected generation outcomes, not
/// errors; they are reported through [`crate::core::guard::GuardVerdict`]
/// and counted in the tick report instead of appearing here.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Rule or pattern is malformed; rejected at rule-save time.
    #[error("invalid rule: {0}")]
    Validation(String),
    /// Scope lookup against the target directory failed; retryable.
    #[error("scope resolution failed: {0}")]
    Resolution(String),
    /// Instance creation or update failed in the backing store.
    #[error("persistence failure: {0}")]
    Persistence(String),
    /// The store already holds an instance with this recurrence key.
    #[error("recurrence key already materialized: {0}")]
    Conflict(String),
    /// Backend-specific failure with context.
    #[error("backend error: {0}")]
    Backend(String),
}

impl EngineError {
    /// Whether the caller may retry the failed operation as-is.
    ///
    /// Resolution and persistence failures are transient directory/store
    /// conditions; validation and key conflicts are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Resolution(_) | Self::Persistence(_))
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
