//! Engine configuration structures.

use serde::{Deserialize, Serialize};

/// Instance-store backend selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceBackendConfig {
    /// In-memory store for development/testing.
    InMemory,
    /// Postgres store.
    Postgres,
}

/// Event-queue backend selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventBackendConfig {
    /// In-memory queue for development/testing.
    InMemory,
    /// Postgres queue.
    Postgres,
}

/// Root engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Forward-looking generation horizon in days.
    pub ahead_days: u32,
    /// Assignee used when no policy resolves one.
    #[serde(default)]
    pub default_assignee: Option<String>,
    /// Instance-store backend selection.
    pub instance_backend: InstanceBackendConfig,
    /// Event-queue backend selection.
    pub event_backend: EventBackendConfig,
    /// Bounded buffer size for the in-memory audit sink.
    pub audit_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ahead_days: 14,
            default_assignee: None,
            instance_backend: InstanceBackendConfig::InMemory,
            event_backend: EventBackendConfig::InMemory,
            audit_buffer: 1024,
        }
    }
}

impl EngineConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.ahead_days == 0 {
            return Err("ahead_days must be greater than 0".into());
        }
        if self.ahead_days > 366 {
            return Err("ahead_days must not exceed 366".into());
        }
        if self.audit_buffer == 0 {
            return Err("audit_buffer must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse engine configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from `FOREMAN_*` environment variables, loading a
    /// `.env` file first when one is present. Unset variables keep their
    /// defaults.
    ///
    /// Recognized: `FOREMAN_AHEAD_DAYS`, `FOREMAN_DEFAULT_ASSIGNEE`,
    /// `FOREMAN_INSTANCE_BACKEND` (`in_memory`/`postgres`),
    /// `FOREMAN_EVENT_BACKEND` (`in_memory`/`postgres`),
    /// `FOREMAN_AUDIT_BUFFER`.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        let mut cfg = Self::default();

        if let Ok(raw) = std::env::var("FOREMAN_AHEAD_DAYS") {
            cfg.ahead_days = raw
                .parse()
                .map_err(|e| format!("FOREMAN_AHEAD_DAYS: {e}"))?;
        }
        if let Ok(raw) = std::env::var("FOREMAN_DEFAULT_ASSIGNEE") {
            cfg.default_assignee = Some(raw);
        }
        if let Ok(raw) = std::env::var("FOREMAN_INSTANCE_BACKEND") {
            cfg.instance_backend = match raw.as_str() {
                "in_memory" => InstanceBackendConfig::InMemory,
                "postgres" => InstanceBackendConfig::Postgres,
                other => return Err(format!("FOREMAN_INSTANCE_BACKEND: unknown backend `{other}`")),
            };
        }
        if let Ok(raw) = std::env::var("FOREMAN_EVENT_BACKEND") {
            cfg.event_backend = match raw.as_str() {
                "in_memory" => EventBackendConfig::InMemory,
                "postgres" => EventBackendConfig::Postgres,
                other => return Err(format!("FOREMAN_EVENT_BACKEND: unknown backend `{other}`")),
            };
        }
        if let Ok(raw) = std::env::var("FOREMAN_AUDIT_BUFFER") {
            cfg.audit_buffer = raw
                .parse()
                .map_err(|e| format!("FOREMAN_AUDIT_BUFFER: {e}"))?;
        }

        cfg.validate()?;
        Ok(cfg)
    }
}
