//! Store and directory interfaces the engine is injected with.
//!
//! The engine never owns persistence; every collaborator is a trait object
//! supplied by the host. In-memory backends cover development and testing;
//! the Postgres adapters carry the schema for a wired deployment.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::core::error::EngineError;
use crate::core::event::TriggerEvent;
use crate::core::instance::WorkInstance;
use crate::core::rule::{RuleCursor, ScheduleRule, ScopeDescriptor};
use crate::util::ids::{TargetId, UserId};

/// Template content at its current version, as served by the template store.
#[derive(Debug, Clone)]
pub struct TemplateContent {
    /// Content to snapshot into instances.
    pub content: serde_json::Value,
    /// Version the content carries.
    pub version: u32,
}

/// Directory facts about a generation target.
#[derive(Debug, Clone)]
pub struct TargetInfo {
    /// Site the target belongs to.
    pub site: String,
    /// Asset type.
    pub asset_type: String,
    /// Free-form tags.
    pub tags: Vec<String>,
}

/// A user known to the assignment directory.
#[derive(Debug, Clone)]
pub struct UserRef {
    /// User identifier.
    pub id: UserId,
    /// Display name.
    pub display_name: String,
}

/// Schedule-rule persistence.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Every rule currently in `Active` status.
    async fn list_active(&self) -> Result<Vec<ScheduleRule>, EngineError>;
    /// Fetch one rule by id.
    async fn get(&self, rule_id: &str) -> Result<Option<ScheduleRule>, EngineError>;
    /// Persist a rule's cursor. Only the run loop calls this.
    async fn update_cursor(&self, rule_id: &str, cursor: RuleCursor) -> Result<(), EngineError>;
}

/// Read access to inspection/work-order templates.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// Current content and version of a template.
    async fn get(&self, template_id: &str) -> Result<Option<TemplateContent>, EngineError>;
}

/// The asset/target directory.
#[async_trait]
pub trait TargetDirectory: Send + Sync {
    /// Expand a scope descriptor to the target ids it currently selects.
    async fn resolve(&self, scope: &ScopeDescriptor) -> Result<Vec<TargetId>, EngineError>;
    /// Directory facts for one target.
    async fn get(&self, target_id: &str) -> Result<Option<TargetInfo>, EngineError>;
}

/// Work-instance persistence. The store is the uniqueness authority: `create`
/// must reject a second instance carrying an already-stored recurrence key.
#[async_trait]
pub trait InstanceStore: Send + Sync {
    /// Fetch the instance holding an exact recurrence key.
    async fn find_by_key(&self, recurrence_key: &str)
        -> Result<Option<WorkInstance>, EngineError>;
    /// All instances for a (rule, target, template) triple, optionally
    /// restricted to a creation-time window.
    async fn query(
        &self,
        rule_id: &str,
        target_id: &str,
        template_id: &str,
        created_within: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<Vec<WorkInstance>, EngineError>;
    /// Persist a new instance; [`EngineError::Conflict`] when its recurrence
    /// key is already stored.
    async fn create(&self, instance: WorkInstance) -> Result<(), EngineError>;
    /// Persist changes to an existing instance.
    async fn update(&self, instance: WorkInstance) -> Result<(), EngineError>;
}

/// Queue of trigger events awaiting consumption.
#[async_trait]
pub trait EventQueue: Send + Sync {
    /// Unprocessed events whose type is in `trigger_types`.
    async fn get_unprocessed(
        &self,
        trigger_types: &[String],
    ) -> Result<Vec<TriggerEvent>, EngineError>;
    /// Mark one event consumed.
    async fn mark_processed(&self, event_id: &str) -> Result<(), EngineError>;
}

/// The user/team directory used for assignment resolution.
#[async_trait]
pub trait AssignmentDirectory: Send + Sync {
    /// Look up a user by id.
    async fn resolve_user(&self, user_id: &str) -> Result<Option<UserRef>, EngineError>;
    /// Member ids of a team, in the directory's stable order.
    async fn resolve_team_members(&self, team_id: &str) -> Result<Vec<UserId>, EngineError>;
}
