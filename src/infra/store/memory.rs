//! In-memory backends for development and testing.
//!
//! Each backend keeps its state behind a `parking_lot::RwLock`; locks are
//! taken for the duration of a call and never held across awaits.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::core::error::EngineError;
use crate::core::event::TriggerEvent;
use crate::core::instance::WorkInstance;
use crate::core::rule::{RuleCursor, RuleStatus, ScheduleRule, ScopeDescriptor};
use crate::infra::store::{
    AssignmentDirectory, EventQueue, InstanceStore, RuleStore, TargetDirectory, TargetInfo,
    TemplateContent, TemplateStore, UserRef,
};
use crate::util::ids::{TargetId, TeamId, TemplateId, UserId};

/// In-memory rule store.
#[derive(Default)]
pub struct InMemoryRuleStore {
    rules: RwLock<HashMap<String, ScheduleRule>>,
}

impl InMemoryRuleStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Save a rule, validating it first. Malformed rules never reach the
    /// generation path.
    pub fn put(&self, rule: ScheduleRule) -> Result<(), EngineError> {
        rule.validate()?;
        self.rules.write().insert(rule.id.clone(), rule);
        Ok(())
    }

    /// Flip a rule's status in place.
    pub fn set_status(&self, rule_id: &str, status: RuleStatus) {
        if let Some(rule) = self.rules.write().get_mut(rule_id) {
            rule.status = status;
            rule.updated_at = crate::util::clock::now_utc();
        }
    }
}

#[async_trait]
impl RuleStore for InMemoryRuleStore {
    async fn list_active(&self) -> Result<Vec<ScheduleRule>, EngineError> {
        let mut active: Vec<ScheduleRule> = self
            .rules
            .read()
            .values()
            .filter(|r| r.status.is_active())
            .cloned()
            .collect();
        active.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(active)
    }

    async fn get(&self, rule_id: &str) -> Result<Option<ScheduleRule>, EngineError> {
        Ok(self.rules.read().get(rule_id).cloned())
    }

    async fn update_cursor(&self, rule_id: &str, cursor: RuleCursor) -> Result<(), EngineError> {
        let mut rules = self.rules.write();
        let rule = rules
            .get_mut(rule_id)
            .ok_or_else(|| EngineError::Persistence(format!("unknown rule {rule_id}")))?;
        rule.cursor = cursor;
        Ok(())
    }
}

/// In-memory template store.
#[derive(Default)]
pub struct InMemoryTemplateStore {
    templates: RwLock<HashMap<TemplateId, TemplateContent>>,
}

impl InMemoryTemplateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a template.
    pub fn put(&self, template_id: impl Into<TemplateId>, content: TemplateContent) {
        self.templates.write().insert(template_id.into(), content);
    }
}

#[async_trait]
impl TemplateStore for InMemoryTemplateStore {
    async fn get(&self, template_id: &str) -> Result<Option<TemplateContent>, EngineError> {
        Ok(self.templates.read().get(template_id).cloned())
    }
}

/// In-memory target directory.
#[derive(Default)]
pub struct InMemoryTargetDirectory {
    targets: RwLock<HashMap<TargetId, TargetInfo>>,
}

impl InMemoryTargetDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a target.
    pub fn put(&self, target_id: impl Into<TargetId>, info: TargetInfo) {
        self.targets.write().insert(target_id.into(), info);
    }
}

#[async_trait]
impl TargetDirectory for InMemoryTargetDirectory {
    async fn resolve(&self, scope: &ScopeDescriptor) -> Result<Vec<TargetId>, EngineError> {
        let targets = self.targets.read();
        let selected = match scope {
            ScopeDescriptor::All => targets.keys().cloned().collect(),
            ScopeDescriptor::ByAssetType { asset_type } => targets
                .iter()
                .filter(|(_, info)| info.asset_type == *asset_type)
                .map(|(id, _)| id.clone())
                .collect(),
            ScopeDescriptor::ByTags { tags } => targets
                .iter()
                .filter(|(_, info)| tags.iter().all(|t| info.tags.contains(t)))
                .map(|(id, _)| id.clone())
                .collect(),
            ScopeDescriptor::ByAssetIds { ids } => ids
                .iter()
                .filter(|id| targets.contains_key(*id))
                .cloned()
                .collect(),
            ScopeDescriptor::BySite { site } => targets
                .iter()
                .filter(|(_, info)| info.site == *site)
                .map(|(id, _)| id.clone())
                .collect(),
        };
        Ok(selected)
    }

    async fn get(&self, target_id: &str) -> Result<Option<TargetInfo>, EngineError> {
        Ok(self.targets.read().get(target_id).cloned())
    }
}

/// In-memory instance store enforcing recurrence-key uniqueness on `create`.
#[derive(Default)]
pub struct InMemoryInstanceStore {
    instances: RwLock<HashMap<String, WorkInstance>>,
}

impl InMemoryInstanceStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot every stored instance, in creation order.
    pub fn all(&self) -> Vec<WorkInstance> {
        let mut all: Vec<WorkInstance> = self.instances.read().values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        all
    }

    /// Number of stored instances.
    pub fn len(&self) -> usize {
        self.instances.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.instances.read().is_empty()
    }
}

#[async_trait]
impl InstanceStore for InMemoryInstanceStore {
    async fn find_by_key(
        &self,
        recurrence_key: &str,
    ) -> Result<Option<WorkInstance>, EngineError> {
        Ok(self
            .instances
            .read()
            .values()
            .find(|i| i.recurrence_key == recurrence_key)
            .cloned())
    }

    async fn query(
        &self,
        rule_id: &str,
        target_id: &str,
        template_id: &str,
        created_within: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<Vec<WorkInstance>, EngineError> {
        Ok(self
            .instances
            .read()
            .values()
            .filter(|i| {
                i.schedule_rule_id == rule_id
                    && i.target_id == target_id
                    && i.template.template_id == template_id
            })
            .filter(|i| {
                created_within.is_none_or(|(from, to)| i.created_at >= from && i.created_at < to)
            })
            .cloned()
            .collect())
    }

    async fn create(&self, instance: WorkInstance) -> Result<(), EngineError> {
        let mut instances = self.instances.write();
        if instances
            .values()
            .any(|i| i.recurrence_key == instance.recurrence_key)
        {
            return Err(EngineError::Conflict(instance.recurrence_key));
        }
        instances.insert(instance.id.clone(), instance);
        Ok(())
    }

    async fn update(&self, instance: WorkInstance) -> Result<(), EngineError> {
        let mut instances = self.instances.write();
        if !instances.contains_key(&instance.id) {
            return Err(EngineError::Persistence(format!(
                "unknown instance {}",
                instance.id
            )));
        }
        instances.insert(instance.id.clone(), instance);
        Ok(())
    }
}

/// In-memory trigger-event queue.
#[derive(Default)]
pub struct InMemoryEventQueue {
    events: RwLock<Vec<TriggerEvent>>,
}

impl InMemoryEventQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event.
    pub fn push(&self, event: TriggerEvent) {
        self.events.write().push(event);
    }

    /// Whether an event has been consumed.
    pub fn is_processed(&self, event_id: &str) -> bool {
        self.events
            .read()
            .iter()
            .any(|e| e.id == event_id && e.processed)
    }
}

#[async_trait]
impl EventQueue for InMemoryEventQueue {
    async fn get_unprocessed(
        &self,
        trigger_types: &[String],
    ) -> Result<Vec<TriggerEvent>, EngineError> {
        Ok(self
            .events
            .read()
            .iter()
            .filter(|e| !e.processed && trigger_types.contains(&e.event_type))
            .cloned()
            .collect())
    }

    async fn mark_processed(&self, event_id: &str) -> Result<(), EngineError> {
        let mut events = self.events.write();
        let event = events
            .iter_mut()
            .find(|e| e.id == event_id)
            .ok_or_else(|| EngineError::Persistence(format!("unknown event {event_id}")))?;
        event.processed = true;
        Ok(())
    }
}

/// In-memory assignment directory.
#[derive(Default)]
pub struct InMemoryAssignmentDirectory {
    users: RwLock<HashMap<UserId, UserRef>>,
    teams: RwLock<HashMap<TeamId, Vec<UserId>>>,
}

impl InMemoryAssignmentDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user.
    pub fn put_user(&self, user_id: impl Into<UserId>, display_name: impl Into<String>) {
        let id = user_id.into();
        self.users.write().insert(
            id.clone(),
            UserRef {
                id,
                display_name: display_name.into(),
            },
        );
    }

    /// Insert or replace a team's member list; order is preserved.
    pub fn put_team(&self, team_id: impl Into<TeamId>, members: Vec<UserId>) {
        self.teams.write().insert(team_id.into(), members);
    }
}

#[async_trait]
impl AssignmentDirectory for InMemoryAssignmentDirectory {
    async fn resolve_user(&self, user_id: &str) -> Result<Option<UserRef>, EngineError> {
        Ok(self.users.read().get(user_id).cloned())
    }

    async fn resolve_team_members(&self, team_id: &str) -> Result<Vec<UserId>, EngineError> {
        Ok(self.teams.read().get(team_id).cloned().unwrap_or_default())
    }
}
