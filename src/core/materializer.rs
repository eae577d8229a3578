//! Instance materialization: unique candidates become persisted Draft instances.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::core::error::EngineError;
use crate::core::guard::Candidate;
use crate::core::instance::{CreatedFrom, InstanceStatus, TemplateSnapshot, WorkInstance};
use crate::core::recurrence::OccurrenceSource;
use crate::core::rule::{AssignmentPolicy, ScheduleRule};
use crate::infra::store::{AssignmentDirectory, InstanceStore, TemplateStore};
use crate::util::ids::{new_instance_id, UserId};

/// Result of a materialization attempt.
#[derive(Debug)]
pub enum MaterializeOutcome {
    /// The instance was persisted.
    Created(WorkInstance),
    /// The store already held the recurrence key; a concurrent pass won the
    /// race. Counted as a duplicate skip, not a failure.
    DuplicateKey,
}

/// Builds and persists work instances from accepted candidates.
///
/// The materializer snapshots template content at creation time and resolves
/// the assignee, but never touches the rule cursor; that belongs to the run
/// loop alone.
pub struct Materializer {
    templates: Arc<dyn TemplateStore>,
    assignments: Arc<dyn AssignmentDirectory>,
    instances: Arc<dyn InstanceStore>,
    default_assignee: Option<UserId>,
}

impl Materializer {
    /// Create a materializer over the template, assignment, and instance
    /// backends.
    pub fn new(
        templates: Arc<dyn TemplateStore>,
        assignments: Arc<dyn AssignmentDirectory>,
        instances: Arc<dyn InstanceStore>,
        default_assignee: Option<UserId>,
    ) -> Self {
        Self {
            templates,
            assignments,
            instances,
            default_assignee,
        }
    }

    /// Materialize one `Unique` candidate into a Draft instance.
    ///
    /// `scope_position` is the target's index in the sorted resolved scope;
    /// round-robin assignment keys off it so the rotation is reproducible
    /// for the same scope ordering.
    pub async fn materialize(
        &self,
        rule: &ScheduleRule,
        candidate: &Candidate<'_>,
        source: &OccurrenceSource,
        scope_position: usize,
        now: DateTime<Utc>,
    ) -> Result<MaterializeOutcome, EngineError> {
        let template = self
            .templates
            .get(&rule.template_id)
            .await?
            .ok_or_else(|| {
                EngineError::Persistence(format!("template {} not found", rule.template_id))
            })?;

        let assigned_to = self.resolve_assignee(rule, scope_position).await?;

        let mut instance = WorkInstance {
            id: new_instance_id(),
            schedule_rule_id: rule.id.clone(),
            target_id: candidate.target_id.to_string(),
            template: TemplateSnapshot {
                template_id: rule.template_id.clone(),
                version: template.version,
                content: template.content,
            },
            scheduled_date: candidate.date,
            due_date: candidate.date + Duration::days(i64::from(rule.due_offset_days)),
            assigned_to,
            recurrence_key: candidate.key(),
            status: InstanceStatus::Draft,
            created_from: created_from(source),
            history: Vec::new(),
            created_at: now,
        };
        instance.push_history(now, "created", Some(describe_source(source)));

        match self.instances.create(instance.clone()).await {
            Ok(()) => {
                tracing::info!(
                    rule = %rule.id,
                    target = candidate.target_id,
                    date = %candidate.date,
                    "instance materialized"
                );
                Ok(MaterializeOutcome::Created(instance))
            }
            Err(EngineError::Conflict(key)) => {
                tracing::debug!(%key, "lost creation race, treating as duplicate");
                Ok(MaterializeOutcome::DuplicateKey)
            }
            Err(e) => Err(e),
        }
    }

    /// Resolution order: FixedUser > RotateTeam > the configured default.
    async fn resolve_assignee(
        &self,
        rule: &ScheduleRule,
        scope_position: usize,
    ) -> Result<Option<UserId>, EngineError> {
        match &rule.assignment {
            AssignmentPolicy::FixedUser { user_id } => {
                match self.assignments.resolve_user(user_id).await? {
                    Some(user) => Ok(Some(user.id)),
                    None => {
                        tracing::warn!(
                            rule = %rule.id,
                            user = %user_id,
                            "fixed assignee missing from directory, using default"
                        );
                        Ok(self.default_assignee.clone())
                    }
                }
            }
            AssignmentPolicy::RotateTeam { team_id } => {
                let members = self.assignments.resolve_team_members(team_id).await?;
                if members.is_empty() {
                    tracing::warn!(
                        rule = %rule.id,
                        team = %team_id,
                        "rotation team has no members, using default"
                    );
                    Ok(self.default_assignee.clone())
                } else {
                    Ok(Some(members[scope_position % members.len()].clone()))
                }
            }
            AssignmentPolicy::Unassigned => Ok(self.default_assignee.clone()),
        }
    }
}

fn created_from(source: &OccurrenceSource) -> CreatedFrom {
    match source {
        OccurrenceSource::Event { .. } => CreatedFrom::Event,
        _ => CreatedFrom::Schedule,
    }
}

fn describe_source(source: &OccurrenceSource) -> String {
    match source {
        OccurrenceSource::Calendar => "calendar schedule".to_string(),
        OccurrenceSource::Completion { instance_id } => {
            format!("follow-up of {instance_id}")
        }
        OccurrenceSource::Usage { meter } => format!("usage threshold on {meter}"),
        OccurrenceSource::Event { event_id } => format!("trigger event {event_id}"),
    }
}
