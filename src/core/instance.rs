//! Work-instance model and recurrence-key derivation.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::util::ids::{RuleId, TargetId, TemplateId, UserId};

/// Deterministic identity of one logical occurrence.
///
/// Identical (rule, target, template, date-bucket) inputs always yield the
/// same key, which is what keeps repeated and concurrent generation passes
/// from materializing the same occurrence twice. The bucket is the
/// occurrence's ISO calendar date.
pub fn recurrence_key(
    rule_id: &str,
    target_id: &str,
    template_id: &str,
    date: NaiveDate,
) -> String {
    format!("{rule_id}:{target_id}:{template_id}:{}", date.format("%Y-%m-%d"))
}

/// Template content copied into an instance at creation time.
///
/// Later template edits never change already-materialized instances; the
/// snapshot is the instance's own copy, not a live reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateSnapshot {
    /// Template the content was copied from.
    pub template_id: TemplateId,
    /// Template version at copy time.
    pub version: u32,
    /// Copied content (checklist sections, metadata).
    pub content: serde_json::Value,
}

/// Lifecycle state of a work instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    /// Created by the materializer, not yet released to a worker.
    Draft,
    /// Released and awaiting work.
    Open,
    /// Work underway.
    InProgress,
    /// Finished by the execution workflow.
    Completed,
    /// Abandoned.
    Cancelled,
}

impl InstanceStatus {
    /// Whether the instance counts against per-target open capacity.
    pub fn is_open(self) -> bool {
        matches!(self, Self::Draft | Self::Open | Self::InProgress)
    }
}

/// Where an instance came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreatedFrom {
    /// The scheduled generation loop.
    Schedule,
    /// Created by hand in the app.
    Manual,
    /// Bulk import.
    Bulk,
    /// A trigger event.
    Event,
}

/// One append-only history record on an instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// When the action happened.
    pub at: DateTime<Utc>,
    /// What happened (created, assigned, status-change).
    pub action: String,
    /// Free-form context.
    pub detail: Option<String>,
}

/// A concrete, dated unit of work produced from a schedule rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkInstance {
    /// Instance identifier.
    pub id: String,
    /// Rule that produced this instance.
    pub schedule_rule_id: RuleId,
    /// Target the work applies to.
    pub target_id: TargetId,
    /// Template content copied at creation time.
    pub template: TemplateSnapshot,
    /// Date the work is scheduled for.
    pub scheduled_date: NaiveDate,
    /// Date the work is due.
    pub due_date: NaiveDate,
    /// Resolved assignee, when any.
    pub assigned_to: Option<UserId>,
    /// Deterministic occurrence identity; unique in the instance store.
    pub recurrence_key: String,
    /// Lifecycle state.
    pub status: InstanceStatus,
    /// Origin of the instance.
    pub created_from: CreatedFrom,
    /// Append-only history.
    pub history: Vec<HistoryEntry>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl WorkInstance {
    /// Append a history record.
    pub fn push_history(
        &mut self,
        at: DateTime<Utc>,
        action: impl Into<String>,
        detail: Option<String>,
    ) {
        self.history.push(HistoryEntry {
            at,
            action: action.into(),
            detail,
        });
    }
}
