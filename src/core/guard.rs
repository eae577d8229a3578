//! Duplicate and capacity admission checks for candidate occurrences.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::core::error::EngineError;
use crate::core::instance::recurrence_key;
use crate::core::rule::RuleConstraints;
use crate::infra::store::InstanceStore;

/// A candidate occurrence awaiting admission.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    /// Rule that produced the candidate.
    pub rule_id: &'a str,
    /// Target the occurrence applies to.
    pub target_id: &'a str,
    /// Template the instance would snapshot.
    pub template_id: &'a str,
    /// Occurrence date.
    pub date: NaiveDate,
}

impl Candidate<'_> {
    /// The candidate's deterministic recurrence key.
    pub fn key(&self) -> String {
        recurrence_key(self.rule_id, self.target_id, self.template_id, self.date)
    }
}

/// Admission outcome for one candidate. Duplicate and capacity skips are
/// expected outcomes, counted by the run loop rather than surfaced as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardVerdict {
    /// No conflict; the candidate may be materialized.
    Unique,
    /// The occurrence already exists (exact key or creation-window hit).
    Duplicate,
    /// The target is at its open-instance limit.
    CapacityExceeded,
}

/// Idempotency and capacity check against the instance store.
pub struct DuplicateGuard {
    instances: Arc<dyn InstanceStore>,
}

impl DuplicateGuard {
    /// Create a guard over an instance store.
    pub fn new(instances: Arc<dyn InstanceStore>) -> Self {
        Self { instances }
    }

    /// Assess a candidate. The check order is a binding contract:
    ///
    /// 1. exact recurrence-key match → `Duplicate`, regardless of capacity;
    /// 2. open instances for (rule, target, template) at or over
    ///    `max_open_per_target` → `CapacityExceeded`;
    /// 3. any instance for the triple created within
    ///    `duplicate_window_hours` of `now` → `Duplicate`;
    /// 4. otherwise `Unique`.
    pub async fn assess(
        &self,
        candidate: &Candidate<'_>,
        constraints: &RuleConstraints,
        now: DateTime<Utc>,
    ) -> Result<GuardVerdict, EngineError> {
        let key = candidate.key();
        if self.instances.find_by_key(&key).await?.is_some() {
            tracing::debug!(%key, "exact recurrence key already materialized");
            return Ok(GuardVerdict::Duplicate);
        }

        let existing = self
            .instances
            .query(candidate.rule_id, candidate.target_id, candidate.template_id, None)
            .await?;

        let open = existing.iter().filter(|i| i.status.is_open()).count();
        let open = u32::try_from(open).unwrap_or(u32::MAX);
        if open >= constraints.max_open_per_target {
            tracing::debug!(
                target = candidate.target_id,
                open,
                limit = constraints.max_open_per_target,
                "open-instance limit reached"
            );
            return Ok(GuardVerdict::CapacityExceeded);
        }

        if constraints.duplicate_window_hours > 0 {
            let cutoff = now - Duration::hours(i64::from(constraints.duplicate_window_hours));
            if existing.iter().any(|i| i.created_at >= cutoff) {
                tracing::debug!(
                    target = candidate.target_id,
                    window_hours = constraints.duplicate_window_hours,
                    "recent instance inside the dedup window"
                );
                return Ok(GuardVerdict::Duplicate);
            }
        }

        Ok(GuardVerdict::Unique)
    }
}
