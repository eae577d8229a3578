//! Scheduler run loop: one generation pass across rules and the event queue.
//!
//! The loop orchestrates the calculator, scope resolver, duplicate guard,
//! and materializer. It holds no locks across passes; overlapping ticks are
//! safe because occurrence uniqueness is enforced by recurrence keys at the
//! data layer (detect, don't prevent).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::config::EngineConfig;
use crate::core::audit::{build_audit_event, AuditAction, GenerationAuditSink};
use crate::core::error::EngineError;
use crate::core::guard::{Candidate, DuplicateGuard, GuardVerdict};
use crate::core::instance::WorkInstance;
use crate::core::materializer::{MaterializeOutcome, Materializer};
use crate::core::recurrence::{
    next_occurrence_after, occurrences, CalculatorInput, GenerationWindow, Occurrence,
    OccurrenceSource,
};
use crate::core::rule::{FrequencyMode, RuleCursor, ScheduleRule};
use crate::core::scope::ScopeResolver;
use crate::infra::store::{
    AssignmentDirectory, EventQueue, InstanceStore, RuleStore, TargetDirectory, TemplateStore,
};
use crate::util::clock::{now_ms, now_utc};
use crate::util::ids::{TargetId, UserId};

/// Summary of one generation pass.
#[derive(Debug, Default, Clone)]
pub struct TickReport {
    /// Instances materialized.
    pub generated: usize,
    /// Candidates skipped as duplicates (exact key, window hit, or lost
    /// creation race).
    pub duplicates: usize,
    /// Candidates skipped at the open-instance limit.
    pub capacity_skips: usize,
    /// Failures, one entry per affected rule or (date, target) pair. Never
    /// fatal; callers present these alongside the generated count.
    pub errors: Vec<String>,
}

impl TickReport {
    /// Whether the pass recorded any failure.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// External notification that a usage meter crossed its configured interval.
///
/// Threshold detection lives with the meter ingestion pipeline; the engine
/// only consumes the crossing.
#[derive(Debug, Clone)]
pub struct UsageSignal {
    /// Target whose meter crossed.
    pub target_id: TargetId,
    /// Meter name, matched against usage-rule patterns.
    pub meter: String,
    /// When the crossing was observed; becomes the occurrence date.
    pub at: DateTime<Utc>,
}

/// The generation engine: rules in, dated work instances out.
pub struct SchedulerEngine {
    config: EngineConfig,
    rules: Arc<dyn RuleStore>,
    events: Arc<dyn EventQueue>,
    resolver: ScopeResolver,
    guard: DuplicateGuard,
    materializer: Materializer,
    audit: Option<Arc<Mutex<Box<dyn GenerationAuditSink>>>>,
}

impl std::fmt::Debug for SchedulerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulerEngine").finish_non_exhaustive()
    }
}

impl SchedulerEngine {
    /// Assemble an engine from its configuration and injected backends.
    pub fn new(
        config: EngineConfig,
        rules: Arc<dyn RuleStore>,
        templates: Arc<dyn TemplateStore>,
        targets: Arc<dyn TargetDirectory>,
        instances: Arc<dyn InstanceStore>,
        events: Arc<dyn EventQueue>,
        assignments: Arc<dyn AssignmentDirectory>,
    ) -> Self {
        let default_assignee: Option<UserId> = config.default_assignee.clone();
        Self {
            config,
            rules,
            events,
            resolver: ScopeResolver::new(targets),
            guard: DuplicateGuard::new(Arc::clone(&instances)),
            materializer: Materializer::new(templates, assignments, instances, default_assignee),
            audit: None,
        }
    }

    /// Attach an audit sink.
    pub fn with_audit(mut self, sink: Box<dyn GenerationAuditSink>) -> Self {
        self.audit = Some(Arc::new(Mutex::new(sink)));
        self
    }

    /// Run one generation pass across all active rules and the event queue.
    ///
    /// `now_override` pins the pass to a fixed clock for deterministic runs;
    /// production callers pass `None`. Safe to invoke concurrently for
    /// overlapping windows: repeats resolve to duplicates, not doubles.
    pub async fn run_tick(&self, now_override: Option<DateTime<Utc>>) -> TickReport {
        let now = now_override.unwrap_or_else(now_utc);
        let mut report = TickReport::default();

        let rules = match self.rules.list_active().await {
            Ok(rules) => rules,
            Err(e) => {
                report.errors.push(format!("loading active rules: {e}"));
                return report;
            }
        };
        tracing::info!(rules = rules.len(), %now, "generation tick started");

        let mut event_rules: Vec<&ScheduleRule> = Vec::new();
        for rule in &rules {
            match &rule.frequency {
                FrequencyMode::FixedCalendar(_) => {
                    self.process_calendar_rule(rule, now, &mut report).await;
                    self.advance_cursor(rule, now, &mut report).await;
                }
                FrequencyMode::EventDriven(_) => event_rules.push(rule),
                // Signal-driven modes generate through their own entry
                // points; the tick only stamps their cursor.
                FrequencyMode::RollingAfterCompletion(_) | FrequencyMode::UsageBased(_) => {
                    self.advance_cursor(rule, now, &mut report).await;
                }
            }
        }

        self.drain_events(&event_rules, now, &mut report).await;
        for rule in &event_rules {
            self.advance_cursor(rule, now, &mut report).await;
        }

        tracing::info!(
            generated = report.generated,
            duplicates = report.duplicates,
            capacity_skips = report.capacity_skips,
            errors = report.errors.len(),
            "generation tick finished"
        );
        report
    }

    /// Run one generation pass for a single rule.
    pub async fn run_for_rule(&self, rule_id: &str) -> TickReport {
        let now = now_utc();
        let mut report = TickReport::default();

        let rule = match self.rules.get(rule_id).await {
            Ok(Some(rule)) => rule,
            Ok(None) => {
                report.errors.push(format!("unknown rule {rule_id}"));
                return report;
            }
            Err(e) => {
                report.errors.push(format!("loading rule {rule_id}: {e}"));
                return report;
            }
        };
        if !rule.status.is_active() {
            tracing::info!(rule = %rule.id, "rule paused, nothing generated");
            return report;
        }

        match &rule.frequency {
            FrequencyMode::FixedCalendar(_) => {
                self.process_calendar_rule(&rule, now, &mut report).await;
            }
            FrequencyMode::EventDriven(_) => {
                self.drain_events(&[&rule], now, &mut report).await;
            }
            FrequencyMode::RollingAfterCompletion(_) | FrequencyMode::UsageBased(_) => {}
        }
        self.advance_cursor(&rule, now, &mut report).await;
        report
    }

    /// React to a completed instance: rolling rules produce at most one
    /// follow-up per call, itself subject to the duplicate guard, so
    /// repeated notifications for the same completion stay idempotent.
    pub async fn on_instance_completed(
        &self,
        instance: &WorkInstance,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<(), EngineError> {
        let Some(rule) = self.rules.get(&instance.schedule_rule_id).await? else {
            tracing::debug!(
                instance = %instance.id,
                rule = %instance.schedule_rule_id,
                "completed instance has no surviving rule"
            );
            return Ok(());
        };
        if !matches!(rule.frequency, FrequencyMode::RollingAfterCompletion(_)) {
            return Ok(());
        }
        if !rule.status.is_active() {
            tracing::debug!(rule = %rule.id, "rule paused, no follow-up");
            return Ok(());
        }

        let now = completed_at.unwrap_or_else(now_utc);
        let window = GenerationWindow::from_now(now, self.config.ahead_days);
        let input = CalculatorInput::Completion {
            completed_on: now.date_naive(),
            instance_id: &instance.id,
        };
        let occs = occurrences(&rule.frequency, &input, &window);

        // Rotation position only matters for team rotation; other policies
        // never consult the scope.
        let position = if matches!(rule.assignment, crate::core::rule::AssignmentPolicy::RotateTeam { .. }) {
            self.resolver
                .resolve(&rule.scope)
                .await?
                .iter()
                .position(|t| *t == instance.target_id)
                .unwrap_or(0)
        } else {
            0
        };

        let mut report = TickReport::default();
        for occ in &occs {
            self.process_pair(&rule, &instance.target_id, position, occ, now, &mut report)
                .await;
        }
        if let Some(first) = report.errors.into_iter().next() {
            return Err(EngineError::Persistence(first));
        }
        Ok(())
    }

    /// React to a usage-threshold crossing: every active usage rule watching
    /// this meter whose scope contains the target produces one occurrence at
    /// the signal timestamp, subject to the duplicate guard.
    pub async fn on_usage_threshold(&self, signal: &UsageSignal) -> TickReport {
        let now = signal.at;
        let mut report = TickReport::default();

        let rules = match self.rules.list_active().await {
            Ok(rules) => rules,
            Err(e) => {
                report.errors.push(format!("loading active rules: {e}"));
                return report;
            }
        };

        for rule in &rules {
            let FrequencyMode::UsageBased(pattern) = &rule.frequency else {
                continue;
            };
            if pattern.meter != signal.meter {
                continue;
            }
            let targets = match self.resolver.resolve(&rule.scope).await {
                Ok(targets) => targets,
                Err(e) => {
                    tracing::warn!(rule = %rule.id, error = %e, "scope resolution failed");
                    report.errors.push(format!("rule {}: {e}", rule.id));
                    continue;
                }
            };
            let Some(position) = targets.iter().position(|t| *t == signal.target_id) else {
                continue;
            };

            let window = GenerationWindow::from_now(now, self.config.ahead_days);
            let input = CalculatorInput::UsageSignal { at: signal.at };
            for occ in &occurrences(&rule.frequency, &input, &window) {
                self.process_pair(rule, &signal.target_id, position, occ, now, &mut report)
                    .await;
            }
        }
        report
    }

    /// Generate for one fixed-calendar rule over the tick window.
    async fn process_calendar_rule(
        &self,
        rule: &ScheduleRule,
        now: DateTime<Utc>,
        report: &mut TickReport,
    ) {
        let window = GenerationWindow::from_now(now, self.config.ahead_days);
        let occs = occurrences(&rule.frequency, &CalculatorInput::WindowScan, &window);
        if occs.is_empty() {
            return;
        }

        let targets = match self.resolver.resolve(&rule.scope).await {
            Ok(targets) => targets,
            Err(e) => {
                tracing::warn!(rule = %rule.id, error = %e, "scope resolution failed, rule skipped this tick");
                report.errors.push(format!("rule {}: {e}", rule.id));
                self.record_audit(&rule.id, None, AuditAction::Error, Some(e.to_string()));
                return;
            }
        };

        for occ in &occs {
            for (position, target) in targets.iter().enumerate() {
                self.process_pair(rule, target, position, occ, now, report).await;
            }
        }
    }

    /// Drain the event queue once per tick and fan matching events out to
    /// the given event-driven rules. Each event is marked processed exactly
    /// once, after every rule has seen it.
    async fn drain_events(
        &self,
        rules: &[&ScheduleRule],
        now: DateTime<Utc>,
        report: &mut TickReport,
    ) {
        if rules.is_empty() {
            return;
        }

        let mut trigger_types: Vec<String> = rules
            .iter()
            .filter_map(|r| r.trigger_types())
            .flatten()
            .cloned()
            .collect();
        trigger_types.sort();
        trigger_types.dedup();

        let events = match self.events.get_unprocessed(&trigger_types).await {
            Ok(events) => events,
            Err(e) => {
                report.errors.push(format!("draining event queue: {e}"));
                return;
            }
        };
        if events.is_empty() {
            return;
        }
        tracing::debug!(events = events.len(), "draining trigger events");

        // One scope snapshot per rule per tick; a failed resolution excludes
        // the rule from this drain but not from future ticks.
        let mut scopes: HashMap<&str, Vec<TargetId>> = HashMap::new();
        for rule in rules {
            match self.resolver.resolve(&rule.scope).await {
                Ok(targets) => {
                    scopes.insert(rule.id.as_str(), targets);
                }
                Err(e) => {
                    tracing::warn!(rule = %rule.id, error = %e, "scope resolution failed, rule skipped this drain");
                    report.errors.push(format!("rule {}: {e}", rule.id));
                    self.record_audit(&rule.id, None, AuditAction::Error, Some(e.to_string()));
                }
            }
        }

        let window = GenerationWindow::from_now(now, self.config.ahead_days);
        for event in &events {
            for rule in rules {
                let Some(targets) = scopes.get(rule.id.as_str()) else {
                    continue;
                };
                if !rule
                    .trigger_types()
                    .is_some_and(|types| types.contains(&event.event_type))
                {
                    continue;
                }
                let Some(position) = targets.iter().position(|t| *t == event.target_id) else {
                    continue;
                };

                let input = CalculatorInput::Events(std::slice::from_ref(event));
                for occ in &occurrences(&rule.frequency, &input, &window) {
                    self.process_pair(rule, &event.target_id, position, occ, now, report)
                        .await;
                }
            }

            match self.events.mark_processed(&event.id).await {
                Ok(()) => {
                    self.record_audit(
                        "event_queue",
                        Some(&event.target_id),
                        AuditAction::EventProcessed,
                        Some(event.id.clone()),
                    );
                }
                Err(e) => {
                    report
                        .errors
                        .push(format!("marking event {} processed: {e}", event.id));
                }
            }
        }
    }

    /// Guard then materialize one (date, target) pair. A failure here is
    /// recorded and the caller moves on to the remaining pairs; one bad
    /// target never aborts the rule's others.
    async fn process_pair(
        &self,
        rule: &ScheduleRule,
        target_id: &str,
        position: usize,
        occ: &Occurrence,
        now: DateTime<Utc>,
        report: &mut TickReport,
    ) {
        let candidate = Candidate {
            rule_id: &rule.id,
            target_id,
            template_id: &rule.template_id,
            date: occ.date,
        };

        match self.guard.assess(&candidate, &rule.constraints, now).await {
            Ok(GuardVerdict::Unique) => {
                match self
                    .materializer
                    .materialize(rule, &candidate, &occ.source, position, now)
                    .await
                {
                    Ok(MaterializeOutcome::Created(_)) => {
                        report.generated += 1;
                        let action = match occ.source {
                            OccurrenceSource::Completion { .. } => AuditAction::FollowUp,
                            _ => AuditAction::Generate,
                        };
                        self.record_audit(&rule.id, Some(target_id), action, None);
                    }
                    Ok(MaterializeOutcome::DuplicateKey) => {
                        report.duplicates += 1;
                        self.record_audit(&rule.id, Some(target_id), AuditAction::Duplicate, None);
                    }
                    Err(e) => {
                        tracing::warn!(
                            rule = %rule.id,
                            target = target_id,
                            error = %e,
                            "pair failed, continuing with remaining targets"
                        );
                        report
                            .errors
                            .push(format!("rule {} target {target_id}: {e}", rule.id));
                        self.record_audit(
                            &rule.id,
                            Some(target_id),
                            AuditAction::Error,
                            Some(e.to_string()),
                        );
                    }
                }
            }
            Ok(GuardVerdict::Duplicate) => {
                report.duplicates += 1;
                self.record_audit(&rule.id, Some(target_id), AuditAction::Duplicate, None);
            }
            Ok(GuardVerdict::CapacityExceeded) => {
                report.capacity_skips += 1;
                self.record_audit(&rule.id, Some(target_id), AuditAction::Capacity, None);
            }
            Err(e) => {
                report
                    .errors
                    .push(format!("rule {} target {target_id}: {e}", rule.id));
                self.record_audit(
                    &rule.id,
                    Some(target_id),
                    AuditAction::Error,
                    Some(e.to_string()),
                );
            }
        }
    }

    /// Stamp the rule's cursor after processing. Only the run loop writes
    /// cursors; the materializer never does.
    async fn advance_cursor(
        &self,
        rule: &ScheduleRule,
        now: DateTime<Utc>,
        report: &mut TickReport,
    ) {
        let next_run_at = match &rule.frequency {
            FrequencyMode::FixedCalendar(pattern) => {
                let window = GenerationWindow::from_now(now, self.config.ahead_days);
                let last_in_window = window.end.pred_opt().unwrap_or(window.end);
                next_occurrence_after(pattern, last_in_window)
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|dt| dt.and_utc())
            }
            _ => None,
        };
        let cursor = RuleCursor {
            last_run_at: Some(now),
            next_run_at,
        };
        if let Err(e) = self.rules.update_cursor(&rule.id, cursor).await {
            report
                .errors
                .push(format!("rule {}: cursor update failed: {e}", rule.id));
        }
    }

    /// Record an audit event when a sink is attached.
    fn record_audit(
        &self,
        rule_id: &str,
        target_id: Option<&str>,
        action: AuditAction,
        detail: Option<String>,
    ) {
        if let Some(audit_sink) = &self.audit {
            let mut sink = audit_sink.lock();
            sink.record(build_audit_event(
                format!("{rule_id}-{}-{}", action.as_str(), now_ms()),
                rule_id,
                target_id.map(str::to_string),
                action,
                detail,
            ));
        }
    }
}
