//! Core domain model and generation algorithms.

pub mod audit;
pub mod engine;
pub mod error;
pub mod event;
pub mod guard;
pub mod instance;
pub mod materializer;
pub mod recurrence;
pub mod rule;
pub mod scope;

pub use audit::{
    build_audit_event, AuditAction, AuditEvent, GenerationAuditSink, InMemoryAuditSink,
    PostgresAuditSink,
};
pub use engine::{SchedulerEngine, TickReport, UsageSignal};
pub use error::{AppResult, EngineError};
pub use event::TriggerEvent;
pub use guard::{Candidate, DuplicateGuard, GuardVerdict};
pub use instance::{
    recurrence_key, CreatedFrom, HistoryEntry, InstanceStatus, TemplateSnapshot, WorkInstance,
};
pub use materializer::{MaterializeOutcome, Materializer};
pub use recurrence::{
    next_occurrence_after, occurrences, rolling_follow_up, CalculatorInput, GenerationWindow,
    Occurrence, OccurrenceSource,
};
pub use rule::{
    AssignmentPolicy, CalendarPattern, EventPattern, FrequencyMode, IntervalUnit, NthWeekday,
    RollingPattern, RuleConstraints, RuleCursor, RuleStatus, ScheduleRule, ScopeDescriptor,
    UsagePattern,
};
pub use scope::ScopeResolver;
