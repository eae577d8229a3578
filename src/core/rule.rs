//! Schedule rule model: scope, frequency patterns, assignment, constraints.

use chrono::{DateTime, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::core::error::EngineError;
use crate::util::ids::{RuleId, TargetId, TeamId, TemplateId, UserId};

/// Interval unit for calendar and rolling patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalUnit {
    /// Calendar days.
    Day,
    /// Calendar weeks (Monday-based).
    Week,
    /// Calendar months, day-clamped.
    Month,
}

/// "Nth weekday of the month" selector, e.g. the second Tuesday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NthWeekday {
    /// 1-based ordinal within the month (1..=5).
    pub nth: u32,
    /// Weekday to select.
    pub weekday: Weekday,
}

/// Fixed calendar timing: occurrence dates derive from the calendar alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarPattern {
    /// Interval unit the multiplier applies to.
    pub unit: IntervalUnit,
    /// Every N units; 1 = every unit.
    pub multiplier: u32,
    /// Weekday set for weekly patterns. Empty = the start date's weekday.
    #[serde(default)]
    pub weekdays: Vec<Weekday>,
    /// Day of the month for monthly patterns, clamped to shorter months.
    #[serde(default)]
    pub day_of_month: Option<u32>,
    /// Nth-weekday selector for monthly patterns; exclusive with `day_of_month`.
    #[serde(default)]
    pub nth_weekday: Option<NthWeekday>,
    /// Anchor date the interval counting starts from.
    pub start_date: NaiveDate,
}

impl CalendarPattern {
    /// Validate the pattern shape for its interval unit.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.multiplier == 0 {
            return Err(EngineError::Validation("multiplier must be at least 1".into()));
        }
        match self.unit {
            IntervalUnit::Day | IntervalUnit::Week => {
                if self.day_of_month.is_some() || self.nth_weekday.is_some() {
                    return Err(EngineError::Validation(
                        "day_of_month/nth_weekday apply to monthly patterns only".into(),
                    ));
                }
            }
            IntervalUnit::Month => {
                if !self.weekdays.is_empty() {
                    return Err(EngineError::Validation(
                        "weekday sets apply to weekly patterns only".into(),
                    ));
                }
                if self.day_of_month.is_some() && self.nth_weekday.is_some() {
                    return Err(EngineError::Validation(
                        "day_of_month and nth_weekday are mutually exclusive".into(),
                    ));
                }
                if let Some(day) = self.day_of_month {
                    if day == 0 || day > 31 {
                        return Err(EngineError::Validation(format!(
                            "day_of_month {day} out of range 1..=31"
                        )));
                    }
                }
                if let Some(nth) = self.nth_weekday {
                    if nth.nth == 0 || nth.nth > 5 {
                        return Err(EngineError::Validation(format!(
                            "nth_weekday ordinal {} out of range 1..=5",
                            nth.nth
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Rolling timing: one follow-up a fixed offset after each completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollingPattern {
    /// Offset magnitude.
    pub offset_count: u32,
    /// Offset unit.
    pub offset_unit: IntervalUnit,
}

impl RollingPattern {
    /// Validate the offset.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.offset_count == 0 {
            return Err(EngineError::Validation("offset_count must be at least 1".into()));
        }
        Ok(())
    }
}

/// Usage-threshold timing: fires when an external meter reading crosses
/// `interval` since the last firing. Threshold detection lives with the
/// meter ingestion pipeline; the engine only consumes the crossing signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsagePattern {
    /// Meter name the threshold applies to (engine hours, odometer, cycles).
    pub meter: String,
    /// Usage delta between occurrences, in meter units.
    pub interval: f64,
}

impl UsagePattern {
    /// Validate the meter reference and interval.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.meter.trim().is_empty() {
            return Err(EngineError::Validation("meter name must not be empty".into()));
        }
        if self.interval <= 0.0 {
            return Err(EngineError::Validation("usage interval must be positive".into()));
        }
        Ok(())
    }
}

/// Event-driven timing: fires once per matching trigger event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventPattern {
    /// Event types this rule reacts to.
    pub trigger_types: Vec<String>,
}

impl EventPattern {
    /// Validate the trigger set.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.trigger_types.is_empty() {
            return Err(EngineError::Validation("trigger_types must not be empty".into()));
        }
        if self.trigger_types.iter().any(|t| t.trim().is_empty()) {
            return Err(EngineError::Validation("trigger types must not be blank".into()));
        }
        Ok(())
    }
}

/// How occurrence dates are derived for a rule.
///
/// A single tagged union replaces per-mode generation paths: the calculator
/// dispatches on this enum so the edge-case policy lives in one place.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FrequencyMode {
    /// Fixed calendar timing scanned over the generation window.
    FixedCalendar(CalendarPattern),
    /// One follow-up per completion, offset from the completion date.
    RollingAfterCompletion(RollingPattern),
    /// One occurrence per external usage-threshold crossing.
    UsageBased(UsagePattern),
    /// One occurrence per matching trigger event.
    EventDriven(EventPattern),
}

impl FrequencyMode {
    /// Validate the mode-specific pattern payload.
    pub fn validate(&self) -> Result<(), EngineError> {
        match self {
            Self::FixedCalendar(p) => p.validate(),
            Self::RollingAfterCompletion(p) => p.validate(),
            Self::UsageBased(p) => p.validate(),
            Self::EventDriven(p) => p.validate(),
        }
    }
}

/// Target-selection criteria resolved against the directory at generation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum ScopeDescriptor {
    /// Every target in the directory.
    All,
    /// Targets of one asset type.
    ByAssetType {
        /// Asset type to match.
        asset_type: String,
    },
    /// Targets carrying every listed tag.
    ByTags {
        /// Required tags.
        tags: Vec<String>,
    },
    /// An explicit target list.
    ByAssetIds {
        /// Target ids, as known to the directory.
        ids: Vec<TargetId>,
    },
    /// Every target at one site.
    BySite {
        /// Site identifier.
        site: String,
    },
}

/// Who a materialized instance is assigned to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "assign", rename_all = "snake_case")]
pub enum AssignmentPolicy {
    /// No explicit assignee; the configured default applies.
    Unassigned,
    /// Always the same user.
    FixedUser {
        /// Assignee.
        user_id: UserId,
    },
    /// Deterministic round-robin over a team's members.
    RotateTeam {
        /// Team whose members rotate.
        team_id: TeamId,
    },
}

/// Per-target generation limits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RuleConstraints {
    /// Maximum simultaneously open instances per (rule, target, template).
    pub max_open_per_target: u32,
    /// Creation-time dedup window in hours; 0 disables the window check.
    pub duplicate_window_hours: u32,
}

impl Default for RuleConstraints {
    fn default() -> Self {
        Self {
            max_open_per_target: 1,
            duplicate_window_hours: 0,
        }
    }
}

impl RuleConstraints {
    /// Validate the limits.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.max_open_per_target == 0 {
            return Err(EngineError::Validation(
                "max_open_per_target must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Whether a rule participates in generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleStatus {
    /// Rule generates occurrences.
    Active,
    /// Generation halted; cursor preserved. Occurrences that would have
    /// fallen inside a pause are not backfilled on resume.
    Paused,
}

impl RuleStatus {
    /// Whether the rule currently generates.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Run-loop bookkeeping. Advanced only by the run loop, never by the
/// materializer.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RuleCursor {
    /// When the run loop last processed this rule.
    pub last_run_at: Option<DateTime<Utc>>,
    /// Next calendar occurrence beyond the processed window, when known.
    pub next_run_at: Option<DateTime<Utc>>,
}

/// A declarative scheduling rule owned by an operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRule {
    /// Rule identifier.
    pub id: RuleId,
    /// Template the generated instances snapshot their content from.
    pub template_id: TemplateId,
    /// Target-selection criteria.
    pub scope: ScopeDescriptor,
    /// Occurrence timing.
    pub frequency: FrequencyMode,
    /// Assignee resolution policy.
    pub assignment: AssignmentPolicy,
    /// Per-target generation limits.
    pub constraints: RuleConstraints,
    /// Days between an instance's scheduled date and its due date.
    pub due_offset_days: u32,
    /// Active/paused state.
    pub status: RuleStatus,
    /// Run-loop bookkeeping.
    pub cursor: RuleCursor,
    /// When the rule was created.
    pub created_at: DateTime<Utc>,
    /// When the rule was last edited.
    pub updated_at: DateTime<Utc>,
    /// Operator who created the rule, when known.
    pub created_by: Option<UserId>,
}

impl ScheduleRule {
    /// Build an active rule with default constraints and empty cursor.
    pub fn new(
        id: impl Into<RuleId>,
        template_id: impl Into<TemplateId>,
        scope: ScopeDescriptor,
        frequency: FrequencyMode,
    ) -> Self {
        let now = crate::util::clock::now_utc();
        Self {
            id: id.into(),
            template_id: template_id.into(),
            scope,
            frequency,
            assignment: AssignmentPolicy::Unassigned,
            constraints: RuleConstraints::default(),
            due_offset_days: 0,
            status: RuleStatus::Active,
            cursor: RuleCursor::default(),
            created_at: now,
            updated_at: now,
            created_by: None,
        }
    }

    /// Validate the whole rule; malformed rules are rejected at save time
    /// and never reach the generation path.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.id.trim().is_empty() {
            return Err(EngineError::Validation("rule id must not be empty".into()));
        }
        if self.template_id.trim().is_empty() {
            return Err(EngineError::Validation("template_id must not be empty".into()));
        }
        self.frequency.validate()?;
        self.constraints.validate()
    }

    /// Trigger types for event-driven rules; `None` for other modes.
    pub fn trigger_types(&self) -> Option<&[String]> {
        match &self.frequency {
            FrequencyMode::EventDriven(p) => Some(&p.trigger_types),
            _ => None,
        }
    }
}
