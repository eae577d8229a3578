//! Recurrence calculator: pure date arithmetic per frequency mode.
//!
//! One dispatch point covers all four timing semantics. The calculator never
//! reads or writes persisted state; it maps a pattern plus an input signal to
//! candidate occurrence dates, and the run loop decides what to do with them.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};

use crate::core::event::TriggerEvent;
use crate::core::rule::{CalendarPattern, FrequencyMode, IntervalUnit, NthWeekday, RollingPattern};
use crate::util::ids::EventId;

/// Half-open generation window `[start, end)` in calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationWindow {
    /// First date inside the window.
    pub start: NaiveDate,
    /// First date beyond the window.
    pub end: NaiveDate,
}

impl GenerationWindow {
    /// Window starting today (per `now`) and spanning `ahead_days` days.
    pub fn from_now(now: DateTime<Utc>, ahead_days: u32) -> Self {
        let start = now.date_naive();
        Self {
            start,
            end: start + Duration::days(i64::from(ahead_days)),
        }
    }

    /// Whether a date falls inside the window.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }

    /// Iterate the window's dates in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(move |d| *d < self.end)
    }
}

/// What produced an occurrence; carried through to the materializer so the
/// instance records its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OccurrenceSource {
    /// A fixed-calendar window scan.
    Calendar,
    /// A completed instance's rolling follow-up.
    Completion {
        /// Instance whose completion produced the follow-up.
        instance_id: String,
    },
    /// A usage-threshold crossing.
    Usage {
        /// Meter that crossed its interval.
        meter: String,
    },
    /// A trigger event.
    Event {
        /// Event that produced the occurrence.
        event_id: EventId,
    },
}

/// One candidate occurrence: a date and what produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    /// Occurrence date.
    pub date: NaiveDate,
    /// Producing input.
    pub source: OccurrenceSource,
}

/// Input signal a generation pass feeds the calculator.
#[derive(Debug, Clone)]
pub enum CalculatorInput<'a> {
    /// Poll a fixed-calendar rule over the window.
    WindowScan,
    /// An instance finished; rolling rules produce one follow-up.
    Completion {
        /// Completion date the offset counts from.
        completed_on: NaiveDate,
        /// Completed instance id.
        instance_id: &'a str,
    },
    /// An external meter crossed its configured interval.
    UsageSignal {
        /// When the crossing was observed.
        at: DateTime<Utc>,
    },
    /// Unprocessed trigger events drained this tick.
    Events(&'a [TriggerEvent]),
}

/// Compute every candidate occurrence for a mode/input pair.
///
/// Mismatched pairs (a completion fed to a calendar rule, a window scan fed
/// to an event rule) produce nothing; each mode answers exactly one input
/// kind. Identical inputs always yield identical output.
pub fn occurrences(
    mode: &FrequencyMode,
    input: &CalculatorInput<'_>,
    window: &GenerationWindow,
) -> Vec<Occurrence> {
    match (mode, input) {
        (FrequencyMode::FixedCalendar(pattern), CalculatorInput::WindowScan) => {
            calendar_occurrences(pattern, window)
        }
        (
            FrequencyMode::RollingAfterCompletion(pattern),
            CalculatorInput::Completion {
                completed_on,
                instance_id,
            },
        ) => vec![Occurrence {
            date: rolling_follow_up(pattern, *completed_on),
            source: OccurrenceSource::Completion {
                instance_id: (*instance_id).to_string(),
            },
        }],
        (FrequencyMode::UsageBased(pattern), CalculatorInput::UsageSignal { at }) => {
            vec![Occurrence {
                date: at.date_naive(),
                source: OccurrenceSource::Usage {
                    meter: pattern.meter.clone(),
                },
            }]
        }
        (FrequencyMode::EventDriven(pattern), CalculatorInput::Events(events)) => events
            .iter()
            .filter(|event| pattern.trigger_types.iter().any(|t| *t == event.event_type))
            .map(|event| Occurrence {
                date: event.timestamp.date_naive(),
                source: OccurrenceSource::Event {
                    event_id: event.id.clone(),
                },
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// First calendar occurrence strictly after `after`, if one exists within a
/// bounded forward search. Used by the run loop to maintain `next_run_at`.
pub fn next_occurrence_after(pattern: &CalendarPattern, after: NaiveDate) -> Option<NaiveDate> {
    let horizon = match pattern.unit {
        IntervalUnit::Day => i64::from(pattern.multiplier) + 1,
        IntervalUnit::Week => 7 * (i64::from(pattern.multiplier) + 1),
        IntervalUnit::Month => 31 * (i64::from(pattern.multiplier) + 2),
    };
    let start = after.succ_opt()?;
    let probe = GenerationWindow {
        start,
        end: start + Duration::days(horizon),
    };
    calendar_occurrences(pattern, &probe)
        .first()
        .map(|o| o.date)
}

/// The single follow-up date for a rolling rule: completion date + offset.
pub fn rolling_follow_up(pattern: &RollingPattern, completed_on: NaiveDate) -> NaiveDate {
    let count = i64::from(pattern.offset_count);
    match pattern.offset_unit {
        IntervalUnit::Day => completed_on + Duration::days(count),
        IntervalUnit::Week => completed_on + Duration::weeks(count),
        IntervalUnit::Month => add_months_clamped(completed_on, pattern.offset_count),
    }
}

fn calendar_occurrences(pattern: &CalendarPattern, window: &GenerationWindow) -> Vec<Occurrence> {
    let dates = match pattern.unit {
        IntervalUnit::Day => daily_dates(pattern, window),
        IntervalUnit::Week => weekly_dates(pattern, window),
        IntervalUnit::Month => monthly_dates(pattern, window),
    };
    dates
        .into_iter()
        .map(|date| Occurrence {
            date,
            source: OccurrenceSource::Calendar,
        })
        .collect()
}

fn daily_dates(pattern: &CalendarPattern, window: &GenerationWindow) -> Vec<NaiveDate> {
    let step = i64::from(pattern.multiplier);
    window
        .days()
        .filter(|d| *d >= pattern.start_date)
        .filter(|d| (*d - pattern.start_date).num_days() % step == 0)
        .collect()
}

fn weekly_dates(pattern: &CalendarPattern, window: &GenerationWindow) -> Vec<NaiveDate> {
    // An empty weekday set means "the weekday the schedule started on".
    let anchor_weekday = pattern.start_date.weekday();
    let in_set = |day: Weekday| {
        if pattern.weekdays.is_empty() {
            day == anchor_weekday
        } else {
            pattern.weekdays.contains(&day)
        }
    };
    let step = i64::from(pattern.multiplier);
    let anchor_week = week_start(pattern.start_date);
    window
        .days()
        .filter(|d| *d >= pattern.start_date)
        .filter(|d| in_set(d.weekday()))
        .filter(|d| (week_start(*d) - anchor_week).num_days() / 7 % step == 0)
        .collect()
}

fn monthly_dates(pattern: &CalendarPattern, window: &GenerationWindow) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let step = i64::from(pattern.multiplier);
    let anchor = month_index(pattern.start_date);

    // Walk whole months touching the window; each qualifying month yields at
    // most one date.
    let mut cursor = month_index(window.start.max(pattern.start_date));
    let last = month_index(window.end);
    while cursor <= last {
        if (cursor - anchor) % step == 0 {
            let (year, month) = month_from_index(cursor);
            let target = match (pattern.day_of_month, pattern.nth_weekday) {
                (Some(day), _) => Some(clamped_date(year, month, day)),
                (None, Some(nth)) => nth_weekday_of_month(year, month, nth),
                (None, None) => Some(clamped_date(year, month, pattern.start_date.day())),
            };
            if let Some(date) = target {
                if date >= pattern.start_date && window.contains(date) {
                    dates.push(date);
                }
            }
        }
        cursor += 1;
    }
    dates
}

/// Monday of the week containing `date`.
fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Months since year zero, for month-interval arithmetic.
fn month_index(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}

fn month_from_index(index: i64) -> (i32, u32) {
    let year = index.div_euclid(12);
    let month0 = index.rem_euclid(12);
    (
        i32::try_from(year).unwrap_or(i32::MAX),
        u32::try_from(month0).unwrap_or(0) + 1,
    )
}

/// A date in (year, month) with the day clamped to the month's length.
///
/// This is the engine's one clamp policy: a configured day beyond the
/// month's last day lands on the last day (31 → Feb 28/29).
fn clamped_date(year: i32, month: u32, day: u32) -> NaiveDate {
    let day = day.min(days_in_month(year, month)).max(1);
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN))
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .map(|first_next| (first_next - Duration::days(1)).day())
        .unwrap_or(28)
}

/// Date of the nth weekday in a month, when the month has one.
fn nth_weekday_of_month(year: i32, month: u32, nth: NthWeekday) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let offset = (7 + nth.weekday.num_days_from_monday() - first.weekday().num_days_from_monday()) % 7;
    let day = 1 + offset + 7 * nth.nth.saturating_sub(1);
    if day <= days_in_month(year, month) {
        NaiveDate::from_ymd_opt(year, month, day)
    } else {
        None
    }
}

/// Month addition with day clamping, shared with rolling follow-ups.
fn add_months_clamped(date: NaiveDate, months: u32) -> NaiveDate {
    let (year, month) = month_from_index(month_index(date) + i64::from(months));
    clamped_date(year, month, date.day())
}
