//! Tests for instance materialization and assignment resolution

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use foreman_recurrence::core::guard::Candidate;
use foreman_recurrence::core::instance::{CreatedFrom, InstanceStatus};
use foreman_recurrence::core::materializer::{MaterializeOutcome, Materializer};
use foreman_recurrence::core::recurrence::OccurrenceSource;
use foreman_recurrence::core::rule::{
    AssignmentPolicy, CalendarPattern, FrequencyMode, IntervalUnit, ScheduleRule, ScopeDescriptor,
};
use foreman_recurrence::infra::store::memory::{
    InMemoryAssignmentDirectory, InMemoryInstanceStore, InMemoryTemplateStore,
};
use foreman_recurrence::infra::store::TemplateContent;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 10, 9, 0, 0).unwrap()
}

fn rule() -> ScheduleRule {
    let mut rule = ScheduleRule::new(
        "r1",
        "tmpl-1",
        ScopeDescriptor::All,
        FrequencyMode::FixedCalendar(CalendarPattern {
            unit: IntervalUnit::Day,
            multiplier: 1,
            weekdays: vec![],
            day_of_month: None,
            nth_weekday: None,
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        }),
    );
    rule.due_offset_days = 3;
    rule
}

fn candidate() -> Candidate<'static> {
    Candidate {
        rule_id: "r1",
        target_id: "pump-7",
        template_id: "tmpl-1",
        date: NaiveDate::from_ymd_opt(2025, 6, 12).unwrap(),
    }
}

struct Fixture {
    templates: Arc<InMemoryTemplateStore>,
    assignments: Arc<InMemoryAssignmentDirectory>,
    instances: Arc<InMemoryInstanceStore>,
}

fn fixture() -> Fixture {
    let templates = Arc::new(InMemoryTemplateStore::new());
    templates.put(
        "tmpl-1",
        TemplateContent {
            content: serde_json::json!({"sections": ["seals"]}),
            version: 4,
        },
    );
    Fixture {
        templates,
        assignments: Arc::new(InMemoryAssignmentDirectory::new()),
        instances: Arc::new(InMemoryInstanceStore::new()),
    }
}

fn materializer(f: &Fixture, default_assignee: Option<String>) -> Materializer {
    Materializer::new(
        f.templates.clone(),
        f.assignments.clone(),
        f.instances.clone(),
        default_assignee,
    )
}

#[tokio::test]
async fn test_draft_instance_snapshots_template() {
    let f = fixture();
    let m = materializer(&f, None);

    let outcome = m
        .materialize(&rule(), &candidate(), &OccurrenceSource::Calendar, 0, now())
        .await
        .unwrap();

    let MaterializeOutcome::Created(instance) = outcome else {
        panic!("expected creation");
    };
    assert_eq!(instance.status, InstanceStatus::Draft);
    assert_eq!(instance.created_from, CreatedFrom::Schedule);
    assert_eq!(instance.template.version, 4);
    assert_eq!(instance.template.content, serde_json::json!({"sections": ["seals"]}));
    assert_eq!(instance.due_date, NaiveDate::from_ymd_opt(2025, 6, 15).unwrap());
    assert_eq!(instance.recurrence_key, "r1:pump-7:tmpl-1:2025-06-12");
    assert_eq!(instance.history.len(), 1);
    assert_eq!(f.instances.len(), 1);
}

#[tokio::test]
async fn test_fixed_user_assignment() {
    let f = fixture();
    f.assignments.put_user("u9", "Robin");
    let mut r = rule();
    r.assignment = AssignmentPolicy::FixedUser {
        user_id: "u9".into(),
    };
    let m = materializer(&f, None);

    let MaterializeOutcome::Created(instance) = m
        .materialize(&r, &candidate(), &OccurrenceSource::Calendar, 0, now())
        .await
        .unwrap()
    else {
        panic!("expected creation");
    };
    assert_eq!(instance.assigned_to.as_deref(), Some("u9"));
}

#[tokio::test]
async fn test_missing_fixed_user_falls_back_to_default() {
    let f = fixture();
    let mut r = rule();
    r.assignment = AssignmentPolicy::FixedUser {
        user_id: "ghost".into(),
    };
    let m = materializer(&f, Some("dispatch".to_string()));

    let MaterializeOutcome::Created(instance) = m
        .materialize(&r, &candidate(), &OccurrenceSource::Calendar, 0, now())
        .await
        .unwrap()
    else {
        panic!("expected creation");
    };
    assert_eq!(instance.assigned_to.as_deref(), Some("dispatch"));
}

#[tokio::test]
async fn test_rotation_wraps_over_members() {
    let f = fixture();
    f.assignments
        .put_team("mechanics", vec!["u1".into(), "u2".into()]);
    let mut r = rule();
    r.assignment = AssignmentPolicy::RotateTeam {
        team_id: "mechanics".into(),
    };
    let m = materializer(&f, None);

    // Position 3 in a 2-member team wraps to member 1.
    let mut c = candidate();
    c.target_id = "pump-9";
    let MaterializeOutcome::Created(instance) = m
        .materialize(&r, &c, &OccurrenceSource::Calendar, 3, now())
        .await
        .unwrap()
    else {
        panic!("expected creation");
    };
    assert_eq!(instance.assigned_to.as_deref(), Some("u2"));
}

#[tokio::test]
async fn test_empty_team_falls_back_to_default() {
    let f = fixture();
    f.assignments.put_team("mechanics", vec![]);
    let mut r = rule();
    r.assignment = AssignmentPolicy::RotateTeam {
        team_id: "mechanics".into(),
    };
    let m = materializer(&f, Some("dispatch".to_string()));

    let MaterializeOutcome::Created(instance) = m
        .materialize(&r, &candidate(), &OccurrenceSource::Calendar, 0, now())
        .await
        .unwrap()
    else {
        panic!("expected creation");
    };
    assert_eq!(instance.assigned_to.as_deref(), Some("dispatch"));
}

#[tokio::test]
async fn test_lost_creation_race_reports_duplicate_key() {
    let f = fixture();
    let m = materializer(&f, None);

    let first = m
        .materialize(&rule(), &candidate(), &OccurrenceSource::Calendar, 0, now())
        .await
        .unwrap();
    assert!(matches!(first, MaterializeOutcome::Created(_)));

    // Same candidate again: the store's key uniqueness turns the write into
    // a duplicate outcome, not an error.
    let second = m
        .materialize(&rule(), &candidate(), &OccurrenceSource::Calendar, 0, now())
        .await
        .unwrap();
    assert!(matches!(second, MaterializeOutcome::DuplicateKey));
    assert_eq!(f.instances.len(), 1);
}

#[tokio::test]
async fn test_missing_template_is_an_error() {
    let f = fixture();
    let mut r = rule();
    r.template_id = "tmpl-missing".into();
    let m = materializer(&f, None);

    let mut c = candidate();
    c.template_id = "tmpl-missing";
    let err = m
        .materialize(&r, &c, &OccurrenceSource::Calendar, 0, now())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("tmpl-missing"));
}
