//! Identifier aliases shared across the rule, instance, and directory models.
//!
//! Ids originate in external systems (the rule editor, the asset directory,
//! the user directory), so they are opaque strings rather than numeric keys.

/// Identifier of a schedule rule.
pub type RuleId = String;

/// Identifier of a generation target (an asset, a location, a piece of equipment).
pub type TargetId = String;

/// Identifier of an inspection/work-order template.
pub type TemplateId = String;

/// Identifier of a user in the assignment directory.
pub type UserId = String;

/// Identifier of a team in the assignment directory.
pub type TeamId = String;

/// Identifier of a trigger event.
pub type EventId = String;

/// Mint a fresh work-instance identifier.
pub fn new_instance_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
