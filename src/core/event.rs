//! Trigger events consumed by event-driven rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::util::ids::{EventId, TargetId};

/// An external occurrence (breakdown report, sensor alarm, audit finding)
/// that event-driven rules react to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerEvent {
    /// Event identifier.
    pub id: EventId,
    /// Event type matched against rule trigger sets.
    pub event_type: String,
    /// Target the event concerns.
    pub target_id: TargetId,
    /// When the event happened; becomes the occurrence date.
    pub timestamp: DateTime<Utc>,
    /// Whether a tick has already consumed this event.
    pub processed: bool,
}

impl TriggerEvent {
    /// Build an unprocessed event.
    pub fn new(
        id: impl Into<EventId>,
        event_type: impl Into<String>,
        target_id: impl Into<TargetId>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            event_type: event_type.into(),
            target_id: target_id.into(),
            timestamp,
            processed: false,
        }
    }
}
