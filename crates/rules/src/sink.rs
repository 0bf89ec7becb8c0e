//! Event-creation collaborator: the generated event shape and the sink
//! trait the dispatchers hand it to.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use autoevent_core::{Record, TimeKind};

use crate::schema::VisibilityMode;

/// Identifier returned by the sink for a created event.
pub type EventId = String;

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("event rejected: {0}")]
    Rejected(String),

    #[error("event store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recurrence {
    Monthly,
    Yearly,
}

impl Recurrence {
    pub fn for_kind(kind: TimeKind) -> Option<Self> {
        match kind {
            TimeKind::RecurringMonthly => Some(Recurrence::Monthly),
            TimeKind::RecurringYearly => Some(Recurrence::Yearly),
            _ => None,
        }
    }
}

/// Link from a member-sourced or group-scoped event back to its group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRef {
    pub group_type: String,
    pub group_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub ref_type: String,
    pub ref_id: String,
}

/// A generated event. Ownership passes to the sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewEvent {
    pub event_type: String,
    pub actor_id: String,
    pub payload: Record,
    pub time_kind: TimeKind,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub all_day: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Recurrence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupRef>,
    pub participants: Vec<Participant>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility_default: Option<VisibilityMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provenance_tag: Option<String>,
}

impl NewEvent {
    /// The read-path view of this event once stored under `id`.
    pub fn to_stored(&self, id: impl Into<EventId>) -> StoredEvent {
        StoredEvent {
            id: id.into(),
            time_kind: self.time_kind,
            start: self.start,
            end: self.end,
            provenance_tag: self.provenance_tag.clone(),
        }
    }
}

/// What the visibility path needs to know about a stored event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    #[serde(default)]
    pub id: EventId,
    #[serde(default = "default_time_kind")]
    pub time_kind: TimeKind,
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub provenance_tag: Option<String>,
}

fn default_time_kind() -> TimeKind {
    TimeKind::Point
}

/// Durable event store. The engine never retries a failed call.
#[async_trait::async_trait]
pub trait EventSink: Send + Sync {
    async fn create_event(&self, event: NewEvent) -> Result<EventId, SinkError>;
}

/// In-memory sink assigning UUID v4 ids.
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<(EventId, NewEvent)>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every created event, in creation order.
    pub fn events(&self) -> Vec<(EventId, NewEvent)> {
        self.events.lock().expect("events lock poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().expect("events lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl EventSink for MemoryEventSink {
    async fn create_event(&self, event: NewEvent) -> Result<EventId, SinkError> {
        let id = Uuid::new_v4().to_string();
        self.events
            .lock()
            .expect("events lock poisoned")
            .push((id.clone(), event));
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> NewEvent {
        NewEvent {
            event_type: "milestone".into(),
            actor_id: "u-1".into(),
            payload: Record::new(),
            time_kind: TimeKind::Deadline,
            start: None,
            end: Some("2025-03-10T00:00:00Z".parse().unwrap()),
            all_day: true,
            recurrence: None,
            group: None,
            participants: vec![],
            visibility_default: None,
            provenance_tag: Some("E:3:abc".into()),
        }
    }

    #[tokio::test]
    async fn memory_sink_assigns_distinct_ids() {
        let sink = MemoryEventSink::new();
        let a = sink.create_event(event()).await.unwrap();
        let b = sink.create_event(event()).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.events()[0].0, a);
    }

    #[test]
    fn stored_view_keeps_range_and_tag() {
        let stored = event().to_stored("ev-1");
        assert_eq!(stored.id, "ev-1");
        assert_eq!(stored.start, None);
        assert_eq!(stored.end, event().end);
        assert_eq!(stored.provenance_tag.as_deref(), Some("E:3:abc"));
    }

    #[test]
    fn stored_event_parses_minimal_json() {
        let stored: StoredEvent =
            serde_json::from_str(r#"{"start": "2025-03-10T00:00:00Z"}"#).unwrap();
        assert_eq!(stored.time_kind, TimeKind::Point);
        assert!(stored.provenance_tag.is_none());
    }

    #[test]
    fn recurrence_only_for_recurring_kinds() {
        assert_eq!(Recurrence::for_kind(TimeKind::RecurringYearly), Some(Recurrence::Yearly));
        assert_eq!(Recurrence::for_kind(TimeKind::RecurringMonthly), Some(Recurrence::Monthly));
        assert_eq!(Recurrence::for_kind(TimeKind::Interval), None);
    }
}
