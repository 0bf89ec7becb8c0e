//! Per-call dispatch outcome.

use serde::Serialize;

use crate::sink::EventId;

/// Identity of one rule attempt within a dispatch call.
///
/// Group-level and member-level attempts never collide: the latter carry
/// the member key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AttemptKey {
    pub rule_id: String,
    pub field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_key: Option<String>,
}

impl AttemptKey {
    pub fn new(rule_id: &str, field: &str, member_key: Option<&str>) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            field: field.to_string(),
            member_key: member_key.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// `time_source: field` and the new value is not a date.
    InvalidDate,
    /// The base date or the interval end is outside the representable range.
    DateOutOfRange,
    ConditionFalse,
}

#[derive(Debug, Clone, Serialize)]
pub struct Emitted {
    #[serde(flatten)]
    pub key: AttemptKey,
    pub event_id: EventId,
}

#[derive(Debug, Clone, Serialize)]
pub struct Skipped {
    #[serde(flatten)]
    pub key: AttemptKey,
    pub reason: SkipReason,
}

/// The sink refused or failed to create the event.
#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    #[serde(flatten)]
    pub key: AttemptKey,
    pub error: String,
}

/// Everything that happened during one dispatch call. Non-firing triggers
/// are not recorded.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatchReport {
    pub emitted: Vec<Emitted>,
    pub skipped: Vec<Skipped>,
    pub failures: Vec<Failure>,
}

impl DispatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn emitted_for(&self, rule_id: &str) -> usize {
        self.emitted.iter().filter(|e| e.key.rule_id == rule_id).count()
    }

    pub fn skipped_for(&self, rule_id: &str) -> Vec<SkipReason> {
        self.skipped
            .iter()
            .filter(|s| s.key.rule_id == rule_id)
            .map(|s| s.reason)
            .collect()
    }
}
