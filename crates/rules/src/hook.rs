//! Secondary, best-effort hook run after each emitted event.

use serde::Serialize;

use autoevent_core::FieldValue;

use crate::schema::Scope;
use crate::sink::EventId;

/// What a hook is told about an emitted event.
#[derive(Debug, Clone, Serialize)]
pub struct HookNotice {
    pub scope: Scope,
    pub rule_id: String,
    pub rule_name: String,
    pub event_id: EventId,
    pub event_type: String,
    /// Rendered event title.
    pub title: String,
    /// The record (or member) the rule fired on, after the write.
    pub subject: FieldValue,
    /// The full context the condition and templates were evaluated against.
    pub rendered_context: FieldValue,
}

#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("hook delivery failed: {0}")]
    Delivery(String),

    #[error("hook misconfigured: {0}")]
    Config(String),
}

/// Fire-and-forget listener. Errors are logged by the dispatcher and
/// otherwise ignored.
#[async_trait::async_trait]
pub trait RuleHook: Send + Sync {
    async fn on_event(&self, notice: &HookNotice) -> Result<(), HookError>;

    fn name(&self) -> &str;
}
