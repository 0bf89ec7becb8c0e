//! The channel seam of the notification hook.

use std::collections::HashMap;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("template error: {0}")]
    Template(String),

    #[error("notifier misconfigured: {0}")]
    Config(String),
}

/// Subject and body rendered from one hook notice.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Notification {
    pub subject: String,
    pub body: String,
    /// `rule_id`, `event_id`, `scope`, `event_type`.
    pub metadata: HashMap<String, String>,
}

/// One delivery channel.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;

    /// Human-readable name for this channel (e.g., "webhook").
    fn channel_name(&self) -> &str;
}
