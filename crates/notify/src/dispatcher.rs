//! Fans a notification out to every configured channel.
//!
//! Channels are tried in order and a failing channel does not stop the
//! ones after it. Failures are collected for the caller.

use crate::traits::{Notification, Notifier, NotifyError};

/// A channel that could not deliver.
#[derive(Debug)]
pub struct FailedDelivery {
    pub channel: String,
    pub error: NotifyError,
}

pub struct ChannelDispatcher {
    channels: Vec<Box<dyn Notifier>>,
}

impl ChannelDispatcher {
    pub fn new(channels: Vec<Box<dyn Notifier>>) -> Self {
        Self { channels }
    }

    /// Deliver `notification` for `rule_id` to every channel.
    pub async fn dispatch(&self, rule_id: &str, notification: &Notification) -> Vec<FailedDelivery> {
        if self.channels.is_empty() {
            tracing::debug!(rule_id, "no notification channels configured");
            return Vec::new();
        }

        let mut failed = Vec::new();
        for channel in &self.channels {
            let started = std::time::Instant::now();
            let result = channel.send(notification).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match result {
                Ok(()) => tracing::info!(
                    rule_id,
                    channel = channel.channel_name(),
                    elapsed_ms,
                    "notification delivered"
                ),
                Err(error) => {
                    tracing::warn!(
                        rule_id,
                        channel = channel.channel_name(),
                        %error,
                        elapsed_ms,
                        "notification delivery failed"
                    );
                    failed.push(FailedDelivery {
                        channel: channel.channel_name().to_string(),
                        error,
                    });
                }
            }
        }
        failed
    }
}
