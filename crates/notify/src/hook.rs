//! Bridges rule-engine hook notices to notification channels.

use std::collections::HashMap;
use std::sync::Arc;

use autoevent_rules::hook::{HookError, HookNotice, RuleHook};

use crate::dispatcher::ChannelDispatcher;
use crate::templating::{TemplateContext, TemplateRenderer};
use crate::traits::{Notification, NotifyError};

const SUBJECT: &str = "{{ event.title }}";
const BODY: &str =
    "Rule '{{ rule.name }}' created {{ event.event_type }} event {{ event.id }} for {{ context.source.type }} {{ context.source.id }}.";

/// A [`RuleHook`] that renders each notice and fans it out to channels.
pub struct NotifyHook {
    channels: ChannelDispatcher,
    renderer: Arc<TemplateRenderer>,
}

impl NotifyHook {
    pub fn new(channels: ChannelDispatcher, renderer: Arc<TemplateRenderer>) -> Self {
        Self { channels, renderer }
    }

    pub fn notification_for(&self, notice: &HookNotice) -> Result<Notification, NotifyError> {
        let ctx = TemplateContext::from_notice(notice);
        Ok(Notification {
            subject: self.renderer.render(SUBJECT, &ctx)?,
            body: self.renderer.render(BODY, &ctx)?,
            metadata: HashMap::from([
                ("rule_id".to_string(), notice.rule_id.clone()),
                ("event_id".to_string(), notice.event_id.clone()),
                ("event_type".to_string(), notice.event_type.clone()),
                ("scope".to_string(), scope_label(notice)),
            ]),
        })
    }
}

fn scope_label(notice: &HookNotice) -> String {
    serde_json::to_value(notice.scope)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

#[async_trait::async_trait]
impl RuleHook for NotifyHook {
    async fn on_event(&self, notice: &HookNotice) -> Result<(), HookError> {
        let notification = self
            .notification_for(notice)
            .map_err(|e| HookError::Config(e.to_string()))?;

        let failed = self.channels.dispatch(&notice.rule_id, &notification).await;
        if failed.is_empty() {
            return Ok(());
        }
        let summary: Vec<String> = failed
            .iter()
            .map(|f| format!("{}: {}", f.channel, f.error))
            .collect();
        Err(HookError::Delivery(summary.join("; ")))
    }

    fn name(&self) -> &str {
        "notify"
    }
}
