//! Generic HTTP webhook notifier.
//!
//! Delivers notifications to a configured URL, either as the serialized
//! [`Notification`] or as a rendered body template.

use std::sync::Arc;

use autoevent_core::config::HookConfig;

use crate::templating::TemplateRenderer;
use crate::traits::{Notification, Notifier, NotifyError};

/// Delivers notifications over HTTP to a single endpoint.
///
/// `${VAR_NAME}` references in the URL are resolved at construction time.
#[derive(Debug)]
pub struct WebhookNotifier {
    url: String,
    method: reqwest::Method,
    /// Rendered with `notification` in scope. Without it the notification
    /// is sent as JSON.
    body_template: Option<String>,
    renderer: Arc<TemplateRenderer>,
    client: reqwest::Client,
}

impl WebhookNotifier {
    /// `None` when no hook URL is configured. The method defaults to `POST`
    /// and is matched case-insensitively. Bad settings fail with
    /// [`NotifyError::Config`].
    pub fn from_hook_config(
        config: &HookConfig,
        renderer: Arc<TemplateRenderer>,
    ) -> Result<Option<Self>, NotifyError> {
        let Some(ref url) = config.url else {
            return Ok(None);
        };

        let method = match config.method {
            Some(ref m) => m
                .to_uppercase()
                .parse::<reqwest::Method>()
                .map_err(|_| NotifyError::Config(format!("invalid HTTP method: {m}")))?,
            None => reqwest::Method::POST,
        };

        if let Some(ref tmpl) = config.body_template {
            renderer
                .validate(tmpl)
                .map_err(|e| NotifyError::Config(format!("invalid body template: {e}")))?;
        }

        Ok(Some(Self {
            url: resolve_env_vars(url)?,
            method,
            body_template: config.body_template.clone(),
            renderer,
            client: reqwest::Client::new(),
        }))
    }

    fn request_body(&self, notification: &Notification) -> Result<String, NotifyError> {
        match self.body_template {
            Some(ref tmpl) => self.renderer.render_body(tmpl, notification),
            None => serde_json::to_string(notification)
                .map_err(|e| NotifyError::Config(format!("failed to serialize notification: {e}"))),
        }
    }
}

#[async_trait::async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let body = self.request_body(notification)?;

        let response = self
            .client
            .request(self.method.clone(), &self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::warn!(
                url = %self.url,
                %status,
                body = %body_text,
                "webhook returned non-2xx status"
            );
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body: body_text,
            });
        }

        tracing::debug!(
            url = %self.url,
            method = %self.method,
            status = %status,
            "webhook notification delivered"
        );
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "webhook"
    }
}

/// Resolve `${VAR_NAME}` patterns using `std::env::var`.
fn resolve_env_vars(input: &str) -> Result<String, NotifyError> {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' || chars.peek() != Some(&'{') {
            result.push(ch);
            continue;
        }
        chars.next();
        let mut var_name = String::new();
        let mut closed = false;
        for c in chars.by_ref() {
            if c == '}' {
                closed = true;
                break;
            }
            var_name.push(c);
        }
        if !closed {
            return Err(NotifyError::Config(format!(
                "unclosed env var reference in: {input}"
            )));
        }
        let value = std::env::var(&var_name)
            .map_err(|_| NotifyError::Config(format!("env var not found: {var_name}")))?;
        result.push_str(&value);
    }

    Ok(result)
}
