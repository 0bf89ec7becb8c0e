//! Minijinja template rendering for notification messages.
//!
//! Renders notification subject and body templates with access to the
//! rule, the emitted event, the record the rule fired on and the full
//! change context.
//!
//! Templates are arbitrary strings (not pre-registered), so a fresh
//! [`minijinja::Environment`] is created per render call.

use serde::Serialize;

use autoevent_rules::hook::HookNotice;
use autoevent_rules::schema::Scope;

use crate::traits::{Notification, NotifyError};

/// Context data available to notification templates.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateContext {
    pub rule: RuleContext,
    pub event: EventContext,
    /// The record (or member) after the write.
    pub subject: serde_json::Value,
    /// Everything the rule's condition and title saw.
    pub context: serde_json::Value,
    /// Current timestamp in RFC 3339 format.
    pub now: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RuleContext {
    pub id: String,
    pub name: String,
    pub scope: Scope,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventContext {
    pub id: String,
    pub event_type: String,
    pub title: String,
}

impl TemplateContext {
    pub fn from_notice(notice: &HookNotice) -> Self {
        Self {
            rule: RuleContext {
                id: notice.rule_id.clone(),
                name: notice.rule_name.clone(),
                scope: notice.scope,
            },
            event: EventContext {
                id: notice.event_id.clone(),
                event_type: notice.event_type.clone(),
                title: notice.title.clone(),
            },
            subject: notice.subject.to_json(),
            context: notice.rendered_context.to_json(),
            now: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Renders notification templates using minijinja.
#[derive(Debug, Default)]
pub struct TemplateRenderer {
    _private: (),
}

impl TemplateRenderer {
    pub fn new() -> Self {
        Self { _private: () }
    }

    fn build_env() -> minijinja::Environment<'static> {
        let mut env = minijinja::Environment::new();
        env.add_filter("round", round_filter);
        env.add_filter("lower", lower_filter);
        env.add_filter("upper", upper_filter);
        env.add_function("env", env_function);
        env
    }

    /// Render a template string against any serializable context.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Template`] if the template is invalid or
    /// rendering fails.
    pub fn render<S: Serialize>(&self, template_str: &str, ctx: &S) -> Result<String, NotifyError> {
        let env = Self::build_env();
        env.render_str(template_str, ctx)
            .map_err(|e| NotifyError::Template(e.to_string()))
    }

    /// Render a webhook body: the notification is exposed as `notification`.
    pub fn render_body(&self, template_str: &str, notification: &Notification) -> Result<String, NotifyError> {
        self.render(template_str, &minijinja::context! { notification => notification })
    }

    /// Check syntax only; nothing is evaluated.
    pub fn validate(&self, template_str: &str) -> Result<(), NotifyError> {
        let env = Self::build_env();
        env.template_from_str(template_str)
            .map_err(|e| NotifyError::Template(e.to_string()))?;
        Ok(())
    }
}

/// Round a float to N decimal places.
fn round_filter(value: f64, decimals: Option<u32>) -> String {
    let n = decimals.unwrap_or(0);
    format!("{:.prec$}", value, prec = n as usize)
}

fn lower_filter(value: String) -> String {
    value.to_lowercase()
}

fn upper_filter(value: String) -> String {
    value.to_uppercase()
}

/// Read an environment variable by name, empty when unset.
fn env_function(name: String) -> String {
    match std::env::var(&name) {
        Ok(val) => val,
        Err(_) => {
            tracing::warn!(var = %name, "environment variable not found, rendering empty string");
            String::new()
        }
    }
}
