//! Read-time visibility of generated events.
//!
//! Fails open: events without a decodable provenance tag, whose rule no
//! longer resolves, or without any date are always visible.

use chrono::{DateTime, Duration, Utc};
use tracing::trace;

use crate::provenance;
use crate::registry::{CompiledRule, RegistryHandle};
use crate::schema::VisibilityMode;
use crate::sink::StoredEvent;

#[derive(Debug, Clone)]
pub struct VisibilityEvaluator {
    registry: RegistryHandle,
}

impl VisibilityEvaluator {
    pub fn new(registry: RegistryHandle) -> Self {
        Self { registry }
    }

    pub fn is_visible_now(&self, event: &StoredEvent, now: DateTime<Utc>) -> bool {
        let Some(tag) = event.provenance_tag.as_deref().and_then(provenance::decode) else {
            return true;
        };
        match self.registry.resolve_by_id(tag.scope, &tag.rule_id) {
            Some(rule) => is_visible_for_rule(rule, event, now),
            None => {
                trace!(event_id = %event.id, rule_id = %tag.rule_id, "rule not found, visible");
                true
            }
        }
    }
}

/// Visibility of `event` under `rule` at `now`. Window bounds are inclusive.
pub fn is_visible_for_rule(rule: &CompiledRule, event: &StoredEvent, now: DateTime<Utc>) -> bool {
    let Some(base) = event.end.or(event.start) else {
        return true;
    };
    let visibility = &rule.spec().visibility;
    match visibility.mode {
        VisibilityMode::Always | VisibilityMode::Unrecognized => true,
        VisibilityMode::AfterDate => now >= base,
        VisibilityMode::UntilDate => now <= base,
        VisibilityMode::Window => {
            // A bound past the representable range does not bound anything.
            let opens = shift(base, -visibility.before_days.unwrap_or(0));
            let closes = shift(base, visibility.after_days.unwrap_or(0));
            opens.map_or(true, |opens| opens <= now) && closes.map_or(true, |closes| now <= closes)
        }
    }
}

fn shift(base: DateTime<Utc>, days: i64) -> Option<DateTime<Utc>> {
    Duration::try_days(days).and_then(|span| base.checked_add_signed(span))
}
