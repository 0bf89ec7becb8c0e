//! Singular-record dispatch.

use serde::Deserialize;
use tracing::{debug, trace, warn};

use autoevent_core::Record;

use crate::schema::Scope;
use crate::trigger::{classify, should_fire};

use super::{candidate_fields, Attempt, DispatchReport, Dispatcher, Source, EMPTY, NULL};

/// A saved singular record. `prev` is absent on create.
#[derive(Debug, Clone, Deserialize)]
pub struct EntityWrite {
    pub record_type: String,
    pub id: String,
    pub actor_id: String,
    pub next: Record,
    #[serde(default)]
    pub prev: Option<Record>,
}

impl Dispatcher {
    pub async fn dispatch_entity(&self, write: &EntityWrite) -> DispatchReport {
        let registry = &self.registry;
        if !registry.has_any(Scope::Entity, &write.record_type) {
            trace!(record_type = %write.record_type, "no entity rules for type");
            return DispatchReport::default();
        }
        let Some(catalog) = self.catalogs.field_catalog(&write.record_type) else {
            warn!(record_type = %write.record_type, "rules exist but type has no field catalog");
            return DispatchReport::default();
        };

        let before = write.prev.as_ref().unwrap_or(&EMPTY);
        let after = &write.next;
        let source = Source {
            record_type: &write.record_type,
            id: &write.id,
            actor_id: &write.actor_id,
            before,
            after,
        };

        let mut session = self.session();
        for field in candidate_fields(catalog.fields.keys(), before, after) {
            let rules = registry.rules_for(Scope::Entity, &write.record_type, field);
            if rules.is_empty() {
                continue;
            }
            let prev = before.get(field).unwrap_or(&NULL);
            let next = after.get(field).unwrap_or(&NULL);
            let classification = classify(prev, next);

            for rule in rules {
                if !should_fire(rule.spec().trigger, &classification) {
                    trace!(rule_id = %rule.id(), field, "trigger did not fire");
                    continue;
                }
                let attempt = Attempt {
                    rule,
                    field,
                    prev,
                    next,
                    source,
                    member: None,
                    all_members: &[],
                };
                self.attempt(&mut session, attempt).await;
            }
        }

        debug!(
            record_type = %write.record_type,
            id = %write.id,
            emitted = session.report.emitted.len(),
            skipped = session.report.skipped.len(),
            failures = session.report.failures.len(),
            "entity dispatch finished"
        );
        session.report
    }
}
