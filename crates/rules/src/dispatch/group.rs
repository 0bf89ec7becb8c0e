//! Group-record dispatch: the group's own fields, then each member.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::{debug, trace, warn};

use autoevent_core::{FieldValue, MemberCatalog, Record};

use crate::schema::Scope;
use crate::sink::Participant;
use crate::trigger::{classify, should_fire};

use super::{
    candidate_fields, Attempt, DispatchReport, Dispatcher, MemberState, Session, Source, EMPTY,
    NULL,
};

/// A saved group record.
///
/// Members are read from `next_members`/`prev_members` when given,
/// otherwise from the record's member list field.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupWrite {
    pub record_type: String,
    pub id: String,
    pub actor_id: String,
    pub next: Record,
    #[serde(default)]
    pub prev: Option<Record>,
    #[serde(default)]
    pub next_members: Option<Vec<Record>>,
    #[serde(default)]
    pub prev_members: Option<Vec<Record>>,
}

/// A member with its stable key resolved.
struct Keyed<'a> {
    key: String,
    record: &'a Record,
}

impl Dispatcher {
    pub async fn dispatch_group(&self, write: &GroupWrite) -> DispatchReport {
        let registry = &self.registry;
        if !registry.has_any(Scope::Group, &write.record_type) {
            trace!(record_type = %write.record_type, "no group rules for type");
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

        let member_ref_type = format!("{}.member", write.record_type);
        let (next_members, prev_members) = match catalog.members {
            Some(ref members) => (
                keyed_members(write.next_members.as_deref(), after, members, true),
                keyed_members(write.prev_members.as_deref(), before, members, false),
            ),
            None => (Vec::new(), Vec::new()),
        };
        let all_members: Vec<Participant> = next_members
            .iter()
            .map(|m| Participant {
                ref_type: member_ref_type.clone(),
                ref_id: m.key.clone(),
            })
            .collect();

        let mut session = self.session();

        // Group-level fields.
        for field in candidate_fields(catalog.fields.keys(), before, after) {
            let rules = registry.rules_for(Scope::Group, &write.record_type, field);
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
                    all_members: &all_members,
                };
                self.attempt(&mut session, attempt).await;
            }
        }

        // Member-level pass.
        if let Some(ref members) = catalog.members {
            if registry.has_member_rules(&write.record_type) {
                let previous: HashMap<&str, &Record> = prev_members
                    .iter()
                    .map(|m| (m.key.as_str(), m.record))
                    .collect();
                for member in &next_members {
                    let state = MemberState {
                        key: &member.key,
                        ref_type: &member_ref_type,
                        before: previous.get(member.key.as_str()).copied().unwrap_or(&EMPTY),
                        after: member.record,
                    };
                    self.dispatch_member(&mut session, members, source, state, &all_members)
                        .await;
                }
            }
        }

        debug!(
            record_type = %write.record_type,
            id = %write.id,
            members = next_members.len(),
            emitted = session.report.emitted.len(),
            skipped = session.report.skipped.len(),
            failures = session.report.failures.len(),
            "group dispatch finished"
        );
        session.report
    }

    async fn dispatch_member(
        &self,
        session: &mut Session,
        catalog: &MemberCatalog,
        source: Source<'_>,
        member: MemberState<'_>,
        all_members: &[Participant],
    ) {
        for field in candidate_fields(catalog.fields.keys(), member.before, member.after) {
            let rules = self.registry.member_rules_for(source.record_type, field);
            if rules.is_empty() {
                continue;
            }
            let prev = member.before.get(field).unwrap_or(&NULL);
            let next = member.after.get(field).unwrap_or(&NULL);
            let classification = classify(prev, next);

            for rule in rules {
                if !should_fire(rule.spec().trigger, &classification) {
                    trace!(rule_id = %rule.id(), field, member_key = member.key, "trigger did not fire");
                    continue;
                }
                let attempt = Attempt {
                    rule,
                    field,
                    prev,
                    next,
                    source,
                    member: Some(member),
                    all_members,
                };
                self.attempt(session, attempt).await;
            }
        }
    }
}

/// Resolve the member list and each member's key.
///
/// Non-object entries are ignored. Members without a key have no stable
/// identity to diff against and are skipped; only the current list warns.
fn keyed_members<'a>(
    explicit: Option<&'a [Record]>,
    record: &'a Record,
    catalog: &MemberCatalog,
    warn_missing: bool,
) -> Vec<Keyed<'a>> {
    let records: Vec<&'a Record> = match explicit {
        Some(list) => list.iter().collect(),
        None => match record.get(&catalog.list_field) {
            Some(FieldValue::List(items)) => items.iter().filter_map(FieldValue::as_object).collect(),
            _ => Vec::new(),
        },
    };

    records
        .into_iter()
        .enumerate()
        .filter_map(|(index, member)| {
            let key = member.get(&catalog.key_field).filter(|v| v.is_present());
            match key {
                Some(key) => Some(Keyed {
                    key: key.to_text(),
                    record: member,
                }),
                None => {
                    if warn_missing {
                        warn!(index, key_field = %catalog.key_field, "member has no key, skipped");
                    }
                    None
                }
            }
        })
        .collect()
}
