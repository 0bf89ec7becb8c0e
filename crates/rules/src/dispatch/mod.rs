//! Write-path dispatch: turns record writes into generated events.
//!
//! Both entry points ([`Dispatcher::dispatch_entity`] and
//! [`Dispatcher::dispatch_group`]) diff the written record field by field,
//! classify each change, and hand every firing rule to the same attempt
//! pipeline:
//!
//! 1. dedup on `(rule, field[, member])` within the call
//! 2. resolve the base date from the field or today
//! 3. evaluate the rule's condition against the change context
//! 4. compute the date range and render title and description
//! 5. build participants and the optional group reference
//! 6. create the event through the [`EventSink`]
//! 7. notify the optional [`RuleHook`]
//!
//! A sink failure is recorded for that attempt only. Hook failures are
//! logged and dropped.

mod entity;
mod group;
mod report;


use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use autoevent_core::{FieldCatalogProvider, FieldValue, Record};

use crate::evaluator::{evaluate, EvalContext};
use crate::hook::{HookNotice, RuleHook};
use crate::registry::{CompiledRule, RegistryHandle};
use crate::schema::{GroupLink, MemberLink, Scope, TimeSource};
use crate::sink::{EventSink, GroupRef, NewEvent, Participant, Recurrence};
use crate::temporal::{compute_range, render_template, Clock, SystemClock, Temporal};

pub use entity::EntityWrite;
pub use group::GroupWrite;
pub use report::{AttemptKey, DispatchReport, Emitted, Failure, SkipReason, Skipped};

/// Prefix of every member-sourced event title.
pub const MEMBER_TITLE_MARKER: &str = "[member] ";

static NULL: FieldValue = FieldValue::Null;
static EMPTY: Record = Record::new();

pub struct Dispatcher {
    registry: RegistryHandle,
    catalogs: Arc<dyn FieldCatalogProvider>,
    sink: Arc<dyn EventSink>,
    hook: Option<Arc<dyn RuleHook>>,
    temporal: Temporal,
    clock: Arc<dyn Clock>,
}

impl Dispatcher {
    /// Dispatcher on the wall clock in UTC, with no hook.
    pub fn new(
        registry: RegistryHandle,
        catalogs: Arc<dyn FieldCatalogProvider>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            registry,
            catalogs,
            sink,
            hook: None,
            temporal: Temporal::utc(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_hook(mut self, hook: Arc<dyn RuleHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn with_temporal(mut self, temporal: Temporal) -> Self {
        self.temporal = temporal;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn registry(&self) -> &RegistryHandle {
        &self.registry
    }

    fn session(&self) -> Session {
        Session {
            now: self.clock.now(),
            seen: HashSet::new(),
            report: DispatchReport::default(),
        }
    }

    /// Steps 1–7 for one firing rule.
    async fn attempt(&self, session: &mut Session, attempt: Attempt<'_>) {
        let rule = attempt.rule;
        let spec = rule.spec();
        let key = AttemptKey::new(rule.id(), attempt.field, attempt.member.map(|m| m.key));
        if !session.seen.insert(key.clone()) {
            debug!(rule_id = %key.rule_id, field = %key.field, "duplicate attempt ignored");
            return;
        }

        let base = match spec.time_source {
            TimeSource::Now => self.temporal.start_of_day(session.now),
            TimeSource::Field => match self.temporal.to_date(attempt.next) {
                Some(date) => Some(date),
                None => {
                    debug!(rule_id = %key.rule_id, field = %key.field, "field value is not a date, skipping");
                    session.skip(key, SkipReason::InvalidDate);
                    return;
                }
            },
        };
        let Some(base) = base else {
            warn!(rule_id = %key.rule_id, field = %key.field, "base date out of range, skipping");
            session.skip(key, SkipReason::DateOutOfRange);
            return;
        };

        let context = self.change_context(&attempt, session.now, base);
        let eval_ctx = EvalContext::new(&context, self.temporal);
        if !evaluate(spec.condition.as_ref(), &eval_ctx) {
            debug!(rule_id = %key.rule_id, field = %key.field, "condition false, skipping");
            session.skip(key, SkipReason::ConditionFalse);
            return;
        }

        let mut title = render_template(&spec.title, &context);
        if attempt.member.is_some() {
            title.insert_str(0, MEMBER_TITLE_MARKER);
        }
        let description = spec
            .description
            .as_deref()
            .map(|d| render_template(d, &context));

        let mut payload = spec.prefill.clone();
        payload.insert("title".into(), FieldValue::Text(title.clone()));
        if let Some(description) = description {
            payload.insert("description".into(), FieldValue::Text(description));
        }
        if let Some(ref hint) = spec.ui_hint {
            payload.insert("ui_hint".into(), FieldValue::from(hint.clone()));
        }

        let Some(range) = compute_range(base, spec.time_kind, spec.interval_days) else {
            warn!(rule_id = %key.rule_id, field = %key.field, %base, "interval end out of range, skipping");
            session.skip(key, SkipReason::DateOutOfRange);
            return;
        };
        let event = NewEvent {
            event_type: spec.event_type.clone(),
            actor_id: attempt.source.actor_id.to_string(),
            payload,
            time_kind: spec.time_kind,
            start: range.start,
            end: range.end,
            all_day: rule.all_day,
            recurrence: Recurrence::for_kind(spec.time_kind),
            group: self.group_ref(&attempt),
            participants: participants(&attempt),
            visibility_default: Some(spec.visibility.mode),
            provenance_tag: Some(rule.provenance.encode()),
        };

        let event_id = match self.sink.create_event(event).await {
            Ok(id) => id,
            Err(e) => {
                warn!(
                    rule_id = %key.rule_id,
                    field = %key.field,
                    member_key = ?key.member_key,
                    error = %e,
                    "event creation failed"
                );
                session.report.failures.push(Failure {
                    key,
                    error: e.to_string(),
                });
                return;
            }
        };
        info!(
            rule_id = %key.rule_id,
            field = %key.field,
            member_key = ?key.member_key,
            event_id = %event_id,
            "event emitted"
        );

        if let Some(ref hook) = self.hook {
            let subject = attempt.member.map_or(attempt.source.after, |m| m.after);
            let notice = HookNotice {
                scope: rule.scope(),
                rule_id: rule.id().to_string(),
                rule_name: rule.name().to_string(),
                event_id: event_id.clone(),
                event_type: spec.event_type.clone(),
                title,
                subject: FieldValue::Object(subject.clone()),
                rendered_context: context,
            };
            if let Err(e) = hook.on_event(&notice).await {
                warn!(rule_id = %key.rule_id, hook = hook.name(), error = %e, "hook failed");
            }
        }

        session.report.emitted.push(Emitted { key, event_id });
    }

    /// The values conditions and templates can reference.
    fn change_context(&self, attempt: &Attempt<'_>, now: DateTime<Utc>, base: DateTime<Utc>) -> FieldValue {
        let rule = attempt.rule;
        let source = &attempt.source;
        let mut ctx = Record::new();
        ctx.insert("now".into(), FieldValue::Date(now));
        ctx.insert("field".into(), attempt.field.into());
        ctx.insert("value".into(), attempt.next.clone());
        ctx.insert("previous".into(), attempt.prev.clone());
        ctx.insert("base_date".into(), FieldValue::Date(base));
        ctx.insert("base_day".into(), self.temporal.calendar_day(base).into());
        ctx.insert("before".into(), FieldValue::Object(source.before.clone()));
        ctx.insert("after".into(), FieldValue::Object(source.after.clone()));
        ctx.insert("actor".into(), source.actor_id.into());
        ctx.insert(
            "source".into(),
            object([("type", source.record_type.into()), ("id", source.id.into())]),
        );
        ctx.insert(
            "rule".into(),
            object([("id", rule.id().into()), ("name", rule.name().into())]),
        );
        if let Some(member) = attempt.member {
            ctx.insert(
                "member".into(),
                object([
                    ("key", member.key.into()),
                    ("id", member.key.into()),
                    ("fields", FieldValue::Object(member.after.clone())),
                    ("before", FieldValue::Object(member.before.clone())),
                ]),
            );
        }
        FieldValue::Object(ctx)
    }

    fn group_ref(&self, attempt: &Attempt<'_>) -> Option<GroupRef> {
        let spec = attempt.rule.spec();
        match (spec.scope, spec.group_link) {
            (Scope::Group, GroupLink::Attach) => Some(GroupRef {
                group_type: attempt.source.record_type.to_string(),
                group_id: attempt.source.id.to_string(),
            }),
            _ => None,
        }
    }
}

fn participants(attempt: &Attempt<'_>) -> Vec<Participant> {
    match attempt.rule.spec().member_link {
        MemberLink::None => Vec::new(),
        MemberLink::AllMembers => attempt.all_members.to_vec(),
        MemberLink::Entity => match attempt.member {
            Some(member) => vec![Participant {
                ref_type: member.ref_type.to_string(),
                ref_id: member.key.to_string(),
            }],
            None => vec![Participant {
                ref_type: attempt.source.record_type.to_string(),
                ref_id: attempt.source.id.to_string(),
            }],
        },
    }
}

fn object<const N: usize>(entries: [(&str, FieldValue); N]) -> FieldValue {
    FieldValue::Object(entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
}

/// Candidate fields in catalog order: recognized keys present in either state.
fn candidate_fields<'c>(
    catalog_fields: impl Iterator<Item = &'c String>,
    before: &Record,
    after: &Record,
) -> Vec<&'c str> {
    catalog_fields
        .filter(|key| before.contains_key(*key) || after.contains_key(*key))
        .map(String::as_str)
        .collect()
}

// ── Per-call state ──────────────────────────────────────────────────

struct Session {
    now: DateTime<Utc>,
    seen: HashSet<AttemptKey>,
    report: DispatchReport,
}

impl Session {
    fn skip(&mut self, key: AttemptKey, reason: SkipReason) {
        self.report.skipped.push(Skipped { key, reason });
    }
}

/// The written record as seen by every attempt of one call.
#[derive(Clone, Copy)]
struct Source<'a> {
    record_type: &'a str,
    id: &'a str,
    actor_id: &'a str,
    before: &'a Record,
    after: &'a Record,
}

#[derive(Clone, Copy)]
struct MemberState<'a> {
    key: &'a str,
    ref_type: &'a str,
    before: &'a Record,
    after: &'a Record,
}

struct Attempt<'a> {
    rule: &'a CompiledRule,
    field: &'a str,
    prev: &'a FieldValue,
    next: &'a FieldValue,
    source: Source<'a>,
    member: Option<MemberState<'a>>,
    all_members: &'a [Participant],
}
