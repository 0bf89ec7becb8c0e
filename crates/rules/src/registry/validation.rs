//! Build-time rule checks against the field and event-type catalogs.

use std::fmt;

use serde::Serialize;

use autoevent_core::{EventTypeProvider, FieldCatalog, FieldCatalogProvider, FieldKind, TimeKind};

use crate::schema::{GroupLink, MemberLink, RuleDefinition, RuleTarget, Scope, TimeSource};

use super::fuzzy::fuzzy_match;

// ── Result types ────────────────────────────────────────────────────

/// The invariant a rule violates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "violation", rename_all = "snake_case")]
pub enum ViolationKind {
    #[error("unknown source type '{source_type}'")]
    UnknownSourceType { source_type: String },

    #[error("unknown field '{field}' on '{record_type}'")]
    UnknownField { record_type: String, field: String },

    #[error("time_source is 'field' but '{field}' is declared as {kind:?}, not date")]
    FieldNotDate { field: String, kind: FieldKind },

    #[error("unknown event type '{event_type}'")]
    UnknownEventType { event_type: String },

    #[error("event type '{event_type}' does not permit time kind '{time_kind}'")]
    TimeKindNotPermitted { event_type: String, time_kind: TimeKind },

    #[error("duplicate rule id within {scope} scope")]
    DuplicateId { scope: Scope },

    #[error("member target is only valid on group rules")]
    MemberTargetOnEntity,

    #[error("'{source_type}' has no member catalog")]
    NoMemberCatalog { source_type: String },

    #[error("group_link is only valid on group rules")]
    GroupLinkOnEntity,

    #[error("member_link 'all_members' is only valid on group rules")]
    AllMembersOnEntity,

    #[error("{setting} must be within 0..=36500 (got {days})")]
    DayOffsetOutOfRange { setting: String, days: i64 },
}

/// Upper bound for any day count in a rule: one hundred years.
pub const MAX_DAY_OFFSET: i64 = 36_500;

/// One violated invariant, attributed to a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleViolation {
    pub rule_id: String,
    pub scope: Scope,
    #[serde(flatten)]
    pub kind: ViolationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl fmt::Display for RuleViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rule '{}' ({}): {}", self.rule_id, self.scope, self.kind)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " (did you mean '{suggestion}'?)")?;
        }
        Ok(())
    }
}

/// Registry build failure. Lists every violation found, not just the first.
#[derive(Debug, Clone, thiserror::Error)]
#[error("rule registry rejected {} violation(s): {}", .violations.len(), summarize(.violations))]
pub struct RegistryError {
    pub violations: Vec<RuleViolation>,
}

impl RegistryError {
    /// Offending rule ids, deduplicated, in report order.
    pub fn rule_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for v in &self.violations {
            if !ids.contains(&v.rule_id.as_str()) {
                ids.push(&v.rule_id);
            }
        }
        ids
    }
}

fn summarize(violations: &[RuleViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// ── Checks ──────────────────────────────────────────────────────────

pub(crate) struct Checker<'a> {
    fields: &'a dyn FieldCatalogProvider,
    event_types: &'a dyn EventTypeProvider,
    violations: Vec<RuleViolation>,
}

impl<'a> Checker<'a> {
    pub(crate) fn new(
        fields: &'a dyn FieldCatalogProvider,
        event_types: &'a dyn EventTypeProvider,
    ) -> Self {
        Self {
            fields,
            event_types,
            violations: Vec::new(),
        }
    }

    pub(crate) fn finish(self) -> Result<(), RegistryError> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(RegistryError {
                violations: self.violations,
            })
        }
    }

    pub(crate) fn duplicate(&mut self, rule: &RuleDefinition) {
        let scope = rule.spec.scope;
        self.push(rule, ViolationKind::DuplicateId { scope }, None);
    }

    /// Check one rule. Returns `true` when it raised no violation.
    pub(crate) fn check(&mut self, rule: &RuleDefinition) -> bool {
        let before = self.violations.len();
        let spec = &rule.spec;

        if spec.scope == Scope::Entity {
            if spec.target == RuleTarget::Member {
                self.push(rule, ViolationKind::MemberTargetOnEntity, None);
            }
            if spec.group_link == GroupLink::Attach {
                self.push(rule, ViolationKind::GroupLinkOnEntity, None);
            }
            if spec.member_link == MemberLink::AllMembers {
                self.push(rule, ViolationKind::AllMembersOnEntity, None);
            }
        }

        let day_offsets = [
            ("interval_days", spec.interval_days),
            ("visibility.before_days", spec.visibility.before_days),
            ("visibility.after_days", spec.visibility.after_days),
        ];
        for (setting, days) in day_offsets {
            if let Some(days) = days.filter(|d| !(0..=MAX_DAY_OFFSET).contains(d)) {
                let kind = ViolationKind::DayOffsetOutOfRange {
                    setting: setting.to_string(),
                    days,
                };
                self.push(rule, kind, None);
            }
        }

        self.check_field(rule);
        self.check_event_type(rule);

        self.violations.len() == before
    }

    fn check_field(&mut self, rule: &RuleDefinition) {
        let spec = &rule.spec;
        let Some(catalog) = self.fields.field_catalog(&spec.source_type) else {
            let suggestion = fuzzy_match(&spec.source_type, &self.fields.record_types());
            let kind = ViolationKind::UnknownSourceType {
                source_type: spec.source_type.clone(),
            };
            self.push(rule, kind, suggestion.map(str::to_string));
            return;
        };

        let (record_type, fields) = match watched_catalog(catalog, spec.target) {
            Some(found) => found,
            None if spec.scope == Scope::Entity => return,
            None => {
                let kind = ViolationKind::NoMemberCatalog {
                    source_type: spec.source_type.clone(),
                };
                self.push(rule, kind, None);
                return;
            }
        };

        match fields.get(&spec.field) {
            None => {
                let known: Vec<&str> = fields.keys().map(String::as_str).collect();
                let suggestion = fuzzy_match(&spec.field, &known).map(str::to_string);
                let kind = ViolationKind::UnknownField {
                    record_type,
                    field: spec.field.clone(),
                };
                self.push(rule, kind, suggestion);
            }
            Some(kind) if spec.time_source == TimeSource::Field && *kind != FieldKind::Date => {
                let kind = ViolationKind::FieldNotDate {
                    field: spec.field.clone(),
                    kind: *kind,
                };
                self.push(rule, kind, None);
            }
            Some(_) => {}
        }
    }

    fn check_event_type(&mut self, rule: &RuleDefinition) {
        let spec = &rule.spec;
        match self.event_types.event_type(&spec.event_type) {
            None => {
                let suggestion = fuzzy_match(&spec.event_type, &self.event_types.event_type_names())
                    .map(str::to_string);
                let kind = ViolationKind::UnknownEventType {
                    event_type: spec.event_type.clone(),
                };
                self.push(rule, kind, suggestion);
            }
            Some(def) if !def.permits(spec.time_kind) => {
                let kind = ViolationKind::TimeKindNotPermitted {
                    event_type: spec.event_type.clone(),
                    time_kind: spec.time_kind,
                };
                self.push(rule, kind, None);
            }
            Some(_) => {}
        }
    }

    fn push(&mut self, rule: &RuleDefinition, kind: ViolationKind, suggestion: Option<String>) {
        self.violations.push(RuleViolation {
            rule_id: rule.id().to_string(),
            scope: rule.spec.scope,
            kind,
            suggestion,
        });
    }
}

/// The catalog the watched field is looked up in: the record's own, or its
/// member catalog for member-target rules.
fn watched_catalog(
    catalog: &FieldCatalog,
    target: RuleTarget,
) -> Option<(String, &indexmap::IndexMap<String, FieldKind>)> {
    match target {
        RuleTarget::Record => Some((catalog.record_type.clone(), &catalog.fields)),
        RuleTarget::Member => catalog
            .members
            .as_ref()
            .map(|m| (format!("{}.{}", catalog.record_type, m.list_field), &m.fields)),
    }
}
