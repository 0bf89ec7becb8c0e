//! Shared fixtures for unit tests.

use autoevent_core::{CatalogSet, EventTypeDef, FieldCatalog, FieldKind, MemberCatalog, TimeKind};

use crate::schema::{RuleDefinition, RuleSpec, RuleTarget, Scope, Trigger};

/// `order` (entity) and `crew` (group with `members`) catalogs plus three
/// event types.
pub(crate) fn catalogs() -> CatalogSet {
    CatalogSet::new()
        .with_record(
            FieldCatalog::new("order")
                .field("code", FieldKind::Text)
                .field("phase", FieldKind::Text)
                .field("delivery_date", FieldKind::Date)
                .field("amount", FieldKind::Number)
                .field("customer", FieldKind::Text),
        )
        .with_record(
            FieldCatalog::new("crew")
                .field("name", FieldKind::Text)
                .field("site", FieldKind::Text)
                .field("start_date", FieldKind::Date)
                .with_members(
                    MemberCatalog::new()
                        .field("name", FieldKind::Text)
                        .field("role", FieldKind::Text)
                        .field("status", FieldKind::Text)
                        .field("certificate_expiry", FieldKind::Date),
                ),
        )
        .with_event_type(EventTypeDef {
            name: "milestone".into(),
            time_kinds: vec![TimeKind::Point, TimeKind::Interval],
            all_day: false,
        })
        .with_event_type(EventTypeDef {
            name: "deadline".into(),
            time_kinds: vec![TimeKind::Deadline],
            all_day: true,
        })
        .with_event_type(EventTypeDef {
            name: "reminder".into(),
            time_kinds: vec![TimeKind::Point, TimeKind::Deadline, TimeKind::RecurringYearly],
            all_day: true,
        })
}

pub(crate) fn entity_rule(id: &str, field: &str, trigger: Trigger) -> RuleDefinition {
    RuleDefinition::new(
        id,
        RuleSpec::new(Scope::Entity, "order", field, trigger, "milestone", "{{after.code}}"),
    )
}

pub(crate) fn group_rule(id: &str, field: &str, trigger: Trigger) -> RuleDefinition {
    RuleDefinition::new(
        id,
        RuleSpec::new(Scope::Group, "crew", field, trigger, "milestone", "{{after.name}}"),
    )
}

pub(crate) fn member_rule(id: &str, field: &str, trigger: Trigger) -> RuleDefinition {
    let mut rule = group_rule(id, field, trigger);
    rule.spec.target = RuleTarget::Member;
    rule.spec.title = "{{member.fields.name}}".into();
    rule
}
