//! End-to-end scenarios: YAML documents in, events out.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;

use autoevent_core::{record_from_json, CatalogSet, FieldValue, TimeKind};
use autoevent_rules::dispatch::{SkipReason, MEMBER_TITLE_MARKER};
use autoevent_rules::loader::parse_document;
use autoevent_rules::registry::ViolationKind;
use autoevent_rules::schema::{RuleDefinition, RuleDocument};
use autoevent_rules::sink::MemoryEventSink;
use autoevent_rules::temporal::FixedClock;
use autoevent_rules::{Dispatcher, EntityWrite, GroupWrite, RuleRegistry, VisibilityEvaluator};

const CATALOGS: &[&str] = &[
    r#"
apiVersion: v1
kind: FieldCatalog
metadata: { id: order-fields, name: Order fields }
spec:
  record_type: order
  fields:
    code: text
    phase: text
    amount: number
    delivery_date: date
"#,
    r#"
apiVersion: v1
kind: FieldCatalog
metadata: { id: crew-fields, name: Crew fields }
spec:
  record_type: crew
  fields:
    name: text
  members:
    fields:
      name: text
      role: text
"#,
    r#"
apiVersion: v1
kind: EventTypeCatalog
metadata: { id: event-types, name: Event types }
spec:
  event_types:
    - name: milestone
      time_kinds: [point, interval]
    - name: deadline
      time_kinds: [deadline]
      all_day: true
"#,
];

const CUT_STARTED: &str = r#"
apiVersion: v1
kind: AutoEventRule
metadata: { id: cut-started, name: Cutting started }
spec:
  scope: entity
  source_type: order
  field: phase
  trigger: on_change
  event_type: milestone
  time_kind: point
  time_source: now
  visibility: { mode: window, before_days: 20, after_days: 5 }
  title: "Order {{after.code}} is in {{value}}"
  condition:
    type: compare
    left: { path: value }
    op: "=="
    right: { const: Taglio }
"#;

const DELIVERY: &str = r#"
apiVersion: v1
kind: AutoEventRule
metadata: { id: delivery, name: Delivery }
spec:
  scope: entity
  source_type: order
  field: delivery_date
  trigger: on_save
  event_type: deadline
  time_kind: deadline
  time_source: field
  title: "Deliver {{after.code}}"
"#;

const BIG_ORDER: &str = r#"
apiVersion: v1
kind: AutoEventRule
metadata: { id: big-order, name: Big order }
spec:
  scope: entity
  source_type: order
  field: code
  trigger: on_save
  event_type: milestone
  time_kind: point
  time_source: now
  title: "Big order {{after.code}}"
  condition:
    type: compare
    left: { path: after.amount }
    op: ">="
    right: { const: 1000 }
    value_kind: number
"#;

const ROLE_CHANGED: &str = r#"
apiVersion: v1
kind: AutoEventRule
metadata: { id: role-changed, name: Role changed }
spec:
  scope: group
  source_type: crew
  target: member
  field: role
  trigger: on_change
  event_type: milestone
  time_kind: point
  time_source: now
  title: "{{member.fields.name}} is now {{value}}"
"#;

const ROLE_AUDIT: &str = r#"
apiVersion: v1
kind: AutoEventRule
metadata: { id: role-audit, name: Role audit }
spec:
  scope: group
  source_type: crew
  target: member
  field: role
  trigger: on_save
  event_type: milestone
  time_kind: point
  time_source: now
  title: "Audit {{member.key}}"
  group_link: attach
"#;

fn at(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

fn catalogs() -> CatalogSet {
    let mut set = CatalogSet::new();
    for yaml in CATALOGS {
        match parse_document(yaml).unwrap() {
            RuleDocument::FieldCatalog(doc) => set.insert_record(doc.spec),
            RuleDocument::EventTypeCatalog(doc) => {
                doc.spec.event_types.into_iter().for_each(|d| set.insert_event_type(d))
            }
            RuleDocument::Rule(_) => unreachable!(),
        }
    }
    set
}

fn rules(yamls: &[&str]) -> Vec<RuleDefinition> {
    yamls
        .iter()
        .map(|y| parse_document(y).unwrap().as_rule().cloned().unwrap())
        .collect()
}

struct Harness {
    dispatcher: Dispatcher,
    sink: Arc<MemoryEventSink>,
}

fn harness(yamls: &[&str], now: &str) -> Harness {
    let catalogs = Arc::new(catalogs());
    let registry = RuleRegistry::build(rules(yamls), catalogs.as_ref(), catalogs.as_ref())
        .unwrap()
        .into_handle();
    let sink = Arc::new(MemoryEventSink::new());
    let dispatcher = Dispatcher::new(registry, catalogs, sink.clone())
        .with_clock(Arc::new(FixedClock(at(now))));
    Harness { dispatcher, sink }
}

fn order(prev: Option<serde_json::Value>, next: serde_json::Value) -> EntityWrite {
    EntityWrite {
        record_type: "order".into(),
        id: "o-1".into(),
        actor_id: "u-1".into(),
        next: record_from_json(next),
        prev: prev.map(record_from_json),
    }
}

// ── Scenario A ──────────────────────────────────────────────────────

#[tokio::test]
async fn scenario_a_phase_change_fires_point_event_today() {
    let h = harness(&[CUT_STARTED], "2025-03-10T15:00:00Z");

    let report = h
        .dispatcher
        .dispatch_entity(&order(
            Some(json!({"code": "ORD-7", "phase": "Progettazione"})),
            json!({"code": "ORD-7", "phase": "Taglio"}),
        ))
        .await;

    assert_eq!(report.emitted.len(), 1);
    let events = h.sink.events();
    let (id, event) = &events[0];
    assert_eq!(event.time_kind, TimeKind::Point);
    assert_eq!(event.start, Some(at("2025-03-10T00:00:00Z")));
    assert_eq!(event.end, None);
    assert_eq!(
        event.payload.get("title"),
        Some(&FieldValue::from("Order ORD-7 is in Taglio"))
    );

    // The emitted event is visible inside its window and hidden after it.
    let visibility = VisibilityEvaluator::new(h.dispatcher.registry().clone());
    let stored = event.to_stored(id.clone());
    assert!(visibility.is_visible_now(&stored, at("2025-03-15T00:00:00Z")));
    assert!(!visibility.is_visible_now(&stored, at("2025-03-15T00:00:01Z")));
}

// ── Scenario B ──────────────────────────────────────────────────────

#[tokio::test]
async fn scenario_b_same_value_does_not_fire() {
    let h = harness(&[CUT_STARTED], "2025-03-10T15:00:00Z");

    let report = h
        .dispatcher
        .dispatch_entity(&order(
            Some(json!({"code": "ORD-7", "phase": "Taglio"})),
            json!({"code": "ORD-7", "phase": "Taglio"}),
        ))
        .await;

    assert!(report.emitted.is_empty());
    assert!(h.sink.is_empty());
}

// ── Scenario C ──────────────────────────────────────────────────────

#[tokio::test]
async fn scenario_c_unparsable_field_date_is_skipped() {
    let h = harness(&[DELIVERY], "2025-03-10T15:00:00Z");

    let report = h
        .dispatcher
        .dispatch_entity(&order(None, json!({"code": "ORD-7", "delivery_date": "not-a-date"})))
        .await;

    assert!(report.emitted.is_empty());
    assert!(report.failures.is_empty());
    assert_eq!(report.skipped_for("delivery"), vec![SkipReason::InvalidDate]);
    assert!(h.sink.is_empty());
}

// ── Scenario D ──────────────────────────────────────────────────────

#[tokio::test]
async fn scenario_d_two_rules_on_one_member_field_fire_independently() {
    let h = harness(&[ROLE_CHANGED, ROLE_AUDIT], "2025-03-10T15:00:00Z");

    let write = GroupWrite {
        record_type: "crew".into(),
        id: "c-1".into(),
        actor_id: "u-1".into(),
        prev: Some(record_from_json(json!({
            "name": "Alpha",
            "members": [{"id": "m-1", "name": "Ada", "role": "fitter"}]
        }))),
        next: record_from_json(json!({
            "name": "Alpha",
            "members": [{"id": "m-1", "name": "Ada", "role": "welder"}]
        })),
        next_members: None,
        prev_members: None,
    };
    let report = h.dispatcher.dispatch_group(&write).await;

    assert_eq!(report.emitted_for("role-changed"), 1);
    assert_eq!(report.emitted_for("role-audit"), 1);
    assert!(report
        .emitted
        .iter()
        .all(|e| e.key.member_key.as_deref() == Some("m-1") && e.key.field == "role"));

    let titles: Vec<String> = h
        .sink
        .events()
        .iter()
        .map(|(_, e)| e.payload.get("title").map(FieldValue::to_text).unwrap_or_default())
        .collect();
    assert!(titles.iter().all(|t| t.starts_with(MEMBER_TITLE_MARKER)));
    assert!(titles.contains(&"[member] Ada is now welder".to_string()));
    assert!(titles.contains(&"[member] Audit m-1".to_string()));
}

// ── Scenario E ──────────────────────────────────────────────────────

#[test]
fn scenario_e_unknown_event_type_fails_build_naming_rule() {
    let yaml = CUT_STARTED.replace("event_type: milestone", "event_type: kickoff");
    let catalogs = catalogs();
    let err = RuleRegistry::build(rules(&[&yaml]), &catalogs, &catalogs).unwrap_err();

    assert_eq!(err.rule_ids(), vec!["cut-started"]);
    assert!(matches!(
        err.violations[0].kind,
        ViolationKind::UnknownEventType { ref event_type } if event_type == "kickoff"
    ));
    assert!(err.to_string().contains("cut-started"));
}

// ── Numeric threshold ───────────────────────────────────────────────

#[tokio::test]
async fn numeric_threshold_needs_complete_data() {
    let h = harness(&[BIG_ORDER], "2025-03-10T15:00:00Z");

    let cases = [
        (json!({"code": "A", "amount": 999}), false),
        (json!({"code": "B", "amount": 1000}), true),
        (json!({"code": "C"}), false),
    ];
    for (next, fires) in cases {
        let report = h.dispatcher.dispatch_entity(&order(None, next.clone())).await;
        assert_eq!(report.emitted_for("big-order") == 1, fires, "{next}");
    }
    assert_eq!(h.sink.len(), 1);
}
