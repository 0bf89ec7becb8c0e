//! Trigger classification: decides, from a field's before/after values,
//! whether a rule is eligible to fire.

use autoevent_core::FieldValue;

use crate::schema::Trigger;

/// Before/after facts about one field in one write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub has_prev: bool,
    pub has_next: bool,
    /// Canonical structural inequality, independent of key order.
    pub changed: bool,
    pub first_set: bool,
}

pub fn classify(prev: &FieldValue, next: &FieldValue) -> Classification {
    let has_prev = prev.is_present();
    let has_next = next.is_present();
    Classification {
        has_prev,
        has_next,
        changed: !prev.canonical_eq(next),
        first_set: !has_prev && has_next,
    }
}

pub fn should_fire(trigger: Trigger, classification: &Classification) -> bool {
    match trigger {
        Trigger::OnSave => classification.has_next,
        Trigger::OnChange => classification.changed && classification.has_next,
        Trigger::OnFirstSet => classification.first_set,
        Trigger::Unrecognized => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn samples() -> Vec<FieldValue> {
        vec![
            FieldValue::Null,
            FieldValue::from(""),
            FieldValue::from("Taglio"),
            FieldValue::from("Progettazione"),
            FieldValue::from(0.0),
            FieldValue::from(false),
            FieldValue::from(json!({"a": 1, "b": 2})),
            FieldValue::from(json!({"b": 2, "a": 1})),
            FieldValue::List(vec![]),
        ]
    }

    #[test]
    fn decision_table_holds_for_all_pairs() {
        for prev in samples() {
            for next in samples() {
                let c = classify(&prev, &next);
                assert_eq!(should_fire(Trigger::OnSave, &c), c.has_next);
                assert_eq!(should_fire(Trigger::OnChange, &c), c.changed && c.has_next);
                assert_eq!(should_fire(Trigger::OnFirstSet, &c), !c.has_prev && c.has_next);
                assert!(!should_fire(Trigger::Unrecognized, &c));
            }
        }
    }

    #[test]
    fn same_value_is_not_a_change() {
        let c = classify(&"Taglio".into(), &"Taglio".into());
        assert!(!c.changed);
        assert!(!should_fire(Trigger::OnChange, &c));
        assert!(should_fire(Trigger::OnSave, &c));
    }

    #[test]
    fn key_order_does_not_count_as_change() {
        let c = classify(
            &FieldValue::from(json!({"a": 1, "b": 2})),
            &FieldValue::from(json!({"b": 2, "a": 1})),
        );
        assert!(!c.changed);
    }

    #[test]
    fn empty_string_to_value_is_first_set() {
        let c = classify(&"".into(), &"2025-03-10".into());
        assert!(c.first_set);
        assert!(should_fire(Trigger::OnFirstSet, &c));

        let cleared = classify(&"Taglio".into(), &FieldValue::Null);
        assert!(cleared.changed);
        assert!(!should_fire(Trigger::OnChange, &cleared));
    }
}
