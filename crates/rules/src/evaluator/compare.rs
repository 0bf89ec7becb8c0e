//! Operand normalization and comparison for `compare` leaves.

use std::cmp::Ordering;

use autoevent_core::{format_number, FieldValue};

use crate::schema::{CompareOp, ValueKind};
use crate::temporal::Temporal;

/// A normalized comparison operand.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Operand {
    Number(f64),
    Text(String),
}

impl Operand {
    fn into_text(self) -> String {
        match self {
            Operand::Number(n) => format_number(n),
            Operand::Text(s) => s,
        }
    }
}

/// Normalize a resolved value. `None` means "no usable value".
pub(crate) fn normalize(value: &FieldValue, kind: ValueKind, temporal: &Temporal) -> Option<Operand> {
    if value.is_null() {
        return None;
    }
    match kind {
        ValueKind::Number => to_number(value).map(Operand::Number),
        ValueKind::String => Some(Operand::Text(value.to_text())),
        ValueKind::Date => temporal
            .to_date(value)
            .map(|d| Operand::Number(d.timestamp_millis() as f64)),
        ValueKind::Auto => Some(auto(value)),
    }
}

fn to_number(value: &FieldValue) -> Option<f64> {
    let n = match value {
        FieldValue::Number(n) => *n,
        FieldValue::Text(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            s.parse::<f64>().ok()?
        }
        FieldValue::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        FieldValue::Date(d) => d.timestamp_millis() as f64,
        FieldValue::Null | FieldValue::List(_) | FieldValue::Object(_) => return None,
    };
    n.is_finite().then_some(n)
}

fn auto(value: &FieldValue) -> Operand {
    match value {
        FieldValue::Number(n) => Operand::Number(*n),
        FieldValue::Date(d) => Operand::Number(d.timestamp_millis() as f64),
        FieldValue::Text(s) => match s.trim().parse::<f64>() {
            Ok(n) if n.is_finite() && !s.trim().is_empty() => Operand::Number(n),
            _ => Operand::Text(s.clone()),
        },
        other => Operand::Text(other.to_text()),
    }
}

/// Numeric comparison when both sides are numbers, lexicographic otherwise.
pub(crate) fn compare(left: &Operand, op: CompareOp, right: &Operand) -> bool {
    let ordering = match (left, right) {
        (Operand::Number(l), Operand::Number(r)) => match l.partial_cmp(r) {
            Some(o) => o,
            None => return false,
        },
        _ => left.clone().into_text().cmp(&right.clone().into_text()),
    };
    match op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::Ne => ordering != Ordering::Equal,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Gte => ordering != Ordering::Less,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Lte => ordering != Ordering::Greater,
    }
}
