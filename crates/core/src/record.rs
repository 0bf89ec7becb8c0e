use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A schema-light business record: field key to value.
///
/// Keys are kept sorted so that two records with the same content compare
/// equal and serialize identically regardless of the order their fields
/// arrived in.
pub type Record = BTreeMap<String, FieldValue>;

static NULL: FieldValue = FieldValue::Null;

/// Typed field values of an open record.
///
/// Records arrive as JSON, so dates usually show up as `Text` and are only
/// parsed when a consumer asks for a date. `Date` exists for callers that
/// already hold a parsed timestamp.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Date(DateTime<Utc>),
    List(Vec<FieldValue>),
    Object(Record),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Whether the value counts as "set".
    ///
    /// Only `Null` and the empty string are absent. `false`, `0`, empty
    /// lists and empty objects are all present.
    pub fn is_present(&self) -> bool {
        match self {
            FieldValue::Null => false,
            FieldValue::Text(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Extract as string, returning None for every non-text variant.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Record> {
        match self {
            FieldValue::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn into_object(self) -> Option<Record> {
        match self {
            FieldValue::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Resolve a dotted path (`after.customer.name`, `members.0.id`).
    ///
    /// Objects are descended by key, lists by numeric index. Anything that
    /// does not resolve yields `Null`.
    pub fn lookup(&self, path: &str) -> &FieldValue {
        let path = path.trim();
        if path.is_empty() {
            return &NULL;
        }
        let mut current = self;
        for segment in path.split('.') {
            current = match current {
                FieldValue::Object(map) => match map.get(segment) {
                    Some(v) => v,
                    None => return &NULL,
                },
                FieldValue::List(items) => match segment.parse::<usize>().ok().and_then(|i| items.get(i)) {
                    Some(v) => v,
                    None => return &NULL,
                },
                _ => return &NULL,
            };
        }
        current
    }

    /// Convert to JSON. Dates become RFC 3339 strings; integral numbers
    /// are emitted without a fractional part.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            FieldValue::Null => serde_json::Value::Null,
            FieldValue::Bool(b) => serde_json::Value::Bool(*b),
            FieldValue::Number(n) => number_to_json(*n),
            FieldValue::Text(s) => serde_json::Value::String(s.clone()),
            FieldValue::Date(d) => serde_json::Value::String(format_date(d)),
            FieldValue::List(items) => {
                serde_json::Value::Array(items.iter().map(FieldValue::to_json).collect())
            }
            FieldValue::Object(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }

    /// Canonical serialized form: object keys sorted, dates as RFC 3339.
    pub fn canonical_json(&self) -> String {
        self.to_json().to_string()
    }

    /// Structural equality that ignores key order and representation
    /// (a `Date` equals the `Text` holding its RFC 3339 form).
    pub fn canonical_eq(&self, other: &FieldValue) -> bool {
        self.canonical_json() == other.canonical_json()
    }

    /// Human-readable text form used when substituting into templates.
    ///
    /// `Null` renders as the empty string; lists and objects render as
    /// canonical JSON.
    pub fn to_text(&self) -> String {
        match self {
            FieldValue::Null => String::new(),
            FieldValue::Bool(b) => b.to_string(),
            FieldValue::Number(n) => format_number(*n),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Date(d) => format_date(d),
            FieldValue::List(_) | FieldValue::Object(_) => self.canonical_json(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

/// Format a number the way a person would type it: `3`, not `3.0`.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn format_date(d: &DateTime<Utc>) -> String {
    d.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn number_to_json(n: f64) -> serde_json::Value {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        serde_json::Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => FieldValue::Null,
            serde_json::Value::Bool(b) => FieldValue::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map(FieldValue::Number).unwrap_or_default(),
            serde_json::Value::String(s) => FieldValue::Text(s),
            serde_json::Value::Array(items) => {
                FieldValue::List(items.into_iter().map(FieldValue::from).collect())
            }
            serde_json::Value::Object(map) => FieldValue::Object(
                map.into_iter().map(|(k, v)| (k, FieldValue::from(v))).collect(),
            ),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Number(n as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(d: DateTime<Utc>) -> Self {
        FieldValue::Date(d)
    }
}

impl From<Record> for FieldValue {
    fn from(map: Record) -> Self {
        FieldValue::Object(map)
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(FieldValue::from)
    }
}

/// Build a [`Record`] from a JSON object. Non-object input yields an empty record.
pub fn record_from_json(value: serde_json::Value) -> Record {
    FieldValue::from(value).into_object().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn presence_rule_per_kind() {
        assert!(!FieldValue::Null.is_present());
        assert!(!FieldValue::from("").is_present());
        assert!(FieldValue::from(" ").is_present());
        assert!(FieldValue::from(false).is_present());
        assert!(FieldValue::from(0.0).is_present());
        assert!(FieldValue::List(vec![]).is_present());
        assert!(FieldValue::Object(Record::new()).is_present());
    }

    #[test]
    fn lookup_descends_objects_and_lists() {
        let value = FieldValue::from(json!({
            "after": { "customer": { "name": "Rossi" } },
            "members": [{ "id": "m1" }, { "id": "m2" }]
        }));
        assert_eq!(value.lookup("after.customer.name"), &FieldValue::from("Rossi"));
        assert_eq!(value.lookup("members.1.id"), &FieldValue::from("m2"));
        assert!(value.lookup("members.7.id").is_null());
        assert!(value.lookup("after.customer.name.first").is_null());
        assert!(value.lookup("").is_null());
    }

    #[test]
    fn canonical_eq_ignores_key_order() {
        let a: FieldValue = serde_json::from_str(r#"{"a": 1, "b": [1, 2]}"#).unwrap();
        let b: FieldValue = serde_json::from_str(r#"{"b": [1, 2], "a": 1.0}"#).unwrap();
        assert!(a.canonical_eq(&b));
        let c: FieldValue = serde_json::from_str(r#"{"b": [2, 1], "a": 1}"#).unwrap();
        assert!(!a.canonical_eq(&c));
    }

    #[test]
    fn date_equals_its_text_form() {
        let date = "2025-03-10T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let text = FieldValue::from("2025-03-10T00:00:00.000Z");
        assert!(FieldValue::Date(date).canonical_eq(&text));
    }

    #[test]
    fn text_form_of_scalars() {
        assert_eq!(FieldValue::Null.to_text(), "");
        assert_eq!(FieldValue::from(3.0).to_text(), "3");
        assert_eq!(FieldValue::from(2.5).to_text(), "2.5");
        assert_eq!(FieldValue::from(true).to_text(), "true");
        assert_eq!(
            FieldValue::from(json!({"z": 1, "a": "x"})).to_text(),
            r#"{"a":"x","z":1}"#
        );
    }

    #[test]
    fn record_from_non_object_is_empty() {
        assert!(record_from_json(json!([1, 2])).is_empty());
        assert_eq!(record_from_json(json!({"k": "v"})).len(), 1);
    }
}
