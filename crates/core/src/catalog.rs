//! Field and event-type catalogs.
//!
//! Catalogs are supplied by the host application and treated as valid
//! input. The rule registry validates rules against them once at startup;
//! the dispatchers use them to decide which keys of a record are fields.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Declared kind of a catalog field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Number,
    Boolean,
    Date,
    List,
    Object,
}

/// Temporal shape of a produced event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeKind {
    Point,
    Interval,
    Deadline,
    RecurringMonthly,
    RecurringYearly,
    /// Any kind this build does not know. Ranges fall back to point semantics.
    #[serde(other)]
    Unrecognized,
}

impl std::fmt::Display for TimeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeKind::Point => write!(f, "point"),
            TimeKind::Interval => write!(f, "interval"),
            TimeKind::Deadline => write!(f, "deadline"),
            TimeKind::RecurringMonthly => write!(f, "recurring_monthly"),
            TimeKind::RecurringYearly => write!(f, "recurring_yearly"),
            TimeKind::Unrecognized => write!(f, "unrecognized"),
        }
    }
}

/// Field catalog for one record type.
///
/// Field order is significant: dispatchers walk fields in catalog order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FieldCatalog {
    pub record_type: String,
    pub fields: IndexMap<String, FieldKind>,
    /// Present only for group types that embed a member list.
    #[serde(default)]
    pub members: Option<MemberCatalog>,
}

impl FieldCatalog {
    pub fn new(record_type: impl Into<String>) -> Self {
        Self {
            record_type: record_type.into(),
            fields: IndexMap::new(),
            members: None,
        }
    }

    pub fn field(mut self, key: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.insert(key.into(), kind);
        self
    }

    pub fn with_members(mut self, members: MemberCatalog) -> Self {
        self.members = Some(members);
        self
    }

    pub fn kind_of(&self, key: &str) -> Option<FieldKind> {
        self.fields.get(key).copied()
    }

    pub fn recognizes(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }
}

/// Smaller catalog describing the members embedded in a group record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MemberCatalog {
    /// Key of the member list inside the group record.
    #[serde(default = "default_list_field")]
    pub list_field: String,
    /// Member field holding the stable member key.
    #[serde(default = "default_key_field")]
    pub key_field: String,
    pub fields: IndexMap<String, FieldKind>,
}

impl MemberCatalog {
    pub fn new() -> Self {
        Self {
            list_field: default_list_field(),
            key_field: default_key_field(),
            fields: IndexMap::new(),
        }
    }

    pub fn field(mut self, key: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.insert(key.into(), kind);
        self
    }

    pub fn kind_of(&self, key: &str) -> Option<FieldKind> {
        self.fields.get(key).copied()
    }
}

impl Default for MemberCatalog {
    fn default() -> Self {
        Self::new()
    }
}

fn default_list_field() -> String {
    "members".to_string()
}

fn default_key_field() -> String {
    "id".to_string()
}

/// A produced event type and the time kinds it accepts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EventTypeDef {
    pub name: String,
    pub time_kinds: Vec<TimeKind>,
    #[serde(default)]
    pub all_day: bool,
}

impl EventTypeDef {
    pub fn permits(&self, kind: TimeKind) -> bool {
        self.time_kinds.contains(&kind)
    }
}

/// Source of per-type field catalogs.
pub trait FieldCatalogProvider: Send + Sync {
    fn field_catalog(&self, record_type: &str) -> Option<&FieldCatalog>;

    /// Known record types, used for "did you mean" suggestions.
    fn record_types(&self) -> Vec<&str> {
        Vec::new()
    }
}

/// Source of produced event type definitions.
pub trait EventTypeProvider: Send + Sync {
    fn event_type(&self, name: &str) -> Option<&EventTypeDef>;

    fn event_type_names(&self) -> Vec<&str> {
        Vec::new()
    }
}

/// In-memory catalog set, usually loaded from catalog documents.
#[derive(Debug, Clone, Default)]
pub struct CatalogSet {
    records: HashMap<String, FieldCatalog>,
    event_types: HashMap<String, EventTypeDef>,
}

impl CatalogSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(mut self, catalog: FieldCatalog) -> Self {
        self.insert_record(catalog);
        self
    }

    pub fn with_event_type(mut self, def: EventTypeDef) -> Self {
        self.insert_event_type(def);
        self
    }

    pub fn insert_record(&mut self, catalog: FieldCatalog) {
        self.records.insert(catalog.record_type.clone(), catalog);
    }

    pub fn insert_event_type(&mut self, def: EventTypeDef) {
        self.event_types.insert(def.name.clone(), def);
    }

    /// Look up a record catalog, failing for unknown types.
    pub fn require(&self, record_type: &str) -> Result<&FieldCatalog, CoreError> {
        self.records
            .get(record_type)
            .ok_or_else(|| CoreError::UnknownRecordType(record_type.to_string()))
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn event_type_count(&self) -> usize {
        self.event_types.len()
    }
}

impl FieldCatalogProvider for CatalogSet {
    fn field_catalog(&self, record_type: &str) -> Option<&FieldCatalog> {
        self.records.get(record_type)
    }

    fn record_types(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.records.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl EventTypeProvider for CatalogSet {
    fn event_type(&self, name: &str) -> Option<&EventTypeDef> {
        self.event_types.get(name)
    }

    fn event_type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.event_types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
