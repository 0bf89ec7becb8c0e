//! Auto-event rule definition.

use std::fmt;

use serde::{Deserialize, Serialize};

use autoevent_core::{Record, TimeKind};

use super::{CommonMetadata, ConditionNode};

/// Top-level `kind: AutoEventRule` document.
///
/// One rule maps a watched field plus trigger and condition to a produced
/// event template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RuleDefinition {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub metadata: CommonMetadata,
    pub spec: RuleSpec,
}

impl RuleDefinition {
    pub fn new(id: impl Into<String>, spec: RuleSpec) -> Self {
        Self {
            api_version: "v1".to_string(),
            kind: "AutoEventRule".to_string(),
            metadata: CommonMetadata::named(id),
            spec,
        }
    }

    pub fn id(&self) -> &str {
        &self.metadata.id
    }
}

/// What the rule watches and what it produces.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RuleSpec {
    pub scope: Scope,
    pub source_type: String,
    /// For group rules: whether `field` belongs to the group record or to its members.
    #[serde(default)]
    pub target: RuleTarget,
    pub field: String,
    pub trigger: Trigger,
    pub event_type: String,
    pub time_kind: TimeKind,
    pub time_source: TimeSource,
    /// Length of an interval event, in days. Values below 1 are raised to 1.
    #[serde(default)]
    pub interval_days: Option<i64>,
    /// Overrides the event type's all-day default.
    #[serde(default)]
    pub all_day: Option<bool>,
    #[serde(default)]
    pub visibility: Visibility,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Static fields merged into every produced payload.
    #[serde(default)]
    pub prefill: Record,
    #[serde(default)]
    pub member_link: MemberLink,
    #[serde(default)]
    pub group_link: GroupLink,
    #[serde(default)]
    pub condition: Option<ConditionNode>,
    /// Opaque hint for the UI, carried but never interpreted.
    #[serde(default)]
    pub ui_hint: Option<serde_json::Value>,
}

impl RuleSpec {
    /// Minimal spec: entity scope, point event anchored to today, always visible.
    pub fn new(
        scope: Scope,
        source_type: impl Into<String>,
        field: impl Into<String>,
        trigger: Trigger,
        event_type: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            scope,
            source_type: source_type.into(),
            target: RuleTarget::Record,
            field: field.into(),
            trigger,
            event_type: event_type.into(),
            time_kind: TimeKind::Point,
            time_source: TimeSource::Now,
            interval_days: None,
            all_day: None,
            visibility: Visibility::default(),
            title: title.into(),
            description: None,
            prefill: Record::new(),
            member_link: MemberLink::default(),
            group_link: GroupLink::default(),
            condition: None,
            ui_hint: None,
        }
    }
}

/// Whether a rule anchors to a singular record or a group record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Entity,
    Group,
}

impl Scope {
    /// One-character prefix used by provenance tags.
    pub fn prefix(self) -> char {
        match self {
            Scope::Entity => 'E',
            Scope::Group => 'G',
        }
    }

    pub fn from_prefix(c: char) -> Option<Self> {
        match c {
            'E' => Some(Scope::Entity),
            'G' => Some(Scope::Group),
            _ => None,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Entity => write!(f, "entity"),
            Scope::Group => write!(f, "group"),
        }
    }
}

/// Which record inside a group write the watched field belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RuleTarget {
    #[default]
    Record,
    Member,
}

/// When a rule is eligible to fire, given the field's before/after values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    OnSave,
    OnChange,
    OnFirstSet,
    /// Anything else. Never fires.
    #[serde(other)]
    Unrecognized,
}

/// Where the event's anchor date comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeSource {
    /// The watched field's new value, parsed as a date.
    Field,
    /// Start of the current local day.
    Now,
}

/// Read-time visibility policy of produced events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityMode {
    #[default]
    Always,
    AfterDate,
    UntilDate,
    Window,
    /// Unknown modes are treated as always visible.
    #[serde(other)]
    Unrecognized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Visibility {
    #[serde(default)]
    pub mode: VisibilityMode,
    #[serde(default)]
    pub before_days: Option<i64>,
    #[serde(default)]
    pub after_days: Option<i64>,
}

impl Visibility {
    pub fn window(before_days: i64, after_days: i64) -> Self {
        Self {
            mode: VisibilityMode::Window,
            before_days: Some(before_days),
            after_days: Some(after_days),
        }
    }
}

/// Who participates in the produced event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MemberLink {
    None,
    /// The record (or member) that triggered the rule.
    #[default]
    Entity,
    /// Every current member of the group.
    AllMembers,
}

/// Whether the produced event references its group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GroupLink {
    #[default]
    None,
    Attach,
}
