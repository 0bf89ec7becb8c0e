//! Document kind enum for two-pass deserialization dispatch.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported document kinds for two-pass deserialization dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleKind {
    AutoEventRule,
    FieldCatalog,
    EventTypeCatalog,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKind::AutoEventRule => write!(f, "AutoEventRule"),
            RuleKind::FieldCatalog => write!(f, "FieldCatalog"),
            RuleKind::EventTypeCatalog => write!(f, "EventTypeCatalog"),
        }
    }
}

impl FromStr for RuleKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "AutoEventRule" => Ok(RuleKind::AutoEventRule),
            "FieldCatalog" => Ok(RuleKind::FieldCatalog),
            "EventTypeCatalog" => Ok(RuleKind::EventTypeCatalog),
            other => Err(format!("unknown rule kind: '{}'", other)),
        }
    }
}
