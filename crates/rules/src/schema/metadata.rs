//! Common metadata shared across all document kinds.

use serde::{Deserialize, Serialize};

/// Shared metadata for all document kinds (rules and catalogs).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CommonMetadata {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl CommonMetadata {
    /// Metadata with `name` equal to `id`, enabled.
    pub fn named(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: None,
            tags: None,
            enabled: true,
        }
    }
}

pub(crate) fn default_true() -> bool {
    true
}
