//! Rule envelope for lightweight first-pass deserialization.

use serde::{Deserialize, Serialize};

use super::{CommonMetadata, RuleDocument, RuleKind};

/// Lightweight first-pass deserializer that reads only the header fields.
///
/// Used during two-pass loading: first extract `kind` to determine the
/// concrete type, then deserialize the full document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleEnvelope {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub metadata: CommonMetadata,
    /// Remaining fields captured as raw YAML for second-pass deserialization.
    #[serde(flatten)]
    pub rest: serde_yaml::Value,
}

impl RuleEnvelope {
    /// Parse the `kind` field into a typed [`RuleKind`].
    pub fn rule_kind(&self) -> std::result::Result<RuleKind, String> {
        self.kind.parse()
    }

    /// Two-pass: reconstruct the full YAML and deserialize into the concrete type.
    pub fn parse_full(&self) -> std::result::Result<RuleDocument, String> {
        let kind = self.rule_kind()?;
        let yaml = serde_yaml::to_string(self).map_err(|e| e.to_string())?;
        match kind {
            RuleKind::AutoEventRule => serde_yaml::from_str(&yaml)
                .map(RuleDocument::Rule)
                .map_err(|e| e.to_string()),
            RuleKind::FieldCatalog => serde_yaml::from_str(&yaml)
                .map(RuleDocument::FieldCatalog)
                .map_err(|e| e.to_string()),
            RuleKind::EventTypeCatalog => serde_yaml::from_str(&yaml)
                .map(RuleDocument::EventTypeCatalog)
                .map_err(|e| e.to_string()),
        }
    }
}
