//! Multi-kind document container and accessors.

use super::{CommonMetadata, EventTypeCatalogDocument, FieldCatalogDocument, RuleDefinition, RuleKind};

/// A fully deserialized document of any supported kind.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleDocument {
    /// Auto-event rule.
    Rule(RuleDefinition),
    /// Field catalog of one record type.
    FieldCatalog(FieldCatalogDocument),
    /// Produced event types.
    EventTypeCatalog(EventTypeCatalogDocument),
}

impl RuleDocument {
    /// Get the document's metadata regardless of kind.
    pub fn metadata(&self) -> &CommonMetadata {
        match self {
            RuleDocument::Rule(rule) => &rule.metadata,
            RuleDocument::FieldCatalog(doc) => &doc.metadata,
            RuleDocument::EventTypeCatalog(doc) => &doc.metadata,
        }
    }

    /// Get the document kind.
    pub fn kind(&self) -> RuleKind {
        match self {
            RuleDocument::Rule(_) => RuleKind::AutoEventRule,
            RuleDocument::FieldCatalog(_) => RuleKind::FieldCatalog,
            RuleDocument::EventTypeCatalog(_) => RuleKind::EventTypeCatalog,
        }
    }

    /// Try to extract as a [`RuleDefinition`] reference.
    pub fn as_rule(&self) -> Option<&RuleDefinition> {
        match self {
            RuleDocument::Rule(rule) => Some(rule),
            _ => None,
        }
    }
}
