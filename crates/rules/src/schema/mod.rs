//! YAML DSL schema types with serde deserialization.
//!
//! Defines the complete type hierarchy for rule documents:
//! - `RuleEnvelope`: lightweight first-pass header (apiVersion, kind, metadata)
//! - `RuleDocument`: enum dispatching to kind-specific types
//! - `RuleDefinition`: one auto-event rule (watched field, trigger, condition, event template)
//! - `FieldCatalogDocument` / `EventTypeCatalogDocument`: catalogs rules are validated against

mod catalogs;
mod condition;
mod document;
mod envelope;
mod kind;
mod metadata;
mod rule;

pub use catalogs::*;
pub use condition::*;
pub use document::*;
pub use envelope::*;
pub use kind::*;
pub use metadata::*;
pub use rule::*;
