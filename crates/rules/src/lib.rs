//! Auto-event rule engine.
//!
//! This crate provides:
//! - YAML rule and catalog documents with two-pass deserialization
//! - Filesystem loader for rule directories
//! - A validated, immutable rule registry
//! - Trigger classification, condition evaluation and date arithmetic
//! - Entity and group dispatchers emitting events through an [`sink::EventSink`]
//! - Read-time visibility of generated events

pub mod dispatch;
pub mod evaluator;
pub mod hook;
pub mod loader;
pub mod provenance;
pub mod registry;
pub mod schema;
pub mod sink;
pub mod temporal;
pub mod trigger;
pub mod visibility;

#[cfg(test)]
mod testing;

pub use dispatch::{DispatchReport, Dispatcher, EntityWrite, GroupWrite};
pub use registry::{RegistryError, RegistryHandle, RuleRegistry};
pub use visibility::VisibilityEvaluator;
