//! Filesystem loader for rule and catalog documents.
//!
//! Scans a directory recursively for YAML files and parses each through the
//! two-pass envelope (`RuleEnvelope` -> `RuleDocument`). A broken file is
//! reported and skipped; it never aborts the scan.

mod core;
mod error;


pub use self::core::{parse_document, LoadedSet, RuleLoader};
pub use self::error::{LoadResult, LoadStatus, Result, RuleError};
