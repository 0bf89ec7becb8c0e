//! Provenance tags: which rule produced a generated event.
//!
//! The compact form is `<scope prefix>:<byte length>:<rule id>`, e.g.
//! `E:11:cut-started`. The length prefix makes every rule id round-trip,
//! including ids that contain the separator.

use std::fmt;

use crate::schema::Scope;

pub const SEPARATOR: char = ':';

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProvenanceTag {
    pub scope: Scope,
    pub rule_id: String,
}

impl ProvenanceTag {
    pub fn new(scope: Scope, rule_id: impl Into<String>) -> Self {
        Self {
            scope,
            rule_id: rule_id.into(),
        }
    }

    pub fn encode(&self) -> String {
        encode(self.scope, &self.rule_id)
    }
}

impl fmt::Display for ProvenanceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

pub fn encode(scope: Scope, rule_id: &str) -> String {
    format!(
        "{}{SEPARATOR}{}{SEPARATOR}{rule_id}",
        scope.prefix(),
        rule_id.len()
    )
}

/// Decode a compact tag. Any malformed input yields `None`.
pub fn decode(tag: &str) -> Option<ProvenanceTag> {
    let mut chars = tag.chars();
    let scope = Scope::from_prefix(chars.next()?)?;
    let rest = chars.as_str().strip_prefix(SEPARATOR)?;
    let (len, rule_id) = rest.split_once(SEPARATOR)?;
    if len.is_empty() || !len.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if len.parse::<usize>().ok()? != rule_id.len() {
        return None;
    }
    Some(ProvenanceTag::new(scope, rule_id))
}
