//! Validated, indexed rule set.
//!
//! [`RuleRegistry::build`] checks every enabled rule against the field and
//! event-type catalogs and fails with a [`RegistryError`] naming each
//! offending rule. Once built the registry is immutable; share it as a
//! [`RegistryHandle`] between dispatchers and the visibility evaluator.

mod fuzzy;
mod validation;


use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info};

use autoevent_core::{EventTypeProvider, FieldCatalogProvider};

use crate::provenance::ProvenanceTag;
use crate::schema::{RuleDefinition, RuleSpec, RuleTarget, Scope};

pub use validation::{RegistryError, RuleViolation, ViolationKind, MAX_DAY_OFFSET};

/// Shared, read-only registry.
pub type RegistryHandle = Arc<RuleRegistry>;

/// A rule that passed validation, with values resolved at build time.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub definition: RuleDefinition,
    pub provenance: ProvenanceTag,
    /// The rule's override, else the event type's default.
    pub all_day: bool,
}

impl CompiledRule {
    pub fn id(&self) -> &str {
        self.definition.id()
    }

    pub fn name(&self) -> &str {
        &self.definition.metadata.name
    }

    pub fn spec(&self) -> &RuleSpec {
        &self.definition.spec
    }

    pub fn scope(&self) -> Scope {
        self.definition.spec.scope
    }
}

/// record type -> watched field -> rules, in definition order.
type FieldIndex = HashMap<String, HashMap<String, Vec<Arc<CompiledRule>>>>;

#[derive(Debug, Default)]
pub struct RuleRegistry {
    entity: FieldIndex,
    group: FieldIndex,
    member: FieldIndex,
    by_id: HashMap<Scope, HashMap<String, Arc<CompiledRule>>>,
    len: usize,
}

impl RuleRegistry {
    /// A registry with no rules. Every dispatch short-circuits.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Validate and index `rules`. Disabled rules are skipped.
    pub fn build(
        rules: impl IntoIterator<Item = RuleDefinition>,
        fields: &dyn FieldCatalogProvider,
        event_types: &dyn EventTypeProvider,
    ) -> Result<Self, RegistryError> {
        let mut checker = validation::Checker::new(fields, event_types);
        let mut seen: HashSet<(Scope, String)> = HashSet::new();
        let mut accepted = Vec::new();

        for rule in rules {
            if !rule.metadata.enabled {
                debug!(rule_id = %rule.id(), "skipping disabled rule");
                continue;
            }
            if !seen.insert((rule.spec.scope, rule.id().to_string())) {
                checker.duplicate(&rule);
                continue;
            }
            if checker.check(&rule) {
                accepted.push(rule);
            }
        }
        checker.finish()?;

        let mut registry = Self::empty();
        for definition in accepted {
            let all_day = definition.spec.all_day.unwrap_or_else(|| {
                event_types
                    .event_type(&definition.spec.event_type)
                    .map(|def| def.all_day)
                    .unwrap_or(false)
            });
            registry.insert(CompiledRule {
                provenance: ProvenanceTag::new(definition.spec.scope, definition.id()),
                definition,
                all_day,
            });
        }

        info!(
            rules = registry.len,
            entity_types = registry.entity.len(),
            group_types = registry.group.len() + registry.member.len(),
            "rule registry built"
        );
        Ok(registry)
    }

    fn insert(&mut self, rule: CompiledRule) {
        let rule = Arc::new(rule);
        let spec = rule.spec();
        let index = match (spec.scope, spec.target) {
            (Scope::Entity, _) => &mut self.entity,
            (Scope::Group, RuleTarget::Record) => &mut self.group,
            (Scope::Group, RuleTarget::Member) => &mut self.member,
        };
        index
            .entry(spec.source_type.clone())
            .or_default()
            .entry(spec.field.clone())
            .or_default()
            .push(Arc::clone(&rule));
        self.by_id
            .entry(rule.scope())
            .or_default()
            .insert(rule.id().to_string(), Arc::clone(&rule));
        self.len += 1;
    }

    fn index(&self, scope: Scope) -> &FieldIndex {
        match scope {
            Scope::Entity => &self.entity,
            Scope::Group => &self.group,
        }
    }

    /// Record-level rules watching `field` on `record_type`. Possibly empty.
    pub fn rules_for(&self, scope: Scope, record_type: &str, field: &str) -> &[Arc<CompiledRule>] {
        lookup(self.index(scope), record_type, field)
    }

    /// Member-level rules of a group type watching a member field.
    pub fn member_rules_for(&self, record_type: &str, field: &str) -> &[Arc<CompiledRule>] {
        lookup(&self.member, record_type, field)
    }

    /// Whether any rule (record- or member-level) watches `record_type`.
    pub fn has_any(&self, scope: Scope, record_type: &str) -> bool {
        self.index(scope).contains_key(record_type)
            || (scope == Scope::Group && self.member.contains_key(record_type))
    }

    pub fn has_member_rules(&self, record_type: &str) -> bool {
        self.member.contains_key(record_type)
    }

    pub fn resolve_by_id(&self, scope: Scope, id: &str) -> Option<&CompiledRule> {
        self.by_id
            .get(&scope)
            .and_then(|rules| rules.get(id))
            .map(Arc::as_ref)
    }

    /// All rules, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &CompiledRule> {
        self.by_id.values().flat_map(|rules| rules.values()).map(Arc::as_ref)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn into_handle(self) -> RegistryHandle {
        Arc::new(self)
    }
}

fn lookup<'a>(index: &'a FieldIndex, record_type: &str, field: &str) -> &'a [Arc<CompiledRule>] {
    index
        .get(record_type)
        .and_then(|fields| fields.get(field))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}
