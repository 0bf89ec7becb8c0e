//! Subcommand implementations.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use autoevent_core::{CatalogSet, Config};
use autoevent_notify::templating::TemplateRenderer;
use autoevent_notify::{ChannelDispatcher, NotifyHook, WebhookNotifier};
use autoevent_rules::loader::{LoadStatus, RuleLoader};
use autoevent_rules::schema::RuleDefinition;
use autoevent_rules::sink::{MemoryEventSink, StoredEvent};
use autoevent_rules::temporal::{FixedClock, Temporal};
use autoevent_rules::{
    Dispatcher, EntityWrite, GroupWrite, RegistryError, RegistryHandle, RuleRegistry, VisibilityEvaluator,
};

/// Catalogs and rules as read from disk, before validation.
pub struct Environment {
    pub catalogs: Arc<CatalogSet>,
    pub rules: Vec<RuleDefinition>,
    /// `path: error` for every document that failed to load.
    pub load_failures: Vec<String>,
}

impl Environment {
    pub fn load(config: &Config) -> Result<Self> {
        let catalog_set = RuleLoader::new(&config.rules.catalog_dir)
            .load_all()
            .with_context(|| format!("reading catalogs from {}", config.rules.catalog_dir.display()))?;
        let rule_set = RuleLoader::new(&config.rules.rules_dir)
            .load_all()
            .with_context(|| format!("reading rules from {}", config.rules.rules_dir.display()))?;

        let load_failures = catalog_set
            .results
            .iter()
            .chain(&rule_set.results)
            .filter_map(|result| match result.status {
                LoadStatus::Failed { ref error } => Some(format!("{}: {error}", result.path.display())),
                _ => None,
            })
            .collect();

        // Catalog documents may live next to rules too.
        let mut catalogs = catalog_set.catalogs();
        rule_set.collect_catalogs(&mut catalogs);

        Ok(Self {
            catalogs: Arc::new(catalogs),
            rules: rule_set.into_rules(),
            load_failures,
        })
    }

    pub fn build_registry(&self) -> Result<RuleRegistry, RegistryError> {
        RuleRegistry::build(self.rules.iter().cloned(), self.catalogs.as_ref(), self.catalogs.as_ref())
    }

    fn registry_handle(&self) -> Result<RegistryHandle> {
        for failure in &self.load_failures {
            warn!(%failure, "document not loaded");
        }
        Ok(self.build_registry()?.into_handle())
    }
}

/// A write as given on the command line.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteInput {
    Entity(EntityWrite),
    Group(GroupWrite),
}

pub fn validate(env: &Environment) -> Result<()> {
    println!(
        "catalogs: {} record type(s), {} event type(s)",
        env.catalogs.record_count(),
        env.catalogs.event_type_count()
    );
    println!("rules:    {} document(s)", env.rules.len());

    let mut problems = env.load_failures.len();
    for failure in &env.load_failures {
        println!("  load error: {failure}");
    }

    match env.build_registry() {
        Ok(registry) => println!("registry: {} enabled rule(s)", registry.len()),
        Err(e) => {
            problems += e.violations.len();
            for violation in &e.violations {
                println!("  {violation}");
            }
        }
    }

    if problems > 0 {
        bail!("{problems} problem(s) found");
    }
    println!("ok");
    Ok(())
}

pub async fn dispatch(env: &Environment, config: &Config, input: &Path, now: Option<DateTime<Utc>>) -> Result<()> {
    let raw = fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?;
    let write: WriteInput = serde_json::from_str(&raw).with_context(|| format!("parsing {}", input.display()))?;

    let sink = Arc::new(MemoryEventSink::new());
    let temporal = Temporal::new(config.engine.utc_offset()?);
    let mut dispatcher = Dispatcher::new(env.registry_handle()?, env.catalogs.clone(), sink.clone())
        .with_temporal(temporal);
    if let Some(now) = now {
        dispatcher = dispatcher.with_clock(Arc::new(FixedClock(now)));
    }
    let renderer = Arc::new(TemplateRenderer::new());
    if let Some(webhook) = WebhookNotifier::from_hook_config(&config.hook, renderer.clone())? {
        info!("notification hook enabled");
        let channels = ChannelDispatcher::new(vec![Box::new(webhook)]);
        let hook = NotifyHook::new(channels, renderer);
        dispatcher = dispatcher.with_hook(Arc::new(hook));
    }

    let report = match write {
        WriteInput::Entity(ref write) => dispatcher.dispatch_entity(write).await,
        WriteInput::Group(ref write) => dispatcher.dispatch_group(write).await,
    };

    let events: Vec<_> = sink
        .events()
        .into_iter()
        .map(|(id, event)| json!({ "id": id, "event": event }))
        .collect();
    let output = json!({ "events": events, "report": report });
    println!("{}", serde_json::to_string_pretty(&output)?);

    if !report.is_clean() {
        bail!("{} event(s) could not be created", report.failures.len());
    }
    Ok(())
}

pub fn visible(env: &Environment, event: &Path, now: Option<DateTime<Utc>>) -> Result<()> {
    let raw = fs::read_to_string(event).with_context(|| format!("reading {}", event.display()))?;
    let stored: StoredEvent = serde_json::from_str(&raw).with_context(|| format!("parsing {}", event.display()))?;

    let now = now.unwrap_or_else(Utc::now);
    let evaluator = VisibilityEvaluator::new(env.registry_handle()?);
    let output = json!({
        "event_id": stored.id,
        "now": now,
        "visible": evaluator.is_visible_now(&stored, now),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const CATALOG: &str = r#"
apiVersion: v1
kind: FieldCatalog
metadata: { id: order-fields, name: Order fields }
spec:
  record_type: order
  fields:
    code: text
    phase: text
"#;

    const EVENT_TYPES: &str = r#"
apiVersion: v1
kind: EventTypeCatalog
metadata: { id: event-types, name: Event types }
spec:
  event_types:
    - name: milestone
      time_kinds: [point]
"#;

    fn rule(event_type: &str) -> String {
        format!(
            r#"
apiVersion: v1
kind: AutoEventRule
metadata: {{ id: cut-started, name: Cutting started }}
spec:
  scope: entity
  source_type: order
  field: phase
  trigger: on_change
  event_type: {event_type}
  time_kind: point
  time_source: now
  visibility: {{ mode: window, before_days: 1, after_days: 1 }}
  title: "{{{{after.code}}}}"
"#
        )
    }

    fn config_for(dir: &Path) -> Config {
        let mut config = Config::for_profile("");
        config.rules.catalog_dir = dir.join("catalogs");
        config.rules.rules_dir = dir.join("rules");
        config.hook.url = None;
        config.engine.utc_offset_minutes = 0;
        config
    }

    fn workspace(event_type: &str) -> (tempfile::TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("catalogs")).unwrap();
        fs::create_dir_all(dir.path().join("rules")).unwrap();
        fs::write(dir.path().join("catalogs/order.yml"), CATALOG).unwrap();
        fs::write(dir.path().join("catalogs/event-types.yml"), EVENT_TYPES).unwrap();
        fs::write(dir.path().join("rules/cut.yml"), rule(event_type)).unwrap();
        let config = config_for(dir.path());
        (dir, config)
    }

    #[test]
    fn validate_accepts_consistent_documents() {
        let (_dir, config) = workspace("milestone");
        let env = Environment::load(&config).unwrap();
        assert!(env.load_failures.is_empty());
        validate(&env).unwrap();
    }

    #[test]
    fn validate_fails_on_unknown_event_type() {
        let (_dir, config) = workspace("kickoff");
        let env = Environment::load(&config).unwrap();
        let err = validate(&env).unwrap_err();
        assert_eq!(err.to_string(), "1 problem(s) found");
    }

    #[test]
    fn validate_counts_load_failures() {
        let (dir, config) = workspace("milestone");
        fs::write(dir.path().join("rules/broken.yml"), "kind: [").unwrap();
        let env = Environment::load(&config).unwrap();
        assert_eq!(env.load_failures.len(), 1);
        assert!(validate(&env).is_err());
    }

    #[test]
    fn missing_rules_dir_is_an_error() {
        let (dir, config) = workspace("milestone");
        fs::remove_dir_all(dir.path().join("rules")).unwrap();
        assert!(Environment::load(&config).is_err());
    }

    #[tokio::test]
    async fn dispatch_runs_an_entity_write() {
        let (dir, config) = workspace("milestone");
        let input = dir.path().join("write.json");
        fs::write(
            &input,
            r#"{"entity": {"record_type": "order", "id": "o-1", "actor_id": "u-1",
                "prev": {"code": "A", "phase": "draft"}, "next": {"code": "A", "phase": "cut"}}}"#,
        )
        .unwrap();
        let env = Environment::load(&config).unwrap();
        dispatch(&env, &config, &input, Some("2025-03-10T15:00:00Z".parse().unwrap()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn dispatch_with_a_hook_configured() {
        let (dir, mut config) = workspace("milestone");
        let input = dir.path().join("write.json");
        fs::write(
            &input,
            r#"{"entity": {"record_type": "order", "id": "o-1", "actor_id": "u-1",
                "prev": {"code": "A", "phase": "draft"}, "next": {"code": "A", "phase": "cut"}}}"#,
        )
        .unwrap();
        let env = Environment::load(&config).unwrap();
        let now = Some("2025-03-10T15:00:00Z".parse().unwrap());

        // Nothing listens on the discard port; the failed delivery is only logged.
        config.hook.url = Some("http://127.0.0.1:9/events".into());
        config.hook.body_template = Some(r#"{"text": "{{ notification.subject }}"}"#.into());
        dispatch(&env, &config, &input, now).await.unwrap();

        config.hook.body_template = Some("{{ unclosed".into());
        assert!(dispatch(&env, &config, &input, now).await.is_err());
    }

    #[test]
    fn visible_reads_a_stored_event() {
        let (dir, config) = workspace("milestone");
        let event = dir.path().join("event.json");
        fs::write(
            &event,
            r#"{"id": "ev-1", "start": "2025-03-10T00:00:00Z", "provenance_tag": "E:11:cut-started"}"#,
        )
        .unwrap();
        let env = Environment::load(&config).unwrap();
        visible(&env, &event, Some("2025-03-10T12:00:00Z".parse().unwrap())).unwrap();
    }

    #[test]
    fn sample_writes_parse() {
        let writes = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../data/writes");
        let order: WriteInput =
            serde_json::from_str(&fs::read_to_string(writes.join("order-cut.json")).unwrap()).unwrap();
        assert!(matches!(order, WriteInput::Entity(ref w) if w.record_type == "order"));
        let crew: WriteInput =
            serde_json::from_str(&fs::read_to_string(writes.join("crew-update.json")).unwrap()).unwrap();
        assert!(matches!(crew, WriteInput::Group(ref w) if w.record_type == "crew"));
    }
}
