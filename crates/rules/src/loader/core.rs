//! [`RuleLoader`] and the set of documents it produces.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use autoevent_core::CatalogSet;

use crate::schema::{RuleDefinition, RuleDocument, RuleEnvelope};

use super::error::{LoadResult, LoadStatus, Result, RuleError};

/// Reads every `*.yml` / `*.yaml` under a directory.
#[derive(Debug, Clone)]
pub struct RuleLoader {
    root: PathBuf,
}

/// Documents parsed by one [`RuleLoader::load_all`] call, in path order.
#[derive(Debug, Default)]
pub struct LoadedSet {
    pub results: Vec<LoadResult>,
    pub documents: Vec<RuleDocument>,
}

impl LoadedSet {
    pub fn rules(&self) -> impl Iterator<Item = &RuleDefinition> {
        self.documents.iter().filter_map(RuleDocument::as_rule)
    }

    pub fn into_rules(self) -> Vec<RuleDefinition> {
        self.documents
            .into_iter()
            .filter_map(|doc| match doc {
                RuleDocument::Rule(rule) => Some(rule),
                _ => None,
            })
            .collect()
    }

    /// Add every catalog document to `set`.
    pub fn collect_catalogs(&self, set: &mut CatalogSet) {
        for doc in &self.documents {
            match doc {
                RuleDocument::FieldCatalog(catalog) => set.insert_record(catalog.spec.clone()),
                RuleDocument::EventTypeCatalog(catalog) => {
                    for def in &catalog.spec.event_types {
                        set.insert_event_type(def.clone());
                    }
                }
                RuleDocument::Rule(_) => {}
            }
        }
    }

    pub fn catalogs(&self) -> CatalogSet {
        let mut set = CatalogSet::new();
        self.collect_catalogs(&mut set);
        set
    }

    pub fn failures(&self) -> impl Iterator<Item = &LoadResult> {
        self.results
            .iter()
            .filter(|r| matches!(r.status, LoadStatus::Failed { .. }))
    }

    pub fn merge(&mut self, other: LoadedSet) {
        self.results.extend(other.results);
        self.documents.extend(other.documents);
    }
}

impl RuleLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Recursively load the directory. Only a missing or unreadable root
    /// is an error; per-file problems land in [`LoadedSet::results`].
    pub fn load_all(&self) -> Result<LoadedSet> {
        if !self.root.is_dir() {
            return Err(RuleError::MissingDir(self.root.clone()));
        }
        let mut set = LoadedSet::default();
        self.scan_dir(&self.root, &mut set)?;
        info!(
            root = %self.root.display(),
            documents = set.documents.len(),
            failed = set.failures().count(),
            "rule directory loaded"
        );
        Ok(set)
    }

    fn scan_dir(&self, dir: &Path, set: &mut LoadedSet) -> Result<()> {
        let mut paths = fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()?;
        paths.sort();

        for path in paths {
            let hidden = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('.'));
            if hidden {
                if path.is_file() {
                    set.results.push(skipped(path, "dotfile"));
                }
                continue;
            }

            if path.is_dir() {
                self.scan_dir(&path, set)?;
                continue;
            }

            let is_yaml = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e == "yml" || e == "yaml");
            if !is_yaml {
                set.results.push(skipped(path, "not a YAML file"));
                continue;
            }

            match self.load_file(&path) {
                Ok(doc) => {
                    let id = doc.metadata().id.clone();
                    info!(id = %id, kind = %doc.kind(), path = %path.display(), "loaded document");
                    set.documents.push(doc);
                    set.results.push(LoadResult {
                        path,
                        status: LoadStatus::Loaded { id },
                    });
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to load document");
                    set.results.push(LoadResult {
                        path,
                        status: LoadStatus::Failed {
                            error: e.to_string(),
                        },
                    });
                }
            }
        }
        Ok(())
    }

    /// Parse one file: envelope first to read `kind`, then the concrete type.
    pub fn load_file(&self, path: &Path) -> Result<RuleDocument> {
        let contents = fs::read_to_string(path)?;
        parse_document(&contents)
    }
}

/// Parse a YAML document from a string.
pub fn parse_document(contents: &str) -> Result<RuleDocument> {
    let envelope: RuleEnvelope = serde_yaml::from_str(contents)?;
    if envelope.metadata.id.trim().is_empty() {
        return Err(RuleError::Validation(
            "metadata.id must not be empty".to_string(),
        ));
    }
    envelope.parse_full().map_err(|e| {
        RuleError::Validation(format!("failed to parse '{}': {}", envelope.metadata.id, e))
    })
}

fn skipped(path: PathBuf, reason: &str) -> LoadResult {
    LoadResult {
        path,
        status: LoadStatus::Skipped {
            reason: reason.to_string(),
        },
    }
}
