//! Error types and per-file load outcomes.

use std::path::PathBuf;

/// Errors raised while reading rule documents.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Well-formed YAML that is not a valid document of its kind.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("rules directory not found: {}", .0.display())]
    MissingDir(PathBuf),
}

pub type Result<T> = std::result::Result<T, RuleError>;

/// Outcome of loading a single file.
#[derive(Debug)]
pub struct LoadResult {
    pub path: PathBuf,
    pub status: LoadStatus,
}

#[derive(Debug)]
pub enum LoadStatus {
    Loaded { id: String },
    /// Dotfile or non-YAML file.
    Skipped { reason: String },
    Failed { error: String },
}
