use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

/// Rule-driven event generation from record writes.
///
/// Loads rule and catalog documents, validates them into a registry and
/// runs writes or visibility checks against it.
#[derive(Parser, Debug)]
#[command(name = "autoevent", about = "Rule-driven event generation from record writes")]
pub struct CliArgs {
    /// Directory of rule documents (overrides AUTOEVENT_RULES_DIR)
    #[arg(long, global = true)]
    pub rules_dir: Option<PathBuf>,

    /// Directory of catalog documents (overrides AUTOEVENT_CATALOG_DIR)
    #[arg(long, global = true)]
    pub catalog_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load catalogs and rules and report every problem found
    Validate,

    /// Run one record write through the dispatcher and print the outcome
    Dispatch {
        /// JSON file holding `{"entity": {...}}` or `{"group": {...}}`
        #[arg(long)]
        input: PathBuf,

        /// Pretend the write happens at this instant (RFC 3339)
        #[arg(long)]
        now: Option<DateTime<Utc>>,
    },

    /// Decide whether a stored event is visible at an instant
    Visible {
        /// JSON file holding the stored event
        #[arg(long)]
        event: PathBuf,

        /// Instant to check (RFC 3339), defaults to now
        #[arg(long)]
        now: Option<DateTime<Utc>>,
    },
}
