mod cli;
mod commands;

use anyhow::{Context, Result};
use clap::Parser;

use autoevent_core::config::{load_dotenv, Config};

use crate::cli::{CliArgs, Command};

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();

    let mut config = Config::from_env();
    if let Some(dir) = args.rules_dir {
        config.rules.rules_dir = dir;
    }
    if let Some(dir) = args.catalog_dir {
        config.rules.catalog_dir = dir;
    }
    config.log_summary();

    let env = commands::Environment::load(&config).context("failed to load rules")?;

    match args.command {
        Command::Validate => commands::validate(&env),
        Command::Dispatch { input, now } => commands::dispatch(&env, &config, &input, now).await,
        Command::Visible { event, now } => commands::visible(&env, &event, now),
    }
}
