use std::env;
use std::path::PathBuf;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_i32(profile: &str, key: &str, default: i32) -> i32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub rules: RulesConfig,
    pub engine: EngineConfig,
    pub hook: HookConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `AUTOEVENT_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("AUTOEVENT_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            rules: RulesConfig::from_env_profiled(p),
            engine: EngineConfig::from_env_profiled(p),
            hook: HookConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  rules:       rules_dir={}, catalog_dir={}", self.rules.rules_dir.display(), self.rules.catalog_dir.display());
        tracing::info!("  engine:      utc_offset_minutes={}", self.engine.utc_offset_minutes);
        tracing::info!("  hook:        configured={}", self.hook.is_configured());
    }
}

// ── Rule and catalog locations ────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    pub rules_dir: PathBuf,
    pub catalog_dir: PathBuf,
}

impl RulesConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            rules_dir: PathBuf::from(profiled_env_or(p, "AUTOEVENT_RULES_DIR", "data/rules")),
            catalog_dir: PathBuf::from(profiled_env_or(p, "AUTOEVENT_CATALOG_DIR", "data/catalogs")),
        }
    }
}

// ── Engine ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Offset of the "local" calendar used for start-of-day and naive dates.
    pub utc_offset_minutes: i32,
}

impl EngineConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            utc_offset_minutes: profiled_env_i32(p, "AUTOEVENT_UTC_OFFSET_MINUTES", 0),
        }
    }

    pub fn utc_offset(&self) -> Result<FixedOffset, CoreError> {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| CoreError::Config {
                key: "AUTOEVENT_UTC_OFFSET_MINUTES".to_string(),
                message: format!("{} is not a valid UTC offset", self.utc_offset_minutes),
            })
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { utc_offset_minutes: 0 }
    }
}

// ── Secondary notification hook ───────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookConfig {
    pub url: Option<String>,
    /// HTTP method, POST when unset.
    pub method: Option<String>,
    /// Optional minijinja body template.
    pub body_template: Option<String>,
}

impl HookConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            url: profiled_env_opt(p, "AUTOEVENT_HOOK_URL"),
            method: profiled_env_opt(p, "AUTOEVENT_HOOK_METHOD"),
            body_template: profiled_env_opt(p, "AUTOEVENT_HOOK_TEMPLATE"),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_in_range_is_accepted() {
        let engine = EngineConfig { utc_offset_minutes: 60 };
        assert_eq!(engine.utc_offset().unwrap().local_minus_utc(), 3600);
    }

    #[test]
    fn offset_out_of_range_is_rejected() {
        let engine = EngineConfig { utc_offset_minutes: 24 * 60 };
        assert!(matches!(engine.utc_offset(), Err(CoreError::Config { .. })));
    }

    #[test]
    fn profiled_key_wins_over_plain_key() {
        env::set_var("AUTOEVENT_RULES_DIR", "plain/rules");
        env::set_var("CFGTEST_AUTOEVENT_RULES_DIR", "profiled/rules");
        let config = Config::for_profile("cfgtest");
        assert_eq!(config.profile_label(), "CFGTEST");
        assert_eq!(config.rules.rules_dir, PathBuf::from("profiled/rules"));
        env::remove_var("CFGTEST_AUTOEVENT_RULES_DIR");
        env::remove_var("AUTOEVENT_RULES_DIR");
    }
}
