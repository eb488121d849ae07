//! Configuration loading for the CLI.
//!
//! Resolution order, later entries winning:
//!
//! 1. Library defaults ([`TwitchAuthConfig::default`]).
//! 2. The `[twitch]` table of the config file (default `config/default.toml`).
//! 3. `TWITCH_CLIENT_ID` / `TWITCH_FORCE_VERIFY` from the environment or `.env`.
//! 4. Command-line flags.

use std::path::Path;

use anyhow::{Context, Result};
use twitch_auth::TwitchAuthConfig;

use crate::helpers::{env_non_empty, parse_bool};

/// Default location of the config file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Overrides taken from the command line.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub client_id: Option<String>,
    pub force_verify: Option<bool>,
}

/// Load the `[twitch]` table from `path`.
///
/// A missing file or a file without a `[twitch]` table yields the defaults;
/// a file that exists but does not parse is an error.
pub fn load_file(path: &Path) -> Result<TwitchAuthConfig> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(TwitchAuthConfig::default());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read {}", path.display()));
        }
    };

    parse_config(&content).with_context(|| format!("invalid config file {}", path.display()))
}

/// Parse the `[twitch]` table out of a TOML document.
pub fn parse_config(content: &str) -> Result<TwitchAuthConfig> {
    let table: toml::Table = content.parse().context("not valid TOML")?;

    match table.get("twitch") {
        Some(section) => section
            .clone()
            .try_into()
            .context("malformed [twitch] section"),
        None => Ok(TwitchAuthConfig::default()),
    }
}

/// Apply environment variables on top of `config`.
pub fn apply_env(config: &mut TwitchAuthConfig) {
    if let Some(client_id) = env_non_empty("TWITCH_CLIENT_ID") {
        config.client_id = client_id;
    }
    if let Some(raw) = env_non_empty("TWITCH_FORCE_VERIFY") {
        match parse_bool(&raw) {
            Some(force_verify) => config.force_verify = force_verify,
            None => tracing::warn!(value = %raw, "ignoring unparseable TWITCH_FORCE_VERIFY"),
        }
    }
}

/// Apply command-line overrides on top of `config`.
pub fn apply_overrides(config: &mut TwitchAuthConfig, overrides: &Overrides) {
    if let Some(ref client_id) = overrides.client_id {
        config.client_id = client_id.clone();
    }
    if let Some(force_verify) = overrides.force_verify {
        config.force_verify = force_verify;
    }
}

/// Layer file, environment, and flags without validating the result.
pub fn load(path: &Path, overrides: &Overrides) -> Result<TwitchAuthConfig> {
    // A missing .env is fine.
    let _ = dotenvy::dotenv();

    let mut config = load_file(path)?;
    apply_env(&mut config);
    apply_overrides(&mut config, overrides);
    Ok(config)
}

/// Resolve the effective configuration and validate it.
pub fn resolve(path: &Path, overrides: &Overrides) -> Result<TwitchAuthConfig> {
    let config = load(path, overrides)?;

    config.validate().context(
        "set a client ID with --client-id, TWITCH_CLIENT_ID, or [twitch] client_id in the config file",
    )?;

    tracing::debug!(
        client_id = %config.client_id,
        force_verify = config.force_verify,
        "configuration resolved"
    );
    Ok(config)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
