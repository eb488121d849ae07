//! CLI entry point for twitch-auth.
//!
//! Provides the `twitch-auth` command: run a Twitch sign-in from the
//! terminal, print the authorization URL, or pull a token out of a
//! redirect address.

mod helpers;
mod settings;
mod terminal;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use twitch_auth::redirect::redirect_marker;
use twitch_auth::{SignInEvent, TwitchAuth, extract_access_token};

use crate::settings::Overrides;
use crate::terminal::TerminalHost;

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// Sign in to Twitch from the terminal.
#[derive(Parser)]
#[command(
    name = "twitch-auth",
    version,
    about = "Twitch sign-in through the OAuth implicit grant",
    long_about = "Opens the Twitch authorization page, captures the access token from the \
                  redirect address, and fetches the signed-in user's profile."
)]
struct Cli {
    /// Twitch application client ID.
    #[arg(long, global = true)]
    client_id: Option<String>,

    /// Make Twitch ask the user to confirm even if already authorized.
    #[arg(long, global = true)]
    force_verify: Option<bool>,

    /// Path to the TOML config file.
    #[arg(long, global = true, default_value = settings::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and print the user's profile as JSON.
    SignIn,

    /// Print the authorization URL.
    AuthorizeUrl,

    /// Extract the access token from a redirect address.
    ExtractToken {
        /// The address the browser was redirected to.
        uri: String,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    helpers::init_tracing("info");

    let cli = Cli::parse();
    let overrides = Overrides {
        client_id: cli.client_id,
        force_verify: cli.force_verify,
    };

    match cli.command {
        Commands::SignIn => cmd_sign_in(&cli.config, &overrides).await,
        Commands::AuthorizeUrl => cmd_authorize_url(&cli.config, &overrides),
        Commands::ExtractToken { uri } => cmd_extract_token(&cli.config, &overrides, &uri),
    }
}

// ---------------------------------------------------------------------------
// Subcommand: sign-in
// ---------------------------------------------------------------------------

async fn cmd_sign_in(config_path: &std::path::Path, overrides: &Overrides) -> Result<()> {
    let config = settings::resolve(config_path, overrides)?;
    let host = Arc::new(TerminalHost::new());
    let auth = TwitchAuth::with_reqwest(config, host).context("failed to set up sign-in")?;

    let mut events = auth.subscribe();
    let watcher = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                SignInEvent::StateChanged { state } => info!(%state, "sign-in state"),
                SignInEvent::UserSignedIn { profile, at } => {
                    info!(user = %profile.name, at = %at.to_rfc3339(), "signed in");
                }
                SignInEvent::Failed { error } => warn!(%error, "sign-in problem"),
            }
        }
    });

    let task = auth
        .start_user_sign_in()
        .context("failed to start sign-in")?;

    let outcome = tokio::select! {
        result = task.wait() => result.context("sign-in failed"),
        _ = tokio::signal::ctrl_c() => {
            auth.cancel_sign_in();
            eprintln!("sign-in interrupted");
            // A pending stdin read would block runtime shutdown.
            std::process::exit(130);
        }
    };
    drop(auth);
    watcher.abort();

    let profile = outcome?;
    let json = serde_json::to_string_pretty(&profile).context("failed to render profile")?;
    println!("{json}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: authorize-url
// ---------------------------------------------------------------------------

fn cmd_authorize_url(config_path: &std::path::Path, overrides: &Overrides) -> Result<()> {
    let config = settings::resolve(config_path, overrides)?;
    let url = config
        .authorization_url()
        .context("failed to build authorization URL")?;
    println!("{url}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: extract-token
// ---------------------------------------------------------------------------

fn cmd_extract_token(config_path: &std::path::Path, overrides: &Overrides, uri: &str) -> Result<()> {
    // No client ID is needed to read a redirect.
    let config = settings::load(config_path, overrides)?;
    let marker = redirect_marker(&config.redirect_uri);

    match extract_access_token(uri, &marker)? {
        Some(token) => {
            println!("{token}");
            Ok(())
        }
        None => bail!("not a redirect to {}", config.redirect_uri),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "twitch-auth",
            "sign-in",
            "--client-id",
            "abc",
            "--force-verify",
            "false",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::SignIn));
        assert_eq!(cli.client_id.as_deref(), Some("abc"));
        assert_eq!(cli.force_verify, Some(false));
        assert_eq!(cli.config, PathBuf::from("config/default.toml"));
    }

    #[test]
    fn parses_extract_token() {
        let cli = Cli::try_parse_from([
            "twitch-auth",
            "--config",
            "other.toml",
            "extract-token",
            "https://localhost/#access_token=abc",
        ])
        .unwrap();
        match cli.command {
            Commands::ExtractToken { uri } => {
                assert_eq!(uri, "https://localhost/#access_token=abc");
            }
            _ => panic!("expected extract-token"),
        }
        assert_eq!(cli.config, PathBuf::from("other.toml"));
    }

    #[test]
    fn rejects_unknown_subcommand() {
        assert!(Cli::try_parse_from(["twitch-auth", "sign-out"]).is_err());
    }

    #[test]
    fn extract_token_rejects_other_pages() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        let err = cmd_extract_token(&path, &Overrides::default(), "https://www.twitch.tv/")
            .unwrap_err();
        assert!(err.to_string().contains("https://localhost"));
    }

    #[test]
    fn extract_token_accepts_redirect() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        cmd_extract_token(
            &path,
            &Overrides::default(),
            "https://localhost/#access_token=abc&scope=user_read",
        )
        .unwrap();
    }
}
