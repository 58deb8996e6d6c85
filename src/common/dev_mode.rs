// src/common/dev_mode.rs
//! Development mode configuration
//!
//! In development the login endpoint may be driven from a stand-in Google
//! redirect URL (`GOOGLE_URL`) whose query string carries an `id_token` and an
//! `access_token`. The URL is decoded once at startup; requests that omit a
//! credential get the decoded value instead.

use reqwest::Url;
use std::env;

use crate::auth::models::LoginCredentials;

#[derive(Debug, Clone)]
pub struct DevModeConfig {
    pub enabled: bool,
    pub google_url: Option<String>,
}

impl DevModeConfig {
    pub fn from_env() -> Self {
        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "production".to_string());
        let enabled = matches!(app_env.to_lowercase().as_str(), "dev" | "development");

        let google_url = env::var("GOOGLE_URL").ok().filter(|s| !s.is_empty());

        Self {
            enabled,
            google_url,
        }
    }

    /// Credentials decoded from the fallback URL.
    ///
    /// Returns `Ok(None)` outside development or when no URL is configured.
    pub fn fallback_credentials(&self) -> anyhow::Result<Option<LoginCredentials>> {
        if !self.enabled {
            return Ok(None);
        }
        match &self.google_url {
            Some(url) => parse_fallback_url(url).map(Some),
            None => Ok(None),
        }
    }
}

/// Google returns the implicit-flow tokens in the fragment (`.../google#id_token=...`);
/// rewriting the first `google#` turns them into query parameters.
pub fn parse_fallback_url(raw: &str) -> anyhow::Result<LoginCredentials> {
    let normalized = raw.replacen("google#", "google?", 1);
    let url = Url::parse(&normalized)?;

    let mut id_token = None;
    let mut access_token = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "id_token" if id_token.is_none() => id_token = Some(value.into_owned()),
            "access_token" if access_token.is_none() => access_token = Some(value.into_owned()),
            _ => {}
        }
    }

    match (id_token, access_token) {
        (Some(id_token), Some(access_token)) => Ok(LoginCredentials {
            id_token,
            access_token,
        }),
        _ => anyhow::bail!("GOOGLE_URL must carry both id_token and access_token"),
    }
}

/// Print dev mode status on startup
pub fn print_dev_mode_status(config: &DevModeConfig, fallback: Option<&LoginCredentials>) {
    if config.enabled {
        println!("⚠️  🔓 DEV MODE ENABLED 🔓 ⚠️");
        if fallback.is_some() {
            println!("   Missing login credentials are filled from GOOGLE_URL");
        } else {
            println!("   GOOGLE_URL not set, login requires real credentials");
        }
        println!("   ⚠️  DO NOT USE IN PRODUCTION ⚠️");
        println!();
    } else {
        println!("🔒 Production mode - login credentials required");
    }
}

/// CLI argument parsing for dev mode
pub fn parse_dev_mode_args<I: IntoIterator<Item = String>>(args: I) -> Option<bool> {
    for arg in args {
        match arg.as_str() {
            "--dev" | "--dev-mode" => return Some(true),
            "--no-dev" | "--prod" | "--production" => return Some(false),
            _ => {}
        }
    }

    None
}

/// Override dev mode from CLI args
pub fn apply_cli_override(mut config: DevModeConfig) -> DevModeConfig {
    if let Some(cli_dev_mode) = parse_dev_mode_args(env::args()) {
        println!("🔧 CLI override: APP_ENV dev = {}", cli_dev_mode);
        config.enabled = cli_dev_mode;
    }

    config
}
