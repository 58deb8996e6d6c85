// src/main.rs
use dotenv::dotenv;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::PathBuf;
use std::{net::SocketAddr, str::FromStr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

// ============================================================================
// MODULE IMPORTS
// ============================================================================

mod app;
mod auth;
mod common;
mod logging_middleware;
mod services;

use auth::tokens::TokenIssuer;
use common::dev_mode::{apply_cli_override, print_dev_mode_status, DevModeConfig};
use common::{AppConfig, AppState};
use services::GoogleIdentityProvider;

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env();

    // ========================================================================
    // DEV MODE CONFIGURATION
    // ========================================================================

    let dev_mode = apply_cli_override(DevModeConfig::from_env());
    let dev_credentials = dev_mode.fallback_credentials()?;
    print_dev_mode_status(&dev_mode, dev_credentials.as_ref());

    // ========================================================================
    // DATABASE SETUP
    // ========================================================================

    if let Some(path_part) = config.database_url.strip_prefix("sqlite://") {
        let path_without_params = path_part.split('?').next().unwrap_or("");
        if !path_without_params.is_empty() && !path_without_params.starts_with(':') {
            let db_path = PathBuf::from(path_without_params);
            if let Some(parent) = db_path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
        }
    }

    let connect_options =
        SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .connect_with(connect_options)
        .await?;

    common::migrations::run_migrations(&pool).await?;

    // ========================================================================
    // SERVICE INITIALIZATION
    // ========================================================================

    let identity = Arc::new(GoogleIdentityProvider::new(config.google.clone())?);
    info!(
        timeout_secs = config.google.timeout.as_secs(),
        audience_check = config.google.client_id.is_some(),
        "GoogleIdentityProvider initialized"
    );

    let tokens = TokenIssuer::new(
        config.jwt_secret.clone(),
        config.access_token_ttl,
        config.refresh_token_ttl,
    );

    // ========================================================================
    // APPLICATION STATE
    // ========================================================================

    let app_state = Arc::new(AppState {
        db: pool,
        identity,
        tokens,
        cookies: config.cookies.clone(),
        dev_credentials,
    });

    let app = app::build_router(app_state, &config.cors_origins);

    // ========================================================================
    // SERVER STARTUP
    // ========================================================================

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
