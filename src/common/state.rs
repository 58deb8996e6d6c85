// Application state shared by all handlers

use sqlx::SqlitePool;
use std::sync::Arc;

use crate::auth::cookies::CookiePolicy;
use crate::auth::models::LoginCredentials;
use crate::auth::tokens::TokenIssuer;
use crate::services::IdentityProvider;

/// Immutable per-process state; handlers receive it as `Extension<Arc<AppState>>`
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub identity: Arc<dyn IdentityProvider>,
    pub tokens: TokenIssuer,
    pub cookies: CookiePolicy,
    /// Development-only stand-in for credentials missing from a login request
    pub dev_credentials: Option<LoginCredentials>,
}
