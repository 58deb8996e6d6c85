//! Authentication extractors for Axum

use async_trait::async_trait;
use axum::{
    extract::{Extension, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use std::sync::Arc;
use tower_cookies::Cookies;
use tracing::{debug, warn};

use super::cookies::{ACCESS_COOKIE, REFRESH_COOKIE};
use super::models::{AccessClaims, RefreshClaims};
use crate::common::{safe_email_log, ApiError, AppState};

/// Request carrying a valid access token
#[derive(Debug)]
pub struct AccessSession {
    pub claims: AccessClaims,
}

impl AccessSession {
    pub fn subject(&self) -> &str {
        &self.claims.sub
    }
}

/// Request carrying a valid refresh token
#[derive(Debug)]
pub struct RefreshSession {
    pub claims: RefreshClaims,
}

impl RefreshSession {
    pub fn subject(&self) -> &str {
        &self.claims.sub
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AccessSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = app_state(parts, state).await?;
        let token = session_token(parts, state, ACCESS_COOKIE).await?;

        let claims = app_state.tokens.decode_access(&token)?;
        debug!(
            user_id = %claims.id,
            email = %safe_email_log(&claims.sub),
            "Access token accepted"
        );
        Ok(AccessSession { claims })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RefreshSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = app_state(parts, state).await?;
        let token = session_token(parts, state, REFRESH_COOKIE).await?;

        let claims = app_state.tokens.decode_refresh(&token)?;
        debug!(email = %safe_email_log(&claims.sub), "Refresh token accepted");
        Ok(RefreshSession { claims })
    }
}

async fn app_state<S: Send + Sync>(parts: &mut Parts, state: &S) -> Result<Arc<AppState>, ApiError> {
    let Extension(app_state): Extension<Arc<AppState>> =
        Extension::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::InternalServer("missing app state".to_string()))?;
    Ok(app_state)
}

/// Reads the token from `Authorization: Bearer <token>`, falling back to `cookie_name`.
/// Headers with any other scheme are ignored.
async fn session_token<S: Send + Sync>(
    parts: &mut Parts,
    state: &S,
    cookie_name: &str,
) -> Result<String, ApiError> {
    let header_token = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    if let Some(token) = header_token {
        return Ok(token);
    }

    let cookies = Cookies::from_request_parts(parts, state)
        .await
        .map_err(|_| ApiError::InternalServer("cookie layer missing".to_string()))?;

    match cookies.get(cookie_name).map(|c| c.value().to_string()) {
        Some(token) if !token.is_empty() => Ok(token),
        _ => {
            warn!(cookie = %cookie_name, "Authentication failed: no session token in header or cookie");
            Err(ApiError::Unauthorized("missing auth".into()))
        }
    }
}
