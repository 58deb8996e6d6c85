//! Authentication handlers

use axum::extract::{rejection::JsonRejection, Extension, Json};
use std::sync::Arc;
use tower_cookies::Cookies;
use tracing::{debug, info, warn};

use super::extractors::{AccessSession, RefreshSession};
use super::models::{
    CurrentUserResponse, LoginRequest, LoginResponse, LogoutResponse, NewUser, RefreshResponse,
    User,
};
use super::store;
use crate::common::{generate_user_id, safe_email_log, ApiError, AppState, Validator};
use crate::services::VerifiedIdentity;

/// POST /login
/// Exchanges a Google ID token + access token for a session token pair
///
/// # Request Body
/// ```json
/// {
///   "id_token": "<google id token>",
///   "access_token": "<google access token>"
/// }
/// ```
///
/// # Response
/// ```json
/// {
///   "access_token": "<jwt>",
///   "refresh_token": "<jwt>"
/// }
/// ```
pub async fn login(
    Extension(state): Extension<Arc<AppState>>,
    cookies: Cookies,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    info!("🔐 Received Google login request");

    let Json(payload) = payload.map_err(|rejection| {
        warn!(reason = %rejection.body_text(), "Rejected unreadable login body");
        ApiError::from(rejection)
    })?;

    let payload = payload.with_fallback(state.dev_credentials.as_ref());
    let validation = payload.validate(&payload);
    if !validation.is_valid {
        return Err(validation.into());
    }
    let (Some(id_token), Some(access_token)) = (payload.id_token, payload.access_token) else {
        return Err(ApiError::ValidationError("credentials missing".to_string()));
    };

    let identity = state.identity.verify_id_token(&id_token).await.map_err(|e| {
        warn!(error = %e, "Google ID token verification failed");
        ApiError::from(e)
    })?;

    let user = resolve_user(&state, &identity, &access_token).await?;

    let access = state.tokens.issue_access(&user)?;
    let refresh = state.tokens.issue_refresh(&user)?;
    state.cookies.set_access(&cookies, &access);
    state.cookies.set_refresh(&cookies, &refresh);

    info!(
        user_id = %user.id,
        email = %safe_email_log(&user.email),
        provider = %user.provider,
        "User authentication successful via Google"
    );

    Ok(Json(LoginResponse {
        access_token: access,
        refresh_token: refresh,
    }))
}

/// Looks the user up by the verified email, creating it from the Google
/// profile on first login. Existing users are returned untouched.
async fn resolve_user(
    state: &AppState,
    identity: &VerifiedIdentity,
    access_token: &str,
) -> Result<User, ApiError> {
    if let Some(existing) = store::find_user_by_email(&state.db, &identity.email).await? {
        debug!(user_id = %existing.id, "Found existing user in database");
        return Ok(existing);
    }

    debug!(
        email = %safe_email_log(&identity.email),
        id_token_email_verified = identity.email_verified,
        "No existing user found, fetching Google profile"
    );
    let profile = state.identity.fetch_profile(access_token).await.map_err(|e| {
        warn!(error = %e, "Fetching Google profile failed");
        ApiError::from(e)
    })?;

    if !profile.verified_email {
        warn!(
            email = %safe_email_log(&identity.email),
            "Google profile reports unverified email, refusing to create user"
        );
        return Err(ApiError::ValidationError("email not verified".to_string()));
    }

    let new_user = NewUser {
        id: generate_user_id(),
        provider: "google".to_string(),
        email: identity.email.clone(),
        nickname: profile.nickname(),
        avatar: profile.picture.clone(),
        verified: true,
    };

    let (user, created) = store::insert_or_fetch_user(&state.db, &new_user).await?;
    if created {
        info!(
            user_id = %user.id,
            email = %safe_email_log(&user.email),
            provider = "google",
            "Created new user account via Google login"
        );
    } else {
        info!(
            user_id = %user.id,
            "Concurrent first login detected, reusing existing user"
        );
    }
    Ok(user)
}

/// POST /refresh
/// Mints a new access token from a valid refresh token
pub async fn refresh(
    Extension(state): Extension<Arc<AppState>>,
    cookies: Cookies,
    session: RefreshSession,
) -> Result<Json<RefreshResponse>, ApiError> {
    let email = session.subject();

    store::touch_last_logged_in(&state.db, email).await?;
    let user = store::find_user_by_email(&state.db, email)
        .await?
        .ok_or_else(|| {
            warn!(email = %safe_email_log(email), "Refresh token subject has no user record");
            ApiError::Unauthorized("user not found".into())
        })?;

    let access = state.tokens.issue_access(&user)?;
    state.cookies.set_access(&cookies, &access);

    info!(user_id = %user.id, "Access token refreshed");
    Ok(Json(RefreshResponse {
        access_token: access,
    }))
}

/// DELETE /logout
/// Clears the session cookies. Tokens are not revoked server-side and stay
/// valid until they expire.
pub async fn logout(
    Extension(state): Extension<Arc<AppState>>,
    cookies: Cookies,
    session: AccessSession,
) -> Result<Json<LogoutResponse>, ApiError> {
    state.cookies.unset_all(&cookies);

    info!(user_id = %session.claims.id, "User logout successful");
    Ok(Json(LogoutResponse {
        msg: "success".to_string(),
    }))
}

/// POST /user
/// Returns the stored record for the token's subject, or `null` if it is gone
pub async fn current_user(
    Extension(state): Extension<Arc<AppState>>,
    session: AccessSession,
) -> Result<Json<CurrentUserResponse>, ApiError> {
    let user = store::find_user_by_email(&state.db, session.subject()).await?;
    if user.is_none() {
        warn!(
            email = %safe_email_log(session.subject()),
            "Access token subject has no user record"
        );
    }

    Ok(Json(CurrentUserResponse { user }))
}
