//! Authentication routes

use axum::{
    routing::{delete, post},
    Router,
};

use super::handlers;

/// Creates and returns the authentication router
///
/// # Routes
/// - `POST /login` - Google login, issues access + refresh tokens
/// - `POST /refresh` - New access token from a refresh token
/// - `DELETE /logout` - Clears session cookies
/// - `POST /user` - Current user record
pub fn auth_routes() -> Router {
    Router::new()
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
        .route("/logout", delete(handlers::logout))
        .route("/user", post(handlers::current_user))
}
