//! # Auth Module
//!
//! Google login and the session tokens that follow from it:
//! - ID token verification and first-login user creation
//! - Access/refresh JWT issuance, delivered in the body and as cookies
//! - Refresh, logout and current-user endpoints
//! - `AccessSession` / `RefreshSession` extractors for protected routes

pub mod cookies;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod store;
pub mod tokens;


pub use routes::auth_routes;
