//! Authentication data models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::common::{ValidationResult, Validator};

/// Discriminates the two session token kinds inside the `type` claim
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Claims of a short-lived access token.
///
/// Besides the registered claims it carries exactly the user fields
/// `id`, `email`, `onboarded`, `avatar` and `username`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AccessClaims {
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
    pub jti: String,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    pub id: String,
    pub email: String,
    pub onboarded: bool,
    pub avatar: Option<String>,
    pub username: Option<String>,
}

/// Claims of a refresh token; subject only
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RefreshClaims {
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
    pub jti: String,
    #[serde(rename = "type")]
    pub token_type: TokenType,
}

/// User database model
#[derive(FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub provider: String,
    pub email: String,
    pub nickname: String,
    pub username: Option<String>,
    pub avatar: Option<String>,
    pub verified: bool,
    pub onboarded: bool,
    pub last_logged_in: Option<String>,
    pub created_at: Option<String>,
}

/// Fields written when a user logs in for the first time
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: String,
    pub provider: String,
    pub email: String,
    pub nickname: String,
    pub avatar: Option<String>,
    pub verified: bool,
}

/// Body of `POST /login`. Both fields are optional on the wire so that
/// development fallback credentials can fill the gaps.
#[derive(Deserialize, Debug, Default)]
pub struct LoginRequest {
    pub id_token: Option<String>,
    pub access_token: Option<String>,
}

/// A complete Google credential pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    pub id_token: String,
    pub access_token: String,
}

impl Validator<LoginRequest> for LoginRequest {
    fn validate(&self, data: &LoginRequest) -> ValidationResult {
        let mut result = ValidationResult::new();
        result.require("id_token", data.id_token.as_deref());
        result.require("access_token", data.access_token.as_deref());
        result
    }
}

impl LoginRequest {
    /// Fills absent or blank fields from `fallback`
    pub fn with_fallback(self, fallback: Option<&LoginCredentials>) -> LoginRequest {
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        match fallback {
            Some(creds) => LoginRequest {
                id_token: present(self.id_token).or_else(|| Some(creds.id_token.clone())),
                access_token: present(self.access_token)
                    .or_else(|| Some(creds.access_token.clone())),
            },
            None => self,
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RefreshResponse {
    pub access_token: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct LogoutResponse {
    pub msg: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct CurrentUserResponse {
    pub user: Option<User>,
}
