//! Session token minting and verification (HS256 JWTs)

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, warn};
use uuid::Uuid;

use super::models::{AccessClaims, RefreshClaims, TokenType, User};
use crate::common::ApiError;

#[derive(Clone)]
pub struct TokenIssuer {
    secret: Arc<String>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(secret: impl Into<String>, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            secret: Arc::new(secret.into()),
            access_ttl,
            refresh_ttl,
        }
    }

    /// Mints an access token for `user`; the subject is the user's email
    pub fn issue_access(&self, user: &User) -> Result<String, ApiError> {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: user.email.clone(),
            iat: now.timestamp() as usize,
            exp: (now + self.access_ttl).timestamp() as usize,
            jti: Uuid::new_v4().to_string(),
            token_type: TokenType::Access,
            id: user.id.clone(),
            email: user.email.clone(),
            onboarded: user.onboarded,
            avatar: user.avatar.clone(),
            username: user.username.clone(),
        };
        self.sign(&claims, &user.id)
    }

    pub fn issue_refresh(&self, user: &User) -> Result<String, ApiError> {
        let now = Utc::now();
        let claims = RefreshClaims {
            sub: user.email.clone(),
            iat: now.timestamp() as usize,
            exp: (now + self.refresh_ttl).timestamp() as usize,
            jti: Uuid::new_v4().to_string(),
            token_type: TokenType::Refresh,
        };
        self.sign(&claims, &user.id)
    }

    pub fn decode_access(&self, token: &str) -> Result<AccessClaims, ApiError> {
        let claims: AccessClaims = self.verify(token)?;
        if claims.token_type != TokenType::Access {
            warn!(token_type = ?claims.token_type, "Rejected non-access token");
            return Err(ApiError::Unauthorized("access token required".into()));
        }
        Ok(claims)
    }

    pub fn decode_refresh(&self, token: &str) -> Result<RefreshClaims, ApiError> {
        let claims: RefreshClaims = self.verify(token)?;
        if claims.token_type != TokenType::Refresh {
            warn!(token_type = ?claims.token_type, "Rejected non-refresh token");
            return Err(ApiError::Unauthorized("refresh token required".into()));
        }
        Ok(claims)
    }

    fn sign<T: serde::Serialize>(&self, claims: &T, user_id: &str) -> Result<String, ApiError> {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| {
            error!(error = %e, user_id = %user_id, "JWT encoding error");
            ApiError::InternalServer("jwt error".to_string())
        })
    }

    fn verify<T: serde::de::DeserializeOwned>(&self, token: &str) -> Result<T, ApiError> {
        decode::<T>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map(|data| data.claims)
        .map_err(|e| {
            debug!(error = %e, "JWT token validation failed");
            ApiError::Unauthorized("invalid token".into())
        })
    }
}
