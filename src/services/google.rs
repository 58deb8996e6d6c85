// src/services/google.rs
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::common::config::GoogleConfig;
use crate::common::{safe_email_log, ApiError};

const GOOGLE_ISSUERS: &[&str] = &["accounts.google.com", "https://accounts.google.com"];

/// Outcome of a failed call to the identity provider
#[derive(Debug, Clone, Error)]
pub enum VerifyError {
    #[error("identity verification timed out")]
    Timeout,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("identity provider error: {0}")]
    Provider(String),
}

impl From<reqwest::Error> for VerifyError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            VerifyError::Timeout
        } else {
            VerifyError::Provider(e.to_string())
        }
    }
}

impl From<VerifyError> for ApiError {
    fn from(e: VerifyError) -> Self {
        match e {
            VerifyError::Timeout => ApiError::RequestTimeout("timeout".to_string()),
            VerifyError::InvalidToken(msg) => ApiError::Unauthorized(msg),
            VerifyError::Provider(msg) => ApiError::ServiceUnavailable(msg),
        }
    }
}

/// Identity asserted by a verified Google ID token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub sub: String,
    pub email: String,
    pub email_verified: bool,
}

/// Extended profile from the `oauth2/v1/userinfo` endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoogleProfile {
    pub email: String,
    #[serde(default)]
    pub verified_email: bool,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

impl GoogleProfile {
    /// Family name followed by given name, without a separator
    pub fn nickname(&self) -> String {
        format!(
            "{}{}",
            self.family_name.as_deref().unwrap_or_default(),
            self.given_name.as_deref().unwrap_or_default()
        )
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Checks signature and claims of a provider-issued ID token
    async fn verify_id_token(&self, id_token: &str) -> Result<VerifiedIdentity, VerifyError>;

    /// Fetches the extended profile belonging to a provider access token
    async fn fetch_profile(&self, access_token: &str) -> Result<GoogleProfile, VerifyError>;
}

pub struct GoogleIdentityProvider {
    http: Client,
    config: GoogleConfig,
}

impl GoogleIdentityProvider {
    pub fn new(config: GoogleConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .no_proxy()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl IdentityProvider for GoogleIdentityProvider {
    async fn verify_id_token(&self, id_token: &str) -> Result<VerifiedIdentity, VerifyError> {
        // Docs: https://developers.google.com/identity/sign-in/web/backend-auth
        debug!("Initiating Google token validation with tokeninfo endpoint");

        let resp = self
            .http
            .get(&self.config.tokeninfo_url)
            .query(&[("id_token", id_token)])
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, endpoint = %self.config.tokeninfo_url, "HTTP error contacting Google tokeninfo endpoint");
                VerifyError::from(e)
            })?;

        let status = resp.status();
        debug!(http_status = %status, "Received response from Google tokeninfo endpoint");

        if status == StatusCode::BAD_REQUEST {
            warn!(http_status = %status, "Google tokeninfo returned 400 - invalid or malformed token");
            return Err(VerifyError::InvalidToken(
                "invalid or malformed id_token".to_string(),
            ));
        }
        if !status.is_success() {
            warn!(http_status = %status, "Google tokeninfo returned error status");
            return Err(VerifyError::Provider(format!(
                "tokeninfo returned {}",
                status
            )));
        }

        let body = resp.json::<Value>().await?;
        let identity = validate_token_info(
            &body,
            self.config.client_id.as_deref(),
            Utc::now().timestamp(),
        )?;

        debug!(
            email = %safe_email_log(&identity.email),
            provider_id = %identity.sub,
            "Google token validation successful"
        );
        Ok(identity)
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<GoogleProfile, VerifyError> {
        let resp = self
            .http
            .get(&self.config.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, endpoint = %self.config.userinfo_url, "HTTP error contacting Google userinfo endpoint");
                VerifyError::from(e)
            })?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            warn!(http_status = %status, "Google userinfo rejected the access token");
            return Err(VerifyError::InvalidToken(
                "access_token rejected by provider".to_string(),
            ));
        }
        if !status.is_success() {
            warn!(http_status = %status, "Google userinfo returned error status");
            return Err(VerifyError::Provider(format!(
                "userinfo returned {}",
                status
            )));
        }

        let profile = resp.json::<GoogleProfile>().await?;
        debug!(
            email = %safe_email_log(&profile.email),
            verified_email = profile.verified_email,
            "Fetched Google profile"
        );
        Ok(profile)
    }
}

/// Validates a tokeninfo payload against issuer, audience and expiry.
///
/// tokeninfo encodes numbers and booleans as strings, so both forms are accepted.
pub fn validate_token_info(
    body: &Value,
    client_id: Option<&str>,
    now: i64,
) -> Result<VerifiedIdentity, VerifyError> {
    let str_field = |key: &str| body.get(key).and_then(|v| v.as_str()).map(str::to_string);

    let issuer = str_field("iss").unwrap_or_default();
    if !GOOGLE_ISSUERS.contains(&issuer.as_str()) {
        warn!(issuer = %issuer, "Google token issuer mismatch");
        return Err(VerifyError::InvalidToken("wrong issuer".to_string()));
    }

    if let Some(expected) = client_id {
        match str_field("aud") {
            Some(aud) if aud == expected => {}
            Some(aud) => {
                warn!(token_audience = %aud, expected_client_id = %expected, "Google token audience validation failed");
                return Err(VerifyError::InvalidToken("token audience mismatch".to_string()));
            }
            None => {
                warn!(expected_client_id = %expected, "Google token missing audience field");
                return Err(VerifyError::InvalidToken("token missing audience".to_string()));
            }
        }
    }

    match body.get("exp").and_then(lenient_i64) {
        Some(exp) if exp >= now => {}
        Some(exp) => {
            warn!(token_exp = exp, current_time = now, "Google token has expired");
            return Err(VerifyError::InvalidToken("token has expired".to_string()));
        }
        None => return Err(VerifyError::InvalidToken("token missing expiry".to_string())),
    }

    let (email, sub) = match (str_field("email"), str_field("sub")) {
        (Some(email), Some(sub)) => (email, sub),
        (email, sub) => {
            warn!(
                has_email = email.is_some(),
                has_sub = sub.is_some(),
                "Google token missing required fields (email/sub)"
            );
            return Err(VerifyError::InvalidToken(
                "token missing required fields".to_string(),
            ));
        }
    };

    let email_verified = body
        .get("email_verified")
        .map(|v| v.as_bool().unwrap_or_else(|| v.as_str() == Some("true")))
        .unwrap_or(false);

    Ok(VerifiedIdentity {
        sub,
        email,
        email_verified,
    })
}

fn lenient_i64(v: &Value) -> Option<i64> {
    v.as_i64().or_else(|| v.as_str().and_then(|s| s.parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;
    use std::time::Duration;

    const NOW: i64 = 1_700_000_000;

    fn token_info() -> Value {
        json!({
            "iss": "https://accounts.google.com",
            "aud": "client-123",
            "sub": "1098",
            "email": "a@x.com",
            "email_verified": "true",
            "exp": (NOW + 3600).to_string(),
        })
    }

    fn config_for(server: &mockito::Server) -> GoogleConfig {
        GoogleConfig {
            client_id: Some("client-123".to_string()),
            timeout: Duration::from_secs(5),
            tokeninfo_url: format!("{}/tokeninfo", server.url()),
            userinfo_url: format!("{}/userinfo", server.url()),
        }
    }

    #[test]
    fn test_validate_token_info_accepts_string_encoded_fields() {
        let identity = validate_token_info(&token_info(), Some("client-123"), NOW).expect("valid");
        assert_eq!(identity.email, "a@x.com");
        assert_eq!(identity.sub, "1098");
        assert!(identity.email_verified);
    }

    #[test]
    fn test_validate_token_info_rejections() {
        let mut wrong_iss = token_info();
        wrong_iss["iss"] = json!("evil.example.com");
        assert!(matches!(
            validate_token_info(&wrong_iss, None, NOW),
            Err(VerifyError::InvalidToken(_))
        ));

        assert!(matches!(
            validate_token_info(&token_info(), Some("other-client"), NOW),
            Err(VerifyError::InvalidToken(_))
        ));

        assert!(matches!(
            validate_token_info(&token_info(), None, NOW + 7200),
            Err(VerifyError::InvalidToken(_))
        ));

        let mut no_email = token_info();
        no_email.as_object_mut().unwrap().remove("email");
        assert!(matches!(
            validate_token_info(&no_email, None, NOW),
            Err(VerifyError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_audience_skipped_without_client_id() {
        let mut body = token_info();
        body.as_object_mut().unwrap().remove("aud");
        assert!(validate_token_info(&body, None, NOW).is_ok());
    }

    #[test]
    fn test_nickname_concatenates_family_then_given() {
        let profile = GoogleProfile {
            email: "a@x.com".to_string(),
            family_name: Some("Doe".to_string()),
            given_name: Some("Jane".to_string()),
            ..GoogleProfile::default()
        };
        assert_eq!(profile.nickname(), "DoeJane");

        let partial = GoogleProfile {
            given_name: Some("Jane".to_string()),
            ..GoogleProfile::default()
        };
        assert_eq!(partial.nickname(), "Jane");
    }

    #[test]
    fn test_verify_error_status_mapping() {
        assert!(matches!(
            ApiError::from(VerifyError::Timeout),
            ApiError::RequestTimeout(msg) if msg == "timeout"
        ));
        assert!(matches!(
            ApiError::from(VerifyError::InvalidToken("x".into())),
            ApiError::Unauthorized(_)
        ));
        assert!(matches!(
            ApiError::from(VerifyError::Provider("x".into())),
            ApiError::ServiceUnavailable(_)
        ));
    }

    #[tokio::test]
    async fn test_verify_id_token_against_tokeninfo() {
        let mut server = mockito::Server::new_async().await;
        let mut body = token_info();
        body["exp"] = json!((Utc::now().timestamp() + 3600).to_string());
        let mock = server
            .mock("GET", "/tokeninfo")
            .match_query(Matcher::UrlEncoded("id_token".into(), "good-token".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await;

        let provider = GoogleIdentityProvider::new(config_for(&server)).expect("client");
        let identity = provider.verify_id_token("good-token").await.expect("verified");

        assert_eq!(identity.email, "a@x.com");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_verify_id_token_bad_request_is_invalid_token() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/tokeninfo")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"error":"invalid_token"}"#)
            .create_async()
            .await;

        let provider = GoogleIdentityProvider::new(config_for(&server)).expect("client");
        let result = provider.verify_id_token("garbage").await;

        assert!(matches!(result, Err(VerifyError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn test_verify_id_token_upstream_failure_is_provider_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/tokeninfo")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let provider = GoogleIdentityProvider::new(config_for(&server)).expect("client");
        let result = provider.verify_id_token("token").await;

        assert!(matches!(result, Err(VerifyError::Provider(_))));
    }

    #[tokio::test]
    async fn test_verify_id_token_timeout() {
        // Accepts connections and never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let provider = GoogleIdentityProvider::new(GoogleConfig {
            client_id: None,
            timeout: Duration::from_millis(200),
            tokeninfo_url: format!("http://{}/tokeninfo", addr),
            userinfo_url: format!("http://{}/userinfo", addr),
        })
        .expect("client");

        let result = provider.verify_id_token("token").await;
        assert!(matches!(result, Err(VerifyError::Timeout)));
    }

    #[tokio::test]
    async fn test_fetch_profile_sends_bearer_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/userinfo")
            .match_header("authorization", "Bearer ya29.token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "id": "1098",
                    "email": "a@x.com",
                    "verified_email": true,
                    "given_name": "Jane",
                    "family_name": "Doe",
                    "picture": "https://example.com/a.png"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let provider = GoogleIdentityProvider::new(config_for(&server)).expect("client");
        let profile = provider.fetch_profile("ya29.token").await.expect("profile");

        assert!(profile.verified_email);
        assert_eq!(profile.nickname(), "DoeJane");
        assert_eq!(profile.picture.as_deref(), Some("https://example.com/a.png"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_profile_unauthorized() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/userinfo")
            .with_status(401)
            .create_async()
            .await;

        let provider = GoogleIdentityProvider::new(config_for(&server)).expect("client");
        let result = provider.fetch_profile("expired").await;

        assert!(matches!(result, Err(VerifyError::InvalidToken(_))));
    }
}
