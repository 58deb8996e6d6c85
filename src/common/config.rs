// src/common/config.rs
//! Runtime configuration read from the environment

use std::env;
use std::time::Duration;
use tracing::warn;

use crate::auth::cookies::CookiePolicy;
use tower_cookies::cookie::SameSite;

const DEFAULT_JWT_SECRET: &str = "replace_with_strong_secret";
pub const DEFAULT_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";
pub const DEFAULT_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v1/userinfo";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub access_token_ttl: chrono::Duration,
    pub refresh_token_ttl: chrono::Duration,
    pub google: GoogleConfig,
    pub cookies: CookiePolicy,
    pub cors_origins: Vec<String>,
}

/// Settings for talking to Google's verification endpoints
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: Option<String>,
    pub timeout: Duration,
    pub tokeninfo_url: String,
    pub userinfo_url: String,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            timeout: Duration::from_secs(10),
            tokeninfo_url: DEFAULT_TOKENINFO_URL.to_string(),
            userinfo_url: DEFAULT_USERINFO_URL.to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://session_api.db".to_string());

        let port = parse_var("PORT", 8080u16);

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            warn!("JWT_SECRET not set, falling back to the built-in development secret");
            DEFAULT_JWT_SECRET.to_string()
        });

        let access_token_ttl =
            chrono::Duration::minutes(parse_var("ACCESS_TOKEN_EXPIRES_MINUTES", 15i64));
        let refresh_token_ttl =
            chrono::Duration::days(parse_var("REFRESH_TOKEN_EXPIRES_DAYS", 30i64));

        let google = GoogleConfig {
            client_id: env::var("GOOGLE_CLIENT_ID").ok().filter(|s| !s.is_empty()),
            timeout: Duration::from_secs(parse_var("GOOGLE_VERIFY_TIMEOUT_SECS", 10u64)),
            tokeninfo_url: env::var("GOOGLE_TOKENINFO_URL")
                .unwrap_or_else(|_| DEFAULT_TOKENINFO_URL.to_string()),
            userinfo_url: env::var("GOOGLE_USERINFO_URL")
                .unwrap_or_else(|_| DEFAULT_USERINFO_URL.to_string()),
        };

        let cookies = CookiePolicy {
            secure: parse_var("COOKIE_SECURE", false),
            same_site: parse_same_site(
                &env::var("COOKIE_SAMESITE").unwrap_or_else(|_| "lax".to_string()),
            ),
            domain: env::var("COOKIE_DOMAIN").ok().filter(|s| !s.is_empty()),
            access_max_age: access_token_ttl,
            refresh_max_age: refresh_token_ttl,
        };

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| {
                "http://localhost:3000,http://localhost:3001,http://localhost:5173".to_string()
            })
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            database_url,
            port,
            jwt_secret,
            access_token_ttl,
            refresh_token_ttl,
            google,
            cookies,
            cors_origins,
        }
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_lowercase().parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                warn!(key = %key, value = %raw, "Ignoring unparsable environment value");
                default
            }
        },
        Err(_) => default,
    }
}

pub fn parse_same_site(raw: &str) -> SameSite {
    match raw.trim().to_lowercase().as_str() {
        "strict" => SameSite::Strict,
        "none" => SameSite::None,
        _ => SameSite::Lax,
    }
}
