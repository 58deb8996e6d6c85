//! Session cookie handling

use tower_cookies::cookie::SameSite;
use tower_cookies::{Cookie, Cookies};

pub const ACCESS_COOKIE: &str = "access_token_cookie";
pub const REFRESH_COOKIE: &str = "refresh_token_cookie";

/// Attributes applied to every session cookie
#[derive(Debug, Clone)]
pub struct CookiePolicy {
    pub secure: bool,
    pub same_site: SameSite,
    pub domain: Option<String>,
    pub access_max_age: chrono::Duration,
    pub refresh_max_age: chrono::Duration,
}

impl Default for CookiePolicy {
    fn default() -> Self {
        Self {
            secure: false,
            same_site: SameSite::Lax,
            domain: None,
            access_max_age: chrono::Duration::minutes(15),
            refresh_max_age: chrono::Duration::days(30),
        }
    }
}

impl CookiePolicy {
    pub fn set_access(&self, cookies: &Cookies, token: &str) {
        cookies.add(self.build(ACCESS_COOKIE, token.to_string(), self.access_max_age));
    }

    pub fn set_refresh(&self, cookies: &Cookies, token: &str) {
        cookies.add(self.build(REFRESH_COOKIE, token.to_string(), self.refresh_max_age));
    }

    /// Overwrites both session cookies with expired, empty values
    pub fn unset_all(&self, cookies: &Cookies) {
        for name in [ACCESS_COOKIE, REFRESH_COOKIE] {
            cookies.add(self.build(name, String::new(), chrono::Duration::zero()));
        }
    }

    fn build(&self, name: &'static str, value: String, max_age: chrono::Duration) -> Cookie<'static> {
        let mut builder = Cookie::build((name, value))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(self.same_site)
            .max_age(time::Duration::seconds(max_age.num_seconds()));
        if let Some(domain) = &self.domain {
            builder = builder.domain(domain.clone());
        }
        builder.build()
    }
}
