//! Refresh token cookie construction and cookie parsing.

use std::fmt;
use std::time::Duration;

use axum::http::header;
use chrono::{DateTime, TimeDelta, Utc};

use crate::jwt::TokenAuthority;

/// Path every refresh cookie is scoped to.
pub const COOKIE_PATH: &str = "/";

/// How far in the past the logout cookie's `Expires` is set, in hours.
const EXPIRED_COOKIE_AGE_HOURS: i64 = 2;

/// A `Set-Cookie` value derived from a refresh token.
///
/// `HttpOnly`, `Secure` and `SameSite=Strict` are always set; the other
/// fields can only be produced by [`CookieFactory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieDescriptor {
    name: String,
    value: String,
    expires_at: DateTime<Utc>,
    max_age_seconds: i64,
}

impl CookieDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn path(&self) -> &str {
        COOKIE_PATH
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn max_age_seconds(&self) -> i64 {
        self.max_age_seconds
    }

    pub fn http_only(&self) -> bool {
        true
    }

    pub fn secure(&self) -> bool {
        true
    }

    pub fn same_site(&self) -> &'static str {
        "Strict"
    }
}

/// Renders the `Set-Cookie` header value. A negative max-age is sent as
/// `Max-Age=0`, which tells the browser to drop the cookie.
impl fmt::Display for CookieDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}={}; Path={}; Expires={}; Max-Age={}; HttpOnly; Secure; SameSite={}",
            self.name,
            self.value,
            COOKIE_PATH,
            self.expires_at.format("%a, %d %b %Y %H:%M:%S GMT"),
            self.max_age_seconds.max(0),
            self.same_site()
        )
    }
}

/// Builds refresh cookies from the authority's cookie name and refresh TTL.
#[derive(Debug, Clone)]
pub struct CookieFactory {
    name: String,
    ttl: Duration,
}

impl CookieFactory {
    pub fn new(authority: &TokenAuthority) -> Self {
        Self {
            name: authority.cookie_name().to_string(),
            ttl: authority.refresh_token_ttl(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cookie carrying the refresh token for one full refresh TTL from now.
    pub fn from_refresh_token(&self, value: &str) -> CookieDescriptor {
        self.from_refresh_token_at(value, Utc::now())
    }

    /// Same as [`Self::from_refresh_token`] with an explicit clock.
    pub fn from_refresh_token_at(&self, value: &str, now: DateTime<Utc>) -> CookieDescriptor {
        // TTLs are capped by the authority, so the conversion cannot overflow.
        let max_age_seconds = self.ttl.as_secs() as i64;

        CookieDescriptor {
            name: self.name.clone(),
            value: value.to_string(),
            expires_at: now + TimeDelta::seconds(max_age_seconds),
            max_age_seconds,
        }
    }

    /// Cookie that makes the browser delete the refresh cookie.
    pub fn expired_descriptor(&self) -> CookieDescriptor {
        CookieDescriptor {
            name: self.name.clone(),
            value: String::new(),
            expires_at: Utc::now() - TimeDelta::hours(EXPIRED_COOKIE_AGE_HOURS),
            max_age_seconds: -1,
        }
    }
}

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a axum::http::HeaderMap, name: &str) -> Option<&'a str> {
    for cookie_header in headers.get_all(header::COOKIE) {
        let Ok(cookie_header) = cookie_header.to_str() else {
            continue;
        };
        for part in cookie_header.split(';') {
            let part = part.trim();
            if let Some((key, value)) = part.split_once('=') {
                if key.trim() == name {
                    return Some(value.trim());
                }
            }
        }
    }
    None
}
