//! Token authority: mints and validates access/refresh token pairs.

use std::collections::BTreeSet;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use thiserror::Error;

use super::claims::{Claims, FRONTEND_AUDIENCE, TokenPair, TokenType};
use super::codec::ClaimsCodec;
use super::error::JwtError;

/// Default issuer written into every token.
pub const DEFAULT_ISSUER: &str = "openai-server";

/// Access token duration: 15 minutes
pub const DEFAULT_ACCESS_TOKEN_TTL: Duration = Duration::from_secs(15 * 60);

/// Refresh token duration: 24 hours
pub const DEFAULT_REFRESH_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Upper bound for either TTL.
pub const MAX_TOKEN_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Refresh cookie name. The `__Host-` prefix requires `Secure`, `Path=/`
/// and no `Domain` attribute.
pub const DEFAULT_COOKIE_NAME: &str = "__Host-refresh_token";

/// Configuration the authority is built from.
#[derive(Clone)]
pub struct AuthorityConfig {
    pub signing_secret: Vec<u8>,
    pub issuer: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub cookie_name: String,
}

impl AuthorityConfig {
    /// Config with the default issuer, TTLs and cookie name.
    pub fn new(signing_secret: impl Into<Vec<u8>>) -> Self {
        Self {
            signing_secret: signing_secret.into(),
            issuer: DEFAULT_ISSUER.to_string(),
            access_token_ttl: DEFAULT_ACCESS_TOKEN_TTL,
            refresh_token_ttl: DEFAULT_REFRESH_TOKEN_TTL,
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
        }
    }

    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    pub fn access_token_ttl(mut self, ttl: Duration) -> Self {
        self.access_token_ttl = ttl;
        self
    }

    pub fn refresh_token_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_token_ttl = ttl;
        self
    }

    pub fn cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }
}

impl std::fmt::Debug for AuthorityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorityConfig")
            .field("signing_secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("cookie_name", &self.cookie_name)
            .finish()
    }
}

/// Rejected authority configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("token TTLs must be at least one second")]
    ZeroTtl,
    #[error("token TTLs must not exceed {} seconds", MAX_TOKEN_TTL.as_secs())]
    TtlTooLong,
    #[error("access token TTL must be shorter than refresh token TTL")]
    AccessNotShorterThanRefresh,
    #[error("issuer must not be empty")]
    EmptyIssuer,
    #[error("cookie name must not be empty")]
    EmptyCookieName,
}

/// Owns the signing secret, issuer and TTL policy.
///
/// Built once at startup and shared read-only between requests.
#[derive(Clone)]
pub struct TokenAuthority {
    codec: ClaimsCodec,
    issuer: String,
    access_token_ttl: Duration,
    refresh_token_ttl: Duration,
    cookie_name: String,
}

impl TokenAuthority {
    /// Build the authority, enforcing `access_token_ttl < refresh_token_ttl`.
    pub fn new(config: AuthorityConfig) -> Result<Self, ConfigError> {
        let AuthorityConfig {
            signing_secret,
            issuer,
            access_token_ttl,
            refresh_token_ttl,
            cookie_name,
        } = config;

        if access_token_ttl.as_secs() == 0 || refresh_token_ttl.as_secs() == 0 {
            return Err(ConfigError::ZeroTtl);
        }
        if access_token_ttl > MAX_TOKEN_TTL || refresh_token_ttl > MAX_TOKEN_TTL {
            return Err(ConfigError::TtlTooLong);
        }
        if access_token_ttl >= refresh_token_ttl {
            return Err(ConfigError::AccessNotShorterThanRefresh);
        }
        if issuer.is_empty() {
            return Err(ConfigError::EmptyIssuer);
        }
        if cookie_name.is_empty() {
            return Err(ConfigError::EmptyCookieName);
        }

        Ok(Self {
            codec: ClaimsCodec::new(&signing_secret),
            issuer,
            access_token_ttl,
            refresh_token_ttl,
            cookie_name,
        })
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn access_token_ttl(&self) -> Duration {
        self.access_token_ttl
    }

    pub fn refresh_token_ttl(&self) -> Duration {
        self.refresh_token_ttl
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Mint a new access/refresh pair for the subject.
    pub fn mint(&self, subject: &str) -> Result<TokenPair, JwtError> {
        self.mint_at(subject, unix_now()?)
    }

    /// Mint a pair as if the current time were `now` (Unix seconds).
    pub fn mint_at(&self, subject: &str, now: u64) -> Result<TokenPair, JwtError> {
        let access = Claims {
            sub: subject.to_string(),
            iss: self.issuer.clone(),
            iat: now,
            nbf: now,
            exp: now + self.access_token_ttl.as_secs(),
            aud: BTreeSet::from([FRONTEND_AUDIENCE.to_string()]),
            token_type: TokenType::Access,
            jti: uuid::Uuid::new_v4().to_string(),
        };

        let refresh = Claims {
            sub: subject.to_string(),
            iss: self.issuer.clone(),
            iat: now,
            nbf: now,
            exp: now + self.refresh_token_ttl.as_secs(),
            aud: BTreeSet::new(),
            token_type: TokenType::Refresh,
            jti: uuid::Uuid::new_v4().to_string(),
        };

        Ok(TokenPair {
            access_token: self.codec.encode(&access)?,
            refresh_token: self.codec.encode(&refresh)?,
        })
    }

    /// Validate a token of either type.
    pub fn validate(&self, token: &str) -> Result<Claims, JwtError> {
        self.validate_at(token, unix_now()?)
    }

    /// Validate a token as if the current time were `now` (Unix seconds).
    ///
    /// The algorithm pin and signature are checked by the codec before any
    /// claim is looked at. `exp` is the last second the token is valid.
    pub fn validate_at(&self, token: &str, now: u64) -> Result<Claims, JwtError> {
        let claims = self.codec.decode(token)?;

        if now > claims.exp {
            return Err(JwtError::Expired);
        }
        if now < claims.nbf {
            return Err(JwtError::NotYetValid);
        }
        if claims.iss != self.issuer {
            return Err(JwtError::WrongIssuer(claims.iss));
        }

        Ok(claims)
    }

    /// Validate a bearer token; refresh tokens are rejected.
    pub fn validate_access(&self, token: &str) -> Result<Claims, JwtError> {
        expect_type(self.validate(token)?, TokenType::Access)
    }

    /// Validate a refresh token; access tokens are rejected.
    pub fn validate_refresh(&self, token: &str) -> Result<Claims, JwtError> {
        expect_type(self.validate(token)?, TokenType::Refresh)
    }
}

fn expect_type(claims: Claims, expected: TokenType) -> Result<Claims, JwtError> {
    if claims.token_type != expected {
        return Err(JwtError::WrongTokenType);
    }
    Ok(claims)
}

/// Current Unix time in seconds.
pub fn unix_now() -> Result<u64, JwtError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| JwtError::TimeError)
}
