//! Claim set carried by access and refresh tokens.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Audience stamped on access tokens.
pub const FRONTEND_AUDIENCE: &str = "openai-frontend";

/// Token type for distinguishing access vs refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Short-lived bearer credential for protected routes
    Access,
    /// Long-lived credential, only accepted by the refresh endpoint
    Refresh,
}

/// Decoded payload of a signed token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user UUID)
    pub sub: String,
    /// Issuer
    pub iss: String,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Not before (Unix timestamp)
    pub nbf: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Audience
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub aud: BTreeSet<String>,
    /// Token type
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    /// Token ID, only used to correlate log lines
    pub jti: String,
}

/// Access and refresh token returned on login and refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}
