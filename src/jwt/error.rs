//! Token minting and validation errors.

use thiserror::Error;

/// Errors that can occur during JWT operations.
#[derive(Debug, Error)]
pub enum JwtError {
    /// Header names an algorithm other than the pinned one (including `none`)
    #[error("unexpected signing algorithm: {0}")]
    UnexpectedAlgorithm(String),
    /// Signature does not match the held secret
    #[error("invalid token signature")]
    InvalidSignature,
    /// `exp` is in the past
    #[error("token has expired")]
    Expired,
    /// `nbf` is in the future
    #[error("token is not valid yet")]
    NotYetValid,
    /// `iss` does not match the authority's issuer
    #[error("wrong issuer: {0}")]
    WrongIssuer(String),
    /// Refresh token used as access token or the other way round
    #[error("wrong token type")]
    WrongTokenType,
    /// Token is not a well-formed JWT or its claims do not decode
    #[error("malformed token: {0}")]
    Malformed(String),
    /// Signer rejected the secret or the claims
    #[error("failed to sign token: {0}")]
    SigningFailure(String),
    /// System clock is before the unix epoch
    #[error("system time error")]
    TimeError,
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match e.kind() {
            ErrorKind::InvalidSignature => JwtError::InvalidSignature,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                JwtError::UnexpectedAlgorithm(e.to_string())
            }
            ErrorKind::ExpiredSignature => JwtError::Expired,
            ErrorKind::ImmatureSignature => JwtError::NotYetValid,
            ErrorKind::InvalidIssuer => JwtError::WrongIssuer(e.to_string()),
            _ => JwtError::Malformed(e.to_string()),
        }
    }
}
