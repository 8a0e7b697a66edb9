//! Authentication error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::StoreError;
use crate::jwt::JwtError;

/// Why a request was not authenticated.
///
/// The variant is only ever logged. Every authentication failure produces
/// the same 401 body, and store/signing failures the same 500 body.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no credential presented")]
    MissingCredential,
    #[error("no authorization header")]
    MissingHeader,
    #[error("authorization header is not a bearer credential")]
    MalformedHeader,
    #[error("invalid token signature")]
    InvalidSignature,
    #[error("unexpected signing algorithm: {0}")]
    UnexpectedAlgorithm(String),
    #[error("token has expired")]
    Expired,
    #[error("token is not valid yet")]
    NotYetValid,
    #[error("wrong issuer: {0}")]
    WrongIssuer(String),
    #[error("wrong token type")]
    WrongTokenType,
    #[error("malformed token: {0}")]
    MalformedToken(String),
    #[error("user not found")]
    UserNotFound,
    #[error("password does not match")]
    PasswordMismatch,
    #[error("failed to sign token: {0}")]
    SigningFailure(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<JwtError> for AuthError {
    fn from(e: JwtError) -> Self {
        match e {
            JwtError::UnexpectedAlgorithm(alg) => AuthError::UnexpectedAlgorithm(alg),
            JwtError::InvalidSignature => AuthError::InvalidSignature,
            JwtError::Expired => AuthError::Expired,
            JwtError::NotYetValid => AuthError::NotYetValid,
            JwtError::WrongIssuer(iss) => AuthError::WrongIssuer(iss),
            JwtError::WrongTokenType => AuthError::WrongTokenType,
            JwtError::Malformed(msg) => AuthError::MalformedToken(msg),
            JwtError::SigningFailure(msg) => AuthError::SigningFailure(msg),
            JwtError::TimeError => AuthError::Internal(e.to_string()),
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        AuthError::Internal(e.to_string())
    }
}

impl AuthError {
    /// True for every kind that is the caller's fault (401).
    pub fn is_unauthorized(&self) -> bool {
        !matches!(self, AuthError::SigningFailure(_) | AuthError::Internal(_))
    }

    pub fn status_code(&self) -> StatusCode {
        if self.is_unauthorized() {
            StatusCode::UNAUTHORIZED
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    fn message(&self) -> &'static str {
        if self.is_unauthorized() {
            "Unauthorized"
        } else {
            "Internal server error"
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: &'static str,
        }

        if self.is_unauthorized() {
            tracing::warn!(reason = %self, "Authentication denied");
        } else {
            tracing::error!(error = %self, "Authentication failed");
        }

        (
            self.status_code(),
            Json(ErrorResponse {
                error: self.message(),
            }),
        )
            .into_response()
    }
}
