//! Bearer token gate for protected routes.
//!
//! Only the `Authorization: Bearer <token>` form is accepted. Whatever check
//! fails, the caller gets the same 401 body; the reason is logged.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::errors::AuthError;
use super::state::HasAuthBackend;
use crate::jwt::{Claims, TokenAuthority};

/// Authorization scheme accepted by the gate (matched case-insensitively).
pub const BEARER_SCHEME: &str = "Bearer";

/// Pull the bearer token out of the `Authorization` header(s).
///
/// The first header using the bearer scheme wins, so a request that also
/// carries e.g. Basic credentials is still accepted.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let mut values = headers.get_all(header::AUTHORIZATION).iter().peekable();
    if values.peek().is_none() {
        return Err(AuthError::MissingHeader);
    }

    for value in values {
        let Ok(value) = value.to_str() else {
            continue;
        };
        let Some((scheme, token)) = value.trim_start().split_once(' ') else {
            continue;
        };
        let token = token.trim();
        if scheme.eq_ignore_ascii_case(BEARER_SCHEME) && !token.is_empty() {
            return Ok(token);
        }
    }

    Err(AuthError::MalformedHeader)
}

/// Validate the bearer access token carried by the request headers.
pub fn authorize(authority: &TokenAuthority, headers: &HeaderMap) -> Result<Claims, AuthError> {
    let token = bearer_token(headers)?;
    let claims = authority.validate_access(token)?;
    Ok(claims)
}

/// Middleware guarding a group of routes. On success the validated
/// [`Claims`] are stored in the request extensions.
pub async fn require_bearer(
    State(authority): State<Arc<TokenAuthority>>,
    mut request: Request,
    next: Next,
) -> Response {
    match authorize(&authority, request.headers()) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Extractor for handlers that need the caller's claims.
/// Reuses the claims stored by [`require_bearer`] when the route is behind
/// it, otherwise authorizes the request itself.
pub struct BearerAuth(pub Claims);

impl<S> FromRequestParts<S> for BearerAuth
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(claims) = parts.extensions.get::<Claims>() {
            return Ok(BearerAuth(claims.clone()));
        }

        authorize(state.authority(), &parts.headers).map(BearerAuth)
    }
}
