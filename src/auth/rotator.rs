//! Refresh token rotation.
//!
//! A valid refresh token is exchanged for a brand-new token pair and cookie,
//! but only while its subject still exists in the user store. Old refresh
//! tokens are not revoked; they stay valid until their own `exp`.

use std::sync::Arc;
use std::time::Duration;

use super::cookie::{CookieDescriptor, CookieFactory};
use super::errors::AuthError;
use crate::db::{Database, bounded};
use crate::jwt::{TokenAuthority, TokenPair};

#[derive(Clone)]
pub struct SessionRotator {
    authority: Arc<TokenAuthority>,
    db: Database,
    cookies: CookieFactory,
    store_timeout: Duration,
}

impl SessionRotator {
    pub fn new(
        authority: Arc<TokenAuthority>,
        db: Database,
        cookies: CookieFactory,
        store_timeout: Duration,
    ) -> Self {
        Self {
            authority,
            db,
            cookies,
            store_timeout,
        }
    }

    /// Exchange a refresh token for a new pair and refresh cookie.
    pub async fn rotate(
        &self,
        refresh_token: Option<&str>,
    ) -> Result<(TokenPair, CookieDescriptor), AuthError> {
        let refresh_token = refresh_token
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingCredential)?;

        let claims = self.authority.validate_refresh(refresh_token)?;

        let user = bounded(self.store_timeout, self.db.users().get_by_uuid(&claims.sub))
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to look up user for refresh"))?
            .ok_or(AuthError::UserNotFound)?;

        let pair = self.authority.mint(&user.uuid)?;
        let cookie = self.cookies.from_refresh_token(&pair.refresh_token);

        tracing::debug!(user = %user.uuid, old_jti = %claims.jti, "Rotated refresh token");

        Ok((pair, cookie))
    }
}
