use axum::{Json, Router, middleware, response::IntoResponse, routing::get};
use serde::Serialize;
use std::sync::Arc;

use crate::auth::{BearerAuth, require_bearer};
use crate::impl_has_auth_backend;
use crate::jwt::TokenAuthority;

#[derive(Clone)]
pub struct ProtectedState {
    pub authority: Arc<TokenAuthority>,
}

impl_has_auth_backend!(ProtectedState);

/// Routes that need a bearer access token.
pub fn router(state: ProtectedState) -> Router {
    Router::new()
        .route("/me", get(me))
        .route_layer(middleware::from_fn_with_state(
            state.authority.clone(),
            require_bearer,
        ))
        .with_state(state)
}

#[derive(Serialize)]
struct MeResponse {
    uuid: String,
    expires_at: u64,
}

async fn me(BearerAuth(claims): BearerAuth) -> impl IntoResponse {
    Json(MeResponse {
        uuid: claims.sub,
        expires_at: claims.exp,
    })
}
