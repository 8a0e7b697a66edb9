use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, header::SET_COOKIE},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::error::{ApiError, ResultExt, is_unique_violation};
use crate::auth::{
    AuthError, CookieDescriptor, CookieFactory, SessionRotator, check_password_policy,
    get_cookie, hash_password, verify_password_or_dummy,
};
use crate::db::{Database, NewUser, bounded};
use crate::jwt::{TokenAuthority, TokenPair};
use crate::rate_limit::{RateLimitConfig, rate_limit_login, rate_limit_signup};

const MAX_NAME_LENGTH: usize = 100;
const MAX_EMAIL_LENGTH: usize = 254;

#[derive(Clone)]
pub struct SessionState {
    pub db: Database,
    pub authority: Arc<TokenAuthority>,
    pub cookies: CookieFactory,
    pub rotator: SessionRotator,
    pub store_timeout: Duration,
    pub no_signup: bool,
    pub rate_limit_config: Arc<RateLimitConfig>,
}

pub fn router(state: SessionState) -> Router {
    let login_router = Router::new()
        .route("/login", post(login))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.rate_limit_config.clone(),
            rate_limit_login,
        ));

    let session_router = Router::new()
        .route("/refresh", get(refresh))
        .route("/logout", get(logout))
        .with_state(state.clone());

    let router = Router::new().merge(login_router).merge(session_router);

    if state.no_signup {
        router
    } else {
        let signup_router = Router::new()
            .route("/signup", post(signup))
            .with_state(state.clone())
            .layer(middleware::from_fn_with_state(
                state.rate_limit_config,
                rate_limit_signup,
            ));

        router.merge(signup_router)
    }
}

/// Tokens in the body, refresh token also in the cookie.
fn session_response(pair: TokenPair, cookie: CookieDescriptor) -> impl IntoResponse {
    ([(SET_COOKIE, cookie.to_string())], Json(pair))
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

async fn login(
    State(state): State<SessionState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let email = payload.email.trim();

    let user = bounded(state.store_timeout, state.db.users().get_by_email(email))
        .await
        .map_err(AuthError::from)?;

    // Unknown emails still pay for a full Argon2 verification.
    let password_hash = user.as_ref().map(|u| u.password_hash.clone());
    let matches = tokio::task::spawn_blocking(move || {
        verify_password_or_dummy(&payload.password, password_hash.as_deref())
    })
    .await
    .map_err(|e| AuthError::Internal(format!("password verification task failed: {}", e)))?
    .map_err(|e| AuthError::Internal(e.to_string()))?;

    let Some(user) = user else {
        return Err(AuthError::UserNotFound.into());
    };
    if !matches {
        return Err(AuthError::PasswordMismatch.into());
    }

    let pair = state.authority.mint(&user.uuid).map_err(AuthError::from)?;
    let cookie = state.cookies.from_refresh_token(&pair.refresh_token);

    info!(user = %user.uuid, "User logged in");

    Ok(session_response(pair, cookie))
}

#[derive(Deserialize)]
struct SignupRequest {
    first_name: String,
    last_name: String,
    email: String,
    password: String,
}

#[derive(Serialize)]
struct SignupResponse {
    uuid: String,
    email: String,
}

fn validate_name(field: &str, value: &str) -> Result<(), ApiError> {
    if value.is_empty() {
        return Err(ApiError::bad_request(format!("{} cannot be empty", field)));
    }
    if value.chars().count() > MAX_NAME_LENGTH {
        return Err(ApiError::bad_request(format!(
            "{} cannot be longer than {} characters",
            field, MAX_NAME_LENGTH
        )));
    }
    if value.chars().any(char::is_control) {
        return Err(ApiError::bad_request(format!(
            "{} contains invalid characters",
            field
        )));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    if email.is_empty() {
        return Err(ApiError::bad_request("Email cannot be empty"));
    }
    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ApiError::bad_request("Email is too long"));
    }
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(|c| c.is_whitespace() || c.is_control())
        }
        None => false,
    };
    if !valid {
        return Err(ApiError::bad_request("Invalid email address"));
    }
    Ok(())
}

async fn signup(
    State(state): State<SessionState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let first_name = payload.first_name.trim();
    let last_name = payload.last_name.trim();
    let email = payload.email.trim();

    validate_name("First name", first_name)?;
    validate_name("Last name", last_name)?;
    validate_email(email)?;
    check_password_policy(&payload.password).map_err(|v| ApiError::bad_request(v.to_string()))?;

    let password = payload.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .db_err("Password hashing task failed")?
        .db_err("Failed to hash password")?;

    let uuid = uuid::Uuid::new_v4().to_string();
    let new_user = NewUser {
        uuid: &uuid,
        first_name,
        last_name,
        email,
        password_hash: &password_hash,
    };

    match bounded(state.store_timeout, state.db.users().create(&new_user)).await {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => {
            return Err(ApiError::conflict("Email is already registered"));
        }
        Err(e) => return Err(ApiError::db_error("Failed to create user", e)),
    }

    info!(user = %uuid, "User signed up");

    Ok(Json(SignupResponse {
        uuid,
        email: email.to_string(),
    }))
}

async fn refresh(
    State(state): State<SessionState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = get_cookie(&headers, state.cookies.name());
    let (pair, cookie) = state.rotator.rotate(token).await?;
    Ok(session_response(pair, cookie))
}

#[derive(Serialize)]
struct LogoutResponse {
    message: &'static str,
}

/// Clears the refresh cookie. Tokens already issued stay valid until they
/// expire.
async fn logout(State(state): State<SessionState>) -> impl IntoResponse {
    let cookie = state.cookies.expired_descriptor();
    (
        [(SET_COOKIE, cookie.to_string())],
        Json(LogoutResponse {
            message: "Logged out",
        }),
    )
}
