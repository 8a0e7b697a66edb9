pub mod api;
pub mod auth;
pub mod cli;
pub mod db;
pub mod jwt;
pub mod rate_limit;

use api::create_api_router;
use auth::ClientIpHeader;
use axum::{Router, http::HeaderValue};
use db::Database;
use jwt::{AuthorityConfig, ConfigError, TokenAuthority};
use rate_limit::{RateLimitConfig, RateLimitQuotas};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Signing secret, issuer, token lifetimes and cookie name
    pub authority: AuthorityConfig,
    /// Budget for each user store call made while handling a request
    pub store_timeout: Duration,
    /// Whether new user signups are disabled
    pub no_signup: bool,
    /// IP extraction strategy (requires running behind a proxy)
    pub ip_header: Option<ClientIpHeader>,
    /// Per-IP quotas for login and signup
    pub rate_limits: RateLimitQuotas,
    /// Browser origins allowed to make credentialed requests. Empty disables CORS.
    pub cors_origins: Vec<HeaderValue>,
}

/// Create the application router with the given configuration.
///
/// Fails when the token lifetimes or names in `config.authority` are invalid.
pub fn create_app(config: &ServerConfig) -> Result<Router, ConfigError> {
    build_app(config).map(|(router, _)| router)
}

fn build_app(config: &ServerConfig) -> Result<(Router, Arc<RateLimitConfig>), ConfigError> {
    let authority = Arc::new(TokenAuthority::new(config.authority.clone())?);
    let rate_limit_config = Arc::new(RateLimitConfig::with_quotas(
        config.rate_limits,
        config.ip_header,
    ));

    let router = create_api_router(
        config.db.clone(),
        authority,
        config.store_timeout,
        config.no_signup,
        rate_limit_config.clone(),
        &config.cors_origins,
    );
    Ok((router, rate_limit_config))
}

/// Server startup failure.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Run the server on the given listener. This function blocks until the server exits.
///
/// Idle rate limiter entries are pruned in the background while it runs.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), ServeError> {
    let (app, rate_limit_config) = build_app(&config)?;
    let pruner = rate_limit_config.spawn_pruner();

    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    let result = axum::serve(listener, make_service).await;
    pruner.abort();
    Ok(result?)
}
