//! CLI argument parsing, validation, and startup helpers.

use std::time::Duration;

use crate::ServerConfig;
use crate::auth::ClientIpHeader;
use crate::db::{DEFAULT_STORE_TIMEOUT, Database};
use crate::jwt::{
    AuthorityConfig, DEFAULT_ACCESS_TOKEN_TTL, DEFAULT_COOKIE_NAME, DEFAULT_ISSUER,
    DEFAULT_REFRESH_TOKEN_TTL,
};
use crate::rate_limit::RateLimitQuotas;
use axum::http::HeaderValue;
use clap::Parser;
use tracing::{error, info};

const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Browser origin allowed by default (a local frontend dev server).
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "sessiongate",
    about = "Session authority issuing JWT access and refresh tokens"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, default_value = "users.db")]
    pub database: String,

    /// Path to file containing JWT secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Value of the `iss` claim in issued tokens
    #[arg(long, env = "JWT_ISSUER", default_value = DEFAULT_ISSUER)]
    pub issuer: String,

    /// Access token lifetime in seconds
    #[arg(long, env = "ACCESS_TTL_SECS", default_value_t = DEFAULT_ACCESS_TOKEN_TTL.as_secs())]
    pub access_ttl_secs: u64,

    /// Refresh token (and cookie) lifetime in seconds
    #[arg(long, env = "REFRESH_TTL_SECS", default_value_t = DEFAULT_REFRESH_TOKEN_TTL.as_secs())]
    pub refresh_ttl_secs: u64,

    /// Name of the refresh cookie. The `__Host-` prefix requires HTTPS
    #[arg(long, env = "REFRESH_COOKIE_NAME", default_value = DEFAULT_COOKIE_NAME)]
    pub cookie_name: String,

    /// Timeout for each user store call, in seconds
    #[arg(long, default_value_t = DEFAULT_STORE_TIMEOUT.as_secs())]
    pub store_timeout_secs: u64,

    /// Read the client IP from this proxy header instead of the socket address
    #[arg(long, value_enum)]
    pub ip_header: Option<ClientIpHeader>,

    /// Browser origins allowed to call the API with credentials (comma-separated)
    #[arg(
        long = "cors-origin",
        env = "CORS_ORIGIN",
        value_delimiter = ',',
        default_value = DEFAULT_CORS_ORIGIN,
        value_parser = parse_origin
    )]
    pub cors_origins: Vec<HeaderValue>,

    /// Disable new user signups
    #[arg(long)]
    pub no_signup: bool,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

fn parse_origin(value: &str) -> Result<HeaderValue, String> {
    let origin = value.trim().trim_end_matches('/');
    if !(origin.starts_with("http://") || origin.starts_with("https://")) {
        return Err(format!("{} is not an http(s) origin", value));
    }
    HeaderValue::from_str(origin).map_err(|e| e.to_string())
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load JWT secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var("JWT_SECRET") {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var("JWT_SECRET") };
        secret
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read JWT secret file");
                return None;
            }
        }
    } else {
        error!(
            "JWT secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
        );
        return None;
    };

    check_secret_length(&secret).then_some(secret)
}

fn check_secret_length(secret: &str) -> bool {
    if secret.len() < MIN_JWT_SECRET_LENGTH {
        error!(
            "JWT secret is shorter than {} bytes. Use a longer secret",
            MIN_JWT_SECRET_LENGTH
        );
        return false;
    }
    true
}

/// Build ServerConfig from validated arguments.
pub fn build_config(args: &Args, db: Database, jwt_secret: String) -> ServerConfig {
    let authority = AuthorityConfig::new(jwt_secret.into_bytes())
        .issuer(args.issuer.clone())
        .access_token_ttl(Duration::from_secs(args.access_ttl_secs))
        .refresh_token_ttl(Duration::from_secs(args.refresh_ttl_secs))
        .cookie_name(args.cookie_name.clone());

    ServerConfig {
        db,
        authority,
        store_timeout: Duration::from_secs(args.store_timeout_secs),
        no_signup: args.no_signup,
        ip_header: args.ip_header,
        rate_limits: RateLimitQuotas::default(),
        cors_origins: args.cors_origins.clone(),
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
