mod error;
mod protected;
mod session;

use axum::{
    Router,
    body::Body,
    extract::ConnectInfo,
    http::{
        HeaderName, HeaderValue, Method, Request,
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    },
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    LatencyUnit,
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span, info_span};

use crate::auth::{CookieFactory, SessionRotator};
use crate::db::Database;
use crate::jwt::TokenAuthority;
use crate::rate_limit::RateLimitConfig;

pub use error::{ApiError, ResultExt};
pub use protected::ProtectedState;
pub use session::SessionState;

/// Create the API router.
///
/// Browsers on `cors_origins` may call it with credentials; an empty list
/// disables CORS entirely.
pub fn create_api_router(
    db: Database,
    authority: Arc<TokenAuthority>,
    store_timeout: Duration,
    no_signup: bool,
    rate_limit_config: Arc<RateLimitConfig>,
    cors_origins: &[HeaderValue],
) -> Router {
    let cookies = CookieFactory::new(&authority);
    let rotator = SessionRotator::new(
        authority.clone(),
        db.clone(),
        cookies.clone(),
        store_timeout,
    );

    let session_state = SessionState {
        db,
        authority: authority.clone(),
        cookies,
        rotator,
        store_timeout,
        no_signup,
        rate_limit_config,
    };

    let protected_state = ProtectedState { authority };

    let router = Router::new()
        .merge(session::router(session_state))
        .nest("/protected", protected::router(protected_state));

    let router = if cors_origins.is_empty() {
        router
    } else {
        router.layer(cors_layer(cors_origins))
    };

    // Outermost, so rate-limited and preflight responses are logged too.
    router.layer(
        TraceLayer::new_for_http()
            .make_span_with(make_span)
            .on_response(
                DefaultOnResponse::new()
                    .level(Level::INFO)
                    .latency_unit(LatencyUnit::Millis),
            ),
    )
}

fn cors_layer(origins: &[HeaderValue]) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins.iter().cloned()))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            ACCEPT,
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static("x-csrf-token"),
        ])
        .allow_credentials(true)
}

/// One span per request; the response event carries status and latency.
fn make_span(request: &Request<Body>) -> Span {
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string());

    info_span!(
        "http-request",
        method = %request.method(),
        path = request.uri().path(),
        remote = remote.as_deref().unwrap_or("unknown"),
    )
}
