//! Rate limiting for authentication endpoints.
//!
//! Uses a token bucket algorithm with per-IP tracking to prevent brute force attacks.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use std::{num::NonZeroU32, sync::Arc, time::Duration};
use tokio::task::JoinHandle;

use crate::auth::{ClientIpHeader, extract_client_ip};

/// Per-IP rate limiter for stricter endpoint-specific limiting.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

const LOGIN_PER_SEC: NonZeroU32 = NonZeroU32::MIN;
const LOGIN_BURST: NonZeroU32 = NonZeroU32::new(5).unwrap();
const SIGNUP_PER_MIN: NonZeroU32 = NonZeroU32::new(3).unwrap();

/// Interval between sweeps of idle per-IP limiter state.
const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Quotas applied to the authentication endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitQuotas {
    pub login_per_second: NonZeroU32,
    pub login_burst: NonZeroU32,
    pub signup_per_minute: NonZeroU32,
}

impl Default for RateLimitQuotas {
    fn default() -> Self {
        Self {
            login_per_second: LOGIN_PER_SEC,
            login_burst: LOGIN_BURST,
            signup_per_minute: SIGNUP_PER_MIN,
        }
    }
}

/// Rate limiting configuration for authentication endpoints.
#[derive(Clone)]
pub struct RateLimitConfig {
    /// Per-IP limiter for login (strict: 1 request per second, burst of 5)
    pub login: Arc<IpLimiter>,
    /// Per-IP limiter for signup (strict: 3 requests per minute)
    pub signup: Arc<IpLimiter>,
    /// Where the client IP comes from. `None` uses the socket address.
    pub ip_header: Option<ClientIpHeader>,
}

impl RateLimitConfig {
    /// Create rate limiters with the default quotas.
    pub fn new(ip_header: Option<ClientIpHeader>) -> Self {
        Self::with_quotas(RateLimitQuotas::default(), ip_header)
    }

    pub fn with_quotas(quotas: RateLimitQuotas, ip_header: Option<ClientIpHeader>) -> Self {
        Self {
            login: Arc::new(RateLimiter::keyed(
                Quota::per_second(quotas.login_per_second).allow_burst(quotas.login_burst),
            )),
            signup: Arc::new(RateLimiter::keyed(Quota::per_minute(
                quotas.signup_per_minute,
            ))),
            ip_header,
        }
    }

    /// Forget every IP whose bucket has refilled completely.
    /// Returns how many keys are still tracked.
    pub fn prune(&self) -> usize {
        for limiter in [&self.login, &self.signup] {
            limiter.retain_recent();
            limiter.shrink_to_fit();
        }
        self.login.len() + self.signup.len()
    }

    /// Spawn a background task that prunes the limiters periodically.
    /// Returns a handle that can be used to abort the task.
    pub fn spawn_pruner(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(PRUNE_INTERVAL);
            loop {
                interval.tick().await;
                let tracked = self.prune();
                tracing::debug!(tracked, "Pruned idle rate limit state");
            }
        })
    }

    fn check(&self, limiter: &IpLimiter, request: &Request, message: &'static str) -> Option<Response> {
        let ip = match extract_client_ip(request, self.ip_header) {
            Ok(ip) => ip,
            Err(reason) => {
                tracing::warn!(reason, "Rejecting request without client IP");
                return Some(
                    (StatusCode::FORBIDDEN, "Unable to determine client IP.").into_response(),
                );
            }
        };

        match limiter.check_key(&ip) {
            Ok(_) => None,
            Err(_) => {
                tracing::warn!(ip = %ip, "Rate limit exceeded");
                Some((StatusCode::TOO_MANY_REQUESTS, message).into_response())
            }
        }
    }
}

/// Middleware for rate limiting login.
pub async fn rate_limit_login(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    match config.check(
        &config.login,
        &request,
        "Too many authentication attempts. Please wait before trying again.",
    ) {
        Some(rejection) => rejection,
        None => next.run(request).await,
    }
}

/// Middleware for rate limiting signup.
pub async fn rate_limit_signup(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    match config.check(
        &config.signup,
        &request,
        "Too many signup attempts. Please wait before trying again.",
    ) {
        Some(rejection) => rejection,
        None => next.run(request).await,
    }
}
