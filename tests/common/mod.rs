#![allow(dead_code)]

use std::num::NonZeroU32;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{HeaderValue, Request, Response, header},
};
use sessiongate::{
    ServerConfig,
    auth::ClientIpHeader,
    create_app,
    db::{DEFAULT_STORE_TIMEOUT, Database},
    jwt::{AuthorityConfig, DEFAULT_COOKIE_NAME, TokenAuthority},
    rate_limit::RateLimitQuotas,
};
use tower::ServiceExt;

pub const TEST_SECRET: &[u8] = b"integration-test-secret-0123456789abcdef";
pub const CLIENT_IP: &str = "203.0.113.7";
pub const PASSWORD: &str = "Correct-Horse-9";
pub const FRONTEND_ORIGIN: &str = "http://localhost:3000";

pub struct TestApp {
    pub router: Router,
    pub db: Database,
    /// Same secret and settings as the router's authority.
    pub authority: TokenAuthority,
}

/// Quotas high enough that ordinary tests never hit them.
pub fn relaxed_quotas() -> RateLimitQuotas {
    let many = NonZeroU32::new(1000).unwrap();
    RateLimitQuotas {
        login_per_second: many,
        login_burst: many,
        signup_per_minute: many,
    }
}

pub async fn create_test_app() -> TestApp {
    create_test_app_with(AuthorityConfig::new(TEST_SECRET), relaxed_quotas()).await
}

pub async fn create_test_app_with(authority: AuthorityConfig, quotas: RateLimitQuotas) -> TestApp {
    build_test_app(authority, |config| config.rate_limits = quotas).await
}

/// App whose store calls give up after `store_timeout`.
pub async fn create_test_app_with_store_timeout(store_timeout: Duration) -> TestApp {
    build_test_app(AuthorityConfig::new(TEST_SECRET), |config| {
        config.store_timeout = store_timeout
    })
    .await
}

async fn build_test_app(
    authority: AuthorityConfig,
    customize: impl FnOnce(&mut ServerConfig),
) -> TestApp {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let mut config = ServerConfig {
        db: db.clone(),
        authority: authority.clone(),
        store_timeout: DEFAULT_STORE_TIMEOUT,
        no_signup: false,
        ip_header: Some(ClientIpHeader::XForwardedFor),
        rate_limits: relaxed_quotas(),
        cors_origins: vec![HeaderValue::from_static(FRONTEND_ORIGIN)],
    };
    customize(&mut config);
    let router = create_app(&config).expect("Invalid test configuration");
    let authority = TokenAuthority::new(authority).expect("Invalid test configuration");

    TestApp {
        router,
        db,
        authority,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Create an account and return its UUID.
    pub async fn signup(&self, email: &str) -> String {
        let response = self.send(signup_request(email, PASSWORD)).await;
        assert_eq!(response.status(), 200, "signup failed for {}", email);
        body_json(response).await["uuid"]
            .as_str()
            .unwrap()
            .to_string()
    }

    /// Log in and return (access token, refresh token).
    pub async fn login(&self, email: &str) -> (String, String) {
        let response = self.send(login_request(email, PASSWORD)).await;
        assert_eq!(response.status(), 200, "login failed for {}", email);
        let json = body_json(response).await;
        (
            json["access_token"].as_str().unwrap().to_string(),
            json["refresh_token"].as_str().unwrap().to_string(),
        )
    }
}

pub fn json_request(method: &str, uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", CLIENT_IP)
        .body(Body::from(body))
        .unwrap()
}

pub fn preflight_request(uri: &str, origin: &str) -> Request<Body> {
    Request::builder()
        .method("OPTIONS")
        .uri(uri)
        .header(header::ORIGIN, origin)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .unwrap()
}

pub fn login_request(email: &str, password: &str) -> Request<Body> {
    json_request(
        "POST",
        "/login",
        serde_json::json!({ "email": email, "password": password }).to_string(),
    )
}

pub fn signup_request(email: &str, password: &str) -> Request<Body> {
    json_request(
        "POST",
        "/signup",
        serde_json::json!({
            "first_name": "Alice",
            "last_name": "Liddell",
            "email": email,
            "password": password,
        })
        .to_string(),
    )
}

pub fn refresh_request(refresh_token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri("/refresh");
    if let Some(token) = refresh_token {
        builder = builder.header(
            header::COOKIE,
            format!("{}={}", DEFAULT_COOKIE_NAME, token),
        );
    }
    builder.body(Body::empty()).unwrap()
}

pub fn me_request(authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri("/protected/me");
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

pub fn set_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
