mod common;

use std::time::Duration;

use axum::http::{StatusCode, header};
use common::*;
use sessiongate::jwt::{AuthorityConfig, DEFAULT_COOKIE_NAME, TokenType};
use sessiongate::rate_limit::RateLimitQuotas;

#[tokio::test]
async fn test_signup_success() {
    let app = create_test_app().await;

    let response = app.send(signup_request("alice@example.com", PASSWORD)).await;
    assert_eq!(response.status(), StatusCode::OK);
    // Signing up does not start a session.
    assert!(set_cookie(&response).is_none());

    let json = body_json(response).await;
    assert_eq!(json["email"], "alice@example.com");
    assert!(json.get("access_token").is_none());

    let uuid = json["uuid"].as_str().unwrap();
    let user = app.db.users().get_by_uuid(uuid).await.unwrap().unwrap();
    assert_eq!(user.first_name, "Alice");
    assert!(user.password_hash.starts_with("$argon2"));
    assert_ne!(user.password_hash, PASSWORD);
}

#[tokio::test]
async fn test_signup_duplicate_email_conflicts() {
    let app = create_test_app().await;
    app.signup("alice@example.com").await;

    let response = app.send(signup_request("ALICE@example.com", PASSWORD)).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_signup_weak_password_rejected() {
    let app = create_test_app().await;

    for password in ["Sh0rt!", "alllowercase1!", "NoDigitsHere!", "NoSymbols123"] {
        let response = app.send(signup_request("alice@example.com", password)).await;
        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "password {:?}",
            password
        );
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().starts_with("password must"));
    }

    // Rejected attempts never reached the store.
    assert!(
        app.db
            .users()
            .get_by_email("alice@example.com")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_signup_malformed_body_rejected() {
    let app = create_test_app().await;

    let response = app
        .send(json_request(
            "POST",
            "/signup",
            r#"{"email": "alice@example.com"}"#.to_string(),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.send(signup_request("not-an-email", PASSWORD)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_success_sets_refresh_cookie() {
    let app = create_test_app().await;
    let uuid = app.signup("alice@example.com").await;

    let response = app.send(login_request("alice@example.com", PASSWORD)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = set_cookie(&response).unwrap();
    let json = body_json(response).await;
    let refresh_token = json["refresh_token"].as_str().unwrap();

    assert!(cookie.starts_with(&format!("{}={};", DEFAULT_COOKIE_NAME, refresh_token)));
    assert!(cookie.contains("Path=/"));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Secure"));
    assert!(cookie.contains("SameSite=Strict"));
    assert!(cookie.contains(&format!(
        "Max-Age={}",
        app.authority.refresh_token_ttl().as_secs()
    )));

    let access = app
        .authority
        .validate_access(json["access_token"].as_str().unwrap())
        .unwrap();
    assert_eq!(access.sub, uuid);

    let refresh = app.authority.validate_refresh(refresh_token).unwrap();
    assert_eq!(refresh.sub, uuid);
    assert_eq!(refresh.token_type, TokenType::Refresh);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = create_test_app().await;
    app.signup("alice@example.com").await;

    let wrong_password = app
        .send(login_request("alice@example.com", "Wrong-Horse-9"))
        .await;
    let unknown_email = app
        .send(login_request("bob@example.com", PASSWORD))
        .await;

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookie(&wrong_password).is_none());

    let a = body_json(wrong_password).await;
    let b = body_json(unknown_email).await;
    assert_eq!(a, b);
    assert_eq!(a["error"], "Unauthorized");
}

#[tokio::test]
async fn test_refresh_rotates_tokens() {
    let app = create_test_app().await;
    let uuid = app.signup("alice@example.com").await;
    let (_, refresh_token) = app.login("alice@example.com").await;

    let response = app.send(refresh_request(Some(&refresh_token))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = set_cookie(&response).unwrap();
    let json = body_json(response).await;
    let new_refresh = json["refresh_token"].as_str().unwrap();

    assert_ne!(new_refresh, refresh_token);
    assert!(cookie.starts_with(&format!("{}={};", DEFAULT_COOKIE_NAME, new_refresh)));

    let access = app
        .authority
        .validate_access(json["access_token"].as_str().unwrap())
        .unwrap();
    assert_eq!(access.sub, uuid);
}

#[tokio::test]
async fn test_refresh_without_cookie_is_unauthorized() {
    let app = create_test_app().await;

    let response = app.send(refresh_request(None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "Unauthorized");
}

#[tokio::test]
async fn test_refresh_rejects_access_token() {
    let app = create_test_app().await;
    app.signup("alice@example.com").await;
    let (access_token, _) = app.login("alice@example.com").await;

    let response = app.send(refresh_request(Some(&access_token))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_rejects_foreign_signature() {
    let app = create_test_app().await;
    let uuid = app.signup("alice@example.com").await;

    let other = sessiongate::jwt::TokenAuthority::new(AuthorityConfig::new(
        b"some-other-secret-0123456789abcdef".to_vec(),
    ))
    .unwrap();
    let forged = other.mint(&uuid).unwrap();

    let response = app.send(refresh_request(Some(&forged.refresh_token))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_for_deleted_user_is_unauthorized() {
    let app = create_test_app().await;
    let uuid = app.signup("alice@example.com").await;
    let (_, refresh_token) = app.login("alice@example.com").await;

    assert!(app.db.users().delete(&uuid).await.unwrap());
    // The token is still cryptographically valid.
    assert!(app.authority.validate_refresh(&refresh_token).is_ok());

    let response = app.send(refresh_request(Some(&refresh_token))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookie(&response).is_none());
}

#[tokio::test]
async fn test_logout_expires_cookie() {
    let app = create_test_app().await;

    let response = app
        .send(
            axum::http::Request::builder()
                .uri("/logout")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = set_cookie(&response).unwrap();
    assert!(cookie.starts_with(&format!("{}=;", DEFAULT_COOKIE_NAME)));
    assert!(cookie.contains("Max-Age=0"));
    assert!(cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn test_login_rate_limited_per_ip() {
    let app = create_test_app_with(AuthorityConfig::new(TEST_SECRET), RateLimitQuotas::default())
        .await;

    // Unknown emails still pay for one password verification each.
    let mut statuses = Vec::new();
    for _ in 0..6 {
        let response = app.send(login_request("nobody@example.com", PASSWORD)).await;
        statuses.push(response.status());
    }

    assert!(statuses[..5].iter().all(|s| *s == StatusCode::UNAUTHORIZED));
    assert_eq!(statuses[5], StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_missing_client_ip_is_forbidden() {
    let app = create_test_app().await;

    let response = app
        .send(
            axum::http::Request::builder()
                .method("POST")
                .uri("/login")
                .header("content-type", "application/json")
                .body(axum::body::Body::from(
                    r#"{"email": "alice@example.com", "password": "x"}"#,
                ))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_store_timeout_is_opaque_internal_error() {
    let app = create_test_app_with_store_timeout(Duration::from_millis(200)).await;
    app.signup("alice@example.com").await;
    let (_, refresh_token) = app.login("alice@example.com").await;

    // The in-memory pool has a single connection; holding it stalls every store call.
    let _held = app.db.pool().acquire().await.unwrap();

    let login = app.send(login_request("alice@example.com", PASSWORD)).await;
    assert_eq!(login.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(set_cookie(&login).is_none());
    let json = body_json(login).await;
    assert_eq!(json, serde_json::json!({ "error": "Internal server error" }));

    let refresh = app.send(refresh_request(Some(&refresh_token))).await;
    assert_eq!(refresh.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(set_cookie(&refresh).is_none());
    let json = body_json(refresh).await;
    assert_eq!(json, serde_json::json!({ "error": "Internal server error" }));
}

#[tokio::test]
async fn test_cors_preflight_allows_frontend_origin() {
    let app = create_test_app().await;

    // No client IP header: the preflight is answered before the rate limiter.
    let response = app.send(preflight_request("/login", FRONTEND_ORIGIN)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        FRONTEND_ORIGIN
    );
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    let allowed_headers = headers[header::ACCESS_CONTROL_ALLOW_HEADERS]
        .to_str()
        .unwrap()
        .to_ascii_lowercase();
    assert!(allowed_headers.contains("content-type"));
    assert!(allowed_headers.contains("authorization"));
}

#[tokio::test]
async fn test_cors_rejects_unknown_origin() {
    let app = create_test_app().await;

    let response = app
        .send(preflight_request("/login", "https://evil.example.com"))
        .await;
    assert!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none()
    );
}

#[tokio::test]
async fn test_cors_headers_on_credentialed_request() {
    let app = create_test_app().await;

    let response = app
        .send(
            axum::http::Request::builder()
                .uri("/logout")
                .header(header::ORIGIN, FRONTEND_ORIGIN)
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        FRONTEND_ORIGIN
    );
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS],
        "true"
    );
}
