mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::*;
use sessiongate::jwt::AuthorityConfig;

#[tokio::test]
async fn test_valid_bearer_token_authenticates() {
    let app = create_test_app().await;
    let uuid = app.signup("alice@example.com").await;
    let (access_token, _) = app.login("alice@example.com").await;

    let response = app
        .send(me_request(Some(&format!("Bearer {}", access_token))))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["uuid"], uuid.as_str());
    assert!(json["expires_at"].as_u64().is_some());
}

#[tokio::test]
async fn test_missing_authorization_is_unauthorized() {
    let app = create_test_app().await;

    let response = app.send(me_request(None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "Unauthorized");
}

#[tokio::test]
async fn test_basic_scheme_is_unauthorized() {
    let app = create_test_app().await;

    let response = app.send(me_request(Some("Basic xyz"))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "Unauthorized");
}

#[tokio::test]
async fn test_refresh_token_is_not_a_bearer_credential() {
    let app = create_test_app().await;
    app.signup("alice@example.com").await;
    let (_, refresh_token) = app.login("alice@example.com").await;

    let response = app
        .send(me_request(Some(&format!("Bearer {}", refresh_token))))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_tampered_token_is_unauthorized() {
    let app = create_test_app().await;
    let pair = app.authority.mint("uuid-123").unwrap();

    // Replace the first character of the signature.
    let (signed, signature) = pair.access_token.rsplit_once('.').unwrap();
    let replacement = if signature.starts_with('A') { "B" } else { "A" };
    let tampered = format!("{}.{}{}", signed, replacement, &signature[1..]);

    let response = app
        .send(me_request(Some(&format!("Bearer {}", tampered))))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unsigned_token_is_unauthorized() {
    let app = create_test_app().await;

    // {"alg":"none","typ":"JWT"} with a plausible payload and no signature.
    let token = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0.\
                 eyJzdWIiOiJ1dWlkLTEyMyIsImlzcyI6Im9wZW5haS1zZXJ2ZXIiLCJpYXQiOjAsIm5iZiI6MCwiZXhwIjo5OTk5OTk5OTk5LCJ0eXAiOiJhY2Nlc3MiLCJqdGkiOiJ4In0.";

    let response = app
        .send(me_request(Some(&format!("Bearer {}", token))))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_access_token_expires() {
    let config = AuthorityConfig::new(TEST_SECRET)
        .access_token_ttl(Duration::from_secs(1))
        .refresh_token_ttl(Duration::from_secs(60));
    let app = create_test_app_with(config, relaxed_quotas()).await;
    let pair = app.authority.mint("uuid-123").unwrap();
    let bearer = format!("Bearer {}", pair.access_token);

    assert!(app.authority.validate(&pair.access_token).is_ok());
    let response = app.send(me_request(Some(&bearer))).await;
    assert_eq!(response.status(), StatusCode::OK);

    tokio::time::sleep(Duration::from_secs(2)).await;

    assert!(matches!(
        app.authority.validate(&pair.access_token),
        Err(sessiongate::jwt::JwtError::Expired)
    ));
    let response = app.send(me_request(Some(&bearer))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
