//! Login token extraction and persistence.

#![allow(clippy::unwrap_used)]

use axum::http::Method;
use secrecy::ExposeSecret;
use serde_json::json;
use tradepost_gateway::GatewayError;
use tradepost_integration_tests::{MockBackend, MockResponse, gateway};

#[tokio::test]
async fn test_token_from_authorization_header_with_empty_body() {
    let mock = MockBackend::new().on(
        Method::POST,
        "/auth/login",
        MockResponse::empty(200).header("Authorization", "Bearer abc.def.ghi"),
    );
    let gw = gateway(&mock.start().await);

    let outcome = gw.dispatcher().login("ada", "secret").await.unwrap();

    assert_eq!(outcome.token.expose_secret(), "abc.def.ghi");
    assert_eq!(outcome.body, json!({}));
    assert_eq!(
        gw.dispatcher().tokens().get().unwrap().expose_secret(),
        "abc.def.ghi"
    );
}

#[tokio::test]
async fn test_token_from_body_with_expiry() {
    let mock = MockBackend::new().on(
        Method::POST,
        "/auth/login",
        MockResponse::json(
            200,
            &json!({"accessToken": "body.token.value", "expiresAt": "2030-01-01T00:00:00Z"}),
        )
        .header("X-Auth-Token", "header.token.value"),
    );
    let gw = gateway(&mock.start().await);

    let outcome = gw.dispatcher().login("ada", "secret").await.unwrap();
    assert_eq!(outcome.token.expose_secret(), "body.token.value");
    assert_eq!(outcome.expires_at.as_deref(), Some("2030-01-01T00:00:00Z"));

    let stored = gw.dispatcher().tokens().get_session().unwrap();
    assert_eq!(stored.token.expose_secret(), "body.token.value");
    assert_eq!(stored.expires_at.as_deref(), Some("2030-01-01T00:00:00Z"));
}

#[tokio::test]
async fn test_login_sends_credentials_without_bearer() {
    let mock = MockBackend::new().on(
        Method::POST,
        "/auth/login",
        MockResponse::json(200, &json!({"token": "new.token.value"})),
    );
    let gw = gateway(&mock.start().await);
    gw.dispatcher().tokens().set("old.token.value", None).unwrap();

    gw.dispatcher().login("ada@example.com", "pw").await.unwrap();

    let request = mock.requests_to(&Method::POST, "/auth/login").pop().unwrap();
    assert!(request.header("authorization").is_none());
    assert_eq!(request.header("content-type"), Some("application/json"));
    assert_eq!(
        request.body,
        Some(json!({"login": "ada@example.com", "password": "pw"}))
    );
}

#[tokio::test]
async fn test_missing_token_fails_and_keeps_store() {
    let mock = MockBackend::new().on(
        Method::POST,
        "/auth/login",
        MockResponse::json(200, &json!({"user": "ada"})),
    );
    let gw = gateway(&mock.start().await);
    gw.dispatcher().tokens().set("previous", None).unwrap();

    let err = gw.dispatcher().login("ada", "pw").await.unwrap_err();
    assert!(matches!(err, GatewayError::NoToken));
    assert_eq!(err.to_string(), "no token returned");
    assert_eq!(gw.dispatcher().tokens().get().unwrap().expose_secret(), "previous");
}

#[tokio::test]
async fn test_rejected_login_uses_raw_text_or_status() {
    let mock = MockBackend::new()
        .on(
            Method::POST,
            "/auth/login",
            MockResponse::json(401, &json!({"message": "Bad credentials"})),
        )
        .on(Method::POST, "/auth/login", MockResponse::empty(401));
    let gw = gateway(&mock.start().await);

    let err = gw.dispatcher().login("ada", "wrong").await.unwrap_err();
    assert_eq!(err.to_string(), r#"{"message":"Bad credentials"}"#);

    let err = gw.dispatcher().login("ada", "wrong").await.unwrap_err();
    assert_eq!(err.to_string(), "HTTP 401");
    assert!(gw.dispatcher().tokens().get().is_none());
}
