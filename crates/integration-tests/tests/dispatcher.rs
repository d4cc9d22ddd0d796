//! Request dispatcher behavior against a mock backend.

#![allow(clippy::unwrap_used)]

use axum::http::Method;
use serde_json::{Value, json};
use tradepost_gateway::{GatewayError, Reply, RequestOptions, Service};
use tradepost_integration_tests::{MockBackend, MockResponse, dead_origin, gateway};

#[tokio::test]
async fn test_attaches_json_content_type_and_stored_bearer() {
    let mock = MockBackend::new().on(
        Method::GET,
        "/items/5",
        MockResponse::json(200, &json!({"ok": true})),
    );
    let gw = gateway(&mock.start().await);
    gw.dispatcher().tokens().set("stored.jwt.token", None).unwrap();

    let reply: Reply<Value> = gw
        .dispatcher()
        .call(Service::Items, "/5", RequestOptions::get())
        .await
        .unwrap();
    assert_eq!(reply, Reply::Json(json!({"ok": true})));

    let request = mock.requests_to(&Method::GET, "/items/5").pop().unwrap();
    assert_eq!(request.header("content-type"), Some("application/json"));
    assert_eq!(request.header("authorization"), Some("Bearer stored.jwt.token"));
}

#[tokio::test]
async fn test_no_bearer_without_token() {
    let mock = MockBackend::new().on(Method::GET, "/items", MockResponse::json(200, &json!([])));
    let gw = gateway(&mock.start().await);

    let _: Reply<Value> = gw
        .dispatcher()
        .call(Service::Items, "", RequestOptions::get())
        .await
        .unwrap();

    assert!(mock.requests().first().unwrap().header("authorization").is_none());
}

#[tokio::test]
async fn test_caller_authorization_overrides_stored_token() {
    let mock = MockBackend::new().on(
        Method::POST,
        "/accounts",
        MockResponse::json(201, &json!({"id": 1})),
    );
    let gw = gateway(&mock.start().await);
    gw.dispatcher().tokens().set("stored", None).unwrap();

    let options = RequestOptions::post(json!({})).header("AUTHORIZATION", "Bearer explicit");
    let _: Reply<Value> = gw.dispatcher().call(Service::Accounts, "", options).await.unwrap();

    let request = mock.requests_to(&Method::POST, "/accounts").pop().unwrap();
    assert_eq!(request.header("authorization"), Some("Bearer explicit"));
    assert_eq!(request.headers.get_all("authorization").iter().count(), 1);
}

#[tokio::test]
async fn test_query_and_body_are_sent() {
    let mock = MockBackend::new().on(Method::POST, "/orders", MockResponse::json(200, &json!({})));
    let gw = gateway(&mock.start().await);

    let options = RequestOptions::post(json!({"items": [{"sku": "A", "quantity": 1}]}))
        .query("dryRun", Some(true))
        .query("skip", None::<&str>);
    let _: Reply<Value> = gw.dispatcher().call(Service::Orders, "", options).await.unwrap();

    let request = mock.requests().pop().unwrap();
    assert_eq!(request.query.as_deref(), Some("dryRun=true"));
    assert_eq!(request.body, Some(json!({"items": [{"sku": "A", "quantity": 1}]})));
}

#[tokio::test]
async fn test_no_content_is_not_parsed() {
    let mock = MockBackend::new()
        .on(Method::POST, "/orders/3/cancel", MockResponse::empty(204))
        .on(Method::POST, "/orders/4/cancel", MockResponse::empty(200));
    let gw = gateway(&mock.start().await);

    // The target type could never be parsed from an empty body.
    let reply: Reply<Vec<u64>> = gw
        .dispatcher()
        .call(Service::Orders, "3/cancel", RequestOptions::post_empty())
        .await
        .unwrap();
    assert!(reply.is_no_content());

    let reply: Reply<Vec<u64>> = gw
        .dispatcher()
        .call(Service::Orders, "4/cancel", RequestOptions::post_empty())
        .await
        .unwrap();
    assert!(reply.is_no_content());
}

#[tokio::test]
async fn test_error_message_normalization() {
    let mock = MockBackend::new()
        .on(Method::GET, "/items/json", MockResponse::json(409, &json!({"message": "X"})))
        .on(Method::GET, "/items/text", MockResponse::text(400, "oops"))
        .on(Method::GET, "/items/empty", MockResponse::empty(503));
    let gw = gateway(&mock.start().await);

    let cases = [("json", "X"), ("text", "oops"), ("empty", "HTTP 503")];
    for (path, expected) in cases {
        let err = gw
            .dispatcher()
            .call::<Value>(Service::Items, path, RequestOptions::get())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Request(_)), "{path}: {err:?}");
        assert_eq!(err.to_string(), expected);
    }
}

#[tokio::test]
async fn test_invalid_success_body_is_decode_error() {
    let mock = MockBackend::new().on(Method::GET, "/items/1", MockResponse::text(200, "<html>"));
    let gw = gateway(&mock.start().await);

    let err = gw
        .dispatcher()
        .call::<Value>(Service::Items, "1", RequestOptions::get())
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Decode(_)));
}

#[tokio::test]
async fn test_transport_failure_is_request_error() {
    let gw = gateway(&dead_origin().await);

    let err = gw
        .dispatcher()
        .call::<Value>(Service::Auth, "/anything", RequestOptions::get())
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Request(ref message) if !message.is_empty()));
}
