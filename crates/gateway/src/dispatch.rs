//! Request dispatcher.
//!
//! Every HTTP call to a backend service goes through [`Dispatcher::call`]:
//! it resolves the service origin, attaches the JSON content type and the
//! current bearer token, and normalizes failures into one message string.
//! Login is the one call that bypasses the bearer header and has its own
//! token-extraction rules.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use secrecy::SecretString;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use crate::config::{Service, ServiceOrigins};
use crate::error::{GatewayError, Result};
use crate::token::TokenStore;

/// Body fields that may carry the session token, in priority order.
const TOKEN_FIELDS: [&str; 6] = [
    "token",
    "accessToken",
    "access_token",
    "jwt",
    "id_token",
    "idToken",
];

/// Response headers that may carry the session token, in priority order.
const TOKEN_HEADERS: [&str; 2] = ["authorization", "x-auth-token"];

static BEARER_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^bearer\s+").expect("Invalid regex"));

// =============================================================================
// URL joining
// =============================================================================

/// Join a base and a path with exactly one `/` at the seam.
///
/// An empty base yields the path with a single leading `/`.
#[must_use]
pub fn join(base: &str, path: &str) -> String {
    let path = path.trim_start_matches('/');
    if base.is_empty() {
        return format!("/{path}");
    }
    format!("{}/{path}", base.trim_end_matches('/'))
}

// =============================================================================
// Request / Reply
// =============================================================================

/// Per-call request options.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<Value>,
    /// Extra headers; these override the defaults of the same name.
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            body: None,
            headers: Vec::new(),
            query: Vec::new(),
        }
    }
}

impl RequestOptions {
    /// A `GET` without body.
    #[must_use]
    pub fn get() -> Self {
        Self::default()
    }

    /// A `POST` carrying `body` as JSON.
    #[must_use]
    pub fn post(body: Value) -> Self {
        Self {
            method: Method::POST,
            body: Some(body),
            ..Self::default()
        }
    }

    /// A `POST` without body.
    #[must_use]
    pub fn post_empty() -> Self {
        Self {
            method: Method::POST,
            ..Self::default()
        }
    }

    /// A `PUT` carrying `body` as JSON.
    #[must_use]
    pub fn put(body: Value) -> Self {
        Self {
            method: Method::PUT,
            body: Some(body),
            ..Self::default()
        }
    }

    /// Add a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Add a query parameter. `None` values are skipped.
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: Option<impl ToString>) -> Self {
        if let Some(value) = value {
            self.query.push((key.into(), value.to_string()));
        }
        self
    }
}

/// Successful response of a dispatched call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply<T> {
    /// A JSON body parsed as `T`.
    Json(T),
    /// `204 No Content`, or a 2xx with an empty body.
    NoContent,
}

impl<T> Reply<T> {
    /// The parsed body, if any.
    #[must_use]
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Json(value) => Some(value),
            Self::NoContent => None,
        }
    }

    /// The parsed body, treating "no content" as a decode failure.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Decode`] for [`Reply::NoContent`].
    pub fn into_json(self) -> Result<T> {
        self.into_option()
            .ok_or_else(|| GatewayError::Decode("expected a JSON body, got no content".to_string()))
    }

    #[must_use]
    pub const fn is_no_content(&self) -> bool {
        matches!(self, Self::NoContent)
    }
}

/// Result of a successful login.
#[derive(Clone)]
pub struct LoginOutcome {
    /// The token now held by the token store.
    pub token: SecretString,
    /// Server-provided `expiresAt`, if any.
    pub expires_at: Option<String>,
    /// Full response body (an empty object when it was not JSON).
    pub body: Value,
}

impl std::fmt::Debug for LoginOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The body usually repeats the token.
        f.debug_struct("LoginOutcome")
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("body", &"[REDACTED]")
            .finish()
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

/// The single choke point for backend HTTP calls.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    client: reqwest::Client,
    origins: ServiceOrigins,
    tokens: TokenStore,
}

impl Dispatcher {
    /// Create a dispatcher. No request timeout is applied.
    #[must_use]
    pub fn new(origins: ServiceOrigins, tokens: TokenStore) -> Self {
        Self::with_client(reqwest::Client::new(), origins, tokens)
    }

    /// Create a dispatcher around an existing HTTP client.
    #[must_use]
    pub fn with_client(
        client: reqwest::Client,
        origins: ServiceOrigins,
        tokens: TokenStore,
    ) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                client,
                origins,
                tokens,
            }),
        }
    }

    /// The token store whose token is attached to requests.
    #[must_use]
    pub fn tokens(&self) -> &TokenStore {
        &self.inner.tokens
    }

    /// The origin map requests are resolved against.
    #[must_use]
    pub fn origins(&self) -> &ServiceOrigins {
        &self.inner.origins
    }

    /// Absolute URL for `path` under `service`. An empty path addresses the
    /// service prefix itself.
    #[must_use]
    pub fn url(&self, service: Service, path: &str) -> String {
        let path = path.trim_start_matches('/');
        let route = if path.is_empty() {
            service.prefix().to_string()
        } else {
            format!("{}/{path}", service.prefix())
        };
        join(self.inner.origins.origin(service).as_str(), &route)
    }

    /// Perform a request and parse the JSON response as `T`.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::Request`] for transport failures and non-2xx
    ///   statuses, carrying the normalized message.
    /// - [`GatewayError::Decode`] when a 2xx body is not valid JSON for `T`.
    #[instrument(skip_all, fields(service = %service, method = %options.method, path = %path))]
    pub async fn call<T: DeserializeOwned>(
        &self,
        service: Service,
        path: &str,
        options: RequestOptions,
    ) -> Result<Reply<T>> {
        let url = self.url(service, path);
        let headers = self.headers(&options.headers)?;

        let mut request = self
            .inner
            .client
            .request(options.method, &url)
            .headers(headers);
        if !options.query.is_empty() {
            request = request.query(&options.query);
        }
        if let Some(body) = &options.body {
            request = request.body(body.to_string());
        }

        let response = request.send().await.map_err(|e| {
            warn!(error = %e, "Request could not be sent");
            GatewayError::from(e)
        })?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            debug!(status = %status, "Request succeeded without content");
            return Ok(Reply::NoContent);
        }

        let text = response.text().await?;
        if !status.is_success() {
            let message = error_message(status, &text);
            warn!(status = %status, error = %message, "Request failed");
            return Err(GatewayError::Request(message));
        }

        debug!(status = %status, "Request succeeded");
        decode_body(&text)
    }

    /// Exchange credentials for a session token and persist it.
    ///
    /// The request carries no bearer header even when a token is held.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::Request`] for transport failures and non-2xx
    ///   statuses (raw body text, or `HTTP <status>` when empty).
    /// - [`GatewayError::NoToken`] when neither the body nor the headers
    ///   carry a token.
    /// - [`GatewayError::Storage`] if the token cannot be persisted.
    #[instrument(skip(self, password))]
    pub async fn login(&self, login: &str, password: &str) -> Result<LoginOutcome> {
        let url = self.url(Service::Auth, "/login");
        let payload = serde_json::json!({ "login": login, "password": password });

        let response = self
            .inner
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload.to_string())
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Login request could not be sent");
                GatewayError::from(e)
            })?;

        let status = response.status();
        let headers = response.headers().clone();
        let text = response.text().await?;

        if !status.is_success() {
            let message = if text.is_empty() {
                format!("HTTP {}", status.as_u16())
            } else {
                text
            };
            warn!(status = %status, error = %message, "Login rejected");
            return Err(GatewayError::Request(message));
        }

        let body: Value = serde_json::from_str(&text).unwrap_or_else(|_| Value::Object(Map::new()));
        let token = token_from_body(&body)
            .or_else(|| token_from_headers(&headers))
            .ok_or_else(|| {
                warn!("Login response carried no token");
                GatewayError::NoToken
            })?;
        let expires_at = expires_at(&body);

        self.inner.tokens.set(&token, expires_at.as_deref())?;
        debug!("Login succeeded");

        Ok(LoginOutcome {
            token: SecretString::from(token),
            expires_at,
            body,
        })
    }

    /// Default headers overlaid with the caller's. Header names compare
    /// case-insensitively, so a caller `authorization` replaces the stored
    /// bearer token.
    fn headers(&self, extra: &[(String, String)]) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(bearer) = self.inner.tokens.bearer() {
            let mut value = HeaderValue::from_str(&bearer).map_err(|_| {
                GatewayError::Request("stored token is not a valid header value".to_string())
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        for (name, value) in extra {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| GatewayError::Request(format!("invalid header name: {name}")))?;
            let mut value = HeaderValue::from_str(value)
                .map_err(|_| GatewayError::Request(format!("invalid value for header {name}")))?;
            if name == AUTHORIZATION {
                value.set_sensitive(true);
            }
            headers.insert(name, value);
        }

        Ok(headers)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("origins", &self.inner.origins)
            .field("tokens", &self.inner.tokens)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Human-readable message for a non-2xx response.
///
/// A JSON object with a non-empty string `message` yields that message;
/// otherwise the raw text; otherwise `HTTP <status>`.
fn error_message(status: StatusCode, text: &str) -> String {
    if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(text)
        && let Some(Value::String(message)) = obj.get("message")
        && !message.is_empty()
    {
        return message.clone();
    }

    if text.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        text.to_string()
    }
}

/// Parse a 2xx body. Blank bodies are "no content".
fn decode_body<T: DeserializeOwned>(text: &str) -> Result<Reply<T>> {
    if text.trim().is_empty() {
        return Ok(Reply::NoContent);
    }
    serde_json::from_str(text)
        .map(Reply::Json)
        .map_err(|e| GatewayError::Decode(e.to_string()))
}

/// First non-empty token field of a login body.
fn token_from_body(body: &Value) -> Option<String> {
    TOKEN_FIELDS
        .iter()
        .filter_map(|field| body.get(field).and_then(Value::as_str))
        .map(str::trim)
        .find(|token| !token.is_empty())
        .map(str::to_string)
}

/// Token from the login response headers, minus any `Bearer ` prefix.
fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    TOKEN_HEADERS
        .iter()
        .filter_map(|name| headers.get(*name).and_then(|v| v.to_str().ok()))
        .map(|raw| BEARER_PREFIX.replace(raw.trim(), "").into_owned())
        .find(|token| !token.is_empty())
}

fn expires_at(body: &Value) -> Option<String> {
    match body.get("expiresAt")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use secrecy::ExposeSecret;
    use url::Url;

    fn dispatcher(origins: ServiceOrigins) -> Dispatcher {
        Dispatcher::new(origins, TokenStore::new(Arc::new(MemoryStorage::new())))
    }

    #[test]
    fn test_join_single_separator() {
        let cases = [
            ("http://h", "x", "http://h/x"),
            ("http://h/", "x", "http://h/x"),
            ("http://h", "/x", "http://h/x"),
            ("http://h//", "//x", "http://h/x"),
            ("http://h/api", "orders/1", "http://h/api/orders/1"),
            ("", "x", "/x"),
            ("", "/x", "/x"),
            ("", "//x", "/x"),
        ];
        for (base, path, expected) in cases {
            assert_eq!(join(base, path), expected, "join({base:?}, {path:?})");
        }
    }

    #[test]
    fn test_url_applies_service_prefix() {
        let d = dispatcher(ServiceOrigins::default());
        assert_eq!(d.url(Service::Auth, "/login"), "http://localhost:9000/auth/login");
        assert_eq!(d.url(Service::Orders, "42/cancel"), "http://localhost:9003/orders/42/cancel");
        assert_eq!(d.url(Service::Items, ""), "http://localhost:9002/items");
        assert_eq!(d.url(Service::Payments, "/"), "http://localhost:9004/payments");
    }

    #[test]
    fn test_url_through_proxy_with_base_path() {
        let proxy = Url::parse("https://shop.example.com/api/").unwrap();
        let d = dispatcher(ServiceOrigins::proxied(&proxy));
        assert_eq!(d.url(Service::Accounts, "7"), "https://shop.example.com/api/accounts/7");
    }

    #[test]
    fn test_error_message_prefers_json_message() {
        assert_eq!(
            error_message(StatusCode::CONFLICT, r#"{"message":"Insufficient stock"}"#),
            "Insufficient stock"
        );
    }

    #[test]
    fn test_error_message_falls_back_to_text_then_status() {
        assert_eq!(error_message(StatusCode::BAD_REQUEST, "oops"), "oops");
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, r#"{"error":"bad"}"#),
            r#"{"error":"bad"}"#
        );
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, r#"{"message":""}"#),
            r#"{"message":""}"#
        );
        assert_eq!(error_message(StatusCode::INTERNAL_SERVER_ERROR, ""), "HTTP 500");
    }

    #[test]
    fn test_decode_body_blank_is_no_content() {
        let reply: Reply<Value> = decode_body("  ").unwrap();
        assert!(reply.is_no_content());
    }

    #[test]
    fn test_decode_body_type_mismatch_is_decode_error() {
        let result: Result<Reply<Vec<i64>>> = decode_body(r#"{"not":"a list"}"#);
        assert!(matches!(result, Err(GatewayError::Decode(_))));

        let result: Result<Reply<Value>> = decode_body("<html>");
        assert!(matches!(result, Err(GatewayError::Decode(_))));
    }

    #[test]
    fn test_reply_into_json() {
        assert_eq!(Reply::Json(3).into_json().unwrap(), 3);
        assert!(matches!(
            Reply::<i32>::NoContent.into_json(),
            Err(GatewayError::Decode(_))
        ));
    }

    #[test]
    fn test_token_from_body_priority() {
        let body = serde_json::json!({"jwt": "c", "accessToken": "b", "token": ""});
        assert_eq!(token_from_body(&body).as_deref(), Some("b"));

        let body = serde_json::json!({"idToken": "z"});
        assert_eq!(token_from_body(&body).as_deref(), Some("z"));

        assert_eq!(token_from_body(&serde_json::json!({})), None);
        assert_eq!(token_from_body(&serde_json::json!("bare")), None);
        assert_eq!(token_from_body(&serde_json::json!({"token": 12})), None);
    }

    #[test]
    fn test_token_from_headers_strips_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(token_from_headers(&headers).as_deref(), Some("abc.def.ghi"));

        let mut headers = HeaderMap::new();
        headers.insert("X-Auth-Token", HeaderValue::from_static("bearer   xyz"));
        assert_eq!(token_from_headers(&headers).as_deref(), Some("xyz"));

        let mut headers = HeaderMap::new();
        headers.insert("x-auth-token", HeaderValue::from_static("raw-token"));
        assert_eq!(token_from_headers(&headers).as_deref(), Some("raw-token"));

        assert_eq!(token_from_headers(&HeaderMap::new()), None);
    }

    #[test]
    fn test_expires_at_accepts_string_or_number() {
        assert_eq!(
            expires_at(&serde_json::json!({"expiresAt": "2030-01-01T00:00:00Z"})).as_deref(),
            Some("2030-01-01T00:00:00Z")
        );
        assert_eq!(
            expires_at(&serde_json::json!({"expiresAt": 1_900_000_000})).as_deref(),
            Some("1900000000")
        );
        assert_eq!(expires_at(&serde_json::json!({})), None);
    }

    #[test]
    fn test_headers_attach_bearer_and_caller_overrides() {
        let d = dispatcher(ServiceOrigins::default());
        let headers = d.headers(&[]).unwrap();
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
        assert!(headers.get(AUTHORIZATION).is_none());

        d.tokens().set("stored", None).unwrap();
        let headers = d.headers(&[]).unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer stored");

        let headers = d
            .headers(&[("authorization".to_string(), "Bearer explicit".to_string())])
            .unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer explicit");
        assert_eq!(headers.get_all(AUTHORIZATION).iter().count(), 1);
    }

    #[test]
    fn test_invalid_caller_header_is_request_error() {
        let d = dispatcher(ServiceOrigins::default());
        let result = d.headers(&[("bad header".to_string(), "v".to_string())]);
        assert!(matches!(result, Err(GatewayError::Request(_))));
    }

    #[test]
    fn test_query_builder_skips_none() {
        let options = RequestOptions::get()
            .query("q", None::<String>)
            .query("page", Some(0))
            .query("size", Some(12));
        assert_eq!(
            options.query,
            vec![
                ("page".to_string(), "0".to_string()),
                ("size".to_string(), "12".to_string())
            ]
        );
    }

    #[test]
    fn test_login_outcome_debug_hides_token() {
        let outcome = LoginOutcome {
            token: SecretString::from("hidden.jwt.value"),
            expires_at: None,
            body: serde_json::json!({"token": "hidden.jwt.value"}),
        };
        assert_eq!(outcome.token.expose_secret(), "hidden.jwt.value");
        assert!(!format!("{outcome:?}").contains("hidden.jwt.value"));
    }
}
