//! Unverified session token claims.
//!
//! The middle segment of a session token is base64url-encoded JSON. It is
//! decoded here purely to learn who the token claims to be for; nothing is
//! verified, that is the backend's job. Every field is optional and the
//! identity id may appear under several names, so [`Claims`] wraps the raw
//! JSON object and exposes a named accessor per recognized field.

use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tradepost_core::AccountId;

/// All-ASCII-digit subject, e.g. `"42"`.
static NUMERIC_SUBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+$").expect("Invalid regex"));

/// Roles granted to a user, as a list or a single string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Roles {
    List(Vec<String>),
    Single(String),
}

impl Roles {
    /// Interpret a loosely-typed roles value.
    ///
    /// Accepts a string, an array of strings, or an array of
    /// `{"authority": "..."}` objects. Anything else yields `None`.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(role) => Some(Self::Single(role.clone())),
            Value::Array(entries) => Some(Self::List(
                entries
                    .iter()
                    .filter_map(|entry| match entry {
                        Value::String(role) => Some(role.clone()),
                        Value::Object(obj) => {
                            obj.get("authority").and_then(Value::as_str).map(str::to_string)
                        }
                        _ => None,
                    })
                    .collect(),
            )),
            _ => None,
        }
    }

    /// Whether `role` is among these roles.
    #[must_use]
    pub fn contains(&self, role: &str) -> bool {
        match self {
            Self::List(roles) => roles.iter().any(|r| r == role),
            Self::Single(r) => r == role,
        }
    }
}

/// Claims decoded from a session token's payload segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    inner: Map<String, Value>,
}

impl Claims {
    /// Decode the claims of `token`.
    ///
    /// Returns `None` for a missing or empty token, a token without a
    /// payload segment, or a payload that is not base64url-encoded JSON
    /// object text. Never panics.
    #[must_use]
    pub fn decode(token: Option<&str>) -> Option<Self> {
        let token = token?.trim();
        if token.is_empty() {
            return None;
        }

        let payload = token.split('.').nth(1)?;
        // Tolerate padding and the standard alphabet.
        let normalized: String = payload
            .trim_end_matches('=')
            .chars()
            .map(|c| match c {
                '+' => '-',
                '/' => '_',
                other => other,
            })
            .collect();

        let bytes = URL_SAFE_NO_PAD.decode(normalized).ok()?;
        match serde_json::from_slice::<Value>(&bytes).ok()? {
            Value::Object(inner) => Some(Self { inner }),
            _ => None,
        }
    }

    /// Raw claim value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.inner.get(key)
    }

    /// The account id this token resolves to.
    ///
    /// Tries, in order: numeric `id`, numeric `userId`, all-digit string
    /// `sub`. The first match wins.
    #[must_use]
    pub fn id(&self) -> Option<AccountId> {
        self.get("id")
            .and_then(integral)
            .or_else(|| self.get("userId").and_then(integral))
            .or_else(|| {
                self.subject()
                    .filter(|sub| NUMERIC_SUBJECT.is_match(sub))
                    .and_then(|sub| sub.parse::<i64>().ok())
            })
            .map(AccountId::new)
    }

    /// Raw `sub` claim, when it is a string.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.get("sub").and_then(Value::as_str)
    }

    /// `username`, falling back to `name`.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.get("username")
            .and_then(Value::as_str)
            .or_else(|| self.get("name").and_then(Value::as_str))
    }

    /// `email` claim.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.get("email").and_then(Value::as_str)
    }

    /// `roles`, falling back to `authorities`.
    #[must_use]
    pub fn roles(&self) -> Option<Roles> {
        self.get("roles")
            .filter(|v| !v.is_null())
            .or_else(|| self.get("authorities"))
            .and_then(Roles::from_value)
    }

    /// Identity of the auth-service user behind this token, as a string.
    ///
    /// Tries `sub`, then `uid`, then `userId`; numeric values are
    /// stringified.
    #[must_use]
    pub fn auth_user_id(&self) -> Option<String> {
        ["sub", "uid", "userId"]
            .iter()
            .filter_map(|key| self.get(key))
            .find_map(|value| match value {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
    }
}

/// Interpret a JSON number as a whole `i64`, e.g. `7` or `7.0`.
#[allow(clippy::cast_possible_truncation)] // bounded by the filter
fn integral(value: &Value) -> Option<i64> {
    let number = value.as_number()?;
    number.as_i64().or_else(|| {
        number
            .as_f64()
            .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15)
            .map(|f| f as i64)
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn token_with(payload: &Value) -> String {
        let body = URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload).unwrap());
        format!("eyJhbGciOiJIUzI1NiJ9.{body}.signature")
    }

    fn decoded(payload: &Value) -> Claims {
        Claims::decode(Some(&token_with(payload))).unwrap()
    }

    #[test]
    fn test_missing_or_malformed_tokens_decode_to_none() {
        let cases = [
            None,
            Some(""),
            Some("   "),
            Some("no-dots-at-all"),
            Some("a.!!!not-base64!!!.c"),
            Some("a..c"),
            // valid base64url, not JSON
            Some("a.aGVsbG8.c"),
            // valid JSON, not an object
            Some("a.WzEsMl0.c"),
        ];

        for token in cases {
            assert!(Claims::decode(token).is_none(), "expected None for {token:?}");
        }
    }

    #[test]
    fn test_numeric_id_wins() {
        let claims = decoded(&json!({"id": 7, "userId": 8, "sub": "9"}));
        assert_eq!(claims.id(), Some(AccountId::new(7)));
    }

    #[test]
    fn test_user_id_used_when_id_missing_or_not_numeric() {
        let claims = decoded(&json!({"id": "7", "userId": 8}));
        assert_eq!(claims.id(), Some(AccountId::new(8)));
    }

    #[test]
    fn test_whole_float_id_is_accepted() {
        let claims = decoded(&json!({"id": 7.0}));
        assert_eq!(claims.id(), Some(AccountId::new(7)));

        let claims = decoded(&json!({"id": 7.5}));
        assert_eq!(claims.id(), None);
    }

    #[test]
    fn test_numeric_subject_resolves_id() {
        let claims = decoded(&json!({"sub": "12345"}));
        assert_eq!(claims.id(), Some(AccountId::new(12345)));
    }

    #[test]
    fn test_non_numeric_subject_yields_no_id() {
        for sub in ["abc", "12a", "", "-4", "1.5", "٣"] {
            let claims = decoded(&json!({"sub": sub}));
            assert_eq!(claims.id(), None, "sub {sub:?} should not resolve");
        }
    }

    #[test]
    fn test_no_identity_fields() {
        let claims = decoded(&json!({"email": "a@b.c"}));
        assert_eq!(claims.id(), None);
        assert_eq!(claims.email(), Some("a@b.c"));
        assert_eq!(claims.username(), None);
        assert_eq!(claims.roles(), None);
    }

    #[test]
    fn test_padded_payload_is_accepted() {
        let body = base64::engine::general_purpose::URL_SAFE.encode(br#"{"id":1}"#);
        assert!(body.ends_with('='));
        let claims = Claims::decode(Some(&format!("h.{body}.s"))).unwrap();
        assert_eq!(claims.id(), Some(AccountId::new(1)));
    }

    #[test]
    fn test_username_falls_back_to_name() {
        let claims = decoded(&json!({"name": "Ada"}));
        assert_eq!(claims.username(), Some("Ada"));

        let claims = decoded(&json!({"username": "ada", "name": "Ada"}));
        assert_eq!(claims.username(), Some("ada"));
    }

    #[test]
    fn test_roles_fall_back_to_authorities() {
        let claims = decoded(&json!({
            "authorities": [{"authority": "ROLE_ADMIN"}, "ROLE_USER"]
        }));
        let roles = claims.roles().unwrap();
        assert_eq!(
            roles,
            Roles::List(vec!["ROLE_ADMIN".to_string(), "ROLE_USER".to_string()])
        );
        assert!(roles.contains("ROLE_ADMIN"));

        let claims = decoded(&json!({"roles": "ADMIN"}));
        assert_eq!(claims.roles(), Some(Roles::Single("ADMIN".to_string())));
    }

    #[test]
    fn test_auth_user_id_prefers_subject() {
        let claims = decoded(&json!({"sub": "user-9", "uid": "x", "userId": 3}));
        assert_eq!(claims.auth_user_id().as_deref(), Some("user-9"));

        let claims = decoded(&json!({"userId": 3}));
        assert_eq!(claims.auth_user_id().as_deref(), Some("3"));
    }

    #[test]
    fn test_unknown_claims_remain_reachable() {
        let claims = decoded(&json!({"tenant": "eu-1"}));
        assert_eq!(claims.get("tenant").and_then(Value::as_str), Some("eu-1"));
    }
}
