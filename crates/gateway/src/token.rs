//! Session token persistence.
//!
//! Holds zero or one session token (plus the server's optional expiry hint)
//! under [`SESSION_KEY`]. There is no in-memory copy: every `get` reads the
//! backing storage, so a `set` is visible to the very next request.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{GatewayError, Result};
use crate::storage::{SESSION_KEY, Storage};

/// A persisted session token.
#[derive(Debug, Clone)]
pub struct StoredSession {
    /// The opaque bearer token.
    pub token: SecretString,
    /// Server-provided expiry, kept verbatim.
    pub expires_at: Option<String>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedSession {
    token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<String>,
}

/// Durable holder of the current session token.
#[derive(Clone)]
pub struct TokenStore {
    storage: Arc<dyn Storage>,
}

impl TokenStore {
    /// Create a token store over shared storage.
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Current token, if any.
    #[must_use]
    pub fn get(&self) -> Option<SecretString> {
        self.get_session().map(|session| session.token)
    }

    /// Current token together with its expiry hint.
    ///
    /// Unreadable or malformed persisted state reads as "no session".
    #[must_use]
    pub fn get_session(&self) -> Option<StoredSession> {
        let raw = match self.storage.get(SESSION_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, "Failed to read session token");
                return None;
            }
        };

        match serde_json::from_str::<PersistedSession>(&raw) {
            Ok(persisted) if !persisted.token.is_empty() => Some(StoredSession {
                token: SecretString::from(persisted.token),
                expires_at: persisted.expires_at,
            }),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "Ignoring malformed persisted session");
                None
            }
        }
    }

    /// Replace the current token. An empty token clears the store.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Storage`] if the token cannot be persisted.
    pub fn set(&self, token: &str, expires_at: Option<&str>) -> Result<()> {
        let token = token.trim();
        if token.is_empty() {
            return self.clear();
        }

        let persisted = PersistedSession {
            token: token.to_string(),
            expires_at: expires_at.map(str::to_string),
        };
        let raw =
            serde_json::to_string(&persisted).map_err(|e| GatewayError::Storage(e.to_string()))?;
        self.storage.set(SESSION_KEY, &raw)
    }

    /// Remove the current token.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Storage`] if the store cannot be written.
    pub fn clear(&self) -> Result<()> {
        self.storage.remove(SESSION_KEY)
    }

    /// Whether a token is currently held.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.get().is_some()
    }

    /// Bearer header value for the current token.
    pub(crate) fn bearer(&self) -> Option<String> {
        self.get()
            .map(|token| format!("Bearer {}", token.expose_secret()))
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("token", &self.get().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::{FileStorage, MemoryStorage};

    fn memory_store() -> TokenStore {
        TokenStore::new(Arc::new(MemoryStorage::new()))
    }

    #[test]
    fn test_empty_store_has_no_token() {
        let store = memory_store();
        assert!(store.get().is_none());
        assert!(!store.is_set());
    }

    #[test]
    fn test_set_is_immediately_visible() {
        let store = memory_store();
        store.set("a.b.c", Some("2030-01-01T00:00:00Z")).unwrap();

        let session = store.get_session().unwrap();
        assert_eq!(session.token.expose_secret(), "a.b.c");
        assert_eq!(session.expires_at.as_deref(), Some("2030-01-01T00:00:00Z"));
        assert_eq!(store.bearer().as_deref(), Some("Bearer a.b.c"));
    }

    #[test]
    fn test_set_replaces_previous_token() {
        let store = memory_store();
        store.set("first", Some("2030-01-01T00:00:00Z")).unwrap();
        store.set("second", None).unwrap();

        let session = store.get_session().unwrap();
        assert_eq!(session.token.expose_secret(), "second");
        assert!(session.expires_at.is_none());
    }

    #[test]
    fn test_clear_removes_token() {
        let store = memory_store();
        store.set("a.b.c", None).unwrap();
        store.clear().unwrap();
        assert!(store.get().is_none());
    }

    #[test]
    fn test_empty_token_clears() {
        let store = memory_store();
        store.set("a.b.c", None).unwrap();
        store.set("  ", None).unwrap();
        assert!(store.get().is_none());
    }

    #[test]
    fn test_malformed_persisted_value_reads_as_empty() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(SESSION_KEY, "raw-token-not-json").unwrap();
        let store = TokenStore::new(storage);
        assert!(store.get().is_none());
    }

    #[test]
    fn test_debug_redacts_token() {
        let store = memory_store();
        store.set("super-secret-token", None).unwrap();
        let debug_output = format!("{store:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super-secret-token"));
    }

    #[test]
    fn test_file_backed_token_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        TokenStore::new(Arc::new(FileStorage::open(dir.path()).unwrap()))
            .set("persisted.jwt.token", None)
            .unwrap();

        let reopened = TokenStore::new(Arc::new(FileStorage::open(dir.path()).unwrap()));
        assert_eq!(
            reopened.get().unwrap().expose_secret(),
            "persisted.jwt.token"
        );
    }
}
