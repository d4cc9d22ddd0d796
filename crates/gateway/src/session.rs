//! Session state.
//!
//! [`SessionController`] owns the `{token, user}` pair and publishes it
//! through a [`tokio::sync::watch`] channel. Every token mutation (login,
//! external set, logout) is followed by a resolution that decodes the token
//! claims and, when they name an account, enriches them from the account
//! service. Only completed resolutions are published; a resolution that was
//! overtaken by a newer mutation is dropped.

use std::sync::atomic::{AtomicU64, Ordering};

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, instrument, warn};
use tradepost_core::AccountId;

use crate::claims::{Claims, Roles};
use crate::config::Service;
use crate::dispatch::{Dispatcher, LoginOutcome, Reply, RequestOptions};
use crate::error::Result;

/// The signed-in user as far as the client can tell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct User {
    pub id: Option<AccountId>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub roles: Option<Roles>,
}

impl User {
    /// The user described by token claims alone.
    #[must_use]
    pub fn from_claims(claims: Option<&Claims>) -> Self {
        claims.map_or_else(Self::default, |claims| Self {
            id: claims.id(),
            username: claims.username().map(str::to_string),
            email: claims.email().map(str::to_string),
            roles: claims.roles(),
        })
    }

    /// Overlay fields from an account record. Fetched values win; missing
    /// or null ones keep the claims value.
    #[must_use]
    pub fn with_account(self, account: &Value) -> Self {
        let text = |key: &str| account.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            id: self.id,
            username: text("username").or(self.username),
            email: text("email").or(self.email),
            roles: account
                .get("roles")
                .and_then(Roles::from_value)
                .or(self.roles),
        }
    }
}

/// A consistent view of the session.
///
/// `user` is `Some` exactly when `token` is.
#[derive(Clone, Default)]
pub struct SessionSnapshot {
    pub token: Option<SecretString>,
    pub user: Option<User>,
}

impl SessionSnapshot {
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

impl std::fmt::Debug for SessionSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSnapshot")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("user", &self.user)
            .finish()
    }
}

/// Owner of the session state.
pub struct SessionController {
    dispatcher: Dispatcher,
    state: watch::Sender<SessionSnapshot>,
    generation: AtomicU64,
}

impl SessionController {
    /// Create a controller in the anonymous state.
    ///
    /// A token already held by the store is picked up by the first
    /// [`refresh`](Self::refresh).
    #[must_use]
    pub fn new(dispatcher: Dispatcher) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::default());
        Self {
            dispatcher,
            state,
            generation: AtomicU64::new(0),
        }
    }

    /// Receive every published snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    /// The most recently published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    /// Sign in and resolve the new user.
    ///
    /// # Errors
    ///
    /// Propagates the dispatcher's login failure; the session is left as it
    /// was.
    pub async fn login(&self, login: &str, password: &str) -> Result<LoginOutcome> {
        let outcome = self.dispatcher.login(login, password).await?;
        self.refresh().await;
        Ok(outcome)
    }

    /// Replace (or with `None`, clear) the token, then resolve.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Storage`](crate::GatewayError::Storage) if the
    /// token store cannot be written.
    pub async fn set_token(&self, token: Option<&str>) -> Result<SessionSnapshot> {
        match token {
            Some(token) => self.dispatcher.tokens().set(token, None)?,
            None => self.dispatcher.tokens().clear()?,
        }
        Ok(self.refresh().await)
    }

    /// Re-read the token store and resolve the user.
    ///
    /// Returns the snapshot this call published, or the current one if a
    /// newer mutation overtook it.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> SessionSnapshot {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let token = self.dispatcher.tokens().get();
        let user = match &token {
            Some(token) => Some(self.resolve_user(token).await),
            None => None,
        };
        let snapshot = SessionSnapshot { token, user };

        let published = self.state.send_if_modified(|current| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            *current = snapshot.clone();
            true
        });

        if published {
            snapshot
        } else {
            debug!(generation, "Discarding superseded session resolution");
            self.snapshot()
        }
    }

    /// Forget the token and user.
    ///
    /// The anonymous state is published even if the store cannot be cleared.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Storage`](crate::GatewayError::Storage) if the
    /// token store cannot be written.
    pub fn logout(&self) -> Result<()> {
        // Clear before bumping so a refresh starting in between reads no token.
        let cleared = self.dispatcher.tokens().clear();
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.state.send_replace(SessionSnapshot::default());
        debug!("Session cleared");
        cleared
    }

    async fn resolve_user(&self, token: &SecretString) -> User {
        let claims = Claims::decode(Some(token.expose_secret()));
        let user = User::from_claims(claims.as_ref());

        let Some(id) = user.id else {
            return user;
        };

        match self
            .dispatcher
            .call::<Value>(Service::Accounts, &id.to_string(), RequestOptions::get())
            .await
        {
            Ok(Reply::Json(account)) => user.with_account(&account),
            Ok(Reply::NoContent) => user,
            Err(e) => {
                warn!(account_id = %id, error = %e, "Account lookup failed, using token claims");
                user
            }
        }
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}
