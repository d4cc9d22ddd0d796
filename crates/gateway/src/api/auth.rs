use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{info, instrument};
use tradepost_core::{Account, NewAccount};

use super::Gateway;
use crate::claims::Claims;
use crate::config::Service;
use crate::dispatch::{LoginOutcome, RequestOptions};
use crate::error::{GatewayError, Result};

#[derive(Deserialize)]
struct Registered {
    #[serde(default)]
    token: String,
}

/// Sign-in, registration and sign-out.
#[derive(Debug, Clone, Copy)]
pub struct AuthApi<'a> {
    gateway: &'a Gateway,
}

impl<'a> AuthApi<'a> {
    pub(super) const fn new(gateway: &'a Gateway) -> Self {
        Self { gateway }
    }

    /// Sign in and publish the resolved session.
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::login`](crate::Dispatcher::login).
    pub async fn login(&self, login: &str, password: &str) -> Result<LoginOutcome> {
        self.gateway.session().login(login, password).await
    }

    /// Create auth credentials. Returns the token issued for them; it is
    /// not stored.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::Request`] if the auth service rejects the request.
    /// - [`GatewayError::NoToken`] if the response carries no token.
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<SecretString> {
        let body = serde_json::json!({
            "email": email,
            "username": username,
            "password": password,
        });
        let registered: Registered = self
            .gateway
            .dispatcher()
            .call(Service::Auth, "/register", RequestOptions::post(body))
            .await?
            .into_json()?;

        if registered.token.trim().is_empty() {
            return Err(GatewayError::NoToken);
        }
        Ok(SecretString::from(registered.token))
    }

    /// Register, sign in with the issued token and create the matching
    /// account record.
    ///
    /// The account is created with the new token as an explicit bearer and
    /// linked to the token subject (`sub`, `uid` or `userId`).
    ///
    /// # Errors
    ///
    /// - Any [`register`](Self::register) failure.
    /// - `GatewayError::Request("token missing subject")` when the token
    ///   names no auth user.
    /// - Any account-creation failure. The token stays stored either way.
    #[instrument(skip(self, password))]
    pub async fn sign_up(&self, email: &str, username: &str, password: &str) -> Result<Account> {
        let token = self.register(email, username, password).await?;
        self.gateway
            .session()
            .set_token(Some(token.expose_secret()))
            .await?;

        let auth_user_id = Claims::decode(Some(token.expose_secret()))
            .and_then(|claims| claims.auth_user_id())
            .ok_or_else(|| GatewayError::Request("token missing subject".to_string()))?;

        let account = self
            .gateway
            .accounts()
            .create(
                &NewAccount {
                    auth_user_id,
                    email: email.to_string(),
                    username: username.to_string(),
                },
                &token,
            )
            .await?;

        self.gateway.session().refresh().await;
        info!(account_id = %account.id, "Account created");
        Ok(account)
    }

    /// Forget the current session.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Storage`] if the token store cannot be written.
    pub fn logout(&self) -> Result<()> {
        self.gateway.session().logout()
    }
}
