//! Subcommand implementations.

pub mod account;
pub mod catalog;
pub mod orders;
pub mod payments;
pub mod session;

use serde::Serialize;
use thiserror::Error;
use tradepost_core::{AccountId, CartError};
use tradepost_gateway::{Gateway, GatewayError, User};

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Cart(#[from] CartError),

    /// An order line argument was not `SKU[:QTY]`.
    #[error("Invalid order line '{0}', expected SKU or SKU:QTY")]
    InvalidLine(String),

    /// The command needs a signed-in user.
    #[error("Not signed in (run `tpost login` first)")]
    NotSignedIn,

    /// The signed-in user's token names no numeric account id.
    #[error("Session has no account id")]
    NoAccountId,

    #[error("Failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

/// Print a value as pretty JSON on stdout.
#[allow(clippy::print_stdout)]
fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// The signed-in user, resolved from the stored token.
async fn current_user(gateway: &Gateway) -> Result<User, CliError> {
    gateway
        .session()
        .refresh()
        .await
        .user
        .ok_or(CliError::NotSignedIn)
}

/// Account id of the signed-in user.
async fn current_account(gateway: &Gateway) -> Result<AccountId, CliError> {
    current_user(gateway).await?.id.ok_or(CliError::NoAccountId)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tradepost_gateway::{MemoryStorage, ServiceOrigins};

    use super::*;

    // {"sub":"auth-user-1","email":"ada@example.com"}
    const NON_NUMERIC_SUB: &str =
        "h.eyJzdWIiOiJhdXRoLXVzZXItMSIsImVtYWlsIjoiYWRhQGV4YW1wbGUuY29tIn0.s";

    fn gateway() -> Gateway {
        Gateway::with_storage(ServiceOrigins::default(), Arc::new(MemoryStorage::new()))
    }

    #[tokio::test]
    async fn test_user_without_account_id_is_still_signed_in() {
        let gateway = gateway();
        gateway
            .session()
            .set_token(Some(NON_NUMERIC_SUB))
            .await
            .unwrap();

        let user = current_user(&gateway).await.unwrap();
        assert_eq!(user.id, None);
        assert_eq!(user.email.as_deref(), Some("ada@example.com"));
        assert!(matches!(
            current_account(&gateway).await,
            Err(CliError::NoAccountId)
        ));
    }

    #[tokio::test]
    async fn test_anonymous_session_is_not_signed_in() {
        let gateway = gateway();
        assert!(matches!(
            current_user(&gateway).await,
            Err(CliError::NotSignedIn)
        ));
        assert!(matches!(
            current_account(&gateway).await,
            Err(CliError::NotSignedIn)
        ));
    }
}
