//! Typed access to the backend services.
//!
//! [`Gateway`] ties the pieces together: one token store, one dispatcher,
//! one session controller and one order submitter, all sharing the same
//! storage. The per-service handles returned by [`Gateway::auth`],
//! [`Gateway::accounts`], [`Gateway::items`] and [`Gateway::payments`] are
//! thin typed wrappers over [`Dispatcher::call`].

mod accounts;
mod auth;
mod items;
mod payments;

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

pub use accounts::AccountsApi;
pub use auth::AuthApi;
pub use items::{DEFAULT_PAGE_SIZE, ItemsApi, SearchQuery};
pub use payments::PaymentsApi;

use crate::config::{GatewayConfig, ServiceOrigins};
use crate::dispatch::Dispatcher;
use crate::error::{GatewayError, Result};
use crate::orders::{OrderIndex, OrderSubmitter};
use crate::session::SessionController;
use crate::storage::{FileStorage, Storage};
use crate::token::TokenStore;

/// Client-side entry point to the Tradepost services.
#[derive(Debug)]
pub struct Gateway {
    dispatcher: Dispatcher,
    session: SessionController,
    orders: OrderSubmitter,
}

impl Gateway {
    /// Build a gateway whose state lives in `config.state_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Storage`] if the state directory cannot be
    /// created.
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let storage = FileStorage::open(&config.state_dir)?;
        Ok(Self::with_storage(config.origins.clone(), Arc::new(storage)))
    }

    /// Build a gateway over explicit origins and storage.
    #[must_use]
    pub fn with_storage(origins: ServiceOrigins, storage: Arc<dyn Storage>) -> Self {
        let dispatcher = Dispatcher::new(origins, TokenStore::new(Arc::clone(&storage)));
        Self {
            session: SessionController::new(dispatcher.clone()),
            orders: OrderSubmitter::new(dispatcher.clone(), OrderIndex::new(storage)),
            dispatcher,
        }
    }

    #[must_use]
    pub const fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    #[must_use]
    pub const fn session(&self) -> &SessionController {
        &self.session
    }

    #[must_use]
    pub const fn orders(&self) -> &OrderSubmitter {
        &self.orders
    }

    #[must_use]
    pub const fn auth(&self) -> AuthApi<'_> {
        AuthApi::new(self)
    }

    #[must_use]
    pub const fn accounts(&self) -> AccountsApi<'_> {
        AccountsApi::new(&self.dispatcher)
    }

    #[must_use]
    pub const fn items(&self) -> ItemsApi<'_> {
        ItemsApi::new(&self.dispatcher)
    }

    #[must_use]
    pub const fn payments(&self) -> PaymentsApi<'_> {
        PaymentsApi::new(&self.dispatcher)
    }
}

/// Serialize a request payload.
fn to_body<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| GatewayError::Encode(e.to_string()))
}
