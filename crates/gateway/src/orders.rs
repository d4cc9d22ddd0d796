//! Order placement and the local order index.
//!
//! The order service has no "orders for this account" listing, so the
//! client remembers the ids of orders it has created or viewed. The index is
//! a best-effort cache: losing it loses nothing on the server, and failing
//! to update it never fails the order operation that triggered the update.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};
use tradepost_core::{AccountId, CartLine, Order, OrderId};

use crate::config::Service;
use crate::dispatch::{Dispatcher, RequestOptions};
use crate::error::{GatewayError, Result};
use crate::storage::{ORDER_INDEX_KEY, Storage};

/// Most order ids the local index keeps.
pub const ORDER_INDEX_CAP: usize = 50;

// =============================================================================
// OrderIndex
// =============================================================================

/// Most-recent-first list of order ids this client knows about.
#[derive(Clone)]
pub struct OrderIndex {
    storage: Arc<dyn Storage>,
    write_lock: Arc<Mutex<()>>,
}

impl OrderIndex {
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Indexed ids, newest first. Unreadable state reads as empty.
    #[must_use]
    pub fn ids(&self) -> Vec<OrderId> {
        let raw = match self.storage.get(ORDER_INDEX_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(error = %e, "Failed to read order index");
                return Vec::new();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(error = %e, "Ignoring malformed order index");
            Vec::new()
        })
    }

    /// Move `id` to the front, dropping the oldest entries past the cap.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Storage`] if the index cannot be written.
    pub async fn record(&self, id: OrderId) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut ids = self.ids();
        push_front(&mut ids, id);
        self.store(&ids)
    }

    /// Add `id` at the front unless it is already indexed.
    ///
    /// Returns whether the index changed.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Storage`] if the index cannot be written.
    pub async fn record_if_absent(&self, id: OrderId) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut ids = self.ids();
        if ids.contains(&id) {
            return Ok(false);
        }
        push_front(&mut ids, id);
        self.store(&ids)?;
        Ok(true)
    }

    /// Forget every indexed id.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Storage`] if the index cannot be written.
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.storage.remove(ORDER_INDEX_KEY)
    }

    fn store(&self, ids: &[OrderId]) -> Result<()> {
        let raw = serde_json::to_string(ids).map_err(|e| GatewayError::Storage(e.to_string()))?;
        self.storage.set(ORDER_INDEX_KEY, &raw)
    }
}

impl std::fmt::Debug for OrderIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderIndex").field("ids", &self.ids()).finish()
    }
}

fn push_front(ids: &mut Vec<OrderId>, id: OrderId) {
    ids.retain(|existing| *existing != id);
    ids.insert(0, id);
    ids.truncate(ORDER_INDEX_CAP);
}

// =============================================================================
// OrderSubmitter
// =============================================================================

/// Places and tracks orders.
#[derive(Debug, Clone)]
pub struct OrderSubmitter {
    dispatcher: Dispatcher,
    index: OrderIndex,
}

impl OrderSubmitter {
    #[must_use]
    pub const fn new(dispatcher: Dispatcher, index: OrderIndex) -> Self {
        Self { dispatcher, index }
    }

    /// The local order index.
    #[must_use]
    pub const fn index(&self) -> &OrderIndex {
        &self.index
    }

    /// Place an order.
    ///
    /// The order is first submitted with `accountId` (`null` when unknown).
    /// If that attempt fails for any reason it is submitted once more without
    /// `accountId`, leaving the server to infer the account from the bearer
    /// token. The second attempt's outcome is final.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::EmptyCart`] if `lines` is empty (nothing is sent).
    /// - The second attempt's failure.
    #[instrument(skip(self, lines), fields(lines = lines.len()))]
    pub async fn create(&self, account_id: Option<AccountId>, lines: &[CartLine]) -> Result<Order> {
        if lines.is_empty() {
            return Err(GatewayError::EmptyCart);
        }

        let with_account = serde_json::json!({ "accountId": account_id, "items": lines });
        let order = match self.submit(with_account).await {
            Ok(order) => order,
            Err(e) => {
                warn!(error = %e, "Order rejected with account id, retrying without it");
                self.submit(serde_json::json!({ "items": lines })).await?
            }
        };

        debug!(order_id = %order.id, "Order placed");
        self.remember(order.id).await;
        Ok(order)
    }

    /// Fetch an order and add it to the index if it is new.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's failure.
    #[instrument(skip(self))]
    pub async fn get(&self, id: OrderId) -> Result<Order> {
        let order = self.fetch(id).await?;
        if let Err(e) = self.index.record_if_absent(order.id).await {
            warn!(order_id = %order.id, error = %e, "Failed to index viewed order");
        }
        Ok(order)
    }

    /// Fetch every indexed order, newest first. Orders that cannot be
    /// fetched are skipped.
    #[instrument(skip(self))]
    pub async fn list_mine(&self) -> Vec<Order> {
        let ids = self.index.ids();
        let results = join_all(ids.iter().map(|id| self.fetch(*id))).await;

        results
            .into_iter()
            .zip(ids)
            .filter_map(|(result, id)| match result {
                Ok(order) => Some(order),
                Err(e) => {
                    debug!(order_id = %id, error = %e, "Skipping unavailable order");
                    None
                }
            })
            .collect()
    }

    /// Cancel an order. Returns the updated order when the server sends one.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's failure.
    #[instrument(skip(self))]
    pub async fn cancel(&self, id: OrderId) -> Result<Option<Order>> {
        self.transition(id, "cancel").await
    }

    /// Confirm an order. Returns the updated order when the server sends one.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's failure.
    #[instrument(skip(self))]
    pub async fn confirm(&self, id: OrderId) -> Result<Option<Order>> {
        self.transition(id, "confirm").await
    }

    async fn submit(&self, body: serde_json::Value) -> Result<Order> {
        self.dispatcher
            .call::<Order>(Service::Orders, "", RequestOptions::post(body))
            .await?
            .into_json()
    }

    async fn fetch(&self, id: OrderId) -> Result<Order> {
        self.dispatcher
            .call::<Order>(Service::Orders, &id.to_string(), RequestOptions::get())
            .await?
            .into_json()
    }

    async fn transition(&self, id: OrderId, action: &str) -> Result<Option<Order>> {
        Ok(self
            .dispatcher
            .call::<Order>(
                Service::Orders,
                &format!("{id}/{action}"),
                RequestOptions::post_empty(),
            )
            .await?
            .into_option())
    }

    async fn remember(&self, id: OrderId) {
        if let Err(e) = self.index.record(id).await {
            warn!(order_id = %id, error = %e, "Failed to index placed order");
        }
    }
}
