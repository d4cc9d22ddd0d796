//! Tradepost session and request gateway.
//!
//! Client-side plumbing between an application and the Tradepost backend
//! services (auth, accounts, items, orders, payments):
//!
//! - [`TokenStore`] keeps the session token in durable [`Storage`].
//! - [`Claims`] reads identity hints out of the token without verifying it.
//! - [`Dispatcher`] performs every HTTP call with uniform headers and error
//!   normalization.
//! - [`SessionController`] owns and publishes the `{token, user}` state.
//! - [`OrderSubmitter`] places orders with a single fallback retry and keeps
//!   the local order index.
//! - [`Gateway`] wires them together and exposes typed service handles.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod claims;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod orders;
pub mod session;
pub mod storage;
pub mod token;

pub use api::{AccountsApi, AuthApi, Gateway, ItemsApi, PaymentsApi, SearchQuery};
pub use claims::{Claims, Roles};
pub use config::{ConfigError, GatewayConfig, OriginMode, Service, ServiceOrigins};
pub use dispatch::{Dispatcher, LoginOutcome, Reply, RequestOptions, join};
pub use error::{GatewayError, Result};
pub use orders::{ORDER_INDEX_CAP, OrderIndex, OrderSubmitter};
pub use session::{SessionController, SessionSnapshot, User};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use token::{StoredSession, TokenStore};
