//! Gateway error type.
//!
//! Every failure a caller can observe is a value of [`GatewayError`]. HTTP
//! and transport failures are flattened into a single human-readable
//! message; callers decide how to present it.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors returned by gateway operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GatewayError {
    /// A request failed (non-2xx status or transport failure).
    ///
    /// Displays as exactly the normalized message.
    #[error("{0}")]
    Request(String),

    /// A successful response body could not be read as the expected shape.
    #[error("invalid response body: {0}")]
    Decode(String),

    /// A request body could not be serialized.
    #[error("invalid request body: {0}")]
    Encode(String),

    /// Login succeeded at the HTTP level but carried no session token.
    #[error("no token returned")]
    NoToken,

    /// An order was submitted without any lines.
    #[error("cannot place an order with an empty cart")]
    EmptyCart,

    /// Persisted client state could not be read or written.
    #[error("storage error: {0}")]
    Storage(String),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl GatewayError {
    /// The human-readable message for this failure.
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        Self::Request(err.to_string())
    }
}

/// Result type alias for `GatewayError`.
pub type Result<T> = std::result::Result<T, GatewayError>;
