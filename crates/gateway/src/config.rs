//! Gateway configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `TRADEPOST_ORIGIN_MODE` - `direct` (default) or `proxy`
//! - `TRADEPOST_PROXY_URL` - Single origin for every service (required in `proxy` mode)
//! - `TRADEPOST_AUTH_BASE_URL` - Auth service origin (default: `http://localhost:9000`)
//! - `TRADEPOST_ACCOUNT_BASE_URL` - Account service origin (default: `http://localhost:9001`)
//! - `TRADEPOST_ITEM_BASE_URL` - Item service origin (default: `http://localhost:9002`)
//! - `TRADEPOST_ORDER_BASE_URL` - Order service origin (default: `http://localhost:9003`)
//! - `TRADEPOST_PAYMENT_BASE_URL` - Payment service origin (default: `http://localhost:9004`)
//! - `TRADEPOST_STATE_DIR` - Directory holding persisted session state (default: `.tradepost`)
//!
//! Origins are plain values: [`ServiceOrigins`] can be built directly and
//! handed to the gateway without touching the environment.

use std::path::PathBuf;

use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// The backend services the gateway talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    Auth,
    Accounts,
    Items,
    Orders,
    Payments,
}

impl Service {
    /// Every service, in port order.
    pub const ALL: [Self; 5] = [
        Self::Auth,
        Self::Accounts,
        Self::Items,
        Self::Orders,
        Self::Payments,
    ];

    /// Fixed path prefix the service is mounted under.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Auth => "/auth",
            Self::Accounts => "/accounts",
            Self::Items => "/items",
            Self::Orders => "/orders",
            Self::Payments => "/payments",
        }
    }

    /// Short name used in logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Accounts => "accounts",
            Self::Items => "items",
            Self::Orders => "orders",
            Self::Payments => "payments",
        }
    }

    const fn env_key(self) -> &'static str {
        match self {
            Self::Auth => "TRADEPOST_AUTH_BASE_URL",
            Self::Accounts => "TRADEPOST_ACCOUNT_BASE_URL",
            Self::Items => "TRADEPOST_ITEM_BASE_URL",
            Self::Orders => "TRADEPOST_ORDER_BASE_URL",
            Self::Payments => "TRADEPOST_PAYMENT_BASE_URL",
        }
    }

    const fn default_origin(self) -> &'static str {
        match self {
            Self::Auth => "http://localhost:9000",
            Self::Accounts => "http://localhost:9001",
            Self::Items => "http://localhost:9002",
            Self::Orders => "http://localhost:9003",
            Self::Payments => "http://localhost:9004",
        }
    }
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Base origin for each backend service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceOrigins {
    auth: Url,
    accounts: Url,
    items: Url,
    orders: Url,
    payments: Url,
}

impl ServiceOrigins {
    /// Give each service its own absolute origin.
    #[must_use]
    pub const fn direct(auth: Url, accounts: Url, items: Url, orders: Url, payments: Url) -> Self {
        Self {
            auth,
            accounts,
            items,
            orders,
            payments,
        }
    }

    /// Route every service through a single origin (reverse-proxy mode).
    #[must_use]
    pub fn proxied(origin: &Url) -> Self {
        Self {
            auth: origin.clone(),
            accounts: origin.clone(),
            items: origin.clone(),
            orders: origin.clone(),
            payments: origin.clone(),
        }
    }

    /// Override the origin of one service.
    #[must_use]
    pub fn with_origin(mut self, service: Service, origin: Url) -> Self {
        *self.slot_mut(service) = origin;
        self
    }

    /// Origin for a service.
    #[must_use]
    pub const fn origin(&self, service: Service) -> &Url {
        match service {
            Service::Auth => &self.auth,
            Service::Accounts => &self.accounts,
            Service::Items => &self.items,
            Service::Orders => &self.orders,
            Service::Payments => &self.payments,
        }
    }

    const fn slot_mut(&mut self, service: Service) -> &mut Url {
        match service {
            Service::Auth => &mut self.auth,
            Service::Accounts => &mut self.accounts,
            Service::Items => &mut self.items,
            Service::Orders => &mut self.orders,
            Service::Payments => &mut self.payments,
        }
    }
}

impl Default for ServiceOrigins {
    /// Each service on its own local port, 9000 through 9004.
    fn default() -> Self {
        let local =
            |service: Service| Url::parse(service.default_origin()).expect("valid default URL");
        Self {
            auth: local(Service::Auth),
            accounts: local(Service::Accounts),
            items: local(Service::Items),
            orders: local(Service::Orders),
            payments: local(Service::Payments),
        }
    }
}

/// How service origins are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OriginMode {
    /// Each service has its own absolute origin.
    #[default]
    Direct,
    /// All services sit behind one reverse proxy.
    Proxy,
}

impl std::str::FromStr for OriginMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(Self::Direct),
            "proxy" => Ok(Self::Proxy),
            other => Err(format!("expected 'direct' or 'proxy', got '{other}'")),
        }
    }
}

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Where each backend service lives
    pub origins: ServiceOrigins,
    /// Directory for the persisted session file
    pub state_dir: PathBuf,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            origins: ServiceOrigins::default(),
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
        }
    }
}

const DEFAULT_STATE_DIR: &str = ".tradepost";

impl GatewayConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable holds an invalid URL or mode, or
    /// if proxy mode is selected without `TRADEPOST_PROXY_URL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(get_optional_env)
    }

    /// Build configuration from an arbitrary variable source.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mode = match lookup("TRADEPOST_ORIGIN_MODE") {
            Some(raw) => raw.parse::<OriginMode>().map_err(|e| {
                ConfigError::InvalidEnvVar("TRADEPOST_ORIGIN_MODE".to_string(), e)
            })?,
            None => OriginMode::default(),
        };

        let origins = match mode {
            OriginMode::Proxy => {
                let raw = lookup("TRADEPOST_PROXY_URL")
                    .ok_or_else(|| ConfigError::MissingEnvVar("TRADEPOST_PROXY_URL".to_string()))?;
                ServiceOrigins::proxied(&parse_url("TRADEPOST_PROXY_URL", &raw)?)
            }
            OriginMode::Direct => {
                let mut origins = ServiceOrigins::default();
                for service in Service::ALL {
                    if let Some(raw) = lookup(service.env_key()) {
                        origins = origins.with_origin(service, parse_url(service.env_key(), &raw)?);
                    }
                }
                origins
            }
        };

        let state_dir = PathBuf::from(
            lookup("TRADEPOST_STATE_DIR").unwrap_or_else(|| DEFAULT_STATE_DIR.to_string()),
        );

        Ok(Self { origins, state_dir })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse an absolute http(s) URL from a variable.
fn parse_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url)
}
