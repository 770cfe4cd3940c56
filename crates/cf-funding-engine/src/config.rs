//! # Engine Configuration
//!
//! `EngineConfig` carries tunables; `SessionConfig` carries the two
//! persisted addresses and is handed explicitly to the gateway.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::domain::{Address, AddressParseError, CurrencyPair};

/// Default Coinbase-style exchange-rate endpoint.
pub const DEFAULT_RATE_SOURCE_URL: &str = "https://api.coinbase.com/v2/exchange-rates";

/// Decimals of the native unit (wei per ether).
pub const DEFAULT_NATIVE_DECIMALS: u32 = 18;

/// Engine configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Bound on waiting for a write confirmation.
    pub confirmation_timeout_secs: u64,

    /// Extra attempts for a read failing with `Unreachable`.
    pub read_retries: u32,

    /// Decimals of the ledger's native unit.
    pub native_decimals: u32,

    /// Ledger unit symbol.
    pub base_currency: String,

    /// Display currency symbol.
    pub quote_currency: String,

    /// HTTP exchange-rate endpoint.
    pub rate_source_url: String,

    /// HTTP timeout for rate fetches.
    pub rate_request_timeout_secs: u64,

    /// JSON-RPC ledger bridge endpoint.
    pub ledger_rpc_url: String,

    /// Where the session is persisted.
    pub session_path: String,

    /// Default tracing filter.
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            confirmation_timeout_secs: 120,
            read_retries: 2,
            native_decimals: DEFAULT_NATIVE_DECIMALS,
            base_currency: "ETH".to_string(),
            quote_currency: "EUR".to_string(),
            rate_source_url: DEFAULT_RATE_SOURCE_URL.to_string(),
            rate_request_timeout_secs: 10,
            ledger_rpc_url: "http://127.0.0.1:8545".to_string(),
            session_path: "cf-session.json".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Create a config for testing (short timeouts, no retries).
    pub fn for_testing() -> Self {
        Self {
            confirmation_timeout_secs: 1,
            read_retries: 0,
            rate_request_timeout_secs: 1,
            ..Self::default()
        }
    }

    /// Confirmation wait bound.
    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    /// Rate fetch timeout.
    pub fn rate_request_timeout(&self) -> Duration {
        Duration::from_secs(self.rate_request_timeout_secs)
    }

    /// Display pair.
    pub fn currency_pair(&self) -> CurrencyPair {
        CurrencyPair::new(&self.base_currency, &self.quote_currency)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.confirmation_timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout(
                "confirmation_timeout_secs cannot be 0".into(),
            ));
        }
        if self.rate_request_timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout(
                "rate_request_timeout_secs cannot be 0".into(),
            ));
        }
        // 10^29 does not fit a Decimal
        if self.native_decimals > 28 {
            return Err(ConfigError::InvalidDecimals(self.native_decimals));
        }
        if self.base_currency.trim().is_empty() || self.quote_currency.trim().is_empty() {
            return Err(ConfigError::InvalidCurrency);
        }
        Ok(())
    }

    /// Apply `CF_*` environment overrides on top of `self`.
    pub fn from_env(mut self) -> Self {
        if let Ok(url) = std::env::var("CF_LEDGER_RPC_URL") {
            self.ledger_rpc_url = url;
        }
        if let Ok(url) = std::env::var("CF_RATE_SOURCE_URL") {
            self.rate_source_url = url;
        }
        if let Ok(path) = std::env::var("CF_SESSION_PATH") {
            self.session_path = path;
        }
        if let Ok(level) = std::env::var("CF_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Ok(secs) = std::env::var("CF_CONFIRMATION_TIMEOUT_SECS") {
            match secs.parse() {
                Ok(s) => self.confirmation_timeout_secs = s,
                Err(_) => warn!("CF_CONFIRMATION_TIMEOUT_SECS is not a number: {}", secs),
            }
        }
        self
    }
}

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Zero or otherwise unusable timeout.
    #[error("Invalid timeout: {0}")]
    InvalidTimeout(String),

    /// Native decimals out of range.
    #[error("Invalid native decimals: {0} (max 28)")]
    InvalidDecimals(u32),

    /// Blank currency symbol.
    #[error("Currency symbols must not be empty")]
    InvalidCurrency,
}

/// The two persisted session strings: deployed contract and active signer.
///
/// Trusted as-is until a read fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// Deployed platform contract.
    pub contract_address: String,
    /// Account that signs writes by default.
    pub signer_address: String,
}

impl SessionConfig {
    /// Create a session.
    pub fn new(contract_address: impl Into<String>, signer_address: impl Into<String>) -> Self {
        Self {
            contract_address: contract_address.into(),
            signer_address: signer_address.into(),
        }
    }

    /// Signer as a typed address.
    pub fn signer(&self) -> Result<Address, AddressParseError> {
        self.signer_address.parse()
    }
}
