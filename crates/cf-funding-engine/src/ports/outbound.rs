//! # Outbound Ports
//!
//! Traits for external dependencies: the ledger transport, the exchange-rate
//! source and session persistence.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde_json::Value;
use thiserror::Error;

use crate::config::SessionConfig;
use crate::domain::{Address, Amount, CurrencyPair, FundingError, TxHash};

/// A write as handed to the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionRequest {
    /// Target contract.
    pub contract: String,
    /// Signing account.
    pub from: Address,
    /// Contract method.
    pub method: String,
    /// Positional arguments.
    pub args: Vec<Value>,
    /// Native value attached.
    pub value: Amount,
}

/// Raw ledger interface - outbound port.
///
/// Results are dynamically shaped JSON; decoding and validation happen in
/// the gateway. Implementations report `Unreachable`, `Rejected` and
/// `StaleConfiguration` (unknown contract) and must not retry writes.
#[async_trait]
pub trait LedgerTransport: Send + Sync {
    /// Read-only contract call.
    async fn call(&self, contract: &str, method: &str, args: Vec<Value>)
        -> Result<Value, FundingError>;

    /// Submit a write. Returns once the ledger accepted it for inclusion.
    async fn submit(&self, tx: TransactionRequest) -> Result<TxHash, FundingError>;

    /// Wait until the write is confirmed and return the raw receipt.
    ///
    /// Unbounded; the gateway wraps it in a timeout.
    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<Value, FundingError>;

    /// Deploy a fresh platform contract and return its address.
    async fn deploy(&self, from: Address) -> Result<String, FundingError>;

    /// Human-readable endpoint for logs.
    fn endpoint(&self) -> &str;
}

/// Exchange-rate source failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateError {
    /// Network failure.
    #[error("Rate source unreachable: {0}")]
    Unreachable(String),

    /// Response missing the pair or carrying a non-positive value.
    #[error("No rate available for {0}")]
    Unavailable(String),

    /// Response could not be parsed.
    #[error("Malformed rate response: {0}")]
    Malformed(String),
}

/// Exchange-rate source - outbound port.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Fetch the current rate. Must never return a non-positive value.
    async fn fetch_rate(&self, pair: &CurrencyPair) -> Result<Decimal, RateError>;
}

/// Session persistence failures.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Filesystem failure.
    #[error("Session store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored session unreadable.
    #[error("Session store parse error: {0}")]
    Parse(String),
}

/// Session persistence - outbound port.
pub trait SessionStore: Send + Sync {
    /// Load the persisted session, `None` on first run.
    fn load(&self) -> Result<Option<SessionConfig>, SessionError>;

    /// Persist a session, replacing any previous one.
    fn save(&self, session: &SessionConfig) -> Result<(), SessionError>;

    /// Forget the session.
    fn clear(&self) -> Result<(), SessionError>;
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// Mock rate source with switchable failure.
#[derive(Default)]
pub struct MockRateSource {
    rate: Mutex<Option<Decimal>>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl MockRateSource {
    /// Source that answers with `rate`.
    pub fn with_rate(rate: Decimal) -> Self {
        Self {
            rate: Mutex::new(Some(rate)),
            ..Default::default()
        }
    }

    /// Change the answered rate. `None` means "pair missing".
    pub fn set_rate(&self, rate: Option<Decimal>) {
        *self.rate.lock() = rate;
    }

    /// Toggle network failure.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of fetches so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RateSource for MockRateSource {
    async fn fetch_rate(&self, pair: &CurrencyPair) -> Result<Decimal, RateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(RateError::Unreachable("Mock failure".to_string()));
        }
        match *self.rate.lock() {
            Some(rate) if rate > Decimal::ZERO => Ok(rate),
            _ => Err(RateError::Unavailable(pair.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_rate_source_answers() {
        let source = MockRateSource::with_rate(Decimal::from(3000));
        let rate = source.fetch_rate(&CurrencyPair::new("ETH", "EUR")).await.unwrap();
        assert_eq!(rate, Decimal::from(3000));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_rate_source_failure() {
        let source = MockRateSource::with_rate(Decimal::from(3000));
        source.set_failing(true);
        let result = source.fetch_rate(&CurrencyPair::new("ETH", "EUR")).await;
        assert!(matches!(result, Err(RateError::Unreachable(_))));
    }

    #[tokio::test]
    async fn test_mock_rate_source_non_positive_is_unavailable() {
        let source = MockRateSource::with_rate(Decimal::ZERO);
        let result = source.fetch_rate(&CurrencyPair::new("ETH", "EUR")).await;
        assert!(matches!(result, Err(RateError::Unavailable(_))));
    }
}
