//! # Domain Value Objects
//!
//! Immutable value types: addresses, amounts, rates, receipts.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Fixed-point amount in the ledger's smallest native unit.
pub use primitive_types::U256 as Amount;

/// Ledger-assigned project identifier.
pub type ProjectId = u64;

/// 0-based milestone position within its project.
pub type MilestoneIndex = u32;

/// Transaction hash (32 bytes).
pub type TxHash = [u8; 32];

/// Opaque 20-byte ledger address.
///
/// Parsed from hex; letter case is irrelevant, so `0xAbC…` and `0xabc…`
/// are the same address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

/// Address parse failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid address: {0}")]
pub struct AddressParseError(pub String);

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if digits.len() != 40 {
            return Err(AddressParseError(s.to_string()));
        }
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes).map_err(|_| AddressParseError(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Base → quote pair, e.g. ETH → EUR.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyPair {
    /// Ledger unit symbol.
    pub base: String,
    /// Display currency symbol.
    pub quote: String,
}

impl CurrencyPair {
    /// Build a pair; symbols are upper-cased.
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        Self {
            base: base.into().to_uppercase(),
            quote: quote.into().to_uppercase(),
        }
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

/// A fetched conversion rate. Advisory only: never gates a write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRate {
    /// Currency pair.
    pub pair: CurrencyPair,
    /// Units of quote per one unit of base. Always positive.
    pub rate: Decimal,
    /// When the rate was obtained.
    pub fetched_at: DateTime<Utc>,
}

impl ExchangeRate {
    /// Build a rate, refusing zero and negative values.
    pub fn new(pair: CurrencyPair, rate: Decimal, fetched_at: DateTime<Utc>) -> Option<Self> {
        if rate <= Decimal::ZERO {
            return None;
        }
        Some(Self {
            pair,
            rate,
            fetched_at,
        })
    }
}

/// Project lifecycle state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    /// Accepting donations.
    #[default]
    Active,
    /// Terminal. No donations, no reactivation.
    Deactivated,
}

impl LifecycleState {
    /// Only `Active -> Deactivated` exists.
    pub fn can_transition_to(&self, next: LifecycleState) -> bool {
        matches!((self, next), (Self::Active, Self::Deactivated))
    }

    /// Check if terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Deactivated)
    }
}

impl From<bool> for LifecycleState {
    fn from(is_active: bool) -> Self {
        if is_active {
            Self::Active
        } else {
            Self::Deactivated
        }
    }
}

/// Confirmation of a write, decoded from the ledger's receipt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    /// Transaction hash.
    pub tx_hash: TxHash,
    /// Block the transaction was included in.
    pub block_number: u64,
    /// Project created by this transaction, if any.
    pub project_id: Option<ProjectId>,
}
