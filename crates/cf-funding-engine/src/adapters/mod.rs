//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implements the outbound port traits: ledger transports, the exchange-rate
//! source and session stores.

mod coinbase_rate;
mod in_memory_ledger;
mod json_rpc_ledger;
mod session_store;

pub use coinbase_rate::{parse_rate, CoinbaseRateSource};
pub use in_memory_ledger::InMemoryLedger;
pub use json_rpc_ledger::{JsonRpcLedger, UNKNOWN_CONTRACT_CODE};
pub use session_store::{FileSessionStore, MemorySessionStore};
