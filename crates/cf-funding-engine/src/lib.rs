//! # Funding Reconciliation Engine
//!
//! Milestone-based charity crowdfunding over an external ledger.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! A charity opens a project with a goal split into milestones; donors fund
//! specific milestones; the owner may deactivate the project. Every fact
//! lives on the ledger. This crate:
//! - derives a consistent view of projects, milestones and donations from
//!   ledger reads,
//! - checks funding rules locally before any write is submitted,
//! - attributes donations per donor and milestone,
//! - converts native amounts to a display currency with a live rate.
//!
//! ## Failure Semantics
//!
//! | Error | Meaning | Caller action |
//! |-------|---------|---------------|
//! | `Unreachable` | transport failed | retry reads; writes at your own risk |
//! | `Rejected` | ledger refused the write | change the request |
//! | `Timeout` | outcome unknown | re-read before retrying |
//! | `InvalidInput` | local check failed | fix input (headroom reported) |
//! | `Corrupt` | inconsistent read | record excluded, surfaced |
//! | `StaleConfiguration` | session no longer resolves | re-provision |
//!
//! ## Module Structure
//!
//! ```text
//! cf-funding-engine/
//! ├── domain/          # Project, Milestone, errors, invariants, lifecycle
//! ├── ports/           # FundingApi in; LedgerTransport, RateSource, SessionStore out
//! ├── gateway/         # Typed LedgerGateway + record decoding
//! ├── application/     # Catalog, donation view, rate cache, provisioning, service
//! ├── adapters/        # In-memory ledger, JSON-RPC ledger, Coinbase rates, session stores
//! └── config.rs        # EngineConfig, SessionConfig
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod gateway;
pub mod ports;

// Re-exports
pub use adapters::{
    CoinbaseRateSource, FileSessionStore, InMemoryLedger, JsonRpcLedger, MemorySessionStore,
};
pub use application::{
    DonationLedgerView, ExchangeRateCache, FundingService, ProjectCatalog, ProvisionError,
    Provisioner,
};
pub use config::{ConfigError, EngineConfig, SessionConfig};
pub use domain::{
    invariant_completion_consistent, invariant_raised_is_sum, validate_donation,
    validate_project_creation, validate_project_proposal, Address, Amount, CatalogSnapshot,
    ContributionSummary, CurrencyPair, DonorPosition, ExchangeRate, FundingError,
    LifecycleError, LifecycleState, Milestone, MilestoneDraft, MilestoneIndex, Project,
    ProjectId, ProjectLifecycle, Receipt, TxHash, ValidationError,
};
pub use gateway::LedgerGateway;
pub use ports::{
    FundingApi, LedgerTransport, MockRateSource, RateError, RateSource, SessionError,
    SessionStore, TransactionRequest,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
