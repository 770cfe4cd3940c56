//! # Application Layer
//!
//! Read-side derivation (catalog, donation view), the exchange-rate cache,
//! first-run provisioning and the service implementing `FundingApi`.

pub mod catalog;
pub mod donations;
pub mod provisioning;
pub mod rates;
pub mod service;

pub use catalog::ProjectCatalog;
pub use donations::DonationLedgerView;
pub use provisioning::{ProvisionError, Provisioner};
pub use rates::{native_to_decimal, ExchangeRateCache};
pub use service::FundingService;
