//! First-run provisioning.
//!
//! A missing session means either deploying a fresh platform contract or
//! connecting to an existing one. A persisted session is trusted as-is.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::config::SessionConfig;
use crate::domain::{Address, AddressParseError, FundingError};
use crate::ports::{LedgerTransport, SessionError, SessionStore};

/// Provisioning failures.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Deploying the contract failed.
    #[error(transparent)]
    Ledger(#[from] FundingError),

    /// Reading or writing the session failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A given contract address is not an address.
    #[error(transparent)]
    Address(#[from] AddressParseError),
}

/// Obtains a `SessionConfig`, deploying or connecting on first run.
pub struct Provisioner<T: LedgerTransport, S: SessionStore> {
    transport: Arc<T>,
    store: Arc<S>,
}

impl<T: LedgerTransport, S: SessionStore> Provisioner<T, S> {
    /// Provisioner deploying through `transport` and persisting into `store`.
    pub fn new(transport: Arc<T>, store: Arc<S>) -> Self {
        Self { transport, store }
    }

    /// Load the persisted session, or deploy a contract as `signer` and
    /// persist the new session.
    pub async fn ensure_session(&self, signer: Address) -> Result<SessionConfig, ProvisionError> {
        if let Some(session) = self.store.load()? {
            return Ok(session);
        }
        let contract = self.transport.deploy(signer).await?;
        let session = SessionConfig::new(contract, signer.to_string());
        self.store.save(&session)?;
        info!(
            "[cf-provision] Deployed platform contract {} via {}",
            session.contract_address,
            self.transport.endpoint()
        );
        Ok(session)
    }

    /// Persist a session for an existing contract without deploying.
    pub fn connect(
        &self,
        contract: &str,
        signer: Address,
    ) -> Result<SessionConfig, ProvisionError> {
        let contract: Address = contract.parse()?;
        let session = SessionConfig::new(contract.to_string(), signer.to_string());
        self.store.save(&session)?;
        info!("[cf-provision] Connected to contract {}", session.contract_address);
        Ok(session)
    }

    /// Forget the persisted session.
    pub fn reset(&self) -> Result<(), ProvisionError> {
        self.store.clear()?;
        Ok(())
    }
}
