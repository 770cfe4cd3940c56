//! # Ledger Gateway
//!
//! Typed read/write façade over a [`LedgerTransport`].
//!
//! - Reads are side-effect free, bounded, and retried with backoff on
//!   `Unreachable`.
//! - Writes are submitted exactly once. Once submitted, only a reverted
//!   receipt is a definite failure; anything else short of a confirmed
//!   receipt yields `Timeout` with the transaction hash so the caller can
//!   re-read before deciding anything. Dropping the returned
//!   future cancels only the wait, never the submitted write.

pub mod decode;

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, SessionConfig};
use crate::domain::{
    validate_milestone_shape, Address, Amount, FundingError, MilestoneIndex, MilestoneRecord,
    ProjectId, ProjectRecord, Receipt, TxHash,
};
use crate::ports::{LedgerTransport, TransactionRequest};

/// Contract method names.
pub mod methods {
    /// Create a project with its milestones.
    pub const CREATE_PROJECT: &str = "createProject";
    /// Donate to a milestone.
    pub const DONATE: &str = "donate";
    /// Owner-only deactivation.
    pub const DEACTIVATE_PROJECT: &str = "deactivateProject";
    /// Point read of a project.
    pub const GET_PROJECT: &str = "getProject";
    /// Point read of a milestone.
    pub const GET_MILESTONE: &str = "getMilestone";
    /// Donor total on one milestone.
    pub const GET_MILESTONE_DONATIONS: &str = "getMilestoneDonations";
    /// Donor total on one project.
    pub const GET_PROJECT_DONATIONS: &str = "getProjectDonations";
    /// Column-shaped bulk read.
    pub const GET_PROJECTS: &str = "getProjects";
}

/// Pause before read retry `n`, scaled by `n`.
const READ_RETRY_BACKOFF: Duration = Duration::from_millis(100);

fn short(hash: &TxHash) -> String {
    format!("0x{}…", hex::encode(&hash[..4]))
}

/// A submitted write whose outcome was not observed.
fn unconfirmed(
    method: &str,
    tx_hash: TxHash,
    started: Instant,
    cause: &dyn std::fmt::Display,
) -> FundingError {
    let waited_ms = started.elapsed().as_millis() as u64;
    warn!(
        "[cf-gateway] {} tx {} unconfirmed after {}ms: {}",
        method,
        short(&tx_hash),
        waited_ms,
        cause
    );
    FundingError::Timeout { tx_hash, waited_ms }
}

/// Typed ledger façade bound to one session.
pub struct LedgerGateway<T: LedgerTransport> {
    transport: Arc<T>,
    session: SessionConfig,
    confirmation_timeout: Duration,
    read_retries: u32,
}

impl<T: LedgerTransport> LedgerGateway<T> {
    /// Bind a transport to a session.
    pub fn new(transport: Arc<T>, session: SessionConfig, config: &EngineConfig) -> Self {
        Self {
            transport,
            session,
            confirmation_timeout: config.confirmation_timeout(),
            read_retries: config.read_retries,
        }
    }

    /// Override the confirmation bound.
    pub fn with_confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.confirmation_timeout = timeout;
        self
    }

    /// The session this gateway talks to.
    pub fn session(&self) -> &SessionConfig {
        &self.session
    }

    /// Underlying transport.
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    async fn read(&self, method: &str, args: Vec<Value>) -> Result<Value, FundingError> {
        let mut attempt = 0;
        loop {
            debug!("[cf-gateway] {} {:?} (attempt {})", method, args, attempt + 1);
            let call = self
                .transport
                .call(&self.session.contract_address, method, args.clone());
            let result = match tokio::time::timeout(self.confirmation_timeout, call).await {
                Ok(result) => result,
                Err(_) => Err(FundingError::Unreachable(format!(
                    "{} gave no answer within {}ms",
                    self.transport.endpoint(),
                    self.confirmation_timeout.as_millis()
                ))),
            };
            match result {
                Err(e) if e.is_retryable() && attempt < self.read_retries => {
                    attempt += 1;
                    warn!(
                        "[cf-gateway] {} via {} failed, retrying ({}/{}): {}",
                        method,
                        self.transport.endpoint(),
                        attempt,
                        self.read_retries,
                        e
                    );
                    tokio::time::sleep(READ_RETRY_BACKOFF * attempt).await;
                }
                other => return other,
            }
        }
    }

    async fn write(
        &self,
        from: Address,
        method: &str,
        args: Vec<Value>,
        value: Amount,
    ) -> Result<Receipt, FundingError> {
        let request = TransactionRequest {
            contract: self.session.contract_address.clone(),
            from,
            method: method.to_string(),
            args,
            value,
        };
        let tx_hash = self.transport.submit(request).await.map_err(|e| {
            warn!("[cf-gateway] {} from {} not submitted: {}", method, from, e);
            e
        })?;
        info!("[cf-gateway] Submitted {} tx {}", method, short(&tx_hash));

        let started = Instant::now();
        let waited = tokio::time::timeout(
            self.confirmation_timeout,
            self.transport.wait_for_receipt(tx_hash),
        )
        .await;
        let raw = match waited {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => return Err(unconfirmed(method, tx_hash, started, &e)),
            Err(_) => return Err(unconfirmed(method, tx_hash, started, &"bound elapsed")),
        };

        match decode::receipt(&raw, &tx_hash) {
            Ok(receipt) => {
                info!(
                    "[cf-gateway] {} tx {} confirmed in block {}",
                    method,
                    short(&tx_hash),
                    receipt.block_number
                );
                Ok(receipt)
            }
            Err(FundingError::Rejected(reason)) => {
                warn!("[cf-gateway] {} tx {} reverted: {}", method, short(&tx_hash), reason);
                Err(FundingError::Rejected(reason))
            }
            Err(e) => Err(unconfirmed(method, tx_hash, started, &e)),
        }
    }

    /// Create a project. Returns the ledger-assigned id and the receipt.
    pub async fn create_project(
        &self,
        owner: Address,
        name: &str,
        goal: Amount,
        milestone_descriptions: &[String],
        milestone_targets: &[Amount],
    ) -> Result<(ProjectId, Receipt), FundingError> {
        validate_milestone_shape(milestone_descriptions, milestone_targets)?;
        let targets: Vec<Value> = milestone_targets
            .iter()
            .map(|t| decode::encode_amount(*t))
            .collect();
        let receipt = self
            .write(
                owner,
                methods::CREATE_PROJECT,
                vec![
                    json!(name),
                    decode::encode_amount(goal),
                    json!(milestone_descriptions),
                    Value::Array(targets),
                ],
                Amount::zero(),
            )
            .await?;
        let id = receipt
            .project_id
            .ok_or_else(|| FundingError::corrupt("createProject receipt carries no project id"))?;
        Ok((id, receipt))
    }

    /// Donate `value` to a milestone.
    pub async fn donate(
        &self,
        project_id: ProjectId,
        milestone_index: MilestoneIndex,
        donor: Address,
        value: Amount,
    ) -> Result<Receipt, FundingError> {
        self.write(
            donor,
            methods::DONATE,
            vec![json!(project_id), json!(milestone_index)],
            value,
        )
        .await
    }

    /// Deactivate a project.
    pub async fn deactivate(
        &self,
        project_id: ProjectId,
        caller: Address,
    ) -> Result<Receipt, FundingError> {
        self.write(
            caller,
            methods::DEACTIVATE_PROJECT,
            vec![json!(project_id)],
            Amount::zero(),
        )
        .await
    }

    /// Point read of a project.
    pub async fn get_project(&self, id: ProjectId) -> Result<ProjectRecord, FundingError> {
        let raw = self.read(methods::GET_PROJECT, vec![json!(id)]).await?;
        let record = decode::project(&raw)?.ok_or(FundingError::NotFound(id))?;
        if record.id != id {
            return Err(FundingError::corrupt(format!(
                "asked for project {}, got {}",
                id, record.id
            )));
        }
        Ok(record)
    }

    /// Point read of a milestone.
    pub async fn get_milestone(
        &self,
        id: ProjectId,
        index: MilestoneIndex,
    ) -> Result<MilestoneRecord, FundingError> {
        let raw = self
            .read(methods::GET_MILESTONE, vec![json!(id), json!(index)])
            .await?;
        decode::milestone(&raw, id, index)
    }

    /// Donor's total on one milestone.
    pub async fn get_milestone_contribution(
        &self,
        donor: Address,
        id: ProjectId,
        index: MilestoneIndex,
    ) -> Result<Amount, FundingError> {
        let raw = self
            .read(
                methods::GET_MILESTONE_DONATIONS,
                vec![json!(id), json!(index), decode::encode_address(&donor)],
            )
            .await?;
        decode::amount(&raw, "milestoneDonations")
    }

    /// Donor's total on one project.
    pub async fn get_project_contribution(
        &self,
        donor: Address,
        id: ProjectId,
    ) -> Result<Amount, FundingError> {
        let raw = self
            .read(
                methods::GET_PROJECT_DONATIONS,
                vec![json!(id), decode::encode_address(&donor)],
            )
            .await?;
        decode::amount(&raw, "projectDonations")
    }

    /// Bulk read of every project. Rows that fail to decode are returned as
    /// errors in place.
    pub async fn get_all_projects(
        &self,
    ) -> Result<Vec<Result<ProjectRecord, FundingError>>, FundingError> {
        let raw = self.read(methods::GET_PROJECTS, vec![]).await?;
        decode::project_columns(&raw)
    }
}
