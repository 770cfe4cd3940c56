//! # Funding Service
//!
//! Implements [`FundingApi`]. Writes are checked against a fresh read of
//! the target project, then submitted once through the gateway. Callers
//! re-read after a successful write.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::{debug, info};

use super::catalog::ProjectCatalog;
use super::donations::DonationLedgerView;
use super::rates::ExchangeRateCache;
use crate::config::{EngineConfig, SessionConfig};
use crate::domain::{
    validate_donation, validate_project_proposal, Address, Amount, CatalogSnapshot,
    ContributionSummary, DonorPosition, ExchangeRate, FundingError, MilestoneDraft,
    MilestoneIndex, Project, ProjectId, ProjectLifecycle, Receipt,
};
use crate::gateway::LedgerGateway;
use crate::ports::{FundingApi, LedgerTransport, RateError, RateSource};

/// The engine, wired together.
pub struct FundingService<T: LedgerTransport, R: RateSource> {
    gateway: Arc<LedgerGateway<T>>,
    catalog: ProjectCatalog<T>,
    donations: DonationLedgerView<T>,
    rates: ExchangeRateCache<R>,
}

impl<T: LedgerTransport, R: RateSource> FundingService<T, R> {
    /// Build the service for one session.
    pub fn new(
        transport: Arc<T>,
        rate_source: Arc<R>,
        session: SessionConfig,
        config: &EngineConfig,
    ) -> Self {
        let gateway = Arc::new(LedgerGateway::new(transport, session, config));
        let catalog = ProjectCatalog::new(gateway.clone());
        let donations = DonationLedgerView::new(gateway.clone(), catalog.clone());
        let rates = ExchangeRateCache::new(rate_source, config);
        Self {
            gateway,
            catalog,
            donations,
            rates,
        }
    }

    /// Typed ledger access.
    pub fn gateway(&self) -> &LedgerGateway<T> {
        &self.gateway
    }

    /// Project catalog.
    pub fn catalog(&self) -> &ProjectCatalog<T> {
        &self.catalog
    }

    /// Donation view.
    pub fn donations(&self) -> &DonationLedgerView<T> {
        &self.donations
    }

    /// Exchange-rate cache.
    pub fn rates(&self) -> &ExchangeRateCache<R> {
        &self.rates
    }
}

#[async_trait]
impl<T: LedgerTransport, R: RateSource> FundingApi for FundingService<T, R> {
    async fn list_projects(&self) -> Result<CatalogSnapshot, FundingError> {
        self.catalog.snapshot().await
    }

    async fn get_project(&self, id: ProjectId) -> Result<Project, FundingError> {
        self.catalog.get(id).await
    }

    async fn projects_owned_by(&self, owner: Address) -> Result<Vec<Project>, FundingError> {
        self.catalog.owned_by(owner).await
    }

    async fn contributions(
        &self,
        donor: Address,
        id: ProjectId,
    ) -> Result<ContributionSummary, FundingError> {
        let project = self.catalog.get(id).await?;
        self.donations.summary(donor, &project).await
    }

    async fn donated_projects(&self, donor: Address) -> Result<Vec<DonorPosition>, FundingError> {
        self.donations.donated_projects(donor).await
    }

    async fn create_project(
        &self,
        owner: Address,
        name: &str,
        goal: Amount,
        milestones: Vec<MilestoneDraft>,
    ) -> Result<Receipt, FundingError> {
        validate_project_proposal(name, goal, &milestones)?;

        let (descriptions, targets): (Vec<String>, Vec<Amount>) = milestones
            .into_iter()
            .map(|m| (m.description, m.target_amount))
            .unzip();
        let (id, receipt) = self
            .gateway
            .create_project(owner, name.trim(), goal, &descriptions, &targets)
            .await?;
        info!("[cf-service] Project {} '{}' created by {}", id, name.trim(), owner);
        Ok(receipt)
    }

    async fn donate(
        &self,
        id: ProjectId,
        milestone_index: MilestoneIndex,
        donor: Address,
        amount: Amount,
    ) -> Result<Receipt, FundingError> {
        let project = self.catalog.get(id).await?;
        validate_donation(&project, milestone_index, amount)?;
        debug!(
            "[cf-service] Donation of {} to project {} milestone {} passed local checks",
            amount, id, milestone_index
        );
        self.gateway.donate(id, milestone_index, donor, amount).await
    }

    async fn donate_display(
        &self,
        id: ProjectId,
        milestone_index: MilestoneIndex,
        donor: Address,
        display_amount: Decimal,
    ) -> Result<Receipt, FundingError> {
        let amount = self
            .rates
            .from_display(display_amount)
            .ok_or(FundingError::RateUnavailable)?;
        self.donate(id, milestone_index, donor, amount).await
    }

    async fn deactivate(&self, id: ProjectId, caller: Address) -> Result<Receipt, FundingError> {
        let project = self.catalog.get(id).await?;
        ProjectLifecycle::of(&project).check_deactivate(caller)?;
        let receipt = self.gateway.deactivate(id, caller).await?;
        info!("[cf-service] Project {} deactivated by {}", id, caller);
        Ok(receipt)
    }

    async fn refresh_rate(&self) -> Result<ExchangeRate, RateError> {
        self.rates.refresh().await
    }

    fn rate(&self) -> Option<ExchangeRate> {
        self.rates.rate()
    }

    fn to_display(&self, amount: Amount) -> Option<Decimal> {
        self.rates.to_display(amount)
    }
}
