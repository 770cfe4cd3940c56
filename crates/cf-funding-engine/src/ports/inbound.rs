//! # Inbound Ports
//!
//! API trait defining what the funding engine offers its callers (CLI, UI).

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::outbound::RateError;
use crate::domain::{
    Address, Amount, CatalogSnapshot, ContributionSummary, DonorPosition, ExchangeRate,
    FundingError, MilestoneDraft, MilestoneIndex, Project, ProjectId, Receipt,
};

/// Funding API - inbound port.
///
/// Reads always go to the ledger. Writes are checked locally, submitted
/// once, and awaited up to the configured bound; callers re-read after a
/// successful write.
#[async_trait]
pub trait FundingApi: Send + Sync {
    /// Every project, corrupt records reported separately.
    async fn list_projects(&self) -> Result<CatalogSnapshot, FundingError>;

    /// One project with its milestones.
    async fn get_project(&self, id: ProjectId) -> Result<Project, FundingError>;

    /// Projects owned by a charity.
    async fn projects_owned_by(&self, owner: Address) -> Result<Vec<Project>, FundingError>;

    /// A donor's per-milestone and total contributions to a project.
    async fn contributions(
        &self,
        donor: Address,
        id: ProjectId,
    ) -> Result<ContributionSummary, FundingError>;

    /// Projects the donor has given to.
    async fn donated_projects(&self, donor: Address) -> Result<Vec<DonorPosition>, FundingError>;

    /// Create a project owned by `owner`.
    async fn create_project(
        &self,
        owner: Address,
        name: &str,
        goal: Amount,
        milestones: Vec<MilestoneDraft>,
    ) -> Result<Receipt, FundingError>;

    /// Donate native `amount` to a milestone.
    async fn donate(
        &self,
        id: ProjectId,
        milestone_index: MilestoneIndex,
        donor: Address,
        amount: Amount,
    ) -> Result<Receipt, FundingError>;

    /// Donate an amount expressed in the display currency.
    async fn donate_display(
        &self,
        id: ProjectId,
        milestone_index: MilestoneIndex,
        donor: Address,
        display_amount: Decimal,
    ) -> Result<Receipt, FundingError>;

    /// Deactivate a project (owner only).
    async fn deactivate(&self, id: ProjectId, caller: Address) -> Result<Receipt, FundingError>;

    /// Fetch a fresh exchange rate.
    async fn refresh_rate(&self) -> Result<ExchangeRate, RateError>;

    /// Last known exchange rate.
    fn rate(&self) -> Option<ExchangeRate>;

    /// Convert a native amount for display.
    fn to_display(&self, amount: Amount) -> Option<Decimal>;
}
