//! # Donation Ledger View
//!
//! Per-donor contribution aggregates, derived from ledger reads and never
//! stored. The project-level total is read first and the per-milestone
//! values after it, so the two can disagree until both observe the same
//! ledger height.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::try_join_all;
use tracing::debug;

use super::catalog::ProjectCatalog;
use crate::domain::{
    Address, Amount, ContributionSummary, DonorPosition, FundingError, MilestoneIndex, Project,
    ProjectId,
};
use crate::gateway::LedgerGateway;
use crate::ports::LedgerTransport;

/// Read-side view over donor contributions.
pub struct DonationLedgerView<T: LedgerTransport> {
    gateway: Arc<LedgerGateway<T>>,
    catalog: ProjectCatalog<T>,
}

impl<T: LedgerTransport> DonationLedgerView<T> {
    /// View over `gateway`, listing projects through `catalog`.
    pub fn new(gateway: Arc<LedgerGateway<T>>, catalog: ProjectCatalog<T>) -> Self {
        Self { gateway, catalog }
    }

    /// Per-milestone totals of `donor` on `project`. Zero where nothing was
    /// given; a donor who never gave gets an all-zero map.
    pub async fn contributions_for(
        &self,
        donor: Address,
        project: &Project,
    ) -> Result<BTreeMap<MilestoneIndex, Amount>, FundingError> {
        let reads = project.milestones.iter().map(move |m| {
            let index = m.index;
            async move {
                let amount = self
                    .gateway
                    .get_milestone_contribution(donor, project.id, index)
                    .await?;
                Ok::<_, FundingError>((index, amount))
            }
        });
        Ok(try_join_all(reads).await?.into_iter().collect())
    }

    /// Project-level total of `donor` on `id`.
    pub async fn total_for(&self, donor: Address, id: ProjectId) -> Result<Amount, FundingError> {
        self.gateway.get_project_contribution(donor, id).await
    }

    /// Total and per-milestone values in one summary.
    pub async fn summary(
        &self,
        donor: Address,
        project: &Project,
    ) -> Result<ContributionSummary, FundingError> {
        let total = self.total_for(donor, project.id).await?;
        let per_milestone = self
            .contributions_for(donor, project)
            .await?
            .into_values()
            .collect();
        let summary = ContributionSummary {
            project_id: project.id,
            per_milestone,
            total,
        };
        if !summary.is_consistent() {
            debug!(
                "[cf-donations] Project {} for {}: total {} vs milestone sum {}",
                project.id,
                donor,
                summary.total,
                summary.milestone_sum()
            );
        }
        Ok(summary)
    }

    /// Every listed project `donor` has given to, with the donor's total.
    pub async fn donated_projects(
        &self,
        donor: Address,
    ) -> Result<Vec<DonorPosition>, FundingError> {
        let snapshot = self.catalog.snapshot().await?;
        let mut positions = Vec::new();
        for project in snapshot.projects {
            let donated = self.total_for(donor, project.id).await?;
            if !donated.is_zero() {
                positions.push(DonorPosition { project, donated });
            }
        }
        Ok(positions)
    }
}
