//! # Project Catalog
//!
//! Builds `Project` views from ledger reads. Nothing is cached between
//! calls: every `list`, `snapshot` or `get` goes back to the ledger.

use std::sync::Arc;

use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use tracing::{debug, warn};

use crate::domain::{Address, CatalogSnapshot, FundingError, Project, ProjectId, ProjectRecord};
use crate::gateway::LedgerGateway;
use crate::ports::LedgerTransport;

/// Read-side project catalog.
pub struct ProjectCatalog<T: LedgerTransport> {
    gateway: Arc<LedgerGateway<T>>,
}

impl<T: LedgerTransport> Clone for ProjectCatalog<T> {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
        }
    }
}

impl<T: LedgerTransport> ProjectCatalog<T> {
    /// Catalog over `gateway`.
    pub fn new(gateway: Arc<LedgerGateway<T>>) -> Self {
        Self { gateway }
    }

    /// Lazily list every project.
    ///
    /// The bulk read happens on first poll. Each record is then re-read
    /// point-wise with its milestones; inconsistent records come out as
    /// `Err(Corrupt)` and the stream carries on. Calling `list` again starts
    /// over from a fresh bulk read.
    pub fn list(&self) -> impl Stream<Item = Result<Project, FundingError>> + '_ {
        stream::once(self.gateway.get_all_projects())
            .map_ok(stream::iter)
            .try_flatten()
            .and_then(move |bulk| self.assemble_listed(bulk))
    }

    /// Drain a full listing. Corrupt records are collected separately; any
    /// other failure aborts the read.
    pub async fn snapshot(&self) -> Result<CatalogSnapshot, FundingError> {
        let rows = self.gateway.get_all_projects().await?;
        let mut snapshot = CatalogSnapshot::default();

        let results: Vec<_> = stream::iter(rows)
            .then(|row| async move {
                match row {
                    Ok(bulk) => self.assemble_listed(bulk).await,
                    Err(e) => Err(e),
                }
            })
            .collect()
            .await;

        for result in results {
            match result {
                Ok(project) => snapshot.projects.push(project),
                Err(e @ FundingError::Corrupt(_)) => {
                    warn!("[cf-catalog] Excluding record: {}", e);
                    snapshot.corrupt.push(e);
                }
                Err(e) => return Err(e),
            }
        }

        debug!(
            "[cf-catalog] Snapshot: {} projects, {} corrupt",
            snapshot.projects.len(),
            snapshot.corrupt.len()
        );
        Ok(snapshot)
    }

    /// One project with its milestones.
    pub async fn get(&self, id: ProjectId) -> Result<Project, FundingError> {
        let record = self.gateway.get_project(id).await?;
        let expected = record.milestone_count;
        self.with_milestones(record, expected).await
    }

    /// Projects owned by `owner`.
    pub async fn owned_by(&self, owner: Address) -> Result<Vec<Project>, FundingError> {
        let snapshot = self.snapshot().await?;
        Ok(snapshot
            .projects
            .into_iter()
            .filter(|p| p.owner == owner)
            .collect())
    }

    async fn assemble_listed(&self, bulk: ProjectRecord) -> Result<Project, FundingError> {
        let record = match self.gateway.get_project(bulk.id).await {
            Ok(record) => record,
            Err(FundingError::NotFound(id)) => {
                return Err(FundingError::corrupt(format!(
                    "project {} listed but not readable",
                    id
                )))
            }
            Err(e) => return Err(e),
        };
        self.with_milestones(record, bulk.milestone_count).await
    }

    async fn with_milestones(
        &self,
        record: ProjectRecord,
        expected_count: u32,
    ) -> Result<Project, FundingError> {
        let id = record.id;
        let mut milestones = Vec::with_capacity(record.milestone_count as usize);
        for index in 0..record.milestone_count {
            let milestone = self
                .gateway
                .get_milestone(id, index)
                .await
                .map_err(|e| match e {
                    FundingError::Rejected(reason) => FundingError::corrupt(format!(
                        "project {}: milestone {} unreadable: {}",
                        id, index, reason
                    )),
                    other => other,
                })?;
            milestones.push(milestone);
        }
        Project::assemble(record, expected_count, milestones)
    }
}
