//! # Domain Entities
//!
//! Projects and their milestones, plus the typed ledger records they are
//! assembled from.
//!
//! A `Milestone` has no identity outside its `Project`; both are built
//! together by [`Project::assemble`] and never mutated afterwards. Fresh
//! state comes from a fresh read.

use serde::{Deserialize, Serialize};

use super::errors::FundingError;
use super::value_objects::{Address, Amount, LifecycleState, MilestoneIndex, ProjectId};

/// Project as returned by a single ledger read, fields validated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    /// Ledger id.
    pub id: ProjectId,
    /// Display name.
    pub name: String,
    /// Owning charity.
    pub owner: Address,
    /// Funding goal.
    pub goal_amount: Amount,
    /// Ledger's own running total.
    pub raised_amount: Amount,
    /// Accepting donations?
    pub is_active: bool,
    /// Number of milestones the ledger reports.
    pub milestone_count: u32,
}

/// Milestone as returned by a single ledger read, fields validated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneRecord {
    /// Position within the project.
    pub index: MilestoneIndex,
    /// Free text.
    pub description: String,
    /// Funding cap.
    pub target_amount: Amount,
    /// Confirmed donations so far.
    pub raised_amount: Amount,
}

/// A funding sub-goal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    /// 0-based, unique within the project.
    pub index: MilestoneIndex,
    /// Free text.
    pub description: String,
    /// Funding cap, always > 0.
    pub target_amount: Amount,
    /// Confirmed donations so far.
    pub raised_amount: Amount,
}

impl Milestone {
    /// Completed iff raised has reached the target.
    pub fn is_completed(&self) -> bool {
        self.raised_amount >= self.target_amount
    }

    /// Remaining fundable amount, zero once completed.
    pub fn headroom(&self) -> Amount {
        self.target_amount.saturating_sub(self.raised_amount)
    }
}

impl From<MilestoneRecord> for Milestone {
    fn from(record: MilestoneRecord) -> Self {
        Self {
            index: record.index,
            description: record.description,
            target_amount: record.target_amount,
            raised_amount: record.raised_amount,
        }
    }
}

/// A charity project with its milestones, in index order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Ledger id.
    pub id: ProjectId,
    /// Display name.
    pub name: String,
    /// Owning charity.
    pub owner: Address,
    /// Funding goal.
    pub goal_amount: Amount,
    /// Sum of milestone raised amounts.
    pub raised_amount: Amount,
    /// Accepting donations?
    pub is_active: bool,
    /// Milestones, index order.
    pub milestones: Vec<Milestone>,
}

impl Project {
    /// Assemble a project from a point read and its milestone reads.
    ///
    /// Fails with `Corrupt` when:
    /// - the milestone count differs from `expected_count` (the bulk read),
    /// - milestones are not exactly `0..count` in order,
    /// - a target is zero,
    /// - the raised sum overflows,
    /// - the ledger aggregate exceeds the milestone sum.
    ///
    /// Milestones are read after the project, so the ledger aggregate may
    /// lag behind their sum; the sum wins.
    pub fn assemble(
        record: ProjectRecord,
        expected_count: u32,
        milestones: Vec<MilestoneRecord>,
    ) -> Result<Self, FundingError> {
        if record.milestone_count != expected_count {
            return Err(FundingError::corrupt(format!(
                "project {}: bulk read reports {} milestones, point read {}",
                record.id, expected_count, record.milestone_count
            )));
        }
        if milestones.len() != record.milestone_count as usize {
            return Err(FundingError::corrupt(format!(
                "project {}: expected {} milestones, got {}",
                record.id,
                record.milestone_count,
                milestones.len()
            )));
        }

        let mut raised = Amount::zero();
        for (position, milestone) in milestones.iter().enumerate() {
            if milestone.index as usize != position {
                return Err(FundingError::corrupt(format!(
                    "project {}: milestone at position {} has index {}",
                    record.id, position, milestone.index
                )));
            }
            if milestone.target_amount.is_zero() {
                return Err(FundingError::corrupt(format!(
                    "project {}: milestone {} has zero target",
                    record.id, milestone.index
                )));
            }
            raised = raised.checked_add(milestone.raised_amount).ok_or_else(|| {
                FundingError::corrupt(format!("project {}: raised sum overflows", record.id))
            })?;
        }

        if record.raised_amount > raised {
            return Err(FundingError::corrupt(format!(
                "project {}: ledger total {} exceeds milestone sum {}",
                record.id, record.raised_amount, raised
            )));
        }

        Ok(Self {
            id: record.id,
            name: record.name,
            owner: record.owner,
            goal_amount: record.goal_amount,
            raised_amount: raised,
            is_active: record.is_active,
            milestones: milestones.into_iter().map(Milestone::from).collect(),
        })
    }

    /// Lifecycle state derived from the active flag.
    pub fn lifecycle_state(&self) -> LifecycleState {
        LifecycleState::from(self.is_active)
    }

    /// Milestone by index.
    pub fn milestone(&self, index: MilestoneIndex) -> Option<&Milestone> {
        self.milestones.get(index as usize)
    }

    /// Sum of milestone targets (saturating).
    pub fn allocated(&self) -> Amount {
        self.milestones
            .iter()
            .fold(Amount::zero(), |acc, m| acc.saturating_add(m.target_amount))
    }

    /// Goal capacity not assigned to any milestone.
    pub fn unallocated(&self) -> Amount {
        self.goal_amount.saturating_sub(self.allocated())
    }

    /// Amount still missing to reach the goal.
    pub fn remaining_to_goal(&self) -> Amount {
        self.goal_amount.saturating_sub(self.raised_amount)
    }

    /// True when every milestone is completed. Vacuously false with none.
    pub fn all_milestones_completed(&self) -> bool {
        !self.milestones.is_empty() && self.milestones.iter().all(Milestone::is_completed)
    }
}

/// Input for one milestone of a project being created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneDraft {
    /// Free text.
    pub description: String,
    /// Funding cap.
    pub target_amount: Amount,
}

impl MilestoneDraft {
    /// Create a draft.
    pub fn new(description: impl Into<String>, target_amount: impl Into<Amount>) -> Self {
        Self {
            description: description.into(),
            target_amount: target_amount.into(),
        }
    }
}

/// One donor's contributions to one project.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionSummary {
    /// Project id.
    pub project_id: ProjectId,
    /// Per-milestone totals, index order, one entry per milestone.
    pub per_milestone: Vec<Amount>,
    /// Project-level total as reported by the ledger.
    pub total: Amount,
}

impl ContributionSummary {
    /// Sum of the per-milestone values. May differ transiently from `total`.
    pub fn milestone_sum(&self) -> Amount {
        self.per_milestone
            .iter()
            .fold(Amount::zero(), |acc, a| acc.saturating_add(*a))
    }

    /// Both reads observed the same ledger height.
    pub fn is_consistent(&self) -> bool {
        self.milestone_sum() == self.total
    }
}

/// A project the donor has funded, with the donor's total.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DonorPosition {
    /// The project.
    pub project: Project,
    /// Donor's total on it.
    pub donated: Amount,
}

/// Result of one full catalog read.
#[derive(Clone, Debug, Default)]
pub struct CatalogSnapshot {
    /// Projects that assembled cleanly, ledger order.
    pub projects: Vec<Project>,
    /// Records excluded because they were inconsistent.
    pub corrupt: Vec<FundingError>,
}

impl CatalogSnapshot {
    /// Look up a project by id.
    pub fn get(&self, id: ProjectId) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }
}
