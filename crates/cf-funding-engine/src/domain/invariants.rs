//! # Funding Invariant Checker
//!
//! Pure checks run against already-fetched state before any write is
//! submitted. They never talk to the ledger and never replace the ledger's
//! own enforcement: a stale snapshot can pass here and still be rejected.

use super::entities::{MilestoneDraft, Project};
use super::errors::ValidationError;
use super::value_objects::{Amount, MilestoneIndex};

/// Validate a donation. Rules in order, first failure wins:
///
/// 1. project active
/// 2. milestone exists
/// 3. amount > 0
/// 4. `raised + amount <= target` (boundary accepted)
pub fn validate_donation(
    project: &Project,
    milestone_index: MilestoneIndex,
    amount: Amount,
) -> Result<(), ValidationError> {
    if !project.is_active {
        return Err(ValidationError::ProjectInactive);
    }

    let milestone =
        project
            .milestone(milestone_index)
            .ok_or(ValidationError::NoSuchMilestone {
                index: milestone_index,
                count: project.milestones.len(),
            })?;

    if amount.is_zero() {
        return Err(ValidationError::NonPositiveAmount);
    }

    let headroom = milestone.headroom();
    if amount > headroom {
        return Err(ValidationError::MilestoneCapExceeded { headroom });
    }

    Ok(())
}

/// Validate goal and milestone targets of a new project.
///
/// Under-allocation is allowed; over-allocation is not.
pub fn validate_project_creation(
    goal: Amount,
    milestone_targets: &[Amount],
) -> Result<(), ValidationError> {
    if goal.is_zero() {
        return Err(ValidationError::NonPositiveGoal);
    }

    let mut allocated = Amount::zero();
    for (index, target) in milestone_targets.iter().enumerate() {
        if target.is_zero() {
            return Err(ValidationError::NonPositiveTarget {
                index: index as MilestoneIndex,
            });
        }
        allocated = allocated
            .checked_add(*target)
            .ok_or(ValidationError::AmountOverflow)?;
    }

    if allocated > goal {
        return Err(ValidationError::OverAllocated { allocated, goal });
    }

    Ok(())
}

/// Full proposal check: name, then goal/targets.
pub fn validate_project_proposal(
    name: &str,
    goal: Amount,
    milestones: &[MilestoneDraft],
) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    let targets: Vec<Amount> = milestones.iter().map(|m| m.target_amount).collect();
    validate_project_creation(goal, &targets)
}

/// Parallel description/target lists must line up.
pub fn validate_milestone_shape(
    descriptions: &[String],
    targets: &[Amount],
) -> Result<(), ValidationError> {
    if descriptions.len() != targets.len() {
        return Err(ValidationError::MilestoneShapeMismatch {
            descriptions: descriptions.len(),
            targets: targets.len(),
        });
    }
    Ok(())
}

/// Invariant: completion flag is a pure function of the amounts.
pub fn invariant_completion_consistent(project: &Project) -> bool {
    project
        .milestones
        .iter()
        .all(|m| m.is_completed() == (m.raised_amount >= m.target_amount))
}

/// Invariant: project raised equals the milestone sum.
pub fn invariant_raised_is_sum(project: &Project) -> bool {
    let sum = project
        .milestones
        .iter()
        .try_fold(Amount::zero(), |acc, m| acc.checked_add(m.raised_amount));
    sum == Some(project.raised_amount)
}
