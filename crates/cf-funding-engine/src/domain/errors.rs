//! # Domain Errors
//!
//! Error taxonomy for the Funding Reconciliation Engine.
//!
//! | Variant | Origin | Retry? |
//! |---------|--------|--------|
//! | `Unreachable` | transport | yes (reads only, writes are the caller's call) |
//! | `Rejected` | ledger business rule | no, change the request |
//! | `Timeout` | confirmation wait | re-read state first |
//! | `InvalidInput` | local checks, never reaches the ledger | no |
//! | `Corrupt` | inconsistent read | no |
//! | `StaleConfiguration` | persisted session no longer resolves | re-provision |

use thiserror::Error;

use super::value_objects::{Address, Amount, MilestoneIndex, ProjectId, TxHash};

/// Engine error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FundingError {
    /// Transport or network failure.
    #[error("Ledger unreachable: {0}")]
    Unreachable(String),

    /// The ledger refused the write.
    #[error("Rejected by ledger: {0}")]
    Rejected(String),

    /// A write was submitted but no confirmation was observed in time.
    /// The outcome is unknown.
    #[error("Confirmation timeout for tx 0x{} after {waited_ms}ms", hex::encode(.tx_hash))]
    Timeout {
        /// Transaction that is still unconfirmed.
        tx_hash: TxHash,
        /// How long the engine waited.
        waited_ms: u64,
    },

    /// Local validation failed before submission.
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    /// Lifecycle transition refused locally.
    #[error("Lifecycle violation: {0}")]
    Lifecycle(#[from] LifecycleError),

    /// A read produced internally inconsistent data.
    #[error("Corrupt ledger data: {0}")]
    Corrupt(String),

    /// Persisted session addresses no longer resolve.
    #[error("Stale configuration: {0}")]
    StaleConfiguration(String),

    /// No project with this id.
    #[error("Project not found: {0}")]
    NotFound(ProjectId),

    /// A display-currency amount was given but no exchange rate is cached.
    #[error("No exchange rate available")]
    RateUnavailable,
}

impl FundingError {
    /// Only transport failures may be retried blindly, and only for reads.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }

    /// A timed-out write must be followed by a fresh read before any retry.
    pub fn requires_reread(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Shorthand for a `Corrupt` error.
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }
}

/// Reasons a proposed write fails local validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Project is deactivated.
    #[error("Project is not active")]
    ProjectInactive,

    /// Milestone index out of range.
    #[error("No milestone {index} (project has {count})")]
    NoSuchMilestone {
        /// Requested index
        index: MilestoneIndex,
        /// Number of milestones
        count: usize,
    },

    /// Donation amount is zero.
    #[error("Donation amount must be positive")]
    NonPositiveAmount,

    /// Donation would push the milestone past its target.
    #[error("Milestone cap exceeded: at most {headroom} can still be donated")]
    MilestoneCapExceeded {
        /// `target - raised` at validation time
        headroom: Amount,
    },

    /// Project goal is zero.
    #[error("Project goal must be positive")]
    NonPositiveGoal,

    /// A milestone target is zero.
    #[error("Milestone {index} target must be positive")]
    NonPositiveTarget {
        /// Offending milestone
        index: MilestoneIndex,
    },

    /// Milestone targets add up to more than the goal.
    #[error("Milestones allocate {allocated} but goal is {goal}")]
    OverAllocated {
        /// Sum of milestone targets
        allocated: Amount,
        /// Project goal
        goal: Amount,
    },

    /// Description and target lists differ in length.
    #[error("Got {descriptions} milestone descriptions but {targets} targets")]
    MilestoneShapeMismatch {
        /// Number of descriptions
        descriptions: usize,
        /// Number of targets
        targets: usize,
    },

    /// Project name is blank.
    #[error("Project name must not be empty")]
    EmptyName,

    /// Arithmetic on the proposal overflowed 256 bits.
    #[error("Amount overflow")]
    AmountOverflow,
}

/// Refused lifecycle transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// Caller is not the owning charity.
    #[error("Caller {caller} is not the project owner {owner}")]
    Unauthorized {
        /// Who asked
        caller: Address,
        /// Who owns the project
        owner: Address,
    },

    /// Project is already in the terminal state.
    #[error("Project already deactivated")]
    AlreadyDeactivated,
}
