//! # Project Lifecycle
//!
//! `Active -> Deactivated`, one way, owner only. Checked locally to fail
//! fast; the ledger has the final word.

use super::entities::Project;
use super::errors::LifecycleError;
use super::value_objects::{Address, LifecycleState};

/// Lifecycle guard for a single project snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProjectLifecycle {
    owner: Address,
    state: LifecycleState,
}

impl ProjectLifecycle {
    /// A freshly created project.
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            state: LifecycleState::Active,
        }
    }

    /// Lifecycle of an observed project.
    pub fn of(project: &Project) -> Self {
        Self {
            owner: project.owner,
            state: project.lifecycle_state(),
        }
    }

    /// Current state.
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Would `caller` be allowed to deactivate?
    ///
    /// Ownership is checked first, so a stranger poking a dead project
    /// gets `Unauthorized`, not `AlreadyDeactivated`.
    pub fn check_deactivate(&self, caller: Address) -> Result<(), LifecycleError> {
        if caller != self.owner {
            return Err(LifecycleError::Unauthorized {
                caller,
                owner: self.owner,
            });
        }
        if !self.state.can_transition_to(LifecycleState::Deactivated) {
            return Err(LifecycleError::AlreadyDeactivated);
        }
        Ok(())
    }

    /// Apply the transition.
    pub fn deactivate(&mut self, caller: Address) -> Result<(), LifecycleError> {
        self.check_deactivate(caller)?;
        self.state = LifecycleState::Deactivated;
        Ok(())
    }
}
