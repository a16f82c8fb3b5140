//! Governance error types.

use concord_core::error::{ErrorSeverity, InvariantViolation};
use concord_core::types::AgentId;
use thiserror::Error;

use crate::deployment::DeploymentState;

/// Governance error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GovernanceError {
    /// A requested operator action does not apply to the agent's state.
    #[error("[Governance] cannot {action} agent {agent} in state {state}")]
    InvalidTransition {
        /// Agent id.
        agent: AgentId,
        /// Current state.
        state: DeploymentState,
        /// Attempted action.
        action: &'static str,
    },

    /// A retune proposal was refused.
    #[error("[Governance] retune for {agent} rejected: {reason}")]
    RetuneRejected {
        /// Agent id.
        agent: AgentId,
        /// Why it was refused.
        reason: String,
    },

    /// A numerical invariant failed.
    #[error("{0}")]
    Invariant(#[from] InvariantViolation),
}

impl GovernanceError {
    /// Returns the severity level of this error.
    #[must_use]
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::InvalidTransition { .. } | Self::RetuneRejected { .. } => ErrorSeverity::Warning,
            Self::Invariant(e) => e.severity(),
        }
    }

    /// Returns true if this is an invariant violation.
    #[must_use]
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::Invariant(_))
    }
}

/// Result type for governance operations.
pub type Result<T> = std::result::Result<T, GovernanceError>;
