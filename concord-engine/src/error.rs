//! Cycle error types.

use std::time::Duration;

use concord_core::error::{ErrorSeverity, StorageError};
use concord_governance::GovernanceError;
use concord_portfolio::PortfolioError;
use thiserror::Error;

/// Why a construction cycle did not publish.
///
/// In every case the previously published snapshot is left in place.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CycleError {
    /// The ledger reported an error; passed through unchanged.
    #[error("{0}")]
    Fetch(#[from] StorageError),

    /// The ledger fetch did not finish in time.
    #[error("[Cycle] ledger fetch timed out after {after:?}")]
    Timeout {
        /// Configured timeout.
        after: Duration,
    },

    /// Portfolio construction failed.
    #[error("{0}")]
    Portfolio(#[from] PortfolioError),

    /// Governance computation failed.
    #[error("{0}")]
    Governance(#[from] GovernanceError),
}

impl CycleError {
    /// Returns the severity level of this error.
    #[must_use]
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Fetch(e) => e.severity(),
            Self::Timeout { .. } => ErrorSeverity::Recoverable,
            Self::Portfolio(e) => e.severity(),
            Self::Governance(e) => e.severity(),
        }
    }

    /// Returns true if the failure happened before computation began.
    #[must_use]
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Fetch(_) | Self::Timeout { .. })
    }

    /// Returns true if this is an invariant violation.
    #[must_use]
    pub fn is_invariant_violation(&self) -> bool {
        match self {
            Self::Portfolio(e) => e.is_invariant_violation(),
            Self::Governance(e) => e.is_invariant_violation(),
            Self::Fetch(_) | Self::Timeout { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let timeout = CycleError::Timeout {
            after: Duration::from_secs(30),
        };
        assert!(timeout.is_upstream());
        assert!(timeout.severity().is_recoverable());
        assert!(timeout.to_string().contains("30s"));

        let fetch = CycleError::from(StorageError::Unavailable {
            reason: "down".to_string(),
        });
        assert!(fetch.is_upstream());
        assert_eq!(fetch.to_string(), "[Storage] Upstream unavailable: down");
        assert!(!fetch.is_invariant_violation());
    }
}
