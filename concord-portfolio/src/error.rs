//! Portfolio construction error types.

use concord_core::error::{ErrorSeverity, InvariantViolation};
use concord_core::types::StrategyId;
use thiserror::Error;

/// Portfolio construction error.
///
/// Thin or empty input is never an error here; it yields a neutral result
/// with diagnostics attached.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PortfolioError {
    /// Inputs that must be index-aligned have different lengths.
    #[error("[Portfolio] {what}: expected {expected} entries, got {actual}")]
    LengthMismatch {
        /// Which input was misaligned.
        what: &'static str,
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// Two input streams share one strategy id.
    #[error("[Portfolio] duplicate strategy id: {0}")]
    DuplicateStrategy(StrategyId),

    /// A numerical invariant failed after normalization.
    #[error("{0}")]
    Invariant(#[from] InvariantViolation),
}

impl PortfolioError {
    /// Returns the severity level of this error.
    #[must_use]
    pub fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Fatal
    }

    /// Returns true if this is an invariant violation.
    #[must_use]
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::Invariant(_))
    }
}

/// Result type for portfolio operations.
pub type Result<T> = std::result::Result<T, PortfolioError>;
