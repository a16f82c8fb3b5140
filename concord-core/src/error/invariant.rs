//! Invariant violations.
//!
//! These indicate a programming fault, never bad input. Callers must not
//! substitute a default when one is returned.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A broken numerical or safety invariant.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InvariantViolation {
    /// Normalized weights do not sum to one.
    #[error("[Invariant] weights sum to {sum}, expected 1 within {tolerance}")]
    WeightSum {
        /// Observed sum.
        sum: f64,
        /// Allowed absolute deviation.
        tolerance: f64,
    },

    /// A weight is negative or non-finite.
    #[error("[Invariant] weight for '{id}' is {value}")]
    InvalidWeight {
        /// Strategy id.
        id: String,
        /// Offending weight.
        value: f64,
    },

    /// Authority fell outside its clamp range after clamping.
    #[error("[Invariant] authority for '{agent}' is {value}, outside [{min}, {max}]")]
    AuthorityOutOfRange {
        /// Agent id.
        agent: String,
        /// Offending multiplier.
        value: f64,
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },

    /// A derived metric came out NaN or infinite.
    #[error("[Invariant] non-finite value for {what}")]
    NonFinite {
        /// Metric name.
        what: String,
    },
}

impl InvariantViolation {
    /// Always fatal.
    #[must_use]
    pub fn severity(&self) -> super::ErrorSeverity {
        super::ErrorSeverity::Fatal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_severity() {
        let v = InvariantViolation::AuthorityOutOfRange {
            agent: "alpha".to_string(),
            value: 2.5,
            min: 0.1,
            max: 2.0,
        };
        assert!(v.to_string().contains("alpha"));
        assert!(v.severity().is_fatal());
    }
}
