//! Configuration-related error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration error: unreadable or unparseable files and out-of-range
/// parameters.
///
/// # Examples
///
/// ```
/// use concord_core::error::ConfigError;
///
/// let error = ConfigError::invalid_value("portfolio.correlation_ceiling", "must be in (0, 1]");
/// assert!(error.to_string().contains("correlation_ceiling"));
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigError {
    /// Configuration value is invalid.
    #[error("[Config] Invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Field with the invalid value.
        field: String,
        /// Reason why the value is invalid.
        reason: String,
    },

    /// Configuration file could not be read.
    #[error("[Config] Failed to read file '{path}': {reason}")]
    FileReadError {
        /// Path to the configuration file.
        path: String,
        /// Reason for the read failure.
        reason: String,
    },

    /// Configuration file could not be parsed.
    #[error("[Config] Invalid format in '{path}': {reason}")]
    InvalidFormat {
        /// Path to the configuration file.
        path: String,
        /// Reason for the format error.
        reason: String,
    },

    /// Aggregate validation failure.
    #[error("[Config] Validation failed: {reason}")]
    ValidationFailed {
        /// Joined list of the individual failures.
        reason: String,
    },
}

impl ConfigError {
    /// Configuration errors are never retried.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        false
    }

    /// Returns the severity level of this error.
    #[must_use]
    pub fn severity(&self) -> super::ErrorSeverity {
        use super::ErrorSeverity;
        match self {
            Self::InvalidFormat { .. } => ErrorSeverity::Fatal,
            Self::InvalidValue { .. } | Self::FileReadError { .. } | Self::ValidationFailed { .. } => {
                ErrorSeverity::Warning
            }
        }
    }

    /// Creates an invalid value error.
    #[must_use]
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
