//! Error types and handling framework.
//!
//! # Error Hierarchy
//!
//! - `ConcordError` - Top-level error type
//!   - `ConfigError` - Configuration loading and validation
//!   - `StorageError` - Upstream ledger and store failures, propagated untransformed
//!   - `InvariantViolation` - Programming faults that must fail loudly
//!   - `ValidationError` - Malformed identifiers and records
//!
//! Shortfalls in data (too few observations, empty strategy sets) are not
//! errors. They resolve to conservative defaults reported alongside the result.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error severity levels for categorizing errors.
///
/// # Examples
///
/// ```
/// use concord_core::error::ErrorSeverity;
///
/// let severity = ErrorSeverity::Recoverable;
/// assert!(severity.is_recoverable());
/// assert!(!severity.is_fatal());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ErrorSeverity {
    /// Unrecoverable error requiring immediate attention.
    Fatal,

    /// The operation failed but a later attempt may succeed.
    #[default]
    Recoverable,

    /// Non-critical issue that should be logged.
    Warning,

    /// Expected or handled condition.
    Info,
}

impl ErrorSeverity {
    /// Returns true if this error is recoverable (not fatal).
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Fatal)
    }

    /// Returns true if this error is fatal (unrecoverable).
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal)
    }

    /// Returns true if this is a warning level severity.
    #[must_use]
    pub const fn is_warning(&self) -> bool {
        matches!(self, Self::Warning)
    }

    /// Returns the severity as a static string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fatal => "FATAL",
            Self::Recoverable => "RECOVERABLE",
            Self::Warning => "WARNING",
            Self::Info => "INFO",
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

mod config;
mod invariant;
mod storage;

pub use config::ConfigError;
pub use invariant::InvariantViolation;
pub use storage::StorageError;

use crate::types::ValidationError;

/// Top-level error type for Concord.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConcordError {
    /// Configuration error.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// Upstream storage or ledger error.
    #[error("{0}")]
    Storage(#[from] StorageError),

    /// Broken invariant.
    #[error("{0}")]
    Invariant(#[from] InvariantViolation),

    /// Malformed identifier or record.
    #[error("[Validation] {0}")]
    Validation(#[from] ValidationError),
}

impl ConcordError {
    /// Returns the severity level of this error.
    #[must_use]
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Config(e) => e.severity(),
            Self::Storage(e) => e.severity(),
            Self::Invariant(e) => e.severity(),
            Self::Validation(_) => ErrorSeverity::Warning,
        }
    }

    /// Returns true if this error is recoverable.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        self.severity().is_recoverable()
    }

    /// Returns true if this is an invariant violation.
    #[must_use]
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::Invariant(_))
    }

    /// Returns true if this is an upstream storage error.
    #[must_use]
    pub fn is_storage_error(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Returns the error category as a string.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Storage(_) => "storage",
            Self::Invariant(_) => "invariant",
            Self::Validation(_) => "validation",
        }
    }
}

/// A specialized Result type for Concord operations.
pub type Result<T> = std::result::Result<T, ConcordError>;
