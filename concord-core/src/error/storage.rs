//! Upstream storage and ledger fetch errors.
//!
//! These are returned by [`crate::traits::TradeLedger`] implementations and
//! propagated to callers as-is. Nothing in the workspace retries them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by a trade ledger or other upstream store.
///
/// # Examples
///
/// ```
/// use concord_core::error::StorageError;
///
/// let error = StorageError::read_error("ledger.json", "permission denied");
/// assert!(error.to_string().contains("ledger.json"));
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageError {
    /// I/O operation failed.
    #[error("[Storage] I/O error during {operation} on '{path}': {reason}")]
    IoError {
        /// Operation that failed (read, list, etc.).
        operation: String,
        /// Path to the file or resource.
        path: String,
        /// Reason for the I/O error.
        reason: String,
    },

    /// A record could not be decoded.
    #[error("[Storage] Deserialization error: {reason}")]
    DeserializationError {
        /// Reason for the deserialization error.
        reason: String,
    },

    /// Ledger backend refused or failed the request.
    #[error("[Storage] Upstream unavailable: {reason}")]
    Unavailable {
        /// Backend-supplied reason.
        reason: String,
    },

    /// A page request referenced an offset the ledger cannot serve.
    #[error("[Storage] Invalid page request at offset {offset} (limit {limit})")]
    InvalidPage {
        /// Requested offset.
        offset: usize,
        /// Requested page size.
        limit: usize,
    },

    /// File or resource not found.
    #[error("[Storage] Not found: {path}")]
    NotFound {
        /// Path to the missing file or resource.
        path: String,
    },
}

impl StorageError {
    /// Returns true if a later attempt might succeed.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    /// Returns the severity level of this error.
    #[must_use]
    pub fn severity(&self) -> super::ErrorSeverity {
        use super::ErrorSeverity;
        match self {
            Self::Unavailable { .. } => ErrorSeverity::Recoverable,
            Self::IoError { .. } | Self::DeserializationError { .. } | Self::InvalidPage { .. } => {
                ErrorSeverity::Warning
            }
            Self::NotFound { .. } => ErrorSeverity::Info,
        }
    }

    /// Creates an I/O read error.
    #[must_use]
    pub fn read_error(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::IoError {
            operation: "read".to_string(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a not found error.
    #[must_use]
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_recoverable() {
        let unavailable = StorageError::Unavailable {
            reason: "503".to_string(),
        };
        assert!(unavailable.is_recoverable());
        assert!(!StorageError::not_found("/data/missing").is_recoverable());
    }

    #[test]
    fn test_read_error_helper() {
        let error = StorageError::read_error("/data/ledger.json", "corrupted");
        assert!(matches!(
            error,
            StorageError::IoError { ref operation, .. } if operation == "read"
        ));
    }

    #[test]
    fn test_serde_roundtrip() {
        let error = StorageError::InvalidPage {
            offset: 2000,
            limit: 1000,
        };
        let json = serde_json::to_string(&error).unwrap();
        let parsed: StorageError = serde_json::from_str(&json).unwrap();
        assert_eq!(error, parsed);
    }
}
