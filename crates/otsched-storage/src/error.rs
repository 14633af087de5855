//! Storage error types for the roster store.

use std::fmt;

use otsched_core::CoreError;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The roster changed between the caller's snapshot and its commit.
    #[error("Version conflict: expected {expected}, found {actual}")]
    VersionConflict {
        /// The version the caller decided against.
        expected: u64,
        /// The version currently committed.
        actual: u64,
    },

    /// The transform refused the roster or produced one violating an invariant.
    #[error("Mutation rejected: {0}")]
    Rejected(#[from] CoreError),

    /// The persistence backend could not be reached or refused the write.
    #[error("Storage unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
    },

    /// Persisted data could not be decoded.
    #[error("Corrupt roster data: {message}")]
    Corrupt {
        /// Description of the decoding failure.
        message: String,
    },

    /// Filesystem error from a file-backed persistence.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization failure while encoding the roster.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    /// Creates a new `VersionConflict` error.
    #[must_use]
    pub fn version_conflict(expected: u64, actual: u64) -> Self {
        Self::VersionConflict { expected, actual }
    }

    /// Creates a new `Unavailable` error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a new `Corrupt` error.
    #[must_use]
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a version conflict error.
    #[must_use]
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }

    /// Returns `true` if the transform was rejected because the roster no
    /// longer matches what the caller decided against.
    #[must_use]
    pub fn is_stale_decision(&self) -> bool {
        match self {
            Self::VersionConflict { .. } => true,
            Self::Rejected(e) => e.is_conflict(),
            _ => false,
        }
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::VersionConflict { .. } => ErrorCategory::Conflict,
            Self::Rejected(_) => ErrorCategory::Validation,
            Self::Unavailable { .. } | Self::Io(_) => ErrorCategory::Infrastructure,
            Self::Corrupt { .. } | Self::Serialization(_) => ErrorCategory::Data,
        }
    }
}

/// Categories of storage errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Concurrent modification.
    Conflict,
    /// Roster rejected by a transform or invariant check.
    Validation,
    /// Infrastructure/connection error.
    Infrastructure,
    /// Persisted data unreadable or unwritable.
    Data,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conflict => write!(f, "conflict"),
            Self::Validation => write!(f, "validation"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Data => write!(f, "data"),
        }
    }
}
