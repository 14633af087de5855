use thiserror::Error;

use crate::roster::{DoctorId, TheatreId};

/// Core error types for roster operations
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Operating theatre not found: {0}")]
    TheatreNotFound(TheatreId),

    #[error("Doctor not found: {0}")]
    DoctorNotFound(DoctorId),

    #[error("Operating theatre {0} is already occupied")]
    TheatreOccupied(TheatreId),

    #[error("Operating theatre {0} is not occupied")]
    TheatreVacant(TheatreId),

    #[error("Doctor {0} is already assigned")]
    DoctorAssigned(DoctorId),

    #[error("Roster invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Invalid roster: {0}")]
    InvalidRoster(String),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl CoreError {
    /// Create a new InvariantViolation error
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation(message.into())
    }

    /// Create a new InvalidRoster error
    pub fn invalid_roster(message: impl Into<String>) -> Self {
        Self::InvalidRoster(message.into())
    }

    /// Check if this error was caused by a stale or conflicting roster view
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::TheatreOccupied(_) | Self::TheatreVacant(_) | Self::DoctorAssigned(_)
        )
    }

    /// Get error category for logging/monitoring
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::TheatreNotFound(_) | Self::DoctorNotFound(_) => ErrorCategory::NotFound,
            Self::TheatreOccupied(_) | Self::TheatreVacant(_) | Self::DoctorAssigned(_) => {
                ErrorCategory::Conflict
            }
            Self::InvariantViolation(_) => ErrorCategory::Invariant,
            Self::InvalidRoster(_) => ErrorCategory::Validation,
            Self::JsonError(_) => ErrorCategory::Serialization,
        }
    }
}

/// Error categories for monitoring and classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    NotFound,
    Conflict,
    Invariant,
    Serialization,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::Invariant => write!(f, "invariant"),
            Self::Serialization => write!(f, "serialization"),
        }
    }
}

/// Convenience result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
