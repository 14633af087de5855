//! Allocation error types.

use std::fmt;

use otsched_storage::StorageError;

/// Which resource was missing when a normal case could not be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapacityGap {
    OperatingTheatre,
    Doctor,
}

impl fmt::Display for CapacityGap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OperatingTheatre => write!(f, "No operating theatres available at this time"),
            Self::Doctor => write!(f, "No doctors available at this time"),
        }
    }
}

/// Errors returned by the scheduling and emergency services.
///
/// Every variant leaves the roster exactly as it was before the call.
#[derive(Debug, thiserror::Error)]
pub enum AllocationError {
    /// Bad request, rejected before any roster access.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// No free theatre or doctor for a normal case.
    #[error("{gap}")]
    NoCapacity { gap: CapacityGap },

    /// An emergency could not be placed even after trying to preempt.
    #[error(
        "Unable to handle emergency: no resources available and no suitable surgery to reschedule"
    )]
    Unavailable,

    /// The roster kept changing underneath the decision.
    #[error("Roster is busy, gave up after {attempts} attempts")]
    StoreContention { attempts: u32 },

    /// The store refused or failed to persist the commit.
    #[error("Failed to update roster: {0}")]
    StorePersistence(#[source] StorageError),
}

impl AllocationError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn no_capacity(gap: CapacityGap) -> Self {
        Self::NoCapacity { gap }
    }

    /// The caller sent something that will never succeed as is.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Retrying the same request later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::StoreContention { .. } | Self::NoCapacity { .. })
    }

    /// Warrants paging someone.
    pub fn is_alertable(&self) -> bool {
        matches!(self, Self::Unavailable | Self::StorePersistence(_))
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) => ErrorCategory::Validation,
            Self::NoCapacity { .. } => ErrorCategory::Capacity,
            Self::Unavailable => ErrorCategory::Unavailable,
            Self::StoreContention { .. } => ErrorCategory::Contention,
            Self::StorePersistence(_) => ErrorCategory::Persistence,
        }
    }
}

/// Error categories for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Validation,
    Capacity,
    Unavailable,
    Contention,
    Persistence,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Capacity => write!(f, "capacity"),
            Self::Unavailable => write!(f, "unavailable"),
            Self::Contention => write!(f, "contention"),
            Self::Persistence => write!(f, "persistence"),
        }
    }
}

pub type Result<T> = std::result::Result<T, AllocationError>;
