//! Persistence contract for the roster.

use async_trait::async_trait;
use otsched_core::RosterState;

use crate::error::StorageError;

/// The only contract the scheduler needs from durable storage.
///
/// A backend stores one roster document. It may be a file, a key-value
/// entry, a relational row or plain memory. Implementations must be
/// thread-safe (`Send + Sync`); serialization of writes is the job of
/// [`ResourceStore`](crate::ResourceStore), not of the backend.
///
/// # Example
///
/// ```ignore
/// use otsched_storage::{RosterPersistence, StorageError};
///
/// async fn doctor_count(storage: &dyn RosterPersistence) -> Result<usize, StorageError> {
///     Ok(storage.get().await?.map(|r| r.doctors.len()).unwrap_or(0))
/// }
/// ```
#[async_trait]
pub trait RosterPersistence: Send + Sync {
    /// Reads the persisted roster.
    ///
    /// Returns `None` if nothing has been written yet.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Corrupt` if the stored data cannot be decoded,
    /// and an infrastructure error if the backend cannot be read.
    async fn get(&self) -> Result<Option<RosterState>, StorageError>;

    /// Replaces the persisted roster.
    ///
    /// The write must be atomic: after a failure the previously stored
    /// roster is still the one returned by `get`.
    ///
    /// # Errors
    ///
    /// Returns an infrastructure error if the write could not be completed.
    async fn put(&self, roster: &RosterState) -> Result<(), StorageError>;

    /// Returns the name of this backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}
