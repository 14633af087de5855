//! # otsched-storage
//!
//! Persistence contract and the single-writer [`ResourceStore`] that owns the
//! doctor/theatre roster.
//!
//! Backends only need to store and return one roster document; see
//! [`RosterPersistence`]. Concrete backends live in separate crates
//! (`otsched-db-memory`, `otsched-db-file`).
//!
//! ## Example
//!
//! ```ignore
//! use otsched_storage::{ResourceStore, StorageError};
//!
//! async fn occupied(store: &ResourceStore) -> usize {
//!     store.snapshot().state.occupied_theatre_count()
//! }
//! ```

mod error;
mod store;
mod traits;

pub use error::{ErrorCategory, StorageError};
pub use store::{Committed, ResourceStore, Snapshot};
pub use traits::RosterPersistence;

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shared persistence trait object.
pub type DynPersistence = std::sync::Arc<dyn RosterPersistence>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use otsched_storage::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{ErrorCategory, StorageError};
    pub use crate::store::{Committed, ResourceStore, Snapshot};
    pub use crate::traits::RosterPersistence;
    pub use crate::{DynPersistence, StorageResult};
}
