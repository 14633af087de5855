//! In-memory roster persistence.
//!
//! Holds the roster in process memory. Used by the server when no durable
//! backend is configured and by tests, which can make writes fail on demand.
//!
//! # Example
//!
//! ```ignore
//! use otsched_db_memory::InMemoryPersistence;
//! use otsched_storage::ResourceStore;
//!
//! let persistence = InMemoryPersistence::new_shared();
//! let store = ResourceStore::open(persistence, || seed.build(now)).await?;
//! ```

mod storage;

pub use otsched_storage::{RosterPersistence, StorageError};
pub use storage::InMemoryPersistence;

/// Creates a new in-memory persistence behind the shared trait object.
pub fn create_persistence() -> otsched_storage::DynPersistence {
    std::sync::Arc::new(InMemoryPersistence::new())
}
