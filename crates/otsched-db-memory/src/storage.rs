use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use otsched_core::RosterState;
use otsched_storage::{RosterPersistence, StorageError};
use tokio::sync::RwLock;

/// In-memory roster persistence.
///
/// `get` returns `None` until the first successful `put`.
#[derive(Debug, Default)]
pub struct InMemoryPersistence {
    roster: RwLock<Option<RosterState>>,
    /// Counter of successful writes
    puts: AtomicU64,
    /// When set, every `put` fails with `StorageError::Unavailable`
    fail_puts: AtomicBool,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Creates a persistence that already holds `roster`.
    pub fn with_roster(roster: RosterState) -> Self {
        Self {
            roster: RwLock::new(Some(roster)),
            ..Self::default()
        }
    }

    /// Makes subsequent writes fail (or succeed again).
    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    pub fn put_count(&self) -> u64 {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RosterPersistence for InMemoryPersistence {
    async fn get(&self) -> Result<Option<RosterState>, StorageError> {
        Ok(self.roster.read().await.clone())
    }

    async fn put(&self, roster: &RosterState) -> Result<(), StorageError> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StorageError::unavailable("in-memory writes disabled"));
        }
        *self.roster.write().await = Some(roster.clone());
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
