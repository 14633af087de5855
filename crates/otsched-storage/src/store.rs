//! Versioned single-writer roster store.
//!
//! Readers take an [`Arc<Snapshot>`] without locking. Writers are serialized
//! through one async mutex; each commit clones the current roster, runs the
//! caller's transform against the clone, checks the roster invariants,
//! persists the result and only then swaps it in. A failure at any step
//! leaves the previous snapshot authoritative.

use std::sync::Arc;

use arc_swap::ArcSwap;
use otsched_core::{CoreError, RosterState};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::StorageError;
use crate::{DynPersistence, StorageResult};

/// An immutable, consistent view of the roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Incremented by one on every commit.
    pub version: u64,
    pub state: Arc<RosterState>,
}

impl Snapshot {
    fn new(version: u64, state: RosterState) -> Self {
        Self {
            version,
            state: Arc::new(state),
        }
    }
}

/// Result of a successful commit: the new snapshot and whatever the
/// transform returned.
#[derive(Debug)]
pub struct Committed<T> {
    pub snapshot: Arc<Snapshot>,
    pub value: T,
}

/// Authoritative doctor/theatre roster.
pub struct ResourceStore {
    current: ArcSwap<Snapshot>,
    writer: Mutex<()>,
    persistence: DynPersistence,
}

impl ResourceStore {
    /// Loads the persisted roster, or builds one with `seed` and persists it
    /// when the backend is empty.
    ///
    /// A persisted roster that breaks an invariant is reported as
    /// [`StorageError::Corrupt`].
    pub async fn open<F>(persistence: DynPersistence, seed: F) -> StorageResult<Self>
    where
        F: FnOnce() -> Result<RosterState, CoreError>,
    {
        match persistence.get().await? {
            Some(state) => {
                state
                    .check_invariants()
                    .map_err(|e| StorageError::corrupt(e.to_string()))?;
                info!(
                    backend = persistence.backend_name(),
                    doctors = state.doctors.len(),
                    theatres = state.ots.len(),
                    "Loaded persisted roster"
                );
                Ok(Self::from_parts(persistence, state))
            }
            None => {
                let state = seed()?;
                Self::initialize(persistence, state).await
            }
        }
    }

    /// Persists `state` as the initial roster, replacing whatever the
    /// backend held.
    pub async fn initialize(
        persistence: DynPersistence,
        state: RosterState,
    ) -> StorageResult<Self> {
        state.check_invariants()?;
        persistence.put(&state).await?;
        info!(
            backend = persistence.backend_name(),
            doctors = state.doctors.len(),
            theatres = state.ots.len(),
            "Seeded roster"
        );
        Ok(Self::from_parts(persistence, state))
    }

    fn from_parts(persistence: DynPersistence, state: RosterState) -> Self {
        Self {
            current: ArcSwap::from_pointee(Snapshot::new(1, state)),
            writer: Mutex::new(()),
            persistence,
        }
    }

    /// Returns the latest committed snapshot. Never blocks on writers.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    pub fn version(&self) -> u64 {
        self.current.load().version
    }

    pub fn backend_name(&self) -> &'static str {
        self.persistence.backend_name()
    }

    /// Commits `transform` against whatever roster is current when the
    /// writer lock is acquired.
    pub async fn apply<T, F>(&self, transform: F) -> StorageResult<Committed<T>>
    where
        F: FnOnce(&mut RosterState) -> Result<T, CoreError>,
    {
        let _guard = self.writer.lock().await;
        let base = self.current.load_full();
        self.commit(base, transform).await
    }

    /// Commits `transform` only if the store is still at `expected_version`.
    ///
    /// Returns [`StorageError::VersionConflict`] without running the
    /// transform when another commit happened in between.
    pub async fn apply_if<T, F>(
        &self,
        expected_version: u64,
        transform: F,
    ) -> StorageResult<Committed<T>>
    where
        F: FnOnce(&mut RosterState) -> Result<T, CoreError>,
    {
        let _guard = self.writer.lock().await;
        let base = self.current.load_full();
        if base.version != expected_version {
            return Err(StorageError::version_conflict(expected_version, base.version));
        }
        self.commit(base, transform).await
    }

    // Caller must hold the writer lock.
    async fn commit<T, F>(&self, base: Arc<Snapshot>, transform: F) -> StorageResult<Committed<T>>
    where
        F: FnOnce(&mut RosterState) -> Result<T, CoreError>,
    {
        let mut next = RosterState::clone(&base.state);
        let value = transform(&mut next)?;
        next.check_invariants()?;

        self.persistence.put(&next).await?;

        let snapshot = Arc::new(Snapshot::new(base.version + 1, next));
        self.current.store(Arc::clone(&snapshot));
        debug!(
            version = snapshot.version,
            backend = self.persistence.backend_name(),
            "Committed roster"
        );
        Ok(Committed { snapshot, value })
    }
}

impl std::fmt::Debug for ResourceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceStore")
            .field("version", &self.version())
            .field("backend", &self.persistence.backend_name())
            .finish()
    }
}
