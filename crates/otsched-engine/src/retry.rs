//! Optimistic read-decide-commit loop shared by every mutating operation.

use otsched_core::{CoreError, RosterState};
use otsched_storage::{Committed, ResourceStore, Snapshot};
use tracing::{debug, warn};

use crate::error::{AllocationError, Result};

/// Runs `decide` against a fresh snapshot and commits its decision with
/// `apply`, provided the store has not moved on since the snapshot.
///
/// A stale snapshot restarts the cycle from scratch, at most `max_attempts`
/// times in total, after which the call fails with
/// [`AllocationError::StoreContention`]. Errors returned by `decide` end the
/// transaction immediately without touching the store.
pub(crate) async fn transact<D, T, Decide, Apply>(
    store: &ResourceStore,
    operation: &'static str,
    max_attempts: u32,
    mut decide: Decide,
    apply: Apply,
) -> Result<Committed<T>>
where
    Decide: FnMut(&Snapshot) -> Result<D>,
    Apply: Fn(&mut RosterState, D) -> std::result::Result<T, CoreError>,
{
    // every decision here commits, so only contention can leave it empty
    try_transact(
        store,
        operation,
        max_attempts,
        |snapshot| decide(snapshot).map(Some),
        apply,
    )
    .await?
    .ok_or(AllocationError::StoreContention {
        attempts: max_attempts,
    })
}

/// Like [`transact`], but `decide` may return `None` when the snapshot needs
/// no change. Nothing is written then and the call returns `Ok(None)`.
pub(crate) async fn try_transact<D, T, Decide, Apply>(
    store: &ResourceStore,
    operation: &'static str,
    max_attempts: u32,
    mut decide: Decide,
    apply: Apply,
) -> Result<Option<Committed<T>>>
where
    Decide: FnMut(&Snapshot) -> Result<Option<D>>,
    Apply: Fn(&mut RosterState, D) -> std::result::Result<T, CoreError>,
{
    for attempt in 1..=max_attempts {
        let snapshot = store.snapshot();
        let Some(decision) = decide(&snapshot)? else {
            debug!(operation, version = snapshot.version, "Nothing to commit");
            return Ok(None);
        };

        match store
            .apply_if(snapshot.version, |roster| apply(roster, decision))
            .await
        {
            Ok(committed) => return Ok(Some(committed)),
            Err(e) if e.is_stale_decision() => {
                warn!(
                    operation,
                    attempt,
                    max_attempts,
                    error = %e,
                    "Roster changed during decision, retrying"
                );
            }
            Err(e) => return Err(AllocationError::StorePersistence(e)),
        }
    }

    Err(AllocationError::StoreContention {
        attempts: max_attempts,
    })
}
