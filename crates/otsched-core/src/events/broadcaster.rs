//! Broadcast publisher for roster updates.
//!
//! The `RosterBroadcaster` is the bus dashboards subscribe to. It uses
//! tokio's broadcast channel for multi-producer, multi-consumer messaging.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

use super::publisher::NotificationPublisher;
use super::types::RosterUpdate;

/// Default buffer size for the broadcast channel.
/// Updates beyond this limit will cause older updates to be dropped for slow receivers.
const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Broadcaster for roster updates.
///
/// Cheap to clone; every clone feeds the same channel.
///
/// # Example
///
/// ```
/// use otsched_core::events::{RosterBroadcaster, RosterUpdate, UpdateCause};
/// use otsched_core::RosterState;
///
/// let broadcaster = RosterBroadcaster::new();
/// let _receiver = broadcaster.subscribe();
///
/// broadcaster.send(RosterUpdate::new(UpdateCause::Released, 1, RosterState::default()));
///
/// // Receive in another task
/// // let update = _receiver.recv().await.unwrap();
/// ```
#[derive(Clone)]
pub struct RosterBroadcaster {
    sender: broadcast::Sender<RosterUpdate>,
}

impl RosterBroadcaster {
    /// Create a new broadcaster with default buffer size.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE)
    }

    /// Create a new broadcaster with custom buffer size.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Create a new broadcaster wrapped in an Arc for sharing.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Send an update to all subscribers.
    ///
    /// Returns the number of subscribers that received the update.
    /// Returns 0 if there are no active subscribers.
    pub fn send(&self, update: RosterUpdate) -> usize {
        self.sender.send(update).unwrap_or_default()
    }

    /// Subscribe to updates.
    ///
    /// Updates sent before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<RosterUpdate> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Check if there are any active subscribers.
    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

impl Default for RosterBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationPublisher for RosterBroadcaster {
    fn publish(&self, update: RosterUpdate) {
        let cause = update.cause;
        let version = update.version;
        let count = self.send(update);
        debug!(
            cause = %cause,
            version = version,
            subscribers = count,
            "Published roster update"
        );
    }
}

impl std::fmt::Debug for RosterBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RosterBroadcaster")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
