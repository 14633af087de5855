use super::types::RosterUpdate;

/// Receives every committed roster update.
///
/// Implementations must not block and must not fail the caller: by the time
/// `publish` runs the mutation is already durable.
pub trait NotificationPublisher: Send + Sync {
    fn publish(&self, update: RosterUpdate);
}

/// Publisher that drops every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPublisher;

impl NotificationPublisher for NoopPublisher {
    fn publish(&self, _update: RosterUpdate) {}
}
