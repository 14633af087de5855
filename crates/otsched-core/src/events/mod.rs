//! Roster change notifications.
//!
//! Every committed mutation of the roster produces one [`RosterUpdate`]
//! carrying the complete post-commit roster. Updates are handed to a
//! [`NotificationPublisher`]; the bundled [`RosterBroadcaster`] fans them out
//! over a tokio broadcast channel.
//!
//! ```text
//!   scheduling / emergency / sweeper
//!                 │ commit
//!                 ▼
//!        NotificationPublisher::publish
//!                 │
//!        ┌────────┴────────┐
//!        ▼                 ▼
//!   dashboard A       dashboard B      (lagging receivers resync)
//! ```
//!
//! Delivery is fire-and-forget. A receiver that falls behind the channel
//! capacity loses the oldest updates and is expected to re-read the full
//! roster instead of replaying missed updates.

pub mod broadcaster;
pub mod publisher;
pub mod types;

pub use broadcaster::RosterBroadcaster;
pub use publisher::{NoopPublisher, NotificationPublisher};
pub use types::{RosterUpdate, UpdateCause};
