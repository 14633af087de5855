//! # otsched-engine
//!
//! Operating theatre and doctor allocation.
//!
//! Every mutating operation follows the same discipline: decide against one
//! [`Snapshot`](otsched_storage::Snapshot) of the roster, commit the decision
//! atomically through the [`ResourceStore`](otsched_storage::ResourceStore)
//! if the roster has not moved on, otherwise decide again. Successful commits
//! are announced through the context's
//! [`NotificationPublisher`](otsched_core::NotificationPublisher).
//!
//! - [`SchedulingService`]: normal-priority cases
//! - [`EmergencyService`]: emergencies, preempting via [`select_victim`] when needed
//! - [`LifecycleSweeper`]: periodic release of finished cases
//! - [`AllocationEngine`]: request/response facade over all of the above

mod context;
pub mod emergency;
pub mod error;
pub mod intake;
pub mod preemption;
mod retry;
pub mod scheduling;
pub mod settings;
pub mod sweeper;

#[cfg(test)]
mod testing;

pub use context::{Allocation, EngineContext};
pub use emergency::EmergencyService;
pub use error::{AllocationError, CapacityGap, ErrorCategory, Result};
pub use intake::{
    AllocationEngine, CaseIntake, Dashboard, EmergencyRequest, IntakeResponse, ScheduleRequest,
};
pub use preemption::{ScoringPolicy, Victim, select_victim};
pub use scheduling::SchedulingService;
pub use settings::SchedulerSettings;
pub use sweeper::{LifecycleSweeper, SweeperHandle};
