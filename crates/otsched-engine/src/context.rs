use std::sync::Arc;

use otsched_core::{
    Clock, CoreError, Doctor, InterruptedCase, NoopPublisher, NotificationPublisher, OperatingTheatre,
    RosterState, RosterUpdate, SystemClock, TheatreId, UpdateCause,
};
use otsched_storage::{ResourceStore, Snapshot};
use time::OffsetDateTime;

use crate::preemption::ScoringPolicy;
use crate::settings::SchedulerSettings;

/// Everything a service needs to read, decide, commit and announce.
#[derive(Clone)]
pub struct EngineContext {
    pub store: Arc<ResourceStore>,
    pub clock: Arc<dyn Clock>,
    pub publisher: Arc<dyn NotificationPublisher>,
    pub settings: SchedulerSettings,
    pub policy: ScoringPolicy,
}

impl EngineContext {
    /// Context with the system clock, default tunables and no subscribers.
    pub fn new(store: Arc<ResourceStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            publisher: Arc::new(NoopPublisher),
            settings: SchedulerSettings::default(),
            policy: ScoringPolicy::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn NotificationPublisher>) -> Self {
        self.publisher = publisher;
        self
    }

    pub fn with_settings(mut self, settings: SchedulerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_policy(mut self, policy: ScoringPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub(crate) fn now(&self) -> OffsetDateTime {
        self.clock.now()
    }

    pub(crate) fn announce(
        &self,
        cause: UpdateCause,
        snapshot: &Snapshot,
        theatres: Vec<TheatreId>,
        interrupted: Option<InterruptedCase>,
        at: OffsetDateTime,
    ) {
        let update = RosterUpdate::new(cause, snapshot.version, RosterState::clone(&snapshot.state))
            .with_theatres(theatres)
            .with_interrupted(interrupted)
            .at(at);
        self.publisher.publish(update);
    }
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("store", &self.store)
            .field("clock", &self.clock)
            .field("settings", &self.settings)
            .field("policy", &self.policy)
            .finish()
    }
}

/// A committed placement, as the roster looks right after the commit.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub ot: OperatingTheatre,
    pub doctor: Doctor,
    /// Case removed from its theatre to make room, emergencies only
    pub interrupted: Option<InterruptedCase>,
    /// Store version of the commit
    pub version: u64,
}

/// Reads back the theatre and doctor bound by a placement just made.
pub(crate) fn placed(
    roster: &RosterState,
    ot_id: TheatreId,
) -> Result<(OperatingTheatre, Doctor), CoreError> {
    let ot = roster
        .theatre(ot_id)
        .ok_or(CoreError::TheatreNotFound(ot_id))?;
    let doctor_id = ot.doctor_id().ok_or(CoreError::TheatreVacant(ot_id))?;
    let doctor = roster
        .doctor(doctor_id)
        .ok_or(CoreError::DoctorNotFound(doctor_id))?;
    Ok((ot.clone(), doctor.clone()))
}
