//! Shared fixtures for unit tests.

use std::sync::Arc;

use otsched_core::{
    Doctor, DoctorStatus, ManualClock, Occupancy, OperatingTheatre, RosterBroadcaster, RosterState,
    SurgicalCase, TheatreId, Urgency,
};
use otsched_db_memory::InMemoryPersistence;
use otsched_storage::ResourceStore;
use time::macros::datetime;
use time::{Duration, OffsetDateTime};

use crate::context::EngineContext;
use crate::emergency::EmergencyService;
use crate::scheduling::SchedulingService;
use crate::sweeper::LifecycleSweeper;

pub(crate) const START: OffsetDateTime = datetime!(2026-03-02 08:00 UTC);

pub(crate) fn case(id: &str, urgency: Urgency) -> SurgicalCase {
    SurgicalCase {
        id: id.to_string(),
        patient_name: format!("Patient {id}"),
        token: None,
        procedure: "Cholecystectomy".to_string(),
        urgency,
        notes: None,
    }
}

pub(crate) struct Harness {
    pub clock: Arc<ManualClock>,
    pub persistence: Arc<InMemoryPersistence>,
    pub store: Arc<ResourceStore>,
    pub broadcaster: Arc<RosterBroadcaster>,
    pub ctx: EngineContext,
}

impl Harness {
    /// `regular` theatres `1..=regular` plus dedicated theatre `regular + 1`,
    /// and `doctors` free doctors.
    pub async fn new(regular: u32, doctors: u32) -> Self {
        Self::with_on_call(regular, doctors, 0).await
    }

    /// Like [`Harness::new`], with `on_call` on-call doctors after the free ones.
    pub async fn with_on_call(regular: u32, free: u32, on_call: u32) -> Self {
        let doctors = (1..=free + on_call)
            .map(|id| {
                let doctor = Doctor::new(id, format!("Dr. {id}"), "General");
                if id > free {
                    doctor.with_status(DoctorStatus::OnCall)
                } else {
                    doctor
                }
            })
            .collect();
        let mut ots: Vec<OperatingTheatre> = (1..=regular)
            .map(|id| OperatingTheatre::new(id, format!("OT-{id}"), false))
            .collect();
        ots.push(OperatingTheatre::new(
            regular + 1,
            format!("OT-{}", regular + 1),
            true,
        ));
        Self::from_roster(RosterState::new(doctors, ots).unwrap()).await
    }

    pub async fn from_roster(roster: RosterState) -> Self {
        let clock = Arc::new(ManualClock::new(START));
        let persistence = InMemoryPersistence::new_shared();
        let store = Arc::new(
            ResourceStore::initialize(persistence.clone(), roster)
                .await
                .unwrap(),
        );
        let broadcaster = RosterBroadcaster::new_shared();
        let ctx = EngineContext::new(store.clone())
            .with_clock(clock.clone())
            .with_publisher(broadcaster.clone());
        Self {
            clock,
            persistence,
            store,
            broadcaster,
            ctx,
        }
    }

    pub fn now(&self) -> OffsetDateTime {
        use otsched_core::Clock;
        self.clock.now()
    }

    pub fn scheduling(&self) -> SchedulingService {
        SchedulingService::new(self.ctx.clone())
    }

    pub fn emergency(&self) -> EmergencyService {
        EmergencyService::new(self.ctx.clone())
    }

    pub fn sweeper(&self) -> LifecycleSweeper {
        LifecycleSweeper::new(self.ctx.clone())
    }

    /// Puts `doctor_id` into theatre `ot_id` with a case that started
    /// `elapsed` minutes ago and ends in `left` minutes.
    pub async fn occupy(
        &self,
        ot_id: TheatreId,
        doctor_id: u32,
        urgency: Urgency,
        elapsed: i64,
        left: i64,
    ) {
        let now = self.now();
        let occupancy = Occupancy {
            case: case(&format!("running-{ot_id}"), urgency),
            assigned_doctor_id: doctor_id,
            start_time: now - Duration::minutes(elapsed),
            estimated_free_at: now + Duration::minutes(left),
        };
        self.store
            .apply(|roster| roster.assign(ot_id, occupancy))
            .await
            .unwrap();
    }
}
