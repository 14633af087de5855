//! Emergency intake with preemption as the last resort.

use otsched_core::{
    DoctorId, InterruptedCase, Occupancy, RosterState, SurgicalCase, TheatreId, UpdateCause,
    Urgency, emergency_token,
};
use time::OffsetDateTime;
use tracing::{debug, error, info, warn};

use crate::context::{Allocation, EngineContext, placed};
use crate::error::{AllocationError, Result};
use crate::preemption::select_victim;
use crate::retry::transact;

/// Places emergency cases, interrupting the least critical ongoing case
/// when no free doctor or theatre is left.
#[derive(Debug, Clone)]
pub struct EmergencyService {
    ctx: EngineContext,
}

/// Everything one emergency commit does, decided against one snapshot.
#[derive(Debug)]
struct EmergencyPlan {
    ot_id: TheatreId,
    occupancy: Occupancy,
    /// Theatre to clear before placing, with the record of what it ran
    preempt: Option<(TheatreId, InterruptedCase)>,
}

impl EmergencyService {
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Places `case` as an emergency starting now.
    ///
    /// Resolution order: a Free doctor, else an OnCall doctor; a free regular
    /// theatre, else the dedicated theatre. If either is still missing the
    /// least critical ongoing case is interrupted once to cover the gap.
    /// Fails with [`AllocationError::Unavailable`] when nothing can be
    /// interrupted, leaving the roster untouched.
    pub async fn handle_emergency(&self, mut case: SurgicalCase) -> Result<Allocation> {
        case.urgency = Urgency::Emergency;
        if case.token.as_deref().is_none_or(str::is_empty) {
            case.token = Some(emergency_token());
        }

        let result = transact(
            &self.ctx.store,
            "emergency",
            self.ctx.settings.max_retries,
            |snapshot| self.plan(&snapshot.state, &case, self.ctx.now()),
            |roster, plan| {
                if let Some((victim_ot, _)) = &plan.preempt {
                    roster.release(*victim_ot)?;
                }
                let start_time = plan.occupancy.start_time;
                roster.assign(plan.ot_id, plan.occupancy)?;
                let rows = placed(roster, plan.ot_id)?;
                Ok((rows, plan.preempt.map(|(_, record)| record), start_time))
            },
        )
        .await;

        let committed = match result {
            Ok(committed) => committed,
            Err(AllocationError::Unavailable) => {
                error!(
                    case_id = %case.id,
                    token = case.token.as_deref().unwrap_or_default(),
                    "Emergency could not be placed: no free resource and nothing to interrupt"
                );
                return Err(AllocationError::Unavailable);
            }
            Err(e) => return Err(e),
        };

        let ((ot, doctor), interrupted, start_time) = committed.value;
        if let Some(record) = &interrupted {
            warn!(
                original_ot = %record.original_ot,
                case_id = %record.case.id,
                remaining_minutes = record.remaining_minutes,
                "Interrupted case for emergency"
            );
        }
        info!(
            ot = %ot.name,
            doctor = %doctor.name,
            case_id = %case.id,
            preempted = interrupted.is_some(),
            version = committed.snapshot.version,
            "Emergency surgery scheduled"
        );

        let mut touched = vec![ot.id];
        if let Some(record) = &interrupted {
            if record.original_ot_id != ot.id {
                touched.push(record.original_ot_id);
            }
        }
        self.ctx.announce(
            UpdateCause::Emergency,
            &committed.snapshot,
            touched,
            interrupted.clone(),
            start_time,
        );

        Ok(Allocation {
            ot,
            doctor,
            interrupted,
            version: committed.snapshot.version,
        })
    }

    fn plan(
        &self,
        roster: &RosterState,
        case: &SurgicalCase,
        now: OffsetDateTime,
    ) -> Result<EmergencyPlan> {
        let mut doctor_id: Option<DoctorId> = roster
            .free_doctor()
            .or_else(|| roster.on_call_doctor())
            .map(|d| d.id);
        let mut ot_id: Option<TheatreId> = roster
            .free_theatre(false)
            .or_else(|| roster.free_theatre(true))
            .map(|t| t.id);

        let mut preempt = None;
        if doctor_id.is_none() || ot_id.is_none() {
            let victim = select_victim(&roster.ots, &roster.doctors, now, &self.ctx.policy)
                .ok_or(AllocationError::Unavailable)?;
            debug!(
                ot = %victim.ot.name,
                score = victim.score,
                remaining_minutes = victim.remaining_minutes,
                "Selected case to interrupt"
            );
            doctor_id = doctor_id.or(victim.doctor.as_ref().map(|d| d.id));
            ot_id = ot_id.or(Some(victim.ot.id));
            preempt = Some((victim.ot.id, victim.interrupted_case));
        }

        let (Some(doctor_id), Some(ot_id)) = (doctor_id, ot_id) else {
            return Err(AllocationError::Unavailable);
        };
        let estimated_free_at = self
            .ctx
            .settings
            .emergency_duration()
            .and_then(|duration| now.checked_add(duration))
            .ok_or_else(|| AllocationError::validation("emergency end time is out of range"))?;
        Ok(EmergencyPlan {
            ot_id,
            occupancy: Occupancy {
                case: case.clone(),
                assigned_doctor_id: doctor_id,
                start_time: now,
                estimated_free_at,
            },
            preempt,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SchedulerSettings;
    use crate::testing::{Harness, case};
    use otsched_core::DoctorStatus;
    use time::Duration;

    #[tokio::test]
    async fn test_free_resources_need_no_preemption() {
        let harness = Harness::new(2, 2).await;
        let allocation = harness
            .emergency()
            .handle_emergency(case("e1", Urgency::Normal))
            .await
            .unwrap();

        assert_eq!(allocation.ot.id, 1);
        assert_eq!(allocation.doctor.id, 1);
        assert!(allocation.interrupted.is_none());

        let occupancy = allocation.ot.occupancy.unwrap();
        assert_eq!(occupancy.case.urgency, Urgency::Emergency);
        assert_eq!(occupancy.estimated_free_at, harness.now() + Duration::hours(2));
        let token = occupancy.case.token.unwrap();
        assert!(token.starts_with("EMERG-"), "{token}");
    }

    #[tokio::test]
    async fn test_supplied_token_is_kept() {
        let harness = Harness::new(1, 1).await;
        let mut intake = case("e1", Urgency::Normal);
        intake.token = Some("T-042".to_string());

        let allocation = harness.emergency().handle_emergency(intake).await.unwrap();
        assert_eq!(
            allocation.ot.occupancy.unwrap().case.token.as_deref(),
            Some("T-042")
        );
    }

    #[tokio::test]
    async fn test_on_call_doctor_is_promoted() {
        let harness = Harness::with_on_call(2, 1, 1).await;
        harness.occupy(1, 1, Urgency::Normal, 30, 60).await;

        let allocation = harness
            .emergency()
            .handle_emergency(case("e1", Urgency::Normal))
            .await
            .unwrap();

        assert_eq!(allocation.doctor.id, 2);
        assert_eq!(allocation.doctor.status, DoctorStatus::Assigned);
        assert_eq!(allocation.ot.id, 2);
        assert!(allocation.interrupted.is_none());
    }

    #[tokio::test]
    async fn test_dedicated_theatre_is_used_last() {
        let harness = Harness::new(1, 2).await;
        harness.occupy(1, 1, Urgency::Normal, 30, 60).await;

        let allocation = harness
            .emergency()
            .handle_emergency(case("e1", Urgency::Normal))
            .await
            .unwrap();

        assert!(allocation.ot.is_emergency_dedicated);
        assert_eq!(allocation.doctor.id, 2);
        assert!(allocation.interrupted.is_none());
    }

    #[tokio::test]
    async fn test_doctor_gap_preempts_least_critical_case() {
        // two regular theatres busy, dedicated theatre free, no spare doctor
        let harness = Harness::new(2, 2).await;
        harness.occupy(1, 1, Urgency::High, 5, 100).await;
        harness.occupy(2, 2, Urgency::Normal, 40, 90).await;
        let mut updates = harness.broadcaster.subscribe();

        let allocation = harness
            .emergency()
            .handle_emergency(case("e1", Urgency::Normal))
            .await
            .unwrap();

        // doctor 2 leaves OT-2 and takes the dedicated theatre
        assert_eq!(allocation.doctor.id, 2);
        assert_eq!(allocation.ot.id, 3);
        let record = allocation.interrupted.unwrap();
        assert_eq!(record.original_ot, "OT-2");
        assert_eq!(record.priority, Urgency::High);
        assert_eq!(record.remaining_minutes, 90);

        let state = harness.store.snapshot().state.clone();
        assert!(state.theatre(2).unwrap().is_free());
        assert!(state.theatre(1).unwrap().is_occupied());
        assert_eq!(state.assigned_doctor_count(), state.occupied_theatre_count());

        let update = updates.try_recv().unwrap();
        assert_eq!(update.cause, UpdateCause::Emergency);
        assert_eq!(update.theatres, vec![3, 2]);
        assert_eq!(update.interrupted.unwrap().original_ot_id, 2);
    }

    #[tokio::test]
    async fn test_theatre_gap_reuses_victim_theatre() {
        // every theatre busy, one doctor still free
        let harness = Harness::new(1, 3).await;
        harness.occupy(1, 1, Urgency::Urgent, 30, 60).await;
        harness.occupy(2, 2, Urgency::Normal, 30, 60).await;

        let allocation = harness
            .emergency()
            .handle_emergency(case("e1", Urgency::Normal))
            .await
            .unwrap();

        // the dedicated theatre is never a victim, so OT-1 is interrupted
        assert_eq!(allocation.ot.id, 1);
        assert_eq!(allocation.doctor.id, 3);
        let state = harness.store.snapshot().state.clone();
        assert_eq!(state.doctor(1).unwrap().status, DoctorStatus::Free);
        assert!(state.theatre(2).unwrap().is_occupied());
        assert_eq!(allocation.interrupted.unwrap().original_ot_id, 1);
    }

    #[tokio::test]
    async fn test_full_roster_victim_supplies_theatre_and_doctor() {
        // dedicated OT-3 already runs an emergency, no free or on-call doctor
        let harness = Harness::new(2, 3).await;
        harness.occupy(1, 1, Urgency::Normal, 40, 90).await;
        harness.occupy(2, 2, Urgency::High, 5, 100).await;
        harness.occupy(3, 3, Urgency::Emergency, 10, 60).await;
        let running_b = harness.store.snapshot().state.theatre(2).unwrap().clone();

        let allocation = harness
            .emergency()
            .handle_emergency(case("e1", Urgency::Normal))
            .await
            .unwrap();

        assert_eq!(allocation.ot.id, 1);
        assert_eq!(allocation.doctor.id, 1);
        let record = allocation.interrupted.unwrap();
        assert_eq!(record.original_ot_id, 1);
        assert_eq!(record.original_ot, "OT-1");
        assert_eq!(record.case.id, "running-1");
        assert_eq!(record.remaining_minutes, 90);

        let state = harness.store.snapshot().state.clone();
        assert_eq!(state.theatre(2).unwrap(), &running_b);
        assert_eq!(
            state.theatre(1).unwrap().occupancy.as_ref().unwrap().case.urgency,
            Urgency::Emergency
        );
        assert_eq!(state.occupied_theatre_count(), 3);
        assert_eq!(state.assigned_doctor_count(), state.occupied_theatre_count());
        state.check_invariants().unwrap();
    }

    #[tokio::test]
    async fn test_overflowing_emergency_duration_is_rejected() {
        let harness = Harness::new(2, 2).await;
        let settings = SchedulerSettings {
            emergency_duration_minutes: i64::MAX / 2,
            ..SchedulerSettings::default()
        };
        let emergency = EmergencyService::new(harness.ctx.clone().with_settings(settings));

        let err = emergency
            .handle_emergency(case("e1", Urgency::Normal))
            .await
            .unwrap_err();

        assert!(err.is_client_error());
        assert_eq!(harness.store.version(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_when_only_emergencies_are_running() {
        let harness = Harness::new(1, 2).await;
        let emergency = harness.emergency();
        emergency.handle_emergency(case("e1", Urgency::Normal)).await.unwrap();
        emergency.handle_emergency(case("e2", Urgency::Normal)).await.unwrap();
        let before = harness.store.snapshot();
        let mut updates = harness.broadcaster.subscribe();

        let err = emergency
            .handle_emergency(case("e3", Urgency::Normal))
            .await
            .unwrap_err();

        assert!(matches!(err, AllocationError::Unavailable));
        assert!(err.is_alertable());
        assert_eq!(harness.store.snapshot(), before);
        assert!(updates.try_recv().is_err());
    }
}
