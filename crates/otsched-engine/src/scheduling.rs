//! Normal-priority intake.

use otsched_core::{Occupancy, SurgicalCase, TheatreId, UpdateCause, Urgency};
use time::Duration;
use tracing::{debug, info};

use crate::context::{Allocation, EngineContext, placed};
use crate::error::{AllocationError, CapacityGap, Result};
use crate::retry::transact;

/// Places non-emergency cases into the lowest-id free regular theatre with
/// the lowest-id free doctor.
#[derive(Debug, Clone)]
pub struct SchedulingService {
    ctx: EngineContext,
}

struct Placement {
    ot_id: TheatreId,
    occupancy: Occupancy,
}

impl SchedulingService {
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Schedules `case` for `duration_hours` starting now.
    ///
    /// Urgent and High urgencies are kept, anything else becomes Normal. On
    /// any error the roster is left untouched.
    pub async fn schedule_surgery(
        &self,
        mut case: SurgicalCase,
        duration_hours: f64,
    ) -> Result<Allocation> {
        let duration = self.validate_duration(duration_hours)?;
        case.urgency = match case.urgency {
            Urgency::Urgent | Urgency::High => case.urgency,
            Urgency::Normal | Urgency::Emergency => Urgency::Normal,
        };

        let committed = transact(
            &self.ctx.store,
            "schedule",
            self.ctx.settings.max_retries,
            |snapshot| {
                let roster = &snapshot.state;
                let ot = roster
                    .free_theatre(false)
                    .ok_or(AllocationError::no_capacity(CapacityGap::OperatingTheatre))?;
                let doctor = roster
                    .free_doctor()
                    .ok_or(AllocationError::no_capacity(CapacityGap::Doctor))?;

                let now = self.ctx.now();
                let estimated_free_at = now.checked_add(duration).ok_or_else(|| {
                    AllocationError::validation("surgery end time is out of range")
                })?;
                debug!(ot = %ot.name, doctor_id = doctor.id, case_id = %case.id, "Selected placement");
                Ok(Placement {
                    ot_id: ot.id,
                    occupancy: Occupancy {
                        case: case.clone(),
                        assigned_doctor_id: doctor.id,
                        start_time: now,
                        estimated_free_at,
                    },
                })
            },
            |roster, placement| {
                let start_time = placement.occupancy.start_time;
                roster.assign(placement.ot_id, placement.occupancy)?;
                placed(roster, placement.ot_id).map(|rows| (rows, start_time))
            },
        )
        .await?;

        let ((ot, doctor), start_time) = committed.value;
        info!(
            ot = %ot.name,
            doctor = %doctor.name,
            case_id = %case.id,
            urgency = %case.urgency,
            version = committed.snapshot.version,
            "Surgery scheduled"
        );
        self.ctx.announce(
            UpdateCause::Scheduled,
            &committed.snapshot,
            vec![ot.id],
            None,
            start_time,
        );

        Ok(Allocation {
            ot,
            doctor,
            interrupted: None,
            version: committed.snapshot.version,
        })
    }

    fn validate_duration(&self, hours: f64) -> Result<Duration> {
        let max = self.ctx.settings.duration_cap_hours();
        if !hours.is_finite() || hours <= 0.0 || hours > max {
            return Err(AllocationError::validation(format!(
                "duration must be greater than 0 and at most {max} hours, got {hours}"
            )));
        }
        Ok(Duration::seconds_f64(hours * 3600.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Harness, case};
    use crate::settings::SchedulerSettings;
    use otsched_core::{DoctorStatus, TheatreStatus};
    use time::macros::datetime;

    #[tokio::test]
    async fn test_schedules_lowest_free_theatre_and_doctor() {
        let harness = Harness::new(3, 2).await;
        let allocation = harness
            .scheduling()
            .schedule_surgery(case("c1", Urgency::Normal), 2.0)
            .await
            .unwrap();

        assert_eq!(allocation.ot.id, 1);
        assert_eq!(allocation.doctor.id, 1);
        assert_eq!(allocation.doctor.status, DoctorStatus::Assigned);
        assert_eq!(allocation.version, 2);

        let occupancy = allocation.ot.occupancy.unwrap();
        assert_eq!(occupancy.case.urgency, Urgency::Normal);
        assert_eq!(occupancy.start_time, harness.now());
        assert_eq!(occupancy.estimated_free_at, harness.now() + Duration::hours(2));
    }

    #[tokio::test]
    async fn test_urgency_normalization() {
        let harness = Harness::new(4, 4).await;
        let scheduling = harness.scheduling();

        for (requested, expected) in [
            (Urgency::Urgent, Urgency::Urgent),
            (Urgency::High, Urgency::High),
            (Urgency::Emergency, Urgency::Normal),
        ] {
            let allocation = scheduling
                .schedule_surgery(case("c", requested), 1.0)
                .await
                .unwrap();
            assert_eq!(allocation.ot.occupancy.unwrap().case.urgency, expected);
        }
    }

    #[tokio::test]
    async fn test_invalid_durations_are_rejected_before_roster_access() {
        let harness = Harness::new(2, 2).await;
        let scheduling = harness.scheduling();

        for hours in [0.0, -1.0, 12.5, f64::NAN, f64::INFINITY] {
            let err = scheduling
                .schedule_surgery(case("c", Urgency::Normal), hours)
                .await
                .unwrap_err();
            assert!(err.is_client_error(), "{hours} accepted");
        }
        assert!(scheduling.schedule_surgery(case("c", Urgency::Normal), 12.0).await.is_ok());
        assert_eq!(harness.store.version(), 2);
    }

    #[tokio::test]
    async fn test_oversized_cap_setting_is_clamped() {
        let harness = Harness::new(2, 2).await;
        let settings = SchedulerSettings {
            max_duration_hours: 1e12,
            ..SchedulerSettings::default()
        };
        let scheduling = SchedulingService::new(harness.ctx.clone().with_settings(settings));

        let err = scheduling
            .schedule_surgery(case("c", Urgency::Normal), 1e11)
            .await
            .unwrap_err();

        assert!(err.is_client_error());
        assert_eq!(harness.store.version(), 1);
    }

    #[tokio::test]
    async fn test_end_time_overflow_is_rejected() {
        let harness = Harness::new(2, 2).await;
        harness.clock.set(datetime!(9999-12-31 23:00 UTC));

        let err = harness
            .scheduling()
            .schedule_surgery(case("c", Urgency::Normal), 2.0)
            .await
            .unwrap_err();

        assert!(err.is_client_error());
        assert_eq!(harness.store.snapshot().state.occupied_theatre_count(), 0);
    }

    #[tokio::test]
    async fn test_no_free_regular_theatre() {
        // one regular theatre plus the dedicated one
        let harness = Harness::new(1, 3).await;
        let scheduling = harness.scheduling();
        scheduling
            .schedule_surgery(case("c1", Urgency::Normal), 1.0)
            .await
            .unwrap();
        let before = harness.store.snapshot();

        let err = scheduling
            .schedule_surgery(case("c2", Urgency::Normal), 1.0)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AllocationError::NoCapacity {
                gap: CapacityGap::OperatingTheatre
            }
        ));
        assert_eq!(harness.store.snapshot(), before);
        // the dedicated theatre is never used for normal cases
        let dedicated = before.state.free_theatre(true).unwrap();
        assert_eq!(dedicated.status, TheatreStatus::Free);
    }

    #[tokio::test]
    async fn test_no_free_doctor() {
        let harness = Harness::new(3, 1).await;
        let scheduling = harness.scheduling();
        scheduling
            .schedule_surgery(case("c1", Urgency::Normal), 1.0)
            .await
            .unwrap();

        let err = scheduling
            .schedule_surgery(case("c2", Urgency::Normal), 1.0)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No doctors available at this time");
    }

    #[tokio::test]
    async fn test_on_call_doctors_are_not_used() {
        let harness = Harness::with_on_call(3, 0, 1).await;
        let err = harness
            .scheduling()
            .schedule_surgery(case("c1", Urgency::Normal), 1.0)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AllocationError::NoCapacity {
                gap: CapacityGap::Doctor
            }
        ));
    }

    #[tokio::test]
    async fn test_publishes_only_on_success() {
        let harness = Harness::new(1, 1).await;
        let mut updates = harness.broadcaster.subscribe();
        let scheduling = harness.scheduling();

        scheduling
            .schedule_surgery(case("c1", Urgency::Normal), 1.0)
            .await
            .unwrap();
        let update = updates.try_recv().unwrap();
        assert_eq!(update.cause, UpdateCause::Scheduled);
        assert_eq!(update.version, 2);
        assert_eq!(update.theatres, vec![1]);

        scheduling
            .schedule_surgery(case("c2", Urgency::Normal), 1.0)
            .await
            .unwrap_err();
        assert!(updates.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_persistence_failure_leaves_roster_untouched() {
        let harness = Harness::new(2, 2).await;
        harness.persistence.fail_puts(true);

        let err = harness
            .scheduling()
            .schedule_surgery(case("c1", Urgency::Normal), 1.0)
            .await
            .unwrap_err();

        assert!(matches!(err, AllocationError::StorePersistence(_)));
        assert_eq!(harness.store.snapshot().state.occupied_theatre_count(), 0);
    }
}
