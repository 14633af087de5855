//! Victim selection for emergencies that find no free resource.
//!
//! Scoring is a pure function of the roster and the current instant. The
//! selector never mutates anything; the emergency service turns the returned
//! [`Victim`] into roster transitions inside its own commit.

use otsched_core::{
    Doctor, InterruptedCase, Occupancy, OperatingTheatre, Urgency, whole_minutes_between,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Constants of the interruptibility score. Higher scores are interrupted first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    pub base_score: f64,
    pub high_divisor: f64,
    pub urgent_divisor: f64,
    /// Cases with fewer minutes left than this are nearly done
    pub near_complete_minutes: i64,
    pub near_complete_factor: f64,
    /// Cases running for fewer minutes than this have just started
    pub just_started_minutes: i64,
    pub just_started_factor: f64,
    /// Length of a typical surgery; remaining time is scaled against it
    pub nominal_minutes: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            base_score: 100.0,
            high_divisor: 3.0,
            urgent_divisor: 2.0,
            near_complete_minutes: 20,
            near_complete_factor: 0.2,
            just_started_minutes: 15,
            just_started_factor: 0.7,
            nominal_minutes: 120.0,
        }
    }
}

impl ScoringPolicy {
    /// Returns a description of the first non-positive constant, if any.
    pub fn validate(&self) -> Result<(), String> {
        let constants = [
            ("base_score", self.base_score),
            ("high_divisor", self.high_divisor),
            ("urgent_divisor", self.urgent_divisor),
            ("near_complete_factor", self.near_complete_factor),
            ("just_started_factor", self.just_started_factor),
            ("nominal_minutes", self.nominal_minutes),
        ];
        for (name, value) in constants {
            if !(value.is_finite() && value > 0.0) {
                return Err(format!("preemption.{name} must be positive, got {value}"));
            }
        }
        if self.near_complete_minutes < 0 || self.just_started_minutes < 0 {
            return Err("preemption minute thresholds must not be negative".to_string());
        }
        Ok(())
    }

    fn divisor(&self, urgency: Urgency) -> f64 {
        match urgency {
            Urgency::High => self.high_divisor,
            Urgency::Urgent => self.urgent_divisor,
            Urgency::Normal | Urgency::Emergency => 1.0,
        }
    }

    /// Interruptibility of one ongoing occupancy at `now`.
    pub fn score(&self, occupancy: &Occupancy, now: OffsetDateTime) -> f64 {
        let time_left = whole_minutes_between(now, occupancy.estimated_free_at);
        let elapsed = whole_minutes_between(occupancy.start_time, now);

        let mut score = self.base_score / self.divisor(occupancy.case.urgency);
        if time_left < self.near_complete_minutes {
            score *= self.near_complete_factor;
        }
        if elapsed < self.just_started_minutes {
            score *= self.just_started_factor;
        }
        score * (time_left as f64 / self.nominal_minutes)
    }
}

/// The occupancy chosen for interruption, as it stood before interruption.
#[derive(Debug, Clone, PartialEq)]
pub struct Victim {
    pub ot: OperatingTheatre,
    pub doctor: Option<Doctor>,
    pub interrupted_case: InterruptedCase,
    pub remaining_minutes: i64,
    pub score: f64,
}

/// Picks the most interruptible ongoing case among `ots`.
///
/// Only occupied, non-dedicated theatres running a non-emergency case are
/// candidates. The highest score wins and ties go to the lowest theatre id.
/// Returns `None` when there is no candidate.
pub fn select_victim(
    ots: &[OperatingTheatre],
    doctors: &[Doctor],
    now: OffsetDateTime,
    policy: &ScoringPolicy,
) -> Option<Victim> {
    let mut candidates: Vec<(&OperatingTheatre, &Occupancy)> = ots
        .iter()
        .filter(|ot| ot.is_occupied() && !ot.is_emergency_dedicated)
        .filter_map(|ot| ot.occupancy.as_ref().map(|occ| (ot, occ)))
        .filter(|(_, occ)| occ.case.urgency != Urgency::Emergency)
        .collect();
    candidates.sort_by_key(|(ot, _)| ot.id);

    let mut best: Option<(&OperatingTheatre, &Occupancy, f64)> = None;
    for (ot, occupancy) in candidates {
        let score = policy.score(occupancy, now);
        match best {
            Some((_, _, best_score)) if score <= best_score => {}
            _ => best = Some((ot, occupancy, score)),
        }
    }

    let (ot, occupancy, score) = best?;
    let remaining_minutes = whole_minutes_between(now, occupancy.estimated_free_at).max(0);
    Some(Victim {
        ot: ot.clone(),
        doctor: doctors
            .iter()
            .find(|d| d.id == occupancy.assigned_doctor_id)
            .cloned(),
        interrupted_case: InterruptedCase {
            case: occupancy.case.clone(),
            original_ot_id: ot.id,
            original_ot: ot.name.clone(),
            priority: Urgency::High,
            interrupted_at: now,
            remaining_minutes,
        },
        remaining_minutes,
        score,
    })
}
