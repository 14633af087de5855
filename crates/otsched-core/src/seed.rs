//! Initial roster construction.

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::error::{CoreError, Result};
use crate::roster::{
    Doctor, DoctorStatus, Occupancy, OperatingTheatre, RosterState, SurgicalCase, Urgency,
};

const DEFAULT_DOCTORS: [(&str, &str); 12] = [
    ("Dr. Smith", "Cardiology"),
    ("Dr. Johnson", "Neurosurgery"),
    ("Dr. Lee", "Orthopedics"),
    ("Dr. Patel", "General"),
    ("Dr. Garcia", "Vascular"),
    ("Dr. Kim", "ENT"),
    ("Dr. Wong", "Urology"),
    ("Dr. Martinez", "Pediatric"),
    ("Dr. Brown", "Plastic"),
    ("Dr. Davis", "Thoracic"),
    ("Dr. Wilson", "Trauma"),
    ("Dr. Taylor", "Oncology"),
];

const DEFAULT_ON_CALL: usize = 2;
const DEFAULT_THEATRES: u32 = 10;

const DEMO_CASES: [(&str, Urgency); 4] = [
    ("Appendectomy", Urgency::Normal),
    ("Bypass", Urgency::Urgent),
    ("Hip Replacement", Urgency::High),
    ("Cataract Removal", Urgency::Normal),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorSeed {
    pub name: String,
    pub specialty: String,
    #[serde(default)]
    pub on_call: bool,
}

/// Description of the fixed roster created before first use.
///
/// Doctors get ids `1..=n` in list order. Theatres are named `OT-1` to
/// `OT-m` and the last one is the emergency-dedicated theatre.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterSeed {
    #[serde(default = "default_doctors")]
    pub doctors: Vec<DoctorSeed>,
    #[serde(default = "default_theatres")]
    pub theatres: u32,
    /// Start with a few theatres already in use, for demos
    #[serde(default)]
    pub demo_occupancy: bool,
}

fn default_doctors() -> Vec<DoctorSeed> {
    let on_call_from = DEFAULT_DOCTORS.len() - DEFAULT_ON_CALL;
    DEFAULT_DOCTORS
        .iter()
        .enumerate()
        .map(|(i, (name, specialty))| DoctorSeed {
            name: (*name).to_string(),
            specialty: (*specialty).to_string(),
            on_call: i >= on_call_from,
        })
        .collect()
}

fn default_theatres() -> u32 {
    DEFAULT_THEATRES
}

impl Default for RosterSeed {
    fn default() -> Self {
        Self::hospital_default()
    }
}

impl RosterSeed {
    /// Twelve doctors (the last two on call) and ten theatres.
    pub fn hospital_default() -> Self {
        Self {
            doctors: default_doctors(),
            theatres: DEFAULT_THEATRES,
            demo_occupancy: false,
        }
    }

    pub fn with_demo_occupancy(mut self, enabled: bool) -> Self {
        self.demo_occupancy = enabled;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.doctors.is_empty() {
            return Err(CoreError::invalid_roster("roster needs at least one doctor"));
        }
        if self.theatres < 2 {
            return Err(CoreError::invalid_roster(
                "roster needs at least one regular and one emergency-dedicated theatre",
            ));
        }
        if let Some(blank) = self.doctors.iter().position(|d| d.name.trim().is_empty()) {
            return Err(CoreError::invalid_roster(format!(
                "doctor #{} has an empty name",
                blank + 1
            )));
        }
        Ok(())
    }

    /// Builds the roster, placing demo cases relative to `now` when enabled.
    pub fn build(&self, now: OffsetDateTime) -> Result<RosterState> {
        self.validate()?;

        let doctors = self
            .doctors
            .iter()
            .zip(1..)
            .map(|(seed, id)| {
                let status = if seed.on_call {
                    DoctorStatus::OnCall
                } else {
                    DoctorStatus::Free
                };
                Doctor::new(id, seed.name.clone(), seed.specialty.clone()).with_status(status)
            })
            .collect();

        let ots = (1..=self.theatres)
            .map(|id| OperatingTheatre::new(id, format!("OT-{id}"), id == self.theatres))
            .collect();

        let mut state = RosterState::new(doctors, ots)?;
        if self.demo_occupancy {
            place_demo_cases(&mut state, now)?;
        }
        Ok(state)
    }
}

fn place_demo_cases(state: &mut RosterState, now: OffsetDateTime) -> Result<()> {
    for (i, (procedure, urgency)) in DEMO_CASES.iter().enumerate() {
        let (Some(theatre), Some(doctor)) = (state.free_theatre(false), state.free_doctor())
        else {
            break;
        };
        let (theatre_id, doctor_id) = (theatre.id, doctor.id);
        let offset = i as i64;
        let case = SurgicalCase {
            id: format!("P{}", 1000 + offset),
            patient_name: format!("Patient {}", 1000 + offset),
            token: Some(format!("TKN{}", 1000 + offset)),
            procedure: (*procedure).to_string(),
            urgency: *urgency,
            notes: None,
        };
        state.assign(
            theatre_id,
            Occupancy {
                case,
                assigned_doctor_id: doctor_id,
                start_time: now - Duration::minutes(30 + 15 * offset),
                estimated_free_at: now + Duration::hours(1 + offset % 3),
            },
        )?;
    }
    Ok(())
}
