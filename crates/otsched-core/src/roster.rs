//! Roster model: doctors, operating theatres and the cases bound to them.
//!
//! The roster is a fixed set of rows created at initialization. Only the
//! status of a doctor and the occupancy of a theatre change afterwards, and
//! every change goes through [`RosterState::assign`] or
//! [`RosterState::release`] so that the doctor/theatre pairing stays
//! consistent.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::clock::whole_minutes_between;
use crate::error::{CoreError, Result};

pub type DoctorId = u32;
pub type TheatreId = u32;

// ============================================================================
// Enumerations
// ============================================================================

/// Clinical urgency of a surgical case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    #[default]
    Normal,
    Urgent,
    High,
    Emergency,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Normal => "normal",
            Urgency::Urgent => "urgent",
            Urgency::High => "high",
            Urgency::Emergency => "emergency",
        }
    }
}

impl std::fmt::Display for Urgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Availability of a doctor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DoctorStatus {
    /// Available for immediate assignment
    Free,
    /// Operating in exactly one theatre
    Assigned,
    /// Off the floor, reachable for emergencies only
    OnCall,
}

impl DoctorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DoctorStatus::Free => "free",
            DoctorStatus::Assigned => "assigned",
            DoctorStatus::OnCall => "on-call",
        }
    }
}

impl std::fmt::Display for DoctorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Availability of an operating theatre.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TheatreStatus {
    Free,
    Occupied,
}

impl TheatreStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TheatreStatus::Free => "free",
            TheatreStatus::Occupied => "occupied",
        }
    }
}

impl std::fmt::Display for TheatreStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Rows
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub id: DoctorId,
    pub name: String,
    pub specialty: String,
    pub status: DoctorStatus,
}

impl Doctor {
    pub fn new(id: DoctorId, name: impl Into<String>, specialty: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            specialty: specialty.into(),
            status: DoctorStatus::Free,
        }
    }

    pub fn with_status(mut self, status: DoctorStatus) -> Self {
        self.status = status;
        self
    }
}

/// A patient's surgical case as submitted at intake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurgicalCase {
    pub id: String,
    pub patient_name: String,
    /// Hospital queue token, if the patient came through the token desk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default)]
    pub procedure: String,
    #[serde(default)]
    pub urgency: Urgency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Binding of a case and a doctor to a theatre for a time interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occupancy {
    pub case: SurgicalCase,
    pub assigned_doctor_id: DoctorId,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub estimated_free_at: OffsetDateTime,
}

impl Occupancy {
    /// True once the scheduled end has been reached.
    pub fn is_due(&self, now: OffsetDateTime) -> bool {
        self.estimated_free_at <= now
    }

    pub fn minutes_left(&self, now: OffsetDateTime) -> i64 {
        whole_minutes_between(now, self.estimated_free_at)
    }

    pub fn minutes_elapsed(&self, now: OffsetDateTime) -> i64 {
        whole_minutes_between(self.start_time, now)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatingTheatre {
    pub id: TheatreId,
    pub name: String,
    /// Reserved for emergencies, used only when every other theatre is busy
    pub is_emergency_dedicated: bool,
    pub status: TheatreStatus,
    #[serde(default)]
    pub occupancy: Option<Occupancy>,
}

impl OperatingTheatre {
    pub fn new(id: TheatreId, name: impl Into<String>, is_emergency_dedicated: bool) -> Self {
        Self {
            id,
            name: name.into(),
            is_emergency_dedicated,
            status: TheatreStatus::Free,
            occupancy: None,
        }
    }

    pub fn is_free(&self) -> bool {
        self.status == TheatreStatus::Free
    }

    pub fn is_occupied(&self) -> bool {
        self.status == TheatreStatus::Occupied
    }

    pub fn doctor_id(&self) -> Option<DoctorId> {
        self.occupancy.as_ref().map(|o| o.assigned_doctor_id)
    }

    fn occupy(&mut self, occupancy: Occupancy) {
        self.status = TheatreStatus::Occupied;
        self.occupancy = Some(occupancy);
    }

    fn vacate(&mut self) -> Option<Occupancy> {
        self.status = TheatreStatus::Free;
        self.occupancy.take()
    }
}

/// A case removed from its theatre to make room for an emergency.
///
/// Carries what an external intake needs to put the case back on the
/// schedule as a high-priority request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterruptedCase {
    pub case: SurgicalCase,
    pub original_ot_id: TheatreId,
    pub original_ot: String,
    pub priority: Urgency,
    #[serde(with = "time::serde::rfc3339")]
    pub interrupted_at: OffsetDateTime,
    pub remaining_minutes: i64,
}

// ============================================================================
// Roster
// ============================================================================

/// The full doctor/theatre roster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterState {
    pub doctors: Vec<Doctor>,
    pub ots: Vec<OperatingTheatre>,
}

impl RosterState {
    /// Builds a roster and verifies every structural invariant.
    pub fn new(doctors: Vec<Doctor>, ots: Vec<OperatingTheatre>) -> Result<Self> {
        let state = Self { doctors, ots };
        state.check_invariants()?;
        Ok(state)
    }

    pub fn doctor(&self, id: DoctorId) -> Option<&Doctor> {
        self.doctors.iter().find(|d| d.id == id)
    }

    pub fn theatre(&self, id: TheatreId) -> Option<&OperatingTheatre> {
        self.ots.iter().find(|t| t.id == id)
    }

    /// Lowest-id doctor with status Free.
    pub fn free_doctor(&self) -> Option<&Doctor> {
        self.doctors
            .iter()
            .filter(|d| d.status == DoctorStatus::Free)
            .min_by_key(|d| d.id)
    }

    /// Lowest-id doctor with status OnCall.
    pub fn on_call_doctor(&self) -> Option<&Doctor> {
        self.doctors
            .iter()
            .filter(|d| d.status == DoctorStatus::OnCall)
            .min_by_key(|d| d.id)
    }

    /// Lowest-id free theatre, restricted to dedicated or regular theatres.
    pub fn free_theatre(&self, emergency_dedicated: bool) -> Option<&OperatingTheatre> {
        self.ots
            .iter()
            .filter(|t| t.is_free() && t.is_emergency_dedicated == emergency_dedicated)
            .min_by_key(|t| t.id)
    }

    pub fn occupied_theatres(&self) -> impl Iterator<Item = &OperatingTheatre> {
        self.ots.iter().filter(|t| t.is_occupied())
    }

    /// Ids of occupied theatres whose scheduled end is at or before `now`.
    pub fn due_theatres(&self, now: OffsetDateTime) -> Vec<TheatreId> {
        let mut due: Vec<TheatreId> = self
            .occupied_theatres()
            .filter(|t| t.occupancy.as_ref().is_some_and(|o| o.is_due(now)))
            .map(|t| t.id)
            .collect();
        due.sort_unstable();
        due
    }

    pub fn assigned_doctor_count(&self) -> usize {
        self.doctors
            .iter()
            .filter(|d| d.status == DoctorStatus::Assigned)
            .count()
    }

    pub fn occupied_theatre_count(&self) -> usize {
        self.occupied_theatres().count()
    }

    /// Binds `occupancy` to a free theatre and marks its doctor Assigned.
    ///
    /// The doctor may be Free or OnCall. Nothing is modified on error.
    pub fn assign(&mut self, theatre_id: TheatreId, occupancy: Occupancy) -> Result<()> {
        let doctor_id = occupancy.assigned_doctor_id;

        let theatre_idx = self
            .ots
            .iter()
            .position(|t| t.id == theatre_id)
            .ok_or(CoreError::TheatreNotFound(theatre_id))?;
        let doctor_idx = self
            .doctors
            .iter()
            .position(|d| d.id == doctor_id)
            .ok_or(CoreError::DoctorNotFound(doctor_id))?;

        if !self.ots[theatre_idx].is_free() {
            return Err(CoreError::TheatreOccupied(theatre_id));
        }
        if self.doctors[doctor_idx].status == DoctorStatus::Assigned {
            return Err(CoreError::DoctorAssigned(doctor_id));
        }

        self.ots[theatre_idx].occupy(occupancy);
        self.doctors[doctor_idx].status = DoctorStatus::Assigned;
        Ok(())
    }

    /// Clears a theatre's occupancy and frees the doctor it referenced.
    pub fn release(&mut self, theatre_id: TheatreId) -> Result<Occupancy> {
        let theatre = self
            .ots
            .iter_mut()
            .find(|t| t.id == theatre_id)
            .ok_or(CoreError::TheatreNotFound(theatre_id))?;
        if !theatre.is_occupied() {
            return Err(CoreError::TheatreVacant(theatre_id));
        }
        let occupancy = theatre
            .vacate()
            .ok_or(CoreError::TheatreVacant(theatre_id))?;

        if let Some(doctor) = self
            .doctors
            .iter_mut()
            .find(|d| d.id == occupancy.assigned_doctor_id)
        {
            doctor.status = DoctorStatus::Free;
        }
        Ok(occupancy)
    }

    /// Verifies the roster-wide invariants:
    ///
    /// - doctor and theatre ids are unique
    /// - exactly one theatre is emergency-dedicated
    /// - a theatre is Occupied iff it carries an occupancy
    /// - every occupancy references an existing, Assigned doctor
    /// - no doctor is referenced by two occupied theatres
    /// - every Assigned doctor is referenced by an occupied theatre
    pub fn check_invariants(&self) -> Result<()> {
        let mut doctor_ids = HashSet::new();
        for doctor in &self.doctors {
            if !doctor_ids.insert(doctor.id) {
                return Err(CoreError::invariant(format!("duplicate doctor id {}", doctor.id)));
            }
        }

        let mut theatre_ids = HashSet::new();
        for theatre in &self.ots {
            if !theatre_ids.insert(theatre.id) {
                return Err(CoreError::invariant(format!(
                    "duplicate theatre id {}",
                    theatre.id
                )));
            }
        }

        let dedicated = self.ots.iter().filter(|t| t.is_emergency_dedicated).count();
        if dedicated != 1 {
            return Err(CoreError::invariant(format!(
                "expected exactly one emergency-dedicated theatre, found {dedicated}"
            )));
        }

        let mut referenced = HashSet::new();
        for theatre in &self.ots {
            match (theatre.status, &theatre.occupancy) {
                (TheatreStatus::Occupied, Some(occupancy)) => {
                    let doctor_id = occupancy.assigned_doctor_id;
                    match self.doctor(doctor_id) {
                        Some(d) if d.status == DoctorStatus::Assigned => {}
                        Some(d) => {
                            return Err(CoreError::invariant(format!(
                                "{} references doctor {} with status {}",
                                theatre.name, doctor_id, d.status
                            )));
                        }
                        None => {
                            return Err(CoreError::invariant(format!(
                                "{} references unknown doctor {}",
                                theatre.name, doctor_id
                            )));
                        }
                    }
                    if !referenced.insert(doctor_id) {
                        return Err(CoreError::invariant(format!(
                            "doctor {doctor_id} is assigned to more than one theatre"
                        )));
                    }
                }
                (TheatreStatus::Free, None) => {}
                (status, _) => {
                    return Err(CoreError::invariant(format!(
                        "{} has status {} inconsistent with its occupancy",
                        theatre.name, status
                    )));
                }
            }
        }

        if let Some(orphan) = self
            .doctors
            .iter()
            .find(|d| d.status == DoctorStatus::Assigned && !referenced.contains(&d.id))
        {
            return Err(CoreError::invariant(format!(
                "doctor {} is Assigned but no theatre references them",
                orphan.id
            )));
        }

        Ok(())
    }
}
