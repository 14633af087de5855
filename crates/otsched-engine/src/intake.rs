//! Intake API: request and response shapes and the engine facade that
//! routes requests to the services.

use otsched_core::{
    Doctor, InterruptedCase, OperatingTheatre, SurgicalCase, Urgency, generate_id,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::context::{Allocation, EngineContext};
use crate::emergency::EmergencyService;
use crate::error::{AllocationError, Result};
use crate::scheduling::SchedulingService;
use crate::sweeper::LifecycleSweeper;

/// A case as submitted by the front desk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseIntake {
    #[serde(default)]
    pub id: Option<String>,
    pub patient_name: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub procedure: String,
    #[serde(default)]
    pub urgency: Option<Urgency>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CaseIntake {
    pub fn new(patient_name: impl Into<String>) -> Self {
        Self {
            patient_name: patient_name.into(),
            ..Self::default()
        }
    }

    pub fn with_procedure(mut self, procedure: impl Into<String>) -> Self {
        self.procedure = procedure.into();
        self
    }

    pub fn with_urgency(mut self, urgency: Urgency) -> Self {
        self.urgency = Some(urgency);
        self
    }

    /// Validates the intake and fills in a generated id when none was given.
    pub fn into_case(self) -> Result<SurgicalCase> {
        let patient_name = self.patient_name.trim().to_string();
        if patient_name.is_empty() {
            return Err(AllocationError::validation("patientName is required"));
        }
        let id = self
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(generate_id);
        Ok(SurgicalCase {
            id,
            patient_name,
            token: self.token.filter(|t| !t.trim().is_empty()),
            procedure: self.procedure,
            urgency: self.urgency.unwrap_or_default(),
            notes: self.notes,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRequest {
    pub case: CaseIntake,
    pub duration_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyRequest {
    pub case: CaseIntake,
}

/// Outcome of an intake request, success or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ot: Option<OperatingTheatre>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor: Option<Doctor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interrupted: Option<InterruptedCase>,
}

impl IntakeResponse {
    fn placed(message: String, allocation: Allocation) -> Self {
        Self {
            success: true,
            message,
            ot: Some(allocation.ot),
            doctor: Some(allocation.doctor),
            interrupted: allocation.interrupted,
        }
    }

    fn failed(error: &AllocationError) -> Self {
        Self {
            success: false,
            message: error.to_string(),
            ot: None,
            doctor: None,
            interrupted: None,
        }
    }
}

/// Full roster view, also the resync point for lagging subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub version: u64,
    pub doctors: Vec<Doctor>,
    pub ots: Vec<OperatingTheatre>,
}

/// Front door of the allocation engine.
#[derive(Debug, Clone)]
pub struct AllocationEngine {
    ctx: EngineContext,
    scheduling: SchedulingService,
    emergency: EmergencyService,
}

impl AllocationEngine {
    pub fn new(ctx: EngineContext) -> Self {
        Self {
            scheduling: SchedulingService::new(ctx.clone()),
            emergency: EmergencyService::new(ctx.clone()),
            ctx,
        }
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    /// A sweeper bound to the same store, clock and publisher.
    pub fn sweeper(&self) -> LifecycleSweeper {
        LifecycleSweeper::new(self.ctx.clone())
    }

    pub async fn schedule(&self, request: ScheduleRequest) -> IntakeResponse {
        let result = match request.case.into_case() {
            Ok(case) => {
                self.scheduling
                    .schedule_surgery(case, request.duration_hours)
                    .await
            }
            Err(e) => Err(e),
        };
        match result {
            Ok(allocation) => IntakeResponse::placed(
                format!(
                    "Surgery scheduled in {} with {}",
                    allocation.ot.name, allocation.doctor.name
                ),
                allocation,
            ),
            Err(e) => {
                log_rejection("schedule", &e);
                IntakeResponse::failed(&e)
            }
        }
    }

    pub async fn emergency(&self, request: EmergencyRequest) -> IntakeResponse {
        let result = match request.case.into_case() {
            Ok(case) => self.emergency.handle_emergency(case).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(allocation) => IntakeResponse::placed(
                format!(
                    "EMERGENCY: Surgery scheduled in {} with {}",
                    allocation.ot.name, allocation.doctor.name
                ),
                allocation,
            ),
            Err(e) => {
                log_rejection("emergency", &e);
                IntakeResponse::failed(&e)
            }
        }
    }

    pub fn dashboard(&self) -> Dashboard {
        let snapshot = self.ctx.store.snapshot();
        Dashboard {
            version: snapshot.version,
            doctors: snapshot.state.doctors.clone(),
            ots: snapshot.state.ots.clone(),
        }
    }

    pub fn doctors(&self) -> Vec<Doctor> {
        self.ctx.store.snapshot().state.doctors.clone()
    }

    pub fn theatres(&self) -> Vec<OperatingTheatre> {
        self.ctx.store.snapshot().state.ots.clone()
    }
}

fn log_rejection(operation: &'static str, error: &AllocationError) {
    if error.is_client_error() || matches!(error, AllocationError::NoCapacity { .. }) {
        info!(operation, category = %error.category(), reason = %error, "Request not placed");
    } else {
        warn!(operation, category = %error.category(), error = %error, "Request failed");
    }
}
