//! Event types for roster notifications.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::roster::{InterruptedCase, RosterState, TheatreId};

/// What caused a roster update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateCause {
    /// A normal-priority case was placed in a theatre
    Scheduled,
    /// An emergency was placed, possibly interrupting another case
    Emergency,
    /// The sweeper released theatres whose cases ran to their end time
    Released,
}

impl UpdateCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateCause::Scheduled => "scheduled",
            UpdateCause::Emergency => "emergency",
            UpdateCause::Released => "released",
        }
    }
}

impl std::fmt::Display for UpdateCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Post-commit roster snapshot sent to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterUpdate {
    pub cause: UpdateCause,
    /// Store version the snapshot was committed at
    pub version: u64,
    #[serde(flatten)]
    pub roster: RosterState,
    /// Theatres touched by the commit
    #[serde(default)]
    pub theatres: Vec<TheatreId>,
    /// Case interrupted by an emergency, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interrupted: Option<InterruptedCase>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl RosterUpdate {
    pub fn new(cause: UpdateCause, version: u64, roster: RosterState) -> Self {
        Self {
            cause,
            version,
            roster,
            theatres: Vec::new(),
            interrupted: None,
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    pub fn with_theatres(mut self, theatres: Vec<TheatreId>) -> Self {
        self.theatres = theatres;
        self
    }

    pub fn with_interrupted(mut self, interrupted: Option<InterruptedCase>) -> Self {
        self.interrupted = interrupted;
        self
    }

    pub fn at(mut self, timestamp: OffsetDateTime) -> Self {
        self.timestamp = timestamp;
        self
    }
}
