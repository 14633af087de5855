pub mod clock;
pub mod error;
pub mod events;
pub mod id;
pub mod roster;
pub mod seed;

pub use clock::{Clock, ManualClock, SystemClock, now_utc, whole_minutes_between};
pub use error::{CoreError, ErrorCategory, Result};
pub use events::{NoopPublisher, NotificationPublisher, RosterBroadcaster, RosterUpdate, UpdateCause};
pub use id::{emergency_token, generate_id};
pub use roster::{
    Doctor, DoctorId, DoctorStatus, InterruptedCase, Occupancy, OperatingTheatre, RosterState,
    SurgicalCase, TheatreId, TheatreStatus, Urgency,
};
pub use seed::{DoctorSeed, RosterSeed};
