use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Longest surgery a normal request may book.
pub const MAX_DURATION_HOURS: f64 = 12.0;

/// Longest configurable emergency slot.
pub const MAX_EMERGENCY_MINUTES: i64 = 24 * 60;

/// Tunables shared by the allocation services and the sweeper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    /// Seconds between two sweeper ticks
    pub sweep_interval_secs: u64,
    /// Read-decide-commit attempts before giving up with `StoreContention`
    pub max_retries: u32,
    /// Fixed length of an emergency surgery
    pub emergency_duration_minutes: i64,
    /// Upper bound on a normal surgery's requested duration
    pub max_duration_hours: f64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 10,
            max_retries: 3,
            emergency_duration_minutes: 120,
            max_duration_hours: 12.0,
        }
    }
}

impl SchedulerSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.sweep_interval_secs == 0 {
            return Err("scheduler.sweep_interval_secs must be greater than 0".to_string());
        }
        if self.max_retries == 0 {
            return Err("scheduler.max_retries must be greater than 0".to_string());
        }
        if !(1..=MAX_EMERGENCY_MINUTES).contains(&self.emergency_duration_minutes) {
            return Err(format!(
                "scheduler.emergency_duration_minutes must be between 1 and {MAX_EMERGENCY_MINUTES}"
            ));
        }
        if !(self.max_duration_hours.is_finite()
            && self.max_duration_hours > 0.0
            && self.max_duration_hours <= MAX_DURATION_HOURS)
        {
            return Err(format!(
                "scheduler.max_duration_hours must be greater than 0 and at most {MAX_DURATION_HOURS}"
            ));
        }
        Ok(())
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Emergency slot length, `None` when the configured minutes overflow.
    pub fn emergency_duration(&self) -> Option<time::Duration> {
        self.emergency_duration_minutes
            .checked_mul(60)
            .map(time::Duration::seconds)
    }

    /// Effective booking cap, never above [`MAX_DURATION_HOURS`].
    pub fn duration_cap_hours(&self) -> f64 {
        self.max_duration_hours.min(MAX_DURATION_HOURS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = SchedulerSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.sweep_interval(), Duration::from_secs(10));
        assert_eq!(settings.emergency_duration(), Some(time::Duration::hours(2)));
        assert_eq!(settings.duration_cap_hours(), 12.0);
    }

    #[test]
    fn test_rejects_zero_retries() {
        let settings = SchedulerSettings {
            max_retries: 0,
            ..SchedulerSettings::default()
        };
        assert!(settings.validate().unwrap_err().contains("max_retries"));
    }

    #[test]
    fn test_rejects_durations_beyond_hard_bounds() {
        let long_emergency = SchedulerSettings {
            emergency_duration_minutes: i64::MAX / 2,
            ..SchedulerSettings::default()
        };
        assert!(
            long_emergency
                .validate()
                .unwrap_err()
                .contains("emergency_duration_minutes")
        );
        assert_eq!(long_emergency.emergency_duration(), None);

        let long_booking = SchedulerSettings {
            max_duration_hours: 13.0,
            ..SchedulerSettings::default()
        };
        assert!(long_booking.validate().unwrap_err().contains("max_duration_hours"));
        assert_eq!(long_booking.duration_cap_hours(), MAX_DURATION_HOURS);

        let full_day = SchedulerSettings {
            emergency_duration_minutes: MAX_EMERGENCY_MINUTES,
            ..SchedulerSettings::default()
        };
        assert!(full_day.validate().is_ok());
    }
}
