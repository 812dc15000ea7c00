use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulerError};

/// When a periodic job fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Schedule {
    /// Run repeatedly with a fixed interval in seconds.
    Interval { every_secs: u64 },

    /// Run every day at the given hour and minute (UTC).
    Daily { hour: u8, minute: u8 },
}

impl Schedule {
    /// Reject schedules that can never fire sensibly.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Schedule::Interval { every_secs: 0 } => Err(SchedulerError::InvalidSchedule(
                "interval must be at least one second".to_string(),
            )),
            Schedule::Daily { hour, minute } if hour > 23 || minute > 59 => {
                Err(SchedulerError::InvalidSchedule(format!(
                    "daily time {hour:02}:{minute:02} is out of range"
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Compute the next UTC execution time for `schedule` strictly after `from`.
///
/// Returns `None` only for an out-of-range daily time.
pub fn compute_next_run(schedule: &Schedule, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match schedule {
        Schedule::Interval { every_secs } => {
            Some(from + Duration::seconds(i64::try_from(*every_secs).ok()?))
        }

        Schedule::Daily { hour, minute } => {
            let candidate = Utc
                .with_ymd_and_hms(
                    from.year(),
                    from.month(),
                    from.day(),
                    u32::from(*hour),
                    u32::from(*minute),
                    0,
                )
                .single()?;
            if candidate > from {
                Some(candidate)
            } else {
                Some(candidate + Duration::days(1))
            }
        }
    }
}
