//! Scheduler types.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::SchedulerError;

/// Persisted schedule record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleState {
    /// When the job last fired, if it ever has.
    #[serde(default)]
    pub previous_fire_time: Option<DateTime<Utc>>,
    /// When the job should fire next.
    pub next_fire_time: DateTime<Utc>,
}

impl ScheduleState {
    /// State produced by a fire at `fired_at`.
    pub fn after_fire(fired_at: DateTime<Utc>, interval: Duration) -> Self {
        Self {
            previous_fire_time: Some(fired_at),
            next_fire_time: fired_at + interval,
        }
    }

    /// Check if the next fire time has been reached.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_fire_time <= now
    }

    /// Time remaining until the next fire, zero if already due.
    pub fn time_until(&self, now: DateTime<Utc>) -> std::time::Duration {
        (self.next_fire_time - now)
            .to_std()
            .unwrap_or(std::time::Duration::ZERO)
    }

    /// Reject records whose next fire precedes their previous fire.
    pub fn validate(&self) -> Result<(), SchedulerError> {
        match self.previous_fire_time {
            Some(previous) if self.next_fire_time <= previous => {
                Err(SchedulerError::InvalidState(format!(
                    "next fire {} is not after previous fire {}",
                    self.next_fire_time, previous
                )))
            }
            _ => Ok(()),
        }
    }
}

/// What the scheduler does on startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupPlan {
    /// No usable persisted state: fire now.
    ColdStart,
    /// A future fire time was persisted: arm a timer for it.
    Restore { at: DateTime<Utc> },
    /// The persisted fire time already passed while the process was down: fire now.
    CatchUp { missed: DateTime<Utc> },
}

impl StartupPlan {
    /// Decide the startup transition from the persisted state.
    pub fn decide(persisted: Option<&ScheduleState>, now: DateTime<Utc>) -> Self {
        match persisted {
            None => Self::ColdStart,
            Some(state) if state.is_due(now) => Self::CatchUp {
                missed: state.next_fire_time,
            },
            Some(state) => Self::Restore {
                at: state.next_fire_time,
            },
        }
    }

    /// Whether this plan fires the job without waiting.
    pub fn fires_immediately(&self) -> bool {
        !matches!(self, Self::Restore { .. })
    }
}

impl fmt::Display for StartupPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ColdStart => write!(f, "cold start, firing immediately"),
            Self::Restore { at } => write!(f, "restoring timer for {}", at),
            Self::CatchUp { missed } => {
                write!(f, "missed fire at {}, catching up immediately", missed)
            }
        }
    }
}
