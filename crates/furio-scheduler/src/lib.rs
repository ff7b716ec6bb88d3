//! Durable daily scheduler for the furio compounder.
//!
//! This crate provides a persistent scheduler that:
//! - Stores the previous and next fire time in a durable state store
//! - Restores a pending timer after a restart instead of firing twice
//! - Fires immediately on first launch or after a missed deadline
//! - Persists the next fire time before the job callback runs

mod clock;
mod error;
mod scheduler;
mod store;
mod types;

pub use clock::{Clock, SystemClock};
pub use error::SchedulerError;
pub use scheduler::{DEFAULT_INTERVAL_HOURS, DailyScheduler};
pub use store::{JsonFileStore, MemoryStore, StateStore};
pub use types::{ScheduleState, StartupPlan};
