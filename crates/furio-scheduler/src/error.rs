//! Error types for the scheduler.

use thiserror::Error;

/// Errors that can occur in scheduler operations.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Reading or writing the state file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted state could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The persisted state decoded but is not a usable schedule.
    #[error("invalid schedule state: {0}")]
    InvalidState(String),
}
