//! Error types for remote writes and run policies.

use std::time::Duration;

use thiserror::Error;

/// Errors reported by a [`crate::LedgerClient`].
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    /// The remote write was rejected or could not be sent.
    #[error("submission failed: {0}")]
    Submission(String),

    /// No receipt arrived within the confirmation budget.
    #[error("confirmation timed out after {}s", .0.as_secs())]
    ConfirmationTimeout(Duration),

    /// The write was mined but did not succeed.
    #[error("transaction reverted: {0}")]
    Reverted(String),

    /// Reading post-write state failed.
    #[error("state read failed: {0}")]
    StateRead(String),

    /// The account's address or key is unusable.
    #[error("invalid account: {0}")]
    InvalidAccount(String),
}

/// Errors from loading or validating a run policy.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// TOML parse error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML encode error.
    #[error("TOML encode error: {0}")]
    Encode(#[from] toml::ser::Error),

    /// No preset carries this name.
    #[error("unknown policy preset: {0}")]
    UnknownPreset(String),

    /// The policy is structurally invalid.
    #[error("invalid policy: {0}")]
    Invalid(String),
}
