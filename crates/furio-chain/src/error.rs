use thiserror::Error;

/// Errors building an [`crate::EvmLedger`].
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("invalid RPC URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid {name} contract address '{value}': {reason}")]
    InvalidAddress {
        name: &'static str,
        value: String,
        reason: String,
    },
}
