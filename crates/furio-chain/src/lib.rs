//! EVM implementation of the furio ledger seam.
//!
//! Writes are signed locally and sent over HTTP JSON-RPC; receipts are
//! polled until the executor's deadline. Token amounts come back as 18-decimal
//! fixed point and are converted to [`rust_decimal::Decimal`].

mod bindings;
mod error;
mod evm;
mod units;

pub use error::ChainError;
pub use evm::{ContractAddresses, EvmLedger};
pub use units::{seconds_to_days, wei_to_decimal};
