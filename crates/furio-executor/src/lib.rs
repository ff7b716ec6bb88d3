//! Remote write execution for the furio compounder.
//!
//! One logical write (compound, claim) per account is submitted, confirmed
//! within a shrinking deadline and retried with an escalating fee up to a
//! fixed ceiling. Batches of accounts run concurrently and always settle.

mod account;
mod aggregate;
mod attempt;
mod error;
mod executor;
mod ledger;
mod policy;

pub use account::{Account, SigningKey, mask_address, redact_address};
pub use aggregate::{BatchReport, average_balance, run_all};
pub use attempt::{ActionAttempt, AttemptOutcome, FeeSchedule, RetryPolicy};
pub use error::{LedgerError, PolicyError};
pub use executor::{AccountOutcome, ActionExecutor, ActionSpec, OutcomeStatus};
pub use ledger::{
    ContractCall, FeeParams, Function, LedgerClient, Receipt, StateQuery, Target, TxHandle,
};
pub use policy::{AccountSelector, Preset, RunPolicy, StepReport, StepSpec, run_policy};
