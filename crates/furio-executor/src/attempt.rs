//! Per-attempt parameters of the retry protocol.

use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::{FeeParams, PolicyError};

const WEI_PER_GWEI: u64 = 1_000_000_000;

/// How the gas price grows with the attempt number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeeSchedule {
    /// `base_gwei + step_gwei * (attempt - 1)`.
    Linear { base_gwei: Decimal, step_gwei: Decimal },
    /// The same price on every attempt.
    Fixed { gwei: Decimal },
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self::Linear {
            base_gwei: Decimal::ONE,
            step_gwei: Decimal::ONE,
        }
    }
}

impl FeeSchedule {
    /// Gas price in gwei for `attempt` (1-based), `None` on overflow.
    pub fn gwei_for(&self, attempt: u32) -> Option<Decimal> {
        let attempt = attempt.max(1);
        match self {
            Self::Linear {
                base_gwei,
                step_gwei,
            } => step_gwei
                .checked_mul(Decimal::from(attempt - 1))?
                .checked_add(*base_gwei),
            Self::Fixed { gwei } => Some(*gwei),
        }
    }

    /// Gas price in wei for `attempt` (1-based), `None` if it does not fit.
    pub fn wei_for(&self, attempt: u32) -> Option<u128> {
        self.gwei_for(attempt)?
            .checked_mul(Decimal::from(WEI_PER_GWEI))?
            .trunc()
            .to_u128()
    }

    /// Reject schedules that could lower the fee on a retry, or whose fee
    /// overflows within `max_attempts`.
    pub fn validate(&self, max_attempts: u32) -> Result<(), PolicyError> {
        let (base, step) = match self {
            Self::Linear {
                base_gwei,
                step_gwei,
            } => (*base_gwei, *step_gwei),
            Self::Fixed { gwei } => (*gwei, Decimal::ZERO),
        };
        if base.is_sign_negative() || step.is_sign_negative() {
            return Err(PolicyError::Invalid(
                "fee schedule must not be negative or decreasing".to_string(),
            ));
        }
        // Non-decreasing, so the last attempt carries the largest fee
        if self.wei_for(max_attempts).is_none() {
            return Err(PolicyError::Invalid(format!(
                "fee for attempt {} does not fit in wei",
                max_attempts
            )));
        }
        Ok(())
    }
}

/// Bounds and parameters of the retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Confirmation budget of the first attempt; attempt `n` gets `budget / n`.
    pub confirmation_budget: Duration,
    pub fee: FeeSchedule,
    pub gas_limit: u64,
    /// Wait for a receipt before reading post-state.
    pub await_confirmation: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            confirmation_budget: Duration::from_secs(120 * 60),
            fee: FeeSchedule::default(),
            gas_limit: 999_999,
            await_confirmation: true,
        }
    }
}

impl RetryPolicy {
    /// Total attempts including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Fee parameters for `attempt`, `None` if the gas price overflows.
    pub fn fee_for(&self, attempt: u32) -> Option<FeeParams> {
        Some(FeeParams {
            gas_price_wei: self.fee.wei_for(attempt)?,
            gas_limit: self.gas_limit,
        })
    }

    /// Confirmation window for `attempt`, shrinking as the fee grows.
    pub fn budget_for(&self, attempt: u32) -> Duration {
        self.confirmation_budget / attempt.max(1)
    }
}

/// The result of one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success { balance: Decimal, tx_reference: String },
    Failure { error: String },
}

/// Record of one submission attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionAttempt {
    pub number: u32,
    pub fee: FeeParams,
    pub deadline: Duration,
    pub outcome: AttemptOutcome,
}
