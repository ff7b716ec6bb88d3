//! Fixed-point conversions.

use std::str::FromStr;

use alloy::primitives::U256;
use alloy::primitives::utils::format_ether;
use rust_decimal::Decimal;

const SECONDS_PER_DAY: u64 = 86_400;

/// Convert an 18-decimal fixed-point amount to a decimal.
pub fn wei_to_decimal(value: U256) -> Option<Decimal> {
    Decimal::from_str(&format_ether(value)).ok().map(|d| d.normalize())
}

/// Lock duration in seconds as whole days, rounded up.
pub fn seconds_to_days(seconds: U256) -> Option<Decimal> {
    let seconds: u64 = seconds.try_into().ok()?;
    Some(Decimal::from(seconds.div_ceil(SECONDS_PER_DAY)))
}
