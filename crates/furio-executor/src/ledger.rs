//! The remote ledger seam.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Account, LedgerError};

/// The contract a write is sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// The reward vault.
    Vault,
    /// The secondary staking pool.
    Pool,
}

/// The state-changing function to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum Function {
    /// Reinvest accrued rewards.
    Compound,
    /// Withdraw accrued rewards.
    ClaimRewards,
    /// Redirect accrued vault rewards into the pool.
    ClaimToPool { amount: u64 },
}

/// A function selected on a target contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractCall {
    pub target: Target,
    pub function: Function,
}

impl fmt::Display for ContractCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let target = match self.target {
            Target::Vault => "vault",
            Target::Pool => "pool",
        };
        match self.function {
            Function::Compound => write!(f, "{}.compound", target),
            Function::ClaimRewards => write!(f, "{}.claim_rewards", target),
            Function::ClaimToPool { amount } => write!(f, "{}.claim_to_pool({})", target, amount),
        }
    }
}

/// Fee parameters for one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeParams {
    pub gas_price_wei: u128,
    pub gas_limit: u64,
}

/// Post-write values that can be read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateQuery {
    /// Tokens held in the vault for the account.
    VaultBalance,
    /// Stable-coin value staked in the pool.
    PoolStake,
    /// Days left on the pool lock, rounded up.
    PoolLockedDays,
    /// Native coin balance of the account.
    NativeBalance,
}

impl StateQuery {
    /// Key used for the reading in reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::VaultBalance => "vault_balance",
            Self::PoolStake => "pool_stake",
            Self::PoolLockedDays => "locked_days",
            Self::NativeBalance => "native_balance",
        }
    }
}

/// Reference to a submitted write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxHandle {
    /// Transaction hash, hex encoded.
    pub hash: String,
}

/// Acknowledgement that a write was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: String,
    pub block_number: Option<u64>,
}

/// Client for the remote ledger the writes go to.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Sign and submit `call` from `account`.
    async fn submit_write(
        &self,
        account: &Account,
        call: &ContractCall,
        fee: &FeeParams,
    ) -> Result<TxHandle, LedgerError>;

    /// Wait until `tx` is applied, for at most `timeout`.
    async fn wait_for_confirmation(
        &self,
        tx: &TxHandle,
        timeout: Duration,
    ) -> Result<Receipt, LedgerError>;

    /// Read a post-write value for `account`.
    async fn read_state(&self, account: &Account, query: StateQuery)
    -> Result<Decimal, LedgerError>;
}
