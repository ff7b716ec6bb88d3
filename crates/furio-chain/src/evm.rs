use std::time::Duration;

use alloy::network::{EthereumWallet, ReceiptResponse, TransactionBuilder};
use alloy::primitives::{Address, TxHash};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::reqwest::Url;
use async_trait::async_trait;
use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;
use furio_executor::{
    Account, ContractCall, FeeParams, LedgerClient, LedgerError, Receipt, StateQuery, Target,
    TxHandle,
};
use rust_decimal::Decimal;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::ChainError;
use crate::bindings::{IFurioPool, IFurioVault, encode_call};
use crate::units::{seconds_to_days, wei_to_decimal};

/// Addresses of the contracts writes go to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractAddresses {
    pub vault: Address,
    pub pool: Address,
}

impl ContractAddresses {
    pub fn parse(vault: &str, pool: &str) -> Result<Self, ChainError> {
        Ok(Self {
            vault: parse_address("vault", vault)?,
            pool: parse_address("pool", pool)?,
        })
    }

    fn for_target(&self, target: Target) -> Address {
        match target {
            Target::Vault => self.vault,
            Target::Pool => self.pool,
        }
    }
}

fn parse_address(name: &'static str, value: &str) -> Result<Address, ChainError> {
    value.trim().parse().map_err(|e| ChainError::InvalidAddress {
        name,
        value: value.to_string(),
        reason: format!("{}", e),
    })
}

/// [`LedgerClient`] over an EVM HTTP JSON-RPC endpoint.
#[derive(Debug, Clone)]
pub struct EvmLedger {
    rpc_url: Url,
    contracts: ContractAddresses,
    /// First receipt poll delay.
    poll_interval: Duration,
}

impl EvmLedger {
    pub fn new(rpc_url: &str, contracts: ContractAddresses) -> Result<Self, ChainError> {
        let parsed = rpc_url.parse().map_err(|e| ChainError::InvalidUrl {
            url: rpc_url.to_string(),
            reason: format!("{}", e),
        })?;
        Ok(Self {
            rpc_url: parsed,
            contracts,
            poll_interval: Duration::from_secs(3),
        })
    }

    pub fn contracts(&self) -> &ContractAddresses {
        &self.contracts
    }

    fn signer(account: &Account) -> Result<PrivateKeySigner, LedgerError> {
        account
            .key
            .expose()
            .trim()
            .parse()
            .map_err(|e| LedgerError::InvalidAccount(format!("invalid private key: {}", e)))
    }

    fn address(account: &Account) -> Result<Address, LedgerError> {
        account
            .address
            .trim()
            .parse()
            .map_err(|e| LedgerError::InvalidAccount(format!("invalid address: {}", e)))
    }

    fn poll_backoff(&self, timeout: Duration) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.poll_interval,
            max_interval: Duration::from_secs(60),
            max_elapsed_time: Some(timeout),
            ..Default::default()
        }
    }
}

#[async_trait]
impl LedgerClient for EvmLedger {
    async fn submit_write(
        &self,
        account: &Account,
        call: &ContractCall,
        fee: &FeeParams,
    ) -> Result<TxHandle, LedgerError> {
        let input = encode_call(call).ok_or_else(|| {
            LedgerError::Submission(format!("{} is not a contract function", call))
        })?;
        let signer = Self::signer(account)?;
        let from = signer.address();
        if from != Self::address(account)? {
            return Err(LedgerError::InvalidAccount(
                "private key does not match address".to_string(),
            ));
        }

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(self.rpc_url.clone());

        // Confirmed nonce: a retry replaces the pending write.
        let nonce = provider
            .get_transaction_count(from)
            .await
            .map_err(|e| LedgerError::Submission(format!("nonce lookup failed: {}", e)))?;

        let tx = TransactionRequest::default()
            .with_from(from)
            .with_to(self.contracts.for_target(call.target))
            .with_input(input)
            .with_nonce(nonce)
            .with_gas_limit(fee.gas_limit)
            .with_gas_price(fee.gas_price_wei);

        let pending = provider
            .send_transaction(tx)
            .await
            .map_err(|e| LedgerError::Submission(e.to_string()))?;
        let hash = format!("{:?}", pending.tx_hash());
        debug!(tx = %hash, nonce, "transaction sent");

        Ok(TxHandle { hash })
    }

    async fn wait_for_confirmation(
        &self,
        tx: &TxHandle,
        timeout: Duration,
    ) -> Result<Receipt, LedgerError> {
        let hash: TxHash = tx
            .hash
            .parse()
            .map_err(|e| LedgerError::Submission(format!("invalid transaction hash: {}", e)))?;
        let provider = ProviderBuilder::new().connect_http(self.rpc_url.clone());
        let started = Instant::now();
        let mut backoff = self.poll_backoff(timeout);

        loop {
            match provider.get_transaction_receipt(hash).await {
                Ok(Some(receipt)) if receipt.status() => {
                    return Ok(Receipt {
                        tx_hash: tx.hash.clone(),
                        block_number: receipt.block_number,
                    });
                }
                Ok(Some(_)) => return Err(LedgerError::Reverted(tx.hash.clone())),
                Ok(None) => debug!(tx = %tx.hash, "receipt not available yet"),
                Err(e) => warn!(tx = %tx.hash, error = %e, "receipt poll failed"),
            }

            let remaining = timeout.saturating_sub(started.elapsed());
            let wait = match backoff.next_backoff() {
                Some(wait) if !remaining.is_zero() => wait.min(remaining),
                _ => return Err(LedgerError::ConfirmationTimeout(timeout)),
            };
            tokio::time::sleep(wait).await;
        }
    }

    async fn read_state(
        &self,
        account: &Account,
        query: StateQuery,
    ) -> Result<Decimal, LedgerError> {
        let owner = Self::address(account)?;
        let provider = ProviderBuilder::new().connect_http(self.rpc_url.clone());
        let read_err = |e: alloy::contract::Error| LedgerError::StateRead(e.to_string());
        let out_of_range = || LedgerError::StateRead(format!("{} out of range", query.label()));

        match query {
            StateQuery::VaultBalance => {
                let vault = IFurioVault::new(self.contracts.vault, provider);
                let raw = vault.participantBalance(owner).call().await.map_err(read_err)?;
                wei_to_decimal(raw).ok_or_else(out_of_range)
            }
            StateQuery::PoolStake => {
                let pool = IFurioPool::new(self.contracts.pool, provider);
                let raw = pool.stakingAmountInUsdc(owner).call().await.map_err(read_err)?;
                wei_to_decimal(raw).ok_or_else(out_of_range)
            }
            StateQuery::PoolLockedDays => {
                let pool = IFurioPool::new(self.contracts.pool, provider);
                let raw = pool
                    .getRemainingLockedTime(owner)
                    .call()
                    .await
                    .map_err(read_err)?;
                seconds_to_days(raw).ok_or_else(out_of_range)
            }
            StateQuery::NativeBalance => {
                let raw = provider
                    .get_balance(owner)
                    .await
                    .map_err(|e| LedgerError::StateRead(e.to_string()))?;
                wei_to_decimal(raw).ok_or_else(out_of_range)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use furio_executor::{Function, SigningKey};

    // Well-known development key (anvil account 0).
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const DEV_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    fn contracts() -> ContractAddresses {
        ContractAddresses::parse(
            "0x4de2b5D4a343aDa3604b8db3e34B83a2F0BFBd14",
            "0x0602943B4F4d9d6E1C9C7B0cE4F1a2Fc9D5D0465",
        )
        .unwrap()
    }

    #[test]
    fn test_bad_address_is_named() {
        let err = ContractAddresses::parse("0x1234", DEV_ADDRESS).unwrap_err();
        assert!(matches!(err, ChainError::InvalidAddress { name: "vault", .. }));
    }

    #[test]
    fn test_bad_url_is_rejected() {
        let err = EvmLedger::new("not a url", contracts()).unwrap_err();
        assert!(matches!(err, ChainError::InvalidUrl { .. }));
    }

    #[test]
    fn test_targets_route_to_contracts() {
        let c = contracts();
        assert_eq!(c.for_target(Target::Vault), c.vault);
        assert_eq!(c.for_target(Target::Pool), c.pool);
    }

    #[test]
    fn test_signer_matches_dev_address() {
        let account = Account::new(1, DEV_ADDRESS, SigningKey::new(DEV_KEY));
        let signer = EvmLedger::signer(&account).unwrap();
        assert_eq!(signer.address(), EvmLedger::address(&account).unwrap());
    }

    #[tokio::test]
    async fn test_mismatched_key_is_rejected_before_sending() {
        let ledger = EvmLedger::new("http://127.0.0.1:1", contracts()).unwrap();
        let account = Account::new(
            1,
            "0x70997970C51812dc3A010C7d01b50e0d17dc79C8",
            SigningKey::new(DEV_KEY),
        );
        let call = ContractCall {
            target: Target::Vault,
            function: Function::Compound,
        };
        let fee = FeeParams {
            gas_price_wei: 1_000_000_000,
            gas_limit: 999_999,
        };

        let err = ledger.submit_write(&account, &call, &fee).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAccount(_)));
    }

    #[tokio::test]
    async fn test_garbage_key_is_invalid_account() {
        let ledger = EvmLedger::new("http://127.0.0.1:1", contracts()).unwrap();
        let account = Account::new(1, DEV_ADDRESS, SigningKey::new("not-a-key"));
        let call = ContractCall {
            target: Target::Pool,
            function: Function::Compound,
        };
        let fee = FeeParams {
            gas_price_wei: 1,
            gas_limit: 1,
        };

        let err = ledger.submit_write(&account, &call, &fee).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAccount(_)));
    }
}
