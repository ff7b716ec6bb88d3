//! The bounded retry loop around one remote write.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::{
    Account, ActionAttempt, AttemptOutcome, ContractCall, FeeParams, LedgerClient, LedgerError,
    RetryPolicy, StateQuery,
};

/// Everything needed to perform one logical write for any account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionSpec {
    pub call: ContractCall,
    /// Reading reported as the account's balance.
    pub balance_query: StateQuery,
    /// Best-effort readings added to a successful outcome.
    pub extra_queries: Vec<StateQuery>,
    pub retry: RetryPolicy,
}

/// Final status of an account's write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success {
        balance: Decimal,
        tx_reference: String,
        /// False when the step does not wait for a receipt.
        confirmed: bool,
        #[serde(skip_serializing_if = "BTreeMap::is_empty")]
        readings: BTreeMap<String, Decimal>,
    },
    Failure {
        error: String,
    },
}

/// Outcome of [`ActionExecutor::execute`] for one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountOutcome {
    pub index: usize,
    /// Masked address.
    pub wallet: String,
    #[serde(flatten)]
    pub status: OutcomeStatus,
    /// Attempts performed.
    pub tries: u32,
    /// Block explorer page of the successful write.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer_link: Option<String>,
    #[serde(skip)]
    pub attempts: Vec<ActionAttempt>,
}

impl AccountOutcome {
    /// An outcome for an account whose task never produced one.
    pub fn failure(account: &Account, error: impl Into<String>) -> Self {
        Self {
            index: account.index,
            wallet: account.mask(),
            status: OutcomeStatus::Failure {
                error: error.into(),
            },
            tries: 0,
            explorer_link: None,
            attempts: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Success { .. })
    }

    /// Point `explorer_link` at `explorer_url` + the transaction hash, for successes.
    pub fn link_transaction(&mut self, explorer_url: &str) {
        if let OutcomeStatus::Success { tx_reference, .. } = &self.status {
            self.explorer_link = Some(format!(
                "{}/{}",
                explorer_url.trim_end_matches('/'),
                tx_reference
            ));
        }
    }

    pub fn balance(&self) -> Option<Decimal> {
        match &self.status {
            OutcomeStatus::Success { balance, .. } => Some(*balance),
            OutcomeStatus::Failure { .. } => None,
        }
    }
}

/// A successful attempt, before extra readings.
struct Landed {
    balance: Decimal,
    tx_hash: String,
    confirmed: bool,
}

/// Performs writes through a [`LedgerClient`].
pub struct ActionExecutor<L: ?Sized> {
    ledger: Arc<L>,
}

impl<L: ?Sized> Clone for ActionExecutor<L> {
    fn clone(&self) -> Self {
        Self {
            ledger: Arc::clone(&self.ledger),
        }
    }
}

impl<L: LedgerClient + ?Sized> ActionExecutor<L> {
    pub fn new(ledger: Arc<L>) -> Self {
        Self { ledger }
    }

    /// Perform `action` for `account`, starting at attempt 1.
    pub async fn execute(&self, account: &Account, action: &ActionSpec) -> AccountOutcome {
        self.execute_from(account, action, 1).await
    }

    /// Perform `action` for `account`, starting at `first_attempt`.
    ///
    /// Never fails: once the attempt ceiling is passed the last error is
    /// recorded in a `Failure` outcome.
    #[tracing::instrument(skip_all, fields(index = account.index, account = %account.mask(), call = %action.call))]
    pub async fn execute_from(
        &self,
        account: &Account,
        action: &ActionSpec,
        first_attempt: u32,
    ) -> AccountOutcome {
        let max_attempts = action.retry.max_attempts();
        let mut attempts = Vec::new();
        let mut last_error = None;
        let mut attempt = first_attempt.max(1);

        while attempt <= max_attempts {
            let Some(fee) = action.retry.fee_for(attempt) else {
                // Fees only grow, so later attempts would overflow too
                error!(attempt, "gas price overflows, not submitting");
                last_error = Some(format!("gas price for attempt {} overflows", attempt));
                break;
            };
            let deadline = action.retry.budget_for(attempt);
            debug!(
                attempt,
                gas_price_wei = fee.gas_price_wei,
                deadline_secs = deadline.as_secs(),
                "submitting write"
            );

            match self.attempt_once(account, action, &fee, deadline).await {
                Ok(landed) => {
                    attempts.push(ActionAttempt {
                        number: attempt,
                        fee,
                        deadline,
                        outcome: AttemptOutcome::Success {
                            balance: landed.balance,
                            tx_reference: landed.tx_hash.clone(),
                        },
                    });
                    info!(attempt, balance = %landed.balance, tx = %landed.tx_hash, "write succeeded");

                    let readings = self.read_extras(account, &action.extra_queries).await;
                    return AccountOutcome {
                        index: account.index,
                        wallet: account.mask(),
                        status: OutcomeStatus::Success {
                            balance: landed.balance,
                            tx_reference: landed.tx_hash,
                            confirmed: landed.confirmed,
                            readings,
                        },
                        tries: attempt,
                        explorer_link: None,
                        attempts,
                    };
                }
                Err(e) => {
                    // Node errors often quote the sender
                    let error = account.redact(&e.to_string());
                    warn!(attempt, error = %error, "write attempt failed");
                    attempts.push(ActionAttempt {
                        number: attempt,
                        fee,
                        deadline,
                        outcome: AttemptOutcome::Failure {
                            error: error.clone(),
                        },
                    });
                    last_error = Some(error);
                    if attempt < max_attempts {
                        info!(next_attempt = attempt + 1, "retrying with a higher fee");
                    }
                }
            }

            attempt += 1;
        }

        let error = last_error.unwrap_or_else(|| "no attempts remaining".to_string());
        error!(tries = attempts.len(), error = %error, "write failed, giving up");

        AccountOutcome {
            index: account.index,
            wallet: account.mask(),
            status: OutcomeStatus::Failure { error },
            tries: attempts.len() as u32,
            explorer_link: None,
            attempts,
        }
    }

    /// Submit, confirm within `deadline`, then read the balance.
    async fn attempt_once(
        &self,
        account: &Account,
        action: &ActionSpec,
        fee: &FeeParams,
        deadline: Duration,
    ) -> Result<Landed, LedgerError> {
        let tx = self.ledger.submit_write(account, &action.call, fee).await?;
        debug!(tx = %tx.hash, "write submitted");

        let confirmed = if action.retry.await_confirmation {
            let receipt = tokio::time::timeout(
                deadline,
                self.ledger.wait_for_confirmation(&tx, deadline),
            )
            .await
            .map_err(|_| LedgerError::ConfirmationTimeout(deadline))??;
            debug!(tx = %receipt.tx_hash, block = ?receipt.block_number, "write confirmed");
            true
        } else {
            false
        };

        let balance = self
            .ledger
            .read_state(account, action.balance_query)
            .await?;

        Ok(Landed {
            balance,
            tx_hash: tx.hash,
            confirmed,
        })
    }

    async fn read_extras(
        &self,
        account: &Account,
        queries: &[StateQuery],
    ) -> BTreeMap<String, Decimal> {
        let mut readings = BTreeMap::new();
        for query in queries {
            match self.ledger.read_state(account, *query).await {
                Ok(value) => {
                    readings.insert(query.label().to_string(), value);
                }
                Err(e) => warn!(
                    query = query.label(),
                    error = %account.redact(&e.to_string()),
                    "extra reading failed"
                ),
            }
        }
        readings
    }
}
