//! Fan-out of one action across accounts and fan-in of the outcomes.

use std::sync::Arc;

use futures_util::future::join_all;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{error, info};

use crate::{Account, AccountOutcome, ActionExecutor, ActionSpec, LedgerClient};

/// Outcomes of one action across a batch of accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// One outcome per input account, in input order.
    pub outcomes: Vec<AccountOutcome>,
    /// Mean balance over successful accounts, `None` when none succeeded.
    pub average_balance: Option<Decimal>,
}

impl BatchReport {
    pub fn new(outcomes: Vec<AccountOutcome>) -> Self {
        let average_balance = average_balance(&outcomes);
        Self {
            outcomes,
            average_balance,
        }
    }

    pub fn successes(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failures(&self) -> usize {
        self.outcomes.len() - self.successes()
    }
}

/// Mean of the balances of successful outcomes.
pub fn average_balance(outcomes: &[AccountOutcome]) -> Option<Decimal> {
    let balances: Vec<Decimal> = outcomes.iter().filter_map(|o| o.balance()).collect();
    if balances.is_empty() {
        return None;
    }
    let total: Decimal = balances.iter().copied().sum();
    Some(total / Decimal::from(balances.len()))
}

/// Run `action` for every account concurrently and wait for all of them.
///
/// Each account runs on its own task, so one account's retries never delay
/// another's. A task that dies is reported as a failure for its account.
pub async fn run_all<L>(
    executor: &ActionExecutor<L>,
    accounts: &[Account],
    action: &ActionSpec,
) -> BatchReport
where
    L: LedgerClient + ?Sized + 'static,
{
    let action = Arc::new(action.clone());
    let handles: Vec<_> = accounts
        .iter()
        .cloned()
        .map(|account| {
            let executor = executor.clone();
            let action = Arc::clone(&action);
            tokio::spawn(async move { executor.execute(&account, &action).await })
        })
        .collect();

    let joined = join_all(handles).await;
    let outcomes: Vec<AccountOutcome> = joined
        .into_iter()
        .zip(accounts)
        .map(|(result, account)| match result {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(account = %account.mask(), error = %e, "account task aborted");
                AccountOutcome::failure(account, format!("task aborted: {}", e))
            }
        })
        .collect();

    let report = BatchReport::new(outcomes);
    info!(
        call = %action.call,
        accounts = report.outcomes.len(),
        succeeded = report.successes(),
        failed = report.failures(),
        average = ?report.average_balance,
        "batch settled"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{OutcomeStatus, SigningKey};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn outcome(index: usize, balance: Option<Decimal>) -> AccountOutcome {
        let account = Account::new(index, format!("0x{:040}", index), SigningKey::new("k"));
        match balance {
            Some(balance) => AccountOutcome {
                index,
                wallet: account.mask(),
                status: OutcomeStatus::Success {
                    balance,
                    tx_reference: "0x01".to_string(),
                    confirmed: true,
                    readings: BTreeMap::new(),
                },
                tries: 1,
                explorer_link: None,
                attempts: Vec::new(),
            },
            None => AccountOutcome::failure(&account, "confirmation timed out"),
        }
    }

    #[test]
    fn test_average_excludes_failures() {
        let outcomes = vec![
            outcome(1, Some(dec!(100))),
            outcome(2, None),
            outcome(3, Some(dec!(300))),
        ];
        assert_eq!(average_balance(&outcomes), Some(dec!(200)));
    }

    #[test]
    fn test_average_of_no_successes_is_none() {
        let outcomes = vec![outcome(1, None), outcome(2, None)];
        assert_eq!(average_balance(&outcomes), None);
        assert_eq!(average_balance(&[]), None);
    }

    #[test]
    fn test_batch_counts() {
        let report = BatchReport::new(vec![outcome(1, Some(dec!(5))), outcome(2, None)]);
        assert_eq!(report.successes(), 1);
        assert_eq!(report.failures(), 1);
        assert_eq!(report.average_balance, Some(dec!(5)));
    }
}
