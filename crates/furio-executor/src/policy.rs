//! Declarative run policies: which writes run on which days for which accounts.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    Account, ActionExecutor, ActionSpec, BatchReport, ContractCall, FeeSchedule, Function,
    LedgerClient, PolicyError, RetryPolicy, StateQuery, Target, run_all,
};

/// Longest confirmation budget a step may ask for: one week.
const MAX_BUDGET_MINUTES: u64 = 7 * 24 * 60;

fn default_budget_minutes() -> u64 {
    120
}

fn default_max_retries() -> u32 {
    5
}

fn default_gas_limit() -> u64 {
    999_999
}

fn default_true() -> bool {
    true
}

/// Which configured accounts a step runs for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountSelector {
    #[default]
    All,
    /// Account indexes, starting at 1.
    Only(Vec<usize>),
}

/// One write performed for a set of accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepSpec {
    pub name: String,
    pub target: Target,
    pub balance_query: StateQuery,
    /// Days the step runs on; empty means every day.
    #[serde(default)]
    pub days: Vec<Weekday>,
    #[serde(default)]
    pub extra_queries: Vec<StateQuery>,
    #[serde(default = "default_budget_minutes")]
    pub confirmation_budget_minutes: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,
    #[serde(default = "default_true")]
    pub await_confirmation: bool,
    /// Free-form goal shown next to the average in reports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_target: Option<String>,
    #[serde(default)]
    pub accounts: AccountSelector,
    pub function: Function,
    #[serde(default)]
    pub fee: FeeSchedule,
}

impl StepSpec {
    /// A step with default retry settings, run every day for every account.
    pub fn new(
        name: impl Into<String>,
        target: Target,
        function: Function,
        balance_query: StateQuery,
    ) -> Self {
        Self {
            name: name.into(),
            target,
            balance_query,
            days: Vec::new(),
            extra_queries: Vec::new(),
            confirmation_budget_minutes: default_budget_minutes(),
            max_retries: default_max_retries(),
            gas_limit: default_gas_limit(),
            await_confirmation: true,
            average_target: None,
            accounts: AccountSelector::All,
            function,
            fee: FeeSchedule::default(),
        }
    }

    fn on_days(mut self, days: &[Weekday]) -> Self {
        self.days = days.to_vec();
        self
    }

    fn for_accounts(mut self, accounts: AccountSelector) -> Self {
        self.accounts = accounts;
        self
    }

    fn with_extras(mut self, extras: &[StateQuery]) -> Self {
        self.extra_queries = extras.to_vec();
        self
    }

    fn with_budget_minutes(mut self, minutes: u64) -> Self {
        self.confirmation_budget_minutes = minutes;
        self
    }

    fn with_target(mut self, target: &str) -> Self {
        self.average_target = Some(target.to_string());
        self
    }

    pub fn runs_on(&self, weekday: Weekday) -> bool {
        self.days.is_empty() || self.days.contains(&weekday)
    }

    pub fn call(&self) -> ContractCall {
        ContractCall {
            target: self.target,
            function: self.function,
        }
    }

    /// The accounts this step applies to, in configuration order.
    pub fn select(&self, accounts: &[Account]) -> Vec<Account> {
        match &self.accounts {
            AccountSelector::All => accounts.to_vec(),
            AccountSelector::Only(indexes) => accounts
                .iter()
                .filter(|a| indexes.contains(&a.index))
                .cloned()
                .collect(),
        }
    }

    pub fn action(&self) -> ActionSpec {
        ActionSpec {
            call: self.call(),
            balance_query: self.balance_query,
            extra_queries: self.extra_queries.clone(),
            retry: RetryPolicy {
                max_retries: self.max_retries,
                confirmation_budget: Duration::from_secs(
                    self.confirmation_budget_minutes.saturating_mul(60),
                ),
                fee: self.fee,
                gas_limit: self.gas_limit,
                await_confirmation: self.await_confirmation,
            },
        }
    }

    pub fn validate(&self, account_count: usize) -> Result<(), PolicyError> {
        let invalid =
            |msg: String| Err(PolicyError::Invalid(format!("step '{}': {}", self.name, msg)));

        if self.name.trim().is_empty() {
            return Err(PolicyError::Invalid("step name must not be empty".to_string()));
        }
        match (self.target, self.function) {
            (_, Function::Compound)
            | (Target::Vault, Function::ClaimToPool { .. })
            | (Target::Pool, Function::ClaimRewards) => {}
            (target, function) => {
                return invalid(format!("{:?} does not support {:?}", target, function));
            }
        }
        if self.confirmation_budget_minutes == 0 {
            return invalid("confirmation budget must be positive".to_string());
        }
        if self.confirmation_budget_minutes > MAX_BUDGET_MINUTES {
            return invalid(format!(
                "confirmation budget must be at most {} minutes",
                MAX_BUDGET_MINUTES
            ));
        }
        if let AccountSelector::Only(indexes) = &self.accounts {
            if indexes.is_empty() {
                return invalid("account list must not be empty".to_string());
            }
            if let Some(bad) = indexes.iter().find(|i| **i == 0 || **i > account_count) {
                return invalid(format!(
                    "account {} is not configured ({} accounts)",
                    bad, account_count
                ));
            }
        }
        match self.fee.validate(self.max_retries.saturating_add(1)) {
            Err(PolicyError::Invalid(msg)) => invalid(msg),
            other => other,
        }
    }
}

/// An ordered list of steps run on every firing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunPolicy {
    pub name: String,
    pub steps: Vec<StepSpec>,
}

impl RunPolicy {
    pub fn from_toml_str(input: &str) -> Result<Self, PolicyError> {
        Ok(toml::from_str(input)?)
    }

    pub fn to_toml_string(&self) -> Result<String, PolicyError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn preset(preset: Preset) -> Self {
        let steps = match preset {
            Preset::Compound => vec![
                StepSpec::new(
                    "vault-compound",
                    Target::Vault,
                    Function::Compound,
                    StateQuery::VaultBalance,
                )
                .with_extras(&[StateQuery::NativeBalance])
                .with_target("100 FUR"),
                StepSpec::new(
                    "pool-compound",
                    Target::Pool,
                    Function::Compound,
                    StateQuery::PoolStake,
                )
                .for_accounts(AccountSelector::Only(vec![5]))
                .with_extras(&[StateQuery::PoolLockedDays])
                .with_budget_minutes(60),
            ],
            Preset::ClaimRotation => vec![
                StepSpec::new(
                    "vault-claim",
                    Target::Vault,
                    Function::ClaimToPool { amount: 1 },
                    StateQuery::VaultBalance,
                )
                .on_days(&[Weekday::Sun, Weekday::Mon, Weekday::Tue])
                .with_extras(&[StateQuery::NativeBalance])
                .with_target("11111 FUR"),
                StepSpec::new(
                    "vault-compound",
                    Target::Vault,
                    Function::Compound,
                    StateQuery::VaultBalance,
                )
                .on_days(&[Weekday::Wed, Weekday::Thu, Weekday::Fri, Weekday::Sat])
                .with_extras(&[StateQuery::NativeBalance])
                .with_target("11111 FUR"),
                StepSpec::new(
                    "pool-claim",
                    Target::Pool,
                    Function::ClaimRewards,
                    StateQuery::PoolStake,
                )
                .with_extras(&[StateQuery::PoolLockedDays])
                .with_budget_minutes(60),
            ],
            Preset::PoolOnly => vec![
                StepSpec::new(
                    "pool-compound",
                    Target::Pool,
                    Function::Compound,
                    StateQuery::PoolStake,
                )
                .with_extras(&[StateQuery::PoolLockedDays])
                .with_budget_minutes(60),
            ],
        };
        Self {
            name: preset.to_string(),
            steps,
        }
    }

    pub fn validate(&self, account_count: usize) -> Result<(), PolicyError> {
        if self.steps.is_empty() {
            return Err(PolicyError::Invalid(format!(
                "policy '{}' has no steps",
                self.name
            )));
        }
        for step in &self.steps {
            step.validate(account_count)?;
        }
        Ok(())
    }

    /// Steps scheduled for `weekday`, in declared order.
    pub fn steps_for(&self, weekday: Weekday) -> impl Iterator<Item = &StepSpec> {
        self.steps.iter().filter(move |s| s.runs_on(weekday))
    }
}

/// Built-in policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// Compound the vault for every account, then the pool for account 5.
    Compound,
    /// Claim into the pool early in the week, compound otherwise, then claim pool rewards.
    ClaimRotation,
    /// Compound the pool only.
    PoolOnly,
}

impl Preset {
    pub const ALL: [Preset; 3] = [Preset::Compound, Preset::ClaimRotation, Preset::PoolOnly];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compound => "compound",
            Self::ClaimRotation => "claim-rotation",
            Self::PoolOnly => "pool-only",
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preset {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| PolicyError::UnknownPreset(s.to_string()))
    }
}

/// Batch outcome of one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub name: String,
    /// Display form of the call, e.g. `vault.compound`.
    pub call: String,
    #[serde(flatten)]
    pub batch: BatchReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_target: Option<String>,
}

/// Run the steps of `policy` scheduled for `weekday`.
///
/// Steps run one after another; each step's accounts run concurrently.
pub async fn run_policy<L>(
    executor: &ActionExecutor<L>,
    accounts: &[Account],
    policy: &RunPolicy,
    weekday: Weekday,
) -> Vec<StepReport>
where
    L: LedgerClient + ?Sized + 'static,
{
    let mut reports = Vec::new();
    for step in &policy.steps {
        if !step.runs_on(weekday) {
            debug!(step = %step.name, ?weekday, "step not scheduled today");
            continue;
        }

        let selected = step.select(accounts);
        info!(step = %step.name, call = %step.call(), accounts = selected.len(), "running step");
        let batch = run_all(executor, &selected, &step.action()).await;
        reports.push(StepReport {
            name: step.name.clone(),
            call: step.call().to_string(),
            batch,
            average_target: step.average_target.clone(),
        });
    }
    reports
}
