//! Wiring for the daemon and one-off runs.
//!
//! The daemon restores the persisted schedule, fires the policy whenever the
//! timer is due and publishes a report after every run. Nothing after startup
//! is fatal: per-account failures end up in the report, report problems in
//! the log.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, Local, Utc};
use furio_executor::{Account, ActionExecutor, LedgerClient, RunPolicy, run_policy};
use furio_report::{ActionReport, Reporter};
use furio_scheduler::{DailyScheduler, JsonFileStore, ScheduleState, StartupPlan, StateStore};
use miette::Result;
use tokio::sync::watch;
use tracing::{info, warn};

/// Runs a policy for a fixed set of accounts and publishes the result.
pub struct Runner {
    executor: ActionExecutor<dyn LedgerClient>,
    accounts: Vec<Account>,
    policy: RunPolicy,
    reporter: Reporter,
}

impl Runner {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        accounts: Vec<Account>,
        policy: RunPolicy,
        reporter: Reporter,
    ) -> Self {
        Self {
            executor: ActionExecutor::new(ledger),
            accounts,
            policy,
            reporter,
        }
    }

    /// One run for a firing at `fired_at`.
    ///
    /// Steps are filtered by the local weekday of the firing instant.
    pub async fn run(
        &self,
        fired_at: DateTime<Utc>,
        schedule: Option<ScheduleState>,
    ) -> ActionReport {
        let weekday = fired_at.with_timezone(&Local).weekday();
        info!(
            policy = %self.policy.name,
            ?weekday,
            accounts = self.accounts.len(),
            "starting run"
        );

        let steps = run_policy(&self.executor, &self.accounts, &self.policy, weekday).await;
        if steps.is_empty() {
            warn!(?weekday, "no steps scheduled for today");
        }

        let report = ActionReport::new(self.policy.name.clone(), steps, schedule, fired_at);
        self.reporter.publish(report).await
    }

    /// Job callback for the scheduler.
    async fn fire(&self, state: ScheduleState) {
        let fired_at = state.previous_fire_time.unwrap_or_else(Utc::now);
        self.run(fired_at, Some(state)).await;
    }
}

/// Run the scheduler loop until Ctrl-C.
pub async fn run(runner: Runner, state_path: PathBuf, interval_hours: i64) -> Result<()> {
    if interval_hours <= 0 {
        return Err(miette::miette!("interval must be at least one hour"));
    }

    info!(path = %state_path.display(), interval_hours, "starting daemon");
    let store = JsonFileStore::new(state_path);
    let mut scheduler =
        DailyScheduler::new(store).with_interval(Duration::hours(interval_hours));

    let plan = scheduler.restore().await;
    info!(%plan, "schedule restored");

    // Handle shutdown signals
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    let runner = &runner;
    scheduler
        .run(shutdown_rx, move |state| runner.fire(state))
        .await;

    info!("daemon stopped");
    Ok(())
}

/// Run the policy once, leaving the persisted schedule untouched.
pub async fn run_once(runner: Runner) -> Result<()> {
    let report = runner.run(Utc::now(), None).await;
    info!(
        run_id = %report.run_id,
        failures = report.failure_count(),
        "run finished"
    );
    Ok(())
}

/// Describe the persisted schedule and what a restart would do.
pub async fn status(state_path: PathBuf) -> Result<String> {
    let store = JsonFileStore::new(state_path.clone());
    let persisted = match store.load().await {
        Ok(state) => state,
        Err(e) => {
            warn!(error = %e, "state file unreadable");
            None
        }
    };

    Ok(describe_status(&state_path, persisted.as_ref(), Utc::now()))
}

fn describe_status(
    path: &std::path::Path,
    persisted: Option<&ScheduleState>,
    now: DateTime<Utc>,
) -> String {
    let plan = StartupPlan::decide(persisted, now);
    let mut lines = vec![format!("state file: {}", path.display())];
    match persisted {
        Some(state) => {
            let previous = state
                .previous_fire_time
                .map(|t| t.with_timezone(&Local).to_rfc2822())
                .unwrap_or_else(|| "never".to_string());
            lines.push(format!("previous fire: {}", previous));
            lines.push(format!(
                "next fire: {}",
                state.next_fire_time.with_timezone(&Local).to_rfc2822()
            ));
        }
        None => lines.push("no schedule recorded".to_string()),
    }
    lines.push(format!("on restart: {}", plan));
    lines.join("\n")
}
