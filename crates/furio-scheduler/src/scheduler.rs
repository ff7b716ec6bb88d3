//! Daily scheduler implementation.

use std::future::Future;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::{Clock, ScheduleState, StartupPlan, StateStore, SystemClock};

/// Default spacing between fires.
pub const DEFAULT_INTERVAL_HOURS: i64 = 24;

/// Maximum sleep duration between clock checks while a timer is armed.
const MAX_SLEEP_SECS: u64 = 60;

/// A persistent, self-rescheduling job timer.
///
/// Holds at most one armed fire time. The loop in [`DailyScheduler::run`]
/// borrows the scheduler mutably, so a second concurrent timer for the same
/// job cannot exist.
pub struct DailyScheduler<S, C = SystemClock> {
    store: S,
    clock: C,
    interval: Duration,
    state: Option<ScheduleState>,
    armed: Option<DateTime<Utc>>,
    restored: Option<StartupPlan>,
}

impl<S: StateStore> DailyScheduler<S, SystemClock> {
    /// Create a scheduler on the system clock.
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<S: StateStore, C: Clock> DailyScheduler<S, C> {
    /// Create a scheduler with an explicit time source.
    pub fn with_clock(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
            interval: Duration::hours(DEFAULT_INTERVAL_HOURS),
            state: None,
            armed: None,
            restored: None,
        }
    }

    /// Override the spacing between fires.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// The last known schedule state.
    pub fn state(&self) -> Option<&ScheduleState> {
        self.state.as_ref()
    }

    /// The fire time of the single pending timer, if one is armed.
    pub fn armed_at(&self) -> Option<DateTime<Utc>> {
        self.armed
    }

    /// Load the persisted state and decide the startup transition.
    ///
    /// Only the first call touches the store; later calls return the same
    /// plan without arming anything new. An unreadable state file is treated
    /// as a cold start.
    #[tracing::instrument(skip(self))]
    pub async fn restore(&mut self) -> StartupPlan {
        if let Some(plan) = self.restored {
            return plan;
        }

        let persisted = match self.store.load().await {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "failed to read persisted schedule, treating as cold start");
                None
            }
        };

        let plan = StartupPlan::decide(persisted.as_ref(), self.clock.now());
        match plan {
            StartupPlan::ColdStart => info!("no previous schedule, firing immediately"),
            StartupPlan::Restore { at } => {
                info!(next_fire = %at, "restored schedule");
                self.armed = Some(at);
            }
            StartupPlan::CatchUp { missed } => {
                warn!(missed = %missed, "scheduled fire was missed, catching up now");
            }
        }

        self.state = persisted;
        self.restored = Some(plan);
        plan
    }

    /// Record a fire at `fired_at`: persist the next fire time and arm it.
    ///
    /// A failed write is logged and does not prevent arming the next timer.
    pub async fn record_fire(&mut self, fired_at: DateTime<Utc>) -> ScheduleState {
        let state = ScheduleState::after_fire(fired_at, self.interval);

        match self.store.save(&state).await {
            Ok(()) => info!(next_fire = %state.next_fire_time, "next fire scheduled"),
            Err(e) => error!(
                error = %e,
                next_fire = %state.next_fire_time,
                "failed to persist schedule, continuing with in-memory timer"
            ),
        }

        self.armed = Some(state.next_fire_time);
        self.state = Some(state.clone());
        state
    }

    /// Run the scheduler loop until shutdown.
    ///
    /// The job receives the state persisted for its fire, which already
    /// points at the following fire time.
    pub async fn run<F, Fut>(&mut self, mut shutdown_rx: watch::Receiver<bool>, mut job: F)
    where
        F: FnMut(ScheduleState) -> Fut,
        Fut: Future<Output = ()>,
    {
        info!("scheduler starting");
        self.restore().await;

        loop {
            if !self.wait_for_armed(&mut shutdown_rx).await {
                break;
            }

            let fired_at = self.clock.now();
            let state = self.record_fire(fired_at).await;
            info!(fired_at = %fired_at, "firing scheduled job");
            job(state).await;
        }

        info!("scheduler shut down gracefully");
    }

    /// Sleep until the armed fire time. Returns `false` on shutdown.
    async fn wait_for_armed(&self, shutdown_rx: &mut watch::Receiver<bool>) -> bool {
        loop {
            if *shutdown_rx.borrow() {
                info!("scheduler received shutdown signal");
                return false;
            }

            let Some(at) = self.armed else {
                return true;
            };

            let now = self.clock.now();
            if at <= now {
                return true;
            }

            let remaining = (at - now).to_std().unwrap_or(std::time::Duration::ZERO);
            let chunk = remaining.min(std::time::Duration::from_secs(MAX_SLEEP_SECS));
            debug!(remaining_secs = remaining.as_secs(), "waiting for next fire");

            tokio::select! {
                changed = shutdown_rx.changed() => {
                    // Sender gone: nobody can request shutdown, keep sleeping
                    if changed.is_err() {
                        sleep(chunk).await;
                    }
                }
                _ = sleep(chunk) => {}
            }
        }
    }
}
