//! Restart behavior of the scheduler against a real state file.

use chrono::{Duration, Utc};
use furio_scheduler::{DailyScheduler, JsonFileStore, ScheduleState, StartupPlan, StateStore};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

#[tokio::test]
async fn fire_then_restart_restores_the_persisted_timer() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("schedule.json");

    // First process: cold start, fire once
    let mut first = DailyScheduler::new(JsonFileStore::new(&path));
    assert_eq!(first.restore().await, StartupPlan::ColdStart);
    let fired_at = Utc::now();
    let persisted = first.record_fire(fired_at).await;
    drop(first);

    // Second process: the file points a day ahead, so nothing fires now
    let mut second = DailyScheduler::new(JsonFileStore::new(&path));
    let plan = second.restore().await;

    assert_eq!(
        plan,
        StartupPlan::Restore {
            at: persisted.next_fire_time
        }
    );
    assert_eq!(second.armed_at(), Some(fired_at + Duration::hours(24)));
    assert_eq!(second.state(), Some(&persisted));
}

#[tokio::test]
async fn corrupt_state_file_falls_back_to_cold_start() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("schedule.json");
    std::fs::write(&path, "garbage").unwrap();

    let mut scheduler = DailyScheduler::new(JsonFileStore::new(&path));

    assert_eq!(scheduler.restore().await, StartupPlan::ColdStart);
    assert!(scheduler.armed_at().is_none());
}

#[tokio::test]
async fn stale_state_file_catches_up() {
    let dir = tempdir().unwrap();
    let store = JsonFileStore::new(dir.path().join("schedule.json"));
    let missed = Utc::now() - Duration::hours(30);
    store
        .save(&ScheduleState {
            previous_fire_time: Some(missed - Duration::hours(24)),
            next_fire_time: missed,
        })
        .await
        .unwrap();

    let mut scheduler = DailyScheduler::new(store.clone());

    assert_eq!(scheduler.restore().await, StartupPlan::CatchUp { missed });
    assert!(scheduler.armed_at().is_none());

    let state = scheduler.record_fire(Utc::now()).await;
    assert_eq!(store.load().await.unwrap(), Some(state));
}
