//! End-to-end lifecycle of the demo backend under paused time: start a
//! run, watch it through the poller, and check the data the dashboard
//! would render along the way.

use cma_dash::backend::{LocalBackend, MarketBackend};
use cma_dash::model::{MatchStatus, RunPhase};
use cma_dash::poller::{PollUpdate, StatusPoller};
use std::sync::Arc;
use std::time::Duration;

async fn settle() {
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn fresh_run_matches_the_published_timeline() {
    let backend = LocalBackend::seeded();

    let snap = backend.start_agent_run().await.unwrap();
    assert_eq!(snap.phase, RunPhase::Syncing);
    assert_eq!(snap.progress_percent, 5);
    assert_eq!(snap.items_processed, 0);
    assert_eq!(snap.items_total, 12);

    // The full dwell schedule is 12s; leave slack for task wakeups.
    tokio::time::sleep(Duration::from_secs(14)).await;
    settle().await;

    let done = backend.agent_status().await.unwrap();
    assert_eq!(done.phase, RunPhase::Completed);
    assert_eq!(done.progress_percent, 100);
    assert_eq!(done.started_at, snap.started_at);
}

#[tokio::test(start_paused = true)]
async fn starting_twice_in_a_row_is_a_noop() {
    let backend = LocalBackend::seeded();
    let first = backend.start_agent_run().await.unwrap();
    let second = backend.start_agent_run().await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test(start_paused = true)]
async fn scouting_surfaces_one_new_pending_match() {
    let backend = LocalBackend::seeded();
    let seeded = backend.assignments().await.unwrap().len();

    backend.start_agent_run().await.unwrap();
    tokio::time::sleep(Duration::from_secs(14)).await;
    settle().await;

    let assignments = backend.assignments().await.unwrap();
    assert_eq!(assignments.len(), seeded + 1);
    let scouted = assignments.last().unwrap();
    assert_eq!(scouted.status, MatchStatus::Pending);
    assert_eq!(scouted.detected_name, "Pulte at Willow");
}

#[tokio::test(start_paused = true)]
async fn polled_deliveries_never_step_backwards() {
    let backend: Arc<dyn MarketBackend> = Arc::new(LocalBackend::seeded());
    backend.start_agent_run().await.unwrap();

    let (poller, mut rx) = StatusPoller::spawn(backend.clone(), Duration::from_secs(1));

    let mut phases = Vec::new();
    let mut last_ordinal = 0;
    let mut last_progress = 0;
    loop {
        match rx.recv().await {
            Some(PollUpdate::Snapshot(snap)) => {
                assert!(snap.phase.ordinal() >= last_ordinal, "phase regressed");
                assert!(snap.progress_percent >= last_progress, "progress regressed");
                last_ordinal = snap.phase.ordinal();
                last_progress = snap.progress_percent;
                if !phases.last().is_some_and(|&p| p == snap.phase) {
                    phases.push(snap.phase);
                }
                if snap.phase.is_terminal() {
                    break;
                }
            }
            Some(PollUpdate::Unreachable(msg)) => panic!("unexpected poll error: {msg}"),
            None => panic!("poller hung up before the run finished"),
        }
    }
    poller.stop();

    assert_eq!(
        phases,
        vec![
            RunPhase::Syncing,
            RunPhase::Scouting,
            RunPhase::Scraping,
            RunPhase::Analyzing,
            RunPhase::Completed,
        ]
    );
    assert_eq!(last_progress, 100);
}

#[tokio::test(start_paused = true)]
async fn completed_runs_can_be_restarted() {
    let backend = LocalBackend::seeded();
    backend.start_agent_run().await.unwrap();
    tokio::time::sleep(Duration::from_secs(14)).await;
    settle().await;
    assert_eq!(
        backend.agent_status().await.unwrap().phase,
        RunPhase::Completed
    );

    let again = backend.start_agent_run().await.unwrap();
    assert_eq!(again.phase, RunPhase::Syncing);
    assert_eq!(again.progress_percent, 5);
    assert_eq!(again.items_processed, 0);
}

#[tokio::test(start_paused = true)]
async fn wire_snapshot_matches_the_dashboard_contract() {
    let backend = LocalBackend::seeded();
    let snap = backend.start_agent_run().await.unwrap();
    let v = serde_json::to_value(&snap).unwrap();
    assert_eq!(v["phase"], "syncing");
    assert_eq!(v["progressPercent"], 5);
    assert_eq!(v["itemsProcessed"], 0);
    assert_eq!(v["itemsTotal"], 12);
    assert!(v["startedAt"].is_i64());
}
