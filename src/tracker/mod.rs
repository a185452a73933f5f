//! Canonical agent-run state and the timers that advance it.
//!
//! The tracker owns exactly one [`RunSnapshot`] and replaces it wholesale at
//! every transition; readers never observe a half-updated value. Phase
//! advancement is driven from a data table of steps rather than scattered
//! timer callbacks.

mod schedule;

pub use schedule::{offset_of_phase, total_duration, PhaseStep, DEMO_SCHEDULE};

use crate::model::{RunPhase, RunSnapshot};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Cheaply cloneable handle to the shared run state. Inject one per
/// serving process; tests create their own for isolation.
#[derive(Clone)]
pub struct RunTracker {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<TrackerState>,
    schedule: &'static [PhaseStep],
}

struct TrackerState {
    snapshot: RunSnapshot,
    /// Bumped on every accepted start or failure. A drive task spawned
    /// for an older run stops once it observes a newer generation.
    generation: u64,
}

impl RunTracker {
    pub fn new() -> Self {
        Self::with_schedule(DEMO_SCHEDULE)
    }

    pub fn with_schedule(schedule: &'static [PhaseStep]) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(TrackerState {
                    snapshot: RunSnapshot::default(),
                    generation: 0,
                }),
                schedule,
            }),
        }
    }

    /// Current snapshot. Always succeeds, no side effects.
    pub async fn snapshot(&self) -> RunSnapshot {
        self.inner.state.lock().await.snapshot.clone()
    }

    /// Start a run. While a run is active this is an idempotent no-op
    /// returning the unchanged current snapshot; from not-started or a
    /// terminal phase it enters the first scheduled step and arms the
    /// remaining transitions.
    pub async fn start(&self) -> RunSnapshot {
        let mut st = self.inner.state.lock().await;
        if st.snapshot.phase.is_active() {
            return st.snapshot.clone();
        }

        st.generation += 1;
        let generation = st.generation;
        let first = &self.inner.schedule[0];
        st.snapshot = RunSnapshot {
            phase: first.phase,
            progress_percent: first.progress,
            message: first.message.into(),
            started_at: Some(now_unix_ms()),
            items_processed: first.items_processed,
            items_total: first.items_total,
        };
        let snap = st.snapshot.clone();
        drop(st);

        tracing::info!(phase = %snap.phase, "agent run started");
        self.spawn_drive(generation);
        snap
    }

    /// Move an in-progress run to the terminal failed phase, freezing
    /// progress at its last value. A no-op outside active phases.
    /// Failed is terminal until the next `start`.
    pub async fn fail(&self, diagnostic: impl Into<String>) -> RunSnapshot {
        let mut st = self.inner.state.lock().await;
        if !st.snapshot.phase.is_active() {
            return st.snapshot.clone();
        }
        // Cancels the drive task for the current run.
        st.generation += 1;
        st.snapshot.phase = RunPhase::Failed;
        st.snapshot.message = diagnostic.into();
        tracing::warn!(message = %st.snapshot.message, "agent run failed");
        st.snapshot.clone()
    }

    fn spawn_drive(&self, generation: u64) {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            for pair in inner.schedule.windows(2) {
                tokio::time::sleep(pair[0].dwell).await;
                let mut st = inner.state.lock().await;
                if st.generation != generation {
                    return;
                }
                let step = &pair[1];
                st.snapshot = RunSnapshot {
                    phase: step.phase,
                    progress_percent: step.progress,
                    message: step.message.into(),
                    started_at: st.snapshot.started_at,
                    items_processed: step.items_processed,
                    items_total: step.items_total,
                };
                tracing::debug!(phase = %step.phase, progress = step.progress, "run advanced");
            }
        });
    }
}

impl Default for RunTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn now_unix_ms() -> i64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn settle() {
        // Let tasks woken by an advanced clock apply their step.
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn start_enters_syncing_with_reset_counters() {
        let tracker = RunTracker::new();
        let snap = tracker.start().await;
        assert_eq!(snap.phase, RunPhase::Syncing);
        assert_eq!(snap.progress_percent, 5);
        assert_eq!(snap.items_processed, 0);
        assert_eq!(snap.items_total, 12);
        assert!(snap.started_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn start_is_a_noop_while_a_run_is_active() {
        let tracker = RunTracker::new();
        let first = tracker.start().await;
        let second = tracker.start().await;
        assert_eq!(first, second);
        assert_eq!(tracker.snapshot().await, first);
    }

    #[tokio::test(start_paused = true)]
    async fn run_reaches_completed_without_progress_regressions() {
        let tracker = RunTracker::new();
        let mut last = tracker.start().await;
        settle().await;
        for _ in 0..30 {
            tokio::time::advance(Duration::from_millis(500)).await;
            settle().await;
            let snap = tracker.snapshot().await;
            assert!(snap.phase.ordinal() >= last.phase.ordinal());
            assert!(snap.progress_percent >= last.progress_percent);
            last = snap;
        }
        assert_eq!(last.phase, RunPhase::Completed);
        assert_eq!(last.progress_percent, 100);
    }

    #[tokio::test(start_paused = true)]
    async fn mid_phase_steps_carry_item_progress_forward() {
        let tracker = RunTracker::new();
        tracker.start().await;
        settle().await;
        // 7s in: second scraping step (60%, 1/2).
        tokio::time::advance(Duration::from_secs(7)).await;
        settle().await;
        let snap = tracker.snapshot().await;
        assert_eq!(snap.phase, RunPhase::Scraping);
        assert_eq!(snap.progress_percent, 60);
        assert_eq!(snap.items_processed, 1);
        assert_eq!(snap.items_total, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_after_completion_resets_counters_and_restamps() {
        let tracker = RunTracker::new();
        tracker.start().await;
        settle().await;
        tokio::time::advance(total_duration(DEMO_SCHEDULE) + Duration::from_secs(1)).await;
        settle().await;
        let done = tracker.snapshot().await;
        assert_eq!(done.phase, RunPhase::Completed);

        // started_at comes from the wall clock at millisecond resolution.
        std::thread::sleep(Duration::from_millis(2));
        let again = tracker.start().await;
        assert_eq!(again.phase, RunPhase::Syncing);
        assert_eq!(again.items_processed, 0);
        assert!(again.started_at.unwrap() > done.started_at.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn fail_freezes_progress_and_cancels_the_schedule() {
        let tracker = RunTracker::new();
        tracker.start().await;
        settle().await;
        tokio::time::advance(Duration::from_secs(3)).await;
        settle().await;
        let failed = tracker.fail("scraper could not reach competitor site").await;
        assert_eq!(failed.phase, RunPhase::Failed);
        assert_eq!(failed.progress_percent, 20);
        assert_eq!(failed.message, "scraper could not reach competitor site");

        // The cancelled drive task must not advance a failed run.
        tokio::time::advance(Duration::from_secs(20)).await;
        settle().await;
        assert_eq!(tracker.snapshot().await.phase, RunPhase::Failed);

        let restarted = tracker.start().await;
        assert_eq!(restarted.phase, RunPhase::Syncing);
        assert_eq!(restarted.progress_percent, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn fail_is_a_noop_when_no_run_is_active() {
        let tracker = RunTracker::new();
        let snap = tracker.fail("nothing to fail").await;
        assert_eq!(snap.phase, RunPhase::NotStarted);
        assert_eq!(snap.message, "Ready to start");
    }
}
