use super::MarketBackend;
use crate::error::BackendError;
use crate::model::{
    Alert, BackendHealth, Competitor, CompetitorMatch, DashboardConfig, HealthState, ReviewAction,
    RunPhase, RunSnapshot,
};
use crate::store::MarketStore;
use crate::tracker::{offset_of_phase, RunTracker, DEMO_SCHEDULE};
use async_trait::async_trait;
use std::sync::Arc;

/// In-process demo backend: the run tracker plus the seeded market store.
/// Serve mode hosts this over HTTP; the TUI and headless modes use it
/// directly when no `--backend-url` is given.
pub struct LocalBackend {
    tracker: RunTracker,
    store: Arc<MarketStore>,
}

impl LocalBackend {
    pub fn new(tracker: RunTracker, store: Arc<MarketStore>) -> Self {
        Self { tracker, store }
    }

    /// Fully in-memory instance with the demo dataset.
    pub fn seeded() -> Self {
        Self::new(RunTracker::new(), Arc::new(MarketStore::seeded()))
    }

    /// The scout surfaces one new pending match per run, timed to land
    /// when the scouting phase hands off to scraping.
    fn spawn_scout_feed(&self) {
        let Some(delay) = offset_of_phase(DEMO_SCHEDULE, RunPhase::Scraping) else {
            return;
        };
        let tracker = self.tracker.clone();
        let store = self.store.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if tracker.snapshot().await.phase == RunPhase::Failed {
                return;
            }
            let m = store.insert_scouted();
            tracing::debug!(id = %m.id, community = %m.community, "scout surfaced a new match");
        });
    }
}

#[async_trait]
impl MarketBackend for LocalBackend {
    async fn agent_status(&self) -> Result<RunSnapshot, BackendError> {
        Ok(self.tracker.snapshot().await)
    }

    async fn start_agent_run(&self) -> Result<RunSnapshot, BackendError> {
        let before = self.tracker.snapshot().await;
        let snap = self.tracker.start().await;
        if !before.phase.is_active() {
            self.spawn_scout_feed();
        }
        Ok(snap)
    }

    async fn assignments(&self) -> Result<Vec<CompetitorMatch>, BackendError> {
        Ok(self.store.matches())
    }

    async fn review_assignment(
        &self,
        id: &str,
        action: ReviewAction,
    ) -> Result<CompetitorMatch, BackendError> {
        self.store.review(id, action)
    }

    async fn competitors(&self) -> Result<Vec<Competitor>, BackendError> {
        Ok(self.store.competitors())
    }

    async fn alerts(&self) -> Result<Vec<Alert>, BackendError> {
        Ok(self.store.alerts())
    }

    async fn config(&self) -> Result<DashboardConfig, BackendError> {
        Ok(self.store.config())
    }

    async fn update_config(&self, config: &DashboardConfig) -> Result<(), BackendError> {
        self.store.set_config(config.clone())
    }

    async fn health(&self) -> Result<BackendHealth, BackendError> {
        let tracked = self.store.competitors().len();
        Ok(BackendHealth {
            feed_status: HealthState::Ok,
            ai_status: HealthState::Ok,
            message: format!("Demo backend ready ({tracked} competitors tracked)."),
        })
    }
}
