//! Backend seam for the dashboard.
//!
//! Everything the front end needs is behind one trait with two
//! implementations: [`LocalBackend`] runs the demo tracker and seeded
//! market data in-process, and [`HttpBackend`] talks to a remote server
//! exposing the same surface. UI layers and the poller only ever see the
//! trait.

mod http;
mod local;

pub use http::HttpBackend;
pub use local::LocalBackend;

use crate::error::BackendError;
use crate::model::{
    Alert, BackendHealth, Competitor, CompetitorMatch, DashboardConfig, ReviewAction, RunSnapshot,
};
use async_trait::async_trait;

#[async_trait]
pub trait MarketBackend: Send + Sync {
    /// Current agent-run snapshot. Side-effect free.
    async fn agent_status(&self) -> Result<RunSnapshot, BackendError>;

    /// Start an agent run. A no-op returning the unchanged snapshot when
    /// a run is already active.
    async fn start_agent_run(&self) -> Result<RunSnapshot, BackendError>;

    async fn assignments(&self) -> Result<Vec<CompetitorMatch>, BackendError>;

    /// Apply a verify/reject decision and return the updated match.
    async fn review_assignment(
        &self,
        id: &str,
        action: ReviewAction,
    ) -> Result<CompetitorMatch, BackendError>;

    async fn competitors(&self) -> Result<Vec<Competitor>, BackendError>;

    async fn alerts(&self) -> Result<Vec<Alert>, BackendError>;

    async fn config(&self) -> Result<DashboardConfig, BackendError>;

    async fn update_config(&self, config: &DashboardConfig) -> Result<(), BackendError>;

    /// Connectivity diagnostics. Reports trouble in the returned value
    /// rather than as an error.
    async fn health(&self) -> Result<BackendHealth, BackendError>;
}
