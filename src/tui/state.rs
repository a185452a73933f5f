use crate::model::{
    Alert, BackendHealth, Competitor, CompetitorMatch, DashboardConfig, MatchStatus, RunPhase,
    RunSnapshot,
};
use crate::orchestrator::MarketData;
use crate::poller::PollUpdate;
use std::cmp::Ordering;

pub const TAB_TITLES: &[&str] = &["Dashboard", "Scout", "Settings"];

/// Phases rendered as step indicators, in display order.
pub const STEP_PHASES: &[RunPhase] = &[
    RunPhase::Syncing,
    RunPhase::Scouting,
    RunPhase::Scraping,
    RunPhase::Analyzing,
    RunPhase::Completed,
];

pub struct UiState {
    pub tab: usize,
    pub status: RunSnapshot,
    /// Last poll tick's error, if any. The previous snapshot stays on
    /// screen; the error renders alongside it.
    pub poll_error: Option<String>,
    pub assignments: Vec<CompetitorMatch>,
    pub competitors: Vec<Competitor>,
    pub alerts: Vec<Alert>,
    pub config: DashboardConfig,
    /// Local config edits not yet written back to the backend.
    pub config_dirty: bool,
    pub health: Option<BackendHealth>,
    pub notice: String,
    pub scout_selected: usize,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            tab: 0,
            status: RunSnapshot::default(),
            poll_error: None,
            assignments: Vec::new(),
            competitors: Vec::new(),
            alerts: Vec::new(),
            config: DashboardConfig::default(),
            config_dirty: false,
            health: None,
            notice: String::new(),
            scout_selected: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    Done,
    Active,
    Todo,
}

/// Completion of a step indicator follows phase identity, not numeric
/// progress thresholds. A failed run lights no steps; the console line
/// carries the diagnostic.
pub fn step_state(current: RunPhase, step: RunPhase) -> StepState {
    if current == RunPhase::Failed {
        return StepState::Todo;
    }
    match current.ordinal().cmp(&step.ordinal()) {
        Ordering::Less => StepState::Todo,
        Ordering::Equal => StepState::Active,
        Ordering::Greater => StepState::Done,
    }
}

impl UiState {
    pub fn is_running(&self) -> bool {
        self.status.phase.is_active()
    }

    pub fn apply_status(&mut self, update: PollUpdate) {
        match update {
            PollUpdate::Snapshot(snap) => {
                self.status = snap;
                self.poll_error = None;
            }
            PollUpdate::Unreachable(msg) => {
                self.poll_error = Some(msg);
            }
        }
    }

    pub fn apply_data(&mut self, data: MarketData) {
        self.assignments = data.assignments;
        self.competitors = data.competitors;
        self.alerts = data.alerts;
        if !self.config_dirty {
            self.config = data.config;
        }
        if self.scout_selected >= self.assignments.len() {
            self.scout_selected = self.assignments.len().saturating_sub(1);
        }
    }

    pub fn scout_next(&mut self) {
        if !self.assignments.is_empty() {
            self.scout_selected = (self.scout_selected + 1).min(self.assignments.len() - 1);
        }
    }

    pub fn scout_prev(&mut self) {
        self.scout_selected = self.scout_selected.saturating_sub(1);
    }

    pub fn selected_match(&self) -> Option<&CompetitorMatch> {
        self.assignments.get(self.scout_selected)
    }

    pub fn pending_reviews(&self) -> usize {
        self.assignments
            .iter()
            .filter(|m| m.status == MatchStatus::Pending)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_completion_derives_from_phase_identity() {
        assert_eq!(step_state(RunPhase::Scraping, RunPhase::Syncing), StepState::Done);
        assert_eq!(step_state(RunPhase::Scraping, RunPhase::Scouting), StepState::Done);
        assert_eq!(step_state(RunPhase::Scraping, RunPhase::Scraping), StepState::Active);
        assert_eq!(step_state(RunPhase::Scraping, RunPhase::Analyzing), StepState::Todo);
        assert_eq!(step_state(RunPhase::Completed, RunPhase::Completed), StepState::Active);
        assert_eq!(step_state(RunPhase::NotStarted, RunPhase::Syncing), StepState::Todo);
    }

    #[test]
    fn failed_runs_light_no_steps() {
        for &step in STEP_PHASES {
            assert_eq!(step_state(RunPhase::Failed, step), StepState::Todo);
        }
    }

    #[test]
    fn poll_errors_keep_the_last_snapshot_on_screen() {
        let mut state = UiState::default();
        let snap = RunSnapshot {
            phase: RunPhase::Scouting,
            progress_percent: 20,
            message: "Scouting".into(),
            started_at: Some(1),
            items_processed: 0,
            items_total: 54,
        };
        state.apply_status(PollUpdate::Snapshot(snap.clone()));
        state.apply_status(PollUpdate::Unreachable("connection refused".into()));
        assert_eq!(state.status, snap);
        assert_eq!(state.poll_error.as_deref(), Some("connection refused"));

        // The next good tick clears the error.
        state.apply_status(PollUpdate::Snapshot(snap.clone()));
        assert!(state.poll_error.is_none());
    }

    #[test]
    fn data_refresh_clamps_the_scout_selection() {
        let mut state = UiState::default();
        state.scout_selected = 7;
        state.apply_data(MarketData {
            assignments: Vec::new(),
            competitors: Vec::new(),
            alerts: Vec::new(),
            config: DashboardConfig::default(),
        });
        assert_eq!(state.scout_selected, 0);
    }
}
