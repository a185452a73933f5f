use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunPhase {
    NotStarted,
    Syncing,
    Scouting,
    Scraping,
    Analyzing,
    Completed,
    Failed,
}

impl RunPhase {
    /// Position in the canonical phase order. `Failed` sorts with the
    /// terminal end so monotonicity checks treat it as a valid successor
    /// of any in-progress phase.
    pub fn ordinal(self) -> u8 {
        match self {
            RunPhase::NotStarted => 0,
            RunPhase::Syncing => 1,
            RunPhase::Scouting => 2,
            RunPhase::Scraping => 3,
            RunPhase::Analyzing => 4,
            RunPhase::Completed => 5,
            RunPhase::Failed => 6,
        }
    }

    /// A run is active while a non-terminal phase past not-started is current.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            RunPhase::Syncing | RunPhase::Scouting | RunPhase::Scraping | RunPhase::Analyzing
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RunPhase::Completed | RunPhase::Failed)
    }

    /// Short label for step indicators and text output.
    pub fn label(self) -> &'static str {
        match self {
            RunPhase::NotStarted => "Idle",
            RunPhase::Syncing => "Feed Sync",
            RunPhase::Scouting => "Scout",
            RunPhase::Scraping => "Scrape",
            RunPhase::Analyzing => "Analyze",
            RunPhase::Completed => "Done",
            RunPhase::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Full state of the agent run at one instant. The tracker replaces the
/// current snapshot wholesale at every transition; no history is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSnapshot {
    pub phase: RunPhase,
    pub progress_percent: u8,
    pub message: String,
    /// Unix milliseconds; stamped once when a run leaves not-started.
    pub started_at: Option<i64>,
    pub items_processed: u32,
    pub items_total: u32,
}

impl Default for RunSnapshot {
    fn default() -> Self {
        Self {
            phase: RunPhase::NotStarted,
            progress_percent: 0,
            message: "Ready to start".into(),
            started_at: None,
            items_processed: 0,
            items_total: 0,
        }
    }
}

impl RunSnapshot {
    /// RFC 3339 rendering of `started_at` for human-facing output.
    pub fn started_at_rfc3339(&self) -> Option<String> {
        let ms = self.started_at?;
        let ts = time::OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000).ok()?;
        ts.format(&time::format_description::well_known::Rfc3339).ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Pending,
    Verified,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewAction {
    Verify,
    Reject,
}

impl ReviewAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewAction::Verify => "verify",
            ReviewAction::Reject => "reject",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "verify" => Some(ReviewAction::Verify),
            "reject" => Some(ReviewAction::Reject),
            _ => None,
        }
    }
}

/// An AI-suggested competitor match awaiting human review in the scout queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorMatch {
    pub id: String,
    pub community: String,
    pub builder_name: String,
    /// Name as detected by the scout, e.g. "D.R. Horton near Waxahachie".
    pub detected_name: String,
    /// Resolved community name once confirmed, e.g. "North Grove".
    pub real_name: Option<String>,
    pub url: Option<String>,
    pub alignment_score: u8,
    pub distance_miles: f64,
    pub status: MatchStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListingStatus {
    Available,
    Sold,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeSpec {
    pub price: u32,
    pub sqft: u32,
    pub bed: u8,
    pub bath: u8,
    pub status: ListingStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Competitor {
    pub id: String,
    pub name: String,
    pub builder: String,
    pub last_scraped: String,
    pub price_min: u32,
    pub price_max: u32,
    pub specs: Vec<HomeSpec>,
    pub alerts: u32,
    pub alignment_score: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlertKind {
    PriceChange,
    InventoryLow,
    NewListing,
}

impl AlertKind {
    pub fn label(self) -> &'static str {
        match self {
            AlertKind::PriceChange => "Price Change",
            AlertKind::InventoryLow => "Inventory Low",
            AlertKind::NewListing => "New Listing",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    pub competitor_id: String,
    pub competitor_name: String,
    pub kind: AlertKind,
    pub severity: Severity,
    pub message: String,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_change: Option<i64>,
}

/// Editable dashboard configuration, persisted under the user config dir.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardConfig {
    pub feed_url: String,
    pub search_radius_miles: u32,
    #[serde(with = "humantime_serde")]
    pub scrape_frequency: Duration,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            feed_url: "https://feed.mybuildercloud.com/bdx/26016593903.xml".into(),
            search_radius_miles: 10,
            scrape_frequency: Duration::from_secs(24 * 60 * 60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Ok,
    Error,
    Checking,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendHealth {
    pub feed_status: HealthState,
    pub ai_status: HealthState,
    pub message: String,
}

/// Everything the headless modes print after a run reaches a terminal phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub status: RunSnapshot,
    pub competitors: Vec<Competitor>,
    pub alerts: Vec<Alert>,
    pub assignments: Vec<CompetitorMatch>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_values_are_kebab_case_on_the_wire() {
        assert_eq!(
            serde_json::to_string(&RunPhase::NotStarted).unwrap(),
            "\"not-started\""
        );
        assert_eq!(serde_json::to_string(&RunPhase::Syncing).unwrap(), "\"syncing\"");
        let parsed: RunPhase = serde_json::from_str("\"scraping\"").unwrap();
        assert_eq!(parsed, RunPhase::Scraping);
    }

    #[test]
    fn snapshot_uses_camel_case_keys() {
        let snap = RunSnapshot {
            phase: RunPhase::Syncing,
            progress_percent: 5,
            message: "Syncing".into(),
            started_at: Some(1_700_000_000_000),
            items_processed: 0,
            items_total: 12,
        };
        let v: serde_json::Value = serde_json::to_value(&snap).unwrap();
        assert_eq!(v["progressPercent"], 5);
        assert_eq!(v["startedAt"], 1_700_000_000_000i64);
        assert_eq!(v["itemsProcessed"], 0);
        assert_eq!(v["itemsTotal"], 12);
    }

    #[test]
    fn phase_order_is_monotonic_through_completion() {
        let order = [
            RunPhase::NotStarted,
            RunPhase::Syncing,
            RunPhase::Scouting,
            RunPhase::Scraping,
            RunPhase::Analyzing,
            RunPhase::Completed,
        ];
        for pair in order.windows(2) {
            assert!(pair[0].ordinal() < pair[1].ordinal());
        }
        assert!(RunPhase::Failed.ordinal() > RunPhase::Analyzing.ordinal());
    }

    #[test]
    fn active_and_terminal_partition_the_phases() {
        assert!(!RunPhase::NotStarted.is_active());
        assert!(RunPhase::Syncing.is_active());
        assert!(RunPhase::Analyzing.is_active());
        assert!(!RunPhase::Completed.is_active());
        assert!(RunPhase::Completed.is_terminal());
        assert!(RunPhase::Failed.is_terminal());
        assert!(!RunPhase::Scouting.is_terminal());
    }

    #[test]
    fn config_round_trips_humantime_durations() {
        let cfg = DashboardConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains("\"scrapeFrequency\":\"1day\""));
        let back: DashboardConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn alert_value_change_is_omitted_when_absent() {
        let alert = Alert {
            id: "a9".into(),
            competitor_id: "c1".into(),
            competitor_name: "Timber Creek".into(),
            kind: AlertKind::InventoryLow,
            severity: Severity::Medium,
            message: "Inventory dropped below 3 units".into(),
            date: "5 hrs ago".into(),
            value_change: None,
        };
        let json = serde_json::to_string(&alert).unwrap();
        assert!(!json.contains("valueChange"));
        assert!(json.contains("\"kind\":\"inventory-low\""));
    }
}
