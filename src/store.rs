//! In-memory market data behind the demo backend: the scout review queue,
//! tracked competitors, alerts, and the editable dashboard config.

use crate::error::BackendError;
use crate::model::{
    Alert, AlertKind, Competitor, CompetitorMatch, DashboardConfig, HomeSpec, ListingStatus,
    MatchStatus, ReviewAction, Severity,
};
use rand::RngCore;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

pub struct MarketStore {
    inner: Mutex<StoreInner>,
    config_path: Option<PathBuf>,
}

struct StoreInner {
    matches: Vec<CompetitorMatch>,
    competitors: Vec<Competitor>,
    alerts: Vec<Alert>,
    config: DashboardConfig,
}

impl MarketStore {
    /// Store preloaded with the demo dataset; config stays in memory.
    pub fn seeded() -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                matches: seed_matches(),
                competitors: seed_competitors(),
                alerts: seed_alerts(),
                config: DashboardConfig::default(),
            }),
            config_path: None,
        }
    }

    /// Load config from `path` (missing or unreadable files fall back to
    /// defaults) and persist future updates there.
    pub fn with_config_path(self, path: PathBuf) -> Self {
        let config = load_config(&path);
        let inner = self.inner;
        {
            let mut st = inner.lock().unwrap_or_else(|e| e.into_inner());
            st.config = config;
        }
        Self {
            inner,
            config_path: Some(path),
        }
    }

    fn locked(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn matches(&self) -> Vec<CompetitorMatch> {
        self.locked().matches.clone()
    }

    pub fn competitors(&self) -> Vec<Competitor> {
        self.locked().competitors.clone()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.locked().alerts.clone()
    }

    pub fn config(&self) -> DashboardConfig {
        self.locked().config.clone()
    }

    /// Apply a human verify/reject decision to a scouted match.
    pub fn review(&self, id: &str, action: ReviewAction) -> Result<CompetitorMatch, BackendError> {
        let mut st = self.locked();
        let m = st
            .matches
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| BackendError::NotFound(id.to_string()))?;
        m.status = match action {
            ReviewAction::Verify => MatchStatus::Verified,
            ReviewAction::Reject => MatchStatus::Rejected,
        };
        Ok(m.clone())
    }

    /// Replace the dashboard config, persisting it when a path is set.
    pub fn set_config(&self, config: DashboardConfig) -> Result<(), BackendError> {
        if let Some(path) = self.config_path.as_deref() {
            save_config(path, &config).map_err(|source| BackendError::Persist {
                path: path.display().to_string(),
                source,
            })?;
        }
        self.locked().config = config;
        Ok(())
    }

    /// Add the match the scout surfaces during a demo run.
    pub fn insert_scouted(&self) -> CompetitorMatch {
        let scouted = CompetitorMatch {
            id: gen_id("m"),
            community: "Willow Wood".into(),
            builder_name: "Pulte".into(),
            detected_name: "Pulte at Willow".into(),
            real_name: None,
            url: None,
            alignment_score: 78,
            distance_miles: 3.2,
            status: MatchStatus::Pending,
        };
        self.locked().matches.push(scouted.clone());
        scouted
    }
}

/// Random record id, e.g. `m-4fca91d0`.
fn gen_id(prefix: &str) -> String {
    let mut b = [0u8; 4];
    rand::thread_rng().fill_bytes(&mut b);
    format!("{prefix}-{:08x}", u32::from_le_bytes(b))
}

/// Default location of the persisted dashboard config.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("cma-dash").join("config.json"))
}

fn load_config(path: &Path) -> DashboardConfig {
    match std::fs::read_to_string(path) {
        Ok(raw) => match serde_json::from_str(&raw) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring malformed config");
                DashboardConfig::default()
            }
        },
        Err(_) => DashboardConfig::default(),
    }
}

/// Write via a temp file in the same directory, then rename, so a crash
/// never leaves a half-written config behind.
fn save_config(path: &Path, config: &DashboardConfig) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let raw = serde_json::to_vec_pretty(config)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, raw)?;
    std::fs::rename(&tmp, path)
}

fn seed_matches() -> Vec<CompetitorMatch> {
    vec![
        CompetitorMatch {
            id: "m-1".into(),
            community: "Legacy Crossing".into(),
            builder_name: "D.R. Horton".into(),
            detected_name: "DR Horton - South".into(),
            real_name: Some("Timber Creek".into()),
            url: Some("https://www.drhorton.com/texas/timber-creek".into()),
            alignment_score: 85,
            distance_miles: 1.2,
            status: MatchStatus::Verified,
        },
        CompetitorMatch {
            id: "m-2".into(),
            community: "Legacy Crossing".into(),
            builder_name: "Lennar".into(),
            detected_name: "Lennar at Wildflower".into(),
            real_name: None,
            url: None,
            alignment_score: 65,
            distance_miles: 4.5,
            status: MatchStatus::Pending,
        },
        CompetitorMatch {
            id: "m-3".into(),
            community: "Country Lakes".into(),
            builder_name: "HistoryMaker".into(),
            detected_name: "HistoryMaker Argyle".into(),
            real_name: Some("Country Lakes South".into()),
            url: Some("https://www.historymaker.com/argyle".into()),
            alignment_score: 92,
            distance_miles: 0.5,
            status: MatchStatus::Verified,
        },
        CompetitorMatch {
            id: "m-4".into(),
            community: "Palomino Estates".into(),
            builder_name: "Bloomfield".into(),
            detected_name: "Bloomfield Homes".into(),
            real_name: None,
            url: None,
            alignment_score: 45,
            distance_miles: 12.0,
            status: MatchStatus::Pending,
        },
    ]
}

fn seed_competitors() -> Vec<Competitor> {
    vec![
        Competitor {
            id: "c-1".into(),
            name: "Timber Creek".into(),
            builder: "D.R. Horton".into(),
            last_scraped: "2023-10-24T10:00:00Z".into(),
            price_min: 350_000,
            price_max: 450_000,
            specs: vec![HomeSpec {
                price: 360_000,
                sqft: 2_100,
                bed: 3,
                bath: 2,
                status: ListingStatus::Available,
            }],
            alerts: 1,
            alignment_score: 85,
        },
        Competitor {
            id: "c-2".into(),
            name: "Country Lakes South".into(),
            builder: "HistoryMaker".into(),
            last_scraped: "2023-10-24T10:05:00Z".into(),
            price_min: 400_000,
            price_max: 550_000,
            specs: vec![HomeSpec {
                price: 420_000,
                sqft: 2_400,
                bed: 4,
                bath: 3,
                status: ListingStatus::Available,
            }],
            alerts: 2,
            alignment_score: 92,
        },
    ]
}

fn seed_alerts() -> Vec<Alert> {
    vec![
        Alert {
            id: "a-1".into(),
            competitor_id: "c-1".into(),
            competitor_name: "Timber Creek".into(),
            kind: AlertKind::PriceChange,
            severity: Severity::High,
            message: "Price dropped by $15k on plan 2400".into(),
            date: "2 hrs ago".into(),
            value_change: Some(-15_000),
        },
        Alert {
            id: "a-2".into(),
            competitor_id: "c-2".into(),
            competitor_name: "Country Lakes South".into(),
            kind: AlertKind::InventoryLow,
            severity: Severity::Medium,
            message: "Inventory dropped below 3 units".into(),
            date: "5 hrs ago".into(),
            value_change: None,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn review_moves_a_pending_match_through_both_outcomes() {
        let store = MarketStore::seeded();
        let verified = store.review("m-2", ReviewAction::Verify).unwrap();
        assert_eq!(verified.status, MatchStatus::Verified);
        let rejected = store.review("m-4", ReviewAction::Reject).unwrap();
        assert_eq!(rejected.status, MatchStatus::Rejected);

        let statuses: Vec<MatchStatus> = store.matches().iter().map(|m| m.status).collect();
        assert_eq!(
            statuses,
            vec![
                MatchStatus::Verified,
                MatchStatus::Verified,
                MatchStatus::Verified,
                MatchStatus::Rejected,
            ]
        );
    }

    #[test]
    fn review_of_an_unknown_id_is_not_found() {
        let store = MarketStore::seeded();
        let err = store.review("m-999", ReviewAction::Verify).unwrap_err();
        assert!(matches!(err, BackendError::NotFound(id) if id == "m-999"));
    }

    #[test]
    fn scouted_match_arrives_pending_with_a_fresh_id() {
        let store = MarketStore::seeded();
        let before = store.matches().len();
        let scouted = store.insert_scouted();
        assert_eq!(scouted.status, MatchStatus::Pending);
        assert_eq!(scouted.community, "Willow Wood");
        assert!(scouted.id.starts_with("m-"));
        assert_eq!(store.matches().len(), before + 1);
    }

    #[test]
    fn config_updates_round_trip_through_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.json");
        let store = MarketStore::seeded().with_config_path(path.clone());
        assert_eq!(store.config(), DashboardConfig::default());

        let edited = DashboardConfig {
            feed_url: "https://feed.example.com/bdx/1.xml".into(),
            search_radius_miles: 15,
            scrape_frequency: Duration::from_secs(6 * 60 * 60),
        };
        store.set_config(edited.clone()).unwrap();
        assert_eq!(store.config(), edited);

        // A second store picks the edited config back up.
        let reloaded = MarketStore::seeded().with_config_path(path);
        assert_eq!(reloaded.config(), edited);
    }

    #[test]
    fn malformed_config_files_fall_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = MarketStore::seeded().with_config_path(path);
        assert_eq!(store.config(), DashboardConfig::default());
    }
}
