use super::MarketBackend;
use crate::error::BackendError;
use crate::model::{
    Alert, BackendHealth, Competitor, CompetitorMatch, DashboardConfig, HealthState, ReviewAction,
    RunSnapshot,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};

/// Client for a remote dashboard backend exposing the `/api` surface.
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .user_agent(format!("cma-dash/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, BackendError> {
        let resp = self.client.get(self.url(path)).send().await?;
        decode(path, resp).await
    }

    async fn post_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, BackendError> {
        let resp = self.client.post(self.url(path)).send().await?;
        decode(path, resp).await
    }
}

/// Check status, then parse. A dead or misrouted backend tends to answer
/// with an HTML error page; that surfaces as a decode error naming the
/// endpoint rather than a serde message with no location.
async fn decode<T: DeserializeOwned>(
    path: &str,
    resp: reqwest::Response,
) -> Result<T, BackendError> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(BackendError::Status {
            endpoint: path.to_string(),
            status: status.as_u16(),
            body: body.chars().take(200).collect(),
        });
    }
    serde_json::from_str(&body).map_err(|source| BackendError::Decode {
        endpoint: path.to_string(),
        source,
    })
}

#[async_trait]
impl MarketBackend for HttpBackend {
    async fn agent_status(&self) -> Result<RunSnapshot, BackendError> {
        self.get_json("/api/agent/status").await
    }

    async fn start_agent_run(&self) -> Result<RunSnapshot, BackendError> {
        self.post_json("/api/agent/run").await
    }

    async fn assignments(&self) -> Result<Vec<CompetitorMatch>, BackendError> {
        self.get_json("/api/scout/assignments").await
    }

    async fn review_assignment(
        &self,
        id: &str,
        action: ReviewAction,
    ) -> Result<CompetitorMatch, BackendError> {
        self.post_json(&format!("/api/scout/verify/{}/{}", id, action.as_str()))
            .await
    }

    async fn competitors(&self) -> Result<Vec<Competitor>, BackendError> {
        self.get_json("/api/competitors").await
    }

    async fn alerts(&self) -> Result<Vec<Alert>, BackendError> {
        self.get_json("/api/alerts").await
    }

    async fn config(&self) -> Result<DashboardConfig, BackendError> {
        self.get_json("/api/config").await
    }

    async fn update_config(&self, config: &DashboardConfig) -> Result<(), BackendError> {
        let path = "/api/config";
        let resp = self.client.put(self.url(path)).json(config).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                endpoint: path.to_string(),
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }
        Ok(())
    }

    /// Timed reachability probe. Trouble is reported in the returned
    /// health value so a dead backend shows up as a red diagnostic line,
    /// not a failed call.
    async fn health(&self) -> Result<BackendHealth, BackendError> {
        let started = Instant::now();
        let outcome: Result<serde_json::Value, BackendError> = self.get_json("/api/health").await;
        Ok(match outcome {
            Ok(_) => BackendHealth {
                feed_status: HealthState::Ok,
                ai_status: HealthState::Ok,
                message: format!("Connected to backend ({}ms).", started.elapsed().as_millis()),
            },
            Err(e) => BackendHealth {
                feed_status: HealthState::Error,
                ai_status: HealthState::Error,
                message: format!("Failed to reach backend: {e}"),
            },
        })
    }
}
