//! HTTP surface for the demo backend, mirroring the dashboard's remote
//! backend contract so other instances (or curl) can drive a run.

use crate::backend::{LocalBackend, MarketBackend};
use crate::error::BackendError;
use crate::model::{Alert, Competitor, CompetitorMatch, DashboardConfig, ReviewAction, RunSnapshot};
use anyhow::{Context, Result};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Clone)]
struct AppState {
    backend: Arc<LocalBackend>,
}

type ApiError = (StatusCode, Json<serde_json::Value>);

fn api_error(e: BackendError) -> ApiError {
    let status = match e {
        BackendError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "detail": e.to_string() })))
}

pub fn router(backend: Arc<LocalBackend>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/health", get(health))
        .route("/api/agent/status", get(agent_status))
        .route("/api/agent/run", post(agent_run))
        .route("/api/scout/assignments", get(assignments))
        .route("/api/scout/verify/{id}/{action}", post(verify))
        .route("/api/competitors", get(competitors))
        .route("/api/alerts", get(alerts))
        .route("/api/config", get(config).put(put_config))
        .with_state(AppState { backend })
}

/// Bind and serve until ctrl-c.
pub async fn serve(backend: Arc<LocalBackend>, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "serving dashboard backend");
    axum::serve(listener, router(backend))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await
        .context("server stopped unexpectedly")
}

async fn root() -> Json<serde_json::Value> {
    let now = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "now".into());
    Json(json!({
        "status": "online",
        "service": "cma-dash backend",
        "timestamp": now,
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn agent_status(State(s): State<AppState>) -> Result<Json<RunSnapshot>, ApiError> {
    s.backend.agent_status().await.map(Json).map_err(api_error)
}

async fn agent_run(State(s): State<AppState>) -> Result<Json<RunSnapshot>, ApiError> {
    let snap = s.backend.start_agent_run().await.map_err(api_error)?;
    tracing::info!(phase = %snap.phase, "run requested over HTTP");
    Ok(Json(snap))
}

async fn assignments(
    State(s): State<AppState>,
) -> Result<Json<Vec<CompetitorMatch>>, ApiError> {
    s.backend.assignments().await.map(Json).map_err(api_error)
}

async fn verify(
    State(s): State<AppState>,
    Path((id, action)): Path<(String, String)>,
) -> Result<Json<CompetitorMatch>, ApiError> {
    let action = ReviewAction::parse(&action).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": format!("unknown review action: {action}") })),
        )
    })?;
    let updated = s
        .backend
        .review_assignment(&id, action)
        .await
        .map_err(api_error)?;
    tracing::info!(id = %updated.id, status = ?updated.status, "match reviewed over HTTP");
    Ok(Json(updated))
}

async fn competitors(State(s): State<AppState>) -> Result<Json<Vec<Competitor>>, ApiError> {
    s.backend.competitors().await.map(Json).map_err(api_error)
}

async fn alerts(State(s): State<AppState>) -> Result<Json<Vec<Alert>>, ApiError> {
    s.backend.alerts().await.map(Json).map_err(api_error)
}

async fn config(State(s): State<AppState>) -> Result<Json<DashboardConfig>, ApiError> {
    s.backend.config().await.map(Json).map_err(api_error)
}

async fn put_config(
    State(s): State<AppState>,
    Json(config): Json<DashboardConfig>,
) -> Result<StatusCode, ApiError> {
    s.backend.update_config(&config).await.map_err(api_error)?;
    tracing::info!("dashboard config updated over HTTP");
    Ok(StatusCode::NO_CONTENT)
}
