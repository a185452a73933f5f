//! Dashboard controller.
//!
//! Owns the status poller and the backend handle, and bridges them to the
//! UI thread over unbounded channels.

use crate::backend::MarketBackend;
use crate::error::BackendError;
use crate::model::{
    Alert, BackendHealth, Competitor, CompetitorMatch, DashboardConfig, ReviewAction, RunPhase,
};
use crate::poller::{PollUpdate, StatusPoller};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Commands emitted by the UI layer.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    StartRun,
    Review { id: String, action: ReviewAction },
    SaveConfig(DashboardConfig),
    RunDiagnostics,
    RefreshData,
    Quit,
}

/// Updates delivered to the UI layer.
#[derive(Debug, Clone)]
pub(crate) enum UiEvent {
    Status(PollUpdate),
    Data(MarketData),
    Health(BackendHealth),
    Notice(String),
}

/// One consistent fetch of everything the dashboard renders besides the
/// run status.
#[derive(Debug, Clone)]
pub(crate) struct MarketData {
    pub assignments: Vec<CompetitorMatch>,
    pub competitors: Vec<Competitor>,
    pub alerts: Vec<Alert>,
    pub config: DashboardConfig,
}

async fn fetch_market_data(backend: &dyn MarketBackend) -> Result<MarketData, BackendError> {
    let (assignments, competitors, alerts, config) = futures::try_join!(
        backend.assignments(),
        backend.competitors(),
        backend.alerts(),
        backend.config(),
    )?;
    Ok(MarketData {
        assignments,
        competitors,
        alerts,
        config,
    })
}

/// Run the controller until the UI asks to quit or hangs up.
pub(crate) async fn run_controller(
    backend: Arc<dyn MarketBackend>,
    poll_every: Duration,
    run_on_launch: bool,
    event_tx: UnboundedSender<UiEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let (poller, mut poll_rx) = StatusPoller::spawn(backend.clone(), poll_every);

    match fetch_market_data(backend.as_ref()).await {
        Ok(data) => {
            let _ = event_tx.send(UiEvent::Data(data));
        }
        Err(e) => {
            let _ = event_tx.send(UiEvent::Notice(format!("Initial data fetch failed: {e}")));
        }
    }

    // Auto-start only a completely fresh backend; reconnecting to one
    // with a finished or failed run leaves it alone.
    if run_on_launch {
        if let Ok(status) = backend.agent_status().await {
            if status.phase == RunPhase::NotStarted && status.items_total == 0 {
                match backend.start_agent_run().await {
                    Ok(snap) => {
                        let _ = event_tx.send(UiEvent::Status(PollUpdate::Snapshot(snap)));
                        let _ = event_tx.send(UiEvent::Notice("Agent run started".into()));
                    }
                    Err(e) => {
                        let _ =
                            event_tx.send(UiEvent::Notice(format!("Failed to start agent: {e}")));
                    }
                }
            }
        }
    }

    let mut last_phase = RunPhase::NotStarted;

    loop {
        tokio::select! {
            update = poll_rx.recv() => {
                let Some(update) = update else { break };
                if let PollUpdate::Snapshot(snap) = &update {
                    // Refresh the lists when scouting hands off (new
                    // matches land) and when a run finishes.
                    let crossed_scout = last_phase.ordinal() < RunPhase::Scraping.ordinal()
                        && snap.phase.ordinal() >= RunPhase::Scraping.ordinal();
                    let finished = !last_phase.is_terminal() && snap.phase.is_terminal();
                    if crossed_scout || finished {
                        if let Ok(data) = fetch_market_data(backend.as_ref()).await {
                            let _ = event_tx.send(UiEvent::Data(data));
                        }
                    }
                    last_phase = snap.phase;
                }
                if event_tx.send(UiEvent::Status(update)).is_err() {
                    break;
                }
            }
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UiCommand::StartRun) => {
                        match backend.start_agent_run().await {
                            Ok(snap) => {
                                // Immediate update; the next poll tick would
                                // otherwise lag the button press by a tick.
                                let _ = event_tx.send(UiEvent::Status(PollUpdate::Snapshot(snap)));
                                let _ = event_tx.send(UiEvent::Notice("Agent run started".into()));
                            }
                            Err(e) => {
                                let _ = event_tx.send(UiEvent::Notice(format!("Failed to start agent: {e}")));
                            }
                        }
                    }
                    Some(UiCommand::Review { id, action }) => {
                        match backend.review_assignment(&id, action).await {
                            Ok(updated) => {
                                let _ = event_tx.send(UiEvent::Notice(format!(
                                    "{} {}",
                                    updated.detected_name,
                                    match action {
                                        ReviewAction::Verify => "verified",
                                        ReviewAction::Reject => "rejected",
                                    }
                                )));
                                if let Ok(data) = fetch_market_data(backend.as_ref()).await {
                                    let _ = event_tx.send(UiEvent::Data(data));
                                }
                            }
                            Err(e) => {
                                let _ = event_tx.send(UiEvent::Notice(format!("Review failed: {e}")));
                            }
                        }
                    }
                    Some(UiCommand::SaveConfig(config)) => {
                        match backend.update_config(&config).await {
                            Ok(()) => {
                                let _ = event_tx.send(UiEvent::Notice("Config saved".into()));
                            }
                            Err(e) => {
                                let _ = event_tx.send(UiEvent::Notice(format!("Config save failed: {e}")));
                            }
                        }
                    }
                    Some(UiCommand::RunDiagnostics) => {
                        match backend.health().await {
                            Ok(health) => {
                                let _ = event_tx.send(UiEvent::Health(health));
                            }
                            Err(e) => {
                                let _ = event_tx.send(UiEvent::Notice(format!("Diagnostics failed: {e}")));
                            }
                        }
                    }
                    Some(UiCommand::RefreshData) => {
                        match fetch_market_data(backend.as_ref()).await {
                            Ok(data) => {
                                let _ = event_tx.send(UiEvent::Data(data));
                            }
                            Err(e) => {
                                let _ = event_tx.send(UiEvent::Notice(format!("Refresh failed: {e}")));
                            }
                        }
                    }
                    Some(UiCommand::Quit) | None => break,
                }
            }
        }
    }

    poller.stop();
    Ok(())
}
