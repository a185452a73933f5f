//! Interval polling of the agent-run status.
//!
//! The poller fetches once immediately on activation, then on a fixed
//! interval, delivering every result to the caller. It relays tracker
//! output only; phase logic lives behind the backend.

use crate::backend::MarketBackend;
use crate::model::RunSnapshot;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// One delivery per poll tick: the latest snapshot, or the error that kept
/// this tick from producing one. A failed tick never stops the poller.
#[derive(Debug, Clone)]
pub enum PollUpdate {
    Snapshot(RunSnapshot),
    Unreachable(String),
}

pub struct StatusPoller {
    active: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl StatusPoller {
    /// Start polling `backend` every `every`, delivering on the returned
    /// channel. The first fetch happens immediately.
    pub fn spawn(
        backend: Arc<dyn MarketBackend>,
        every: Duration,
    ) -> (Self, UnboundedReceiver<PollUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let active = Arc::new(AtomicBool::new(true));
        let flag = active.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !flag.load(Ordering::Relaxed) {
                    return;
                }
                let update = match backend.agent_status().await {
                    Ok(snap) => PollUpdate::Snapshot(snap),
                    Err(e) => PollUpdate::Unreachable(e.to_string()),
                };
                // Deactivation may have raced the fetch; a result that
                // arrives after stop must not be delivered.
                if !flag.load(Ordering::Relaxed) {
                    return;
                }
                if tx.send(update).is_err() {
                    return;
                }
            }
        });

        (Self { active, handle }, rx)
    }

    /// Stop polling. No deliveries occur after this returns; an in-flight
    /// fetch is not interrupted, only its result is discarded.
    pub fn stop(self) {
        self.active.store(false, Ordering::Relaxed);
        self.handle.abort();
    }
}
