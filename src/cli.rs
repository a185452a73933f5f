use crate::backend::{HttpBackend, LocalBackend, MarketBackend};
use crate::model::{RunPhase, RunReport, RunSnapshot};
use crate::poller::{PollUpdate, StatusPoller};
use crate::store::{self, MarketStore};
use crate::tracker::RunTracker;
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "cma-dash",
    version,
    about = "Market-intelligence dashboard for home-builder sales teams"
)]
pub struct Cli {
    /// Poll a remote backend at this base URL instead of running the
    /// built-in demo backend in-process
    #[arg(long)]
    pub backend_url: Option<String>,

    /// Agent status poll interval
    #[arg(long, default_value = "1s")]
    pub poll_interval: humantime::Duration,

    /// Run one agent cycle and print the final report as JSON (no TUI)
    #[arg(long)]
    pub json: bool,

    /// Run one agent cycle and print the final report as text (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Host the demo backend over HTTP instead of opening the dashboard
    #[arg(long)]
    pub serve: bool,

    /// Port for --serve
    #[arg(long, default_value_t = 8000)]
    pub port: u16,

    /// Automatically start an agent run on launch when the backend is idle
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub run_on_launch: bool,

    /// Cap on how long headless modes wait for the run to finish
    #[arg(long, default_value = "60s")]
    pub run_timeout: humantime::Duration,
}

pub async fn run(args: Cli) -> Result<()> {
    if args.json && args.text {
        return Err(anyhow::anyhow!("--json and --text are mutually exclusive"));
    }

    if args.serve {
        if args.backend_url.is_some() {
            return Err(anyhow::anyhow!(
                "--serve hosts the built-in demo backend and cannot be combined with --backend-url"
            ));
        }
        return crate::server::serve(Arc::new(demo_backend(true)), args.port).await;
    }

    let headless = args.json || args.text;
    let backend: Arc<dyn MarketBackend> = match args.backend_url.as_deref() {
        Some(url) => Arc::new(HttpBackend::new(url).context("failed to build HTTP backend")?),
        None => Arc::new(demo_backend(!headless)),
    };

    if headless {
        return run_headless(args, backend).await;
    }

    #[cfg(feature = "tui")]
    {
        return crate::tui::run(args, backend).await;
    }
    #[cfg(not(feature = "tui"))]
    {
        // Fallback when built without TUI support.
        run_headless(args, backend).await
    }
}

/// Demo backend wiring: fresh tracker plus the seeded store, with config
/// persisted under the user config dir for the interactive modes.
fn demo_backend(persist_config: bool) -> LocalBackend {
    let mut market = MarketStore::seeded();
    if persist_config {
        if let Some(path) = store::default_config_path() {
            market = market.with_config_path(path);
        }
    }
    LocalBackend::new(RunTracker::new(), Arc::new(market))
}

/// Drive one full agent cycle and print the report. Text mode narrates
/// phase transitions on stderr while the run progresses.
async fn run_headless(args: Cli, backend: Arc<dyn MarketBackend>) -> Result<()> {
    let (out_tx, out_handle) = spawn_output_writer();
    let text_mode = args.text;
    let run_timeout = Duration::from(args.run_timeout);

    let started = backend
        .start_agent_run()
        .await
        .context("failed to start the agent run")?;
    if text_mode {
        let _ = out_tx.send(OutputLine::Stderr(format!("== {} ==", started.phase)));
    }

    let (poller, mut rx) = StatusPoller::spawn(backend.clone(), Duration::from(args.poll_interval));
    let deadline = tokio::time::Instant::now() + run_timeout;
    let mut last_phase = started.phase;
    let mut final_status: Option<RunSnapshot> = None;

    loop {
        tokio::select! {
            update = rx.recv() => match update {
                Some(PollUpdate::Snapshot(snap)) => {
                    if text_mode && snap.phase != last_phase {
                        let _ = out_tx.send(OutputLine::Stderr(format!("== {} ==", snap.phase)));
                    }
                    last_phase = snap.phase;
                    if snap.phase.is_terminal() {
                        final_status = Some(snap);
                        break;
                    }
                }
                Some(PollUpdate::Unreachable(msg)) => {
                    let _ = out_tx.send(OutputLine::Stderr(format!("status poll failed: {msg}")));
                }
                None => break,
            },
            _ = tokio::time::sleep_until(deadline) => break,
        }
    }
    poller.stop();

    let Some(status) = final_status else {
        drop(out_tx);
        let _ = out_handle.await;
        return Err(anyhow::anyhow!(
            "run did not reach a terminal phase within {}",
            humantime::format_duration(run_timeout)
        ));
    };

    let (competitors, alerts, assignments) = futures::try_join!(
        backend.competitors(),
        backend.alerts(),
        backend.assignments(),
    )
    .context("failed to fetch the market report")?;
    let report = RunReport {
        status,
        competitors,
        alerts,
        assignments,
    };

    if args.json {
        let _ = out_tx.send(OutputLine::Stdout(serde_json::to_string_pretty(&report)?));
    } else {
        for line in crate::text_summary::build_text_summary(&report).lines {
            let _ = out_tx.send(OutputLine::Stdout(line));
        }
    }

    drop(out_tx);
    let _ = out_handle.await;

    if report.status.phase == RunPhase::Failed {
        return Err(anyhow::anyhow!("agent run failed: {}", report.status.message));
    }
    Ok(())
}
