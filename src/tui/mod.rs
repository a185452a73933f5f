mod state;

use crate::backend::MarketBackend;
use crate::cli::Cli;
use crate::model::{HealthState, MatchStatus, ReviewAction, RunPhase, Severity};
use crate::orchestrator::{self, UiCommand, UiEvent};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph, Tabs},
    Terminal,
};
use self::state::{step_state, StepState, UiState, STEP_PHASES, TAB_TITLES};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use std::{io, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(args: Cli, backend: Arc<dyn MarketBackend>) -> Result<()> {
    // Unbounded channels avoid backpressure between the UI thread and the
    // controller.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<UiEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    // TUI runs in a dedicated thread to keep all blocking I/O out of the
    // Tokio runtime.
    let ui_handle = std::thread::spawn(move || run_threaded(event_rx, cmd_tx));

    let res = orchestrator::run_controller(
        backend,
        StdDuration::from(args.poll_interval),
        args.run_on_launch,
        event_tx,
        cmd_rx,
    )
    .await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
fn run_threaded(
    mut event_rx: UnboundedReceiver<UiEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let mut state = UiState::default();
    let tick_rate = StdDuration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        // Drain controller updates without blocking to keep the UI
        // responsive.
        while let Ok(ev) = event_rx.try_recv() {
            match ev {
                UiEvent::Status(update) => state.apply_status(update),
                UiEvent::Data(data) => state.apply_data(data),
                UiEvent::Health(health) => state.health = Some(health),
                UiEvent::Notice(notice) => state.notice = notice,
            }
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(StdDuration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                match (k.modifiers, k.code) {
                    (_, KeyCode::Char('q')) | (KeyModifiers::CONTROL, KeyCode::Char('c')) => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                    (_, KeyCode::Tab) => {
                        state.tab = (state.tab + 1) % TAB_TITLES.len();
                    }
                    (_, KeyCode::Char('1')) => state.tab = 0,
                    (_, KeyCode::Char('2')) => state.tab = 1,
                    (_, KeyCode::Char('3')) => state.tab = 2,
                    (_, KeyCode::Char('s')) => {
                        if !state.is_running() {
                            let _ = cmd_tx.send(UiCommand::StartRun);
                        }
                    }
                    (_, KeyCode::Char('r')) => {
                        let _ = cmd_tx.send(UiCommand::RefreshData);
                    }
                    (_, KeyCode::Char('d')) => {
                        state.health = None;
                        let _ = cmd_tx.send(UiCommand::RunDiagnostics);
                    }
                    (_, KeyCode::Down) | (_, KeyCode::Char('j')) if state.tab == 1 => {
                        state.scout_next();
                    }
                    (_, KeyCode::Up) | (_, KeyCode::Char('k')) if state.tab == 1 => {
                        state.scout_prev();
                    }
                    (_, KeyCode::Char('v')) | (_, KeyCode::Char('x')) if state.tab == 1 => {
                        let action = if k.code == KeyCode::Char('v') {
                            ReviewAction::Verify
                        } else {
                            ReviewAction::Reject
                        };
                        if let Some(m) = state.selected_match() {
                            if m.status == MatchStatus::Pending {
                                let _ = cmd_tx.send(UiCommand::Review {
                                    id: m.id.clone(),
                                    action,
                                });
                            } else {
                                state.notice = "Match already reviewed".into();
                            }
                        }
                    }
                    (_, KeyCode::Char('+')) if state.tab == 2 => {
                        state.config.search_radius_miles += 1;
                        state.config_dirty = true;
                    }
                    (_, KeyCode::Char('-')) if state.tab == 2 => {
                        if state.config.search_radius_miles > 1 {
                            state.config.search_radius_miles -= 1;
                            state.config_dirty = true;
                        }
                    }
                    (_, KeyCode::Char(']')) if state.tab == 2 => {
                        state.config.scrape_frequency += StdDuration::from_secs(6 * 60 * 60);
                        state.config_dirty = true;
                    }
                    (_, KeyCode::Char('[')) if state.tab == 2 => {
                        let floor = StdDuration::from_secs(60 * 60);
                        let stepped = state
                            .config
                            .scrape_frequency
                            .saturating_sub(StdDuration::from_secs(6 * 60 * 60));
                        state.config.scrape_frequency = stepped.max(floor);
                        state.config_dirty = true;
                    }
                    (_, KeyCode::Char('w')) if state.tab == 2 => {
                        let _ = cmd_tx.send(UiCommand::SaveConfig(state.config.clone()));
                        state.config_dirty = false;
                    }
                    _ => {}
                }
            }
        }
    };

    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();
    res
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(1),
        ])
        .split(area);

    let tabs = Tabs::new(TAB_TITLES.iter().map(|t| Line::from(*t)))
        .select(state.tab)
        .highlight_style(Style::default().fg(Color::Indexed(63)).add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::ALL).title(" CMA Dashboard "));
    f.render_widget(tabs, rows[0]);

    match state.tab {
        1 => draw_scout(f, rows[1], state),
        2 => draw_settings(f, rows[1], state),
        _ => draw_dashboard(f, rows[1], state),
    }

    let footer = if state.notice.is_empty() {
        "q quit | tab switch | s start run | r refresh".to_string()
    } else {
        state.notice.clone()
    };
    f.render_widget(
        Paragraph::new(footer).style(Style::default().fg(Color::Gray)),
        rows[2],
    );
}

fn draw_dashboard(f: &mut ratatui::Frame, area: Rect, state: &UiState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7),
            Constraint::Min(4),
            Constraint::Length(6),
        ])
        .split(area);

    draw_run_panel(f, rows[0], state);
    draw_competitors(f, rows[1], state);
    draw_alerts(f, rows[2], state);
}

fn draw_run_panel(f: &mut ratatui::Frame, area: Rect, state: &UiState) {
    let block = Block::default().borders(Borders::ALL).title(" Agent Run ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(inner);

    let failed = state.status.phase == RunPhase::Failed;
    let gauge = Gauge::default()
        .ratio(f64::from(state.status.progress_percent) / 100.0)
        .gauge_style(Style::default().fg(if failed { Color::Red } else { Color::Indexed(63) }))
        .label(format!("{}%", state.status.progress_percent));
    f.render_widget(gauge, rows[0]);

    let mut steps: Vec<Span> = Vec::new();
    for (i, &phase) in STEP_PHASES.iter().enumerate() {
        if i > 0 {
            steps.push(Span::raw("  "));
        }
        let style = match step_state(state.status.phase, phase) {
            StepState::Done => Style::default().fg(Color::Indexed(63)).add_modifier(Modifier::BOLD),
            StepState::Active => Style::default()
                .fg(Color::White)
                .bg(Color::Indexed(63))
                .add_modifier(Modifier::BOLD),
            StepState::Todo => Style::default().fg(Color::DarkGray),
        };
        steps.push(Span::styled(format!(" {} ", phase.label()), style));
    }
    f.render_widget(Paragraph::new(Line::from(steps)), rows[1]);

    let console = if let Some(err) = state.poll_error.as_deref() {
        Line::from(Span::styled(
            format!("status poll failed: {err}"),
            Style::default().fg(Color::Red),
        ))
    } else {
        let style = if failed {
            Style::default().fg(Color::Red)
        } else {
            Style::default().fg(Color::Green)
        };
        let mut spans = vec![Span::styled(state.status.message.clone(), style)];
        if state.status.items_total > 0 {
            spans.push(Span::styled(
                format!(
                    "  ({}/{})",
                    state.status.items_processed, state.status.items_total
                ),
                Style::default().fg(Color::Gray),
            ));
        }
        Line::from(spans)
    };
    f.render_widget(Paragraph::new(console), rows[2]);
}

fn draw_competitors(f: &mut ratatui::Frame, area: Rect, state: &UiState) {
    let items: Vec<ListItem> = state
        .competitors
        .iter()
        .map(|c| {
            ListItem::new(Line::from(vec![
                Span::styled(c.name.clone(), Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(format!(
                    "  {}  ${}k-${}k  score {}",
                    c.builder,
                    c.price_min / 1000,
                    c.price_max / 1000,
                    c.alignment_score
                )),
                if c.alerts > 0 {
                    Span::styled(
                        format!("  {} alert(s)", c.alerts),
                        Style::default().fg(Color::Yellow),
                    )
                } else {
                    Span::raw("")
                },
            ]))
        })
        .collect();
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" Competitors ({}) ", state.competitors.len())),
    );
    f.render_widget(list, area);
}

fn draw_alerts(f: &mut ratatui::Frame, area: Rect, state: &UiState) {
    let items: Vec<ListItem> = state
        .alerts
        .iter()
        .map(|a| {
            let sev_style = match a.severity {
                Severity::High => Style::default().fg(Color::Red),
                Severity::Medium => Style::default().fg(Color::Yellow),
                Severity::Low => Style::default().fg(Color::Gray),
            };
            ListItem::new(Line::from(vec![
                Span::styled(format!("[{}] ", a.kind.label()), sev_style),
                Span::raw(format!("{}: {} ({})", a.competitor_name, a.message, a.date)),
            ]))
        })
        .collect();
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" Alerts ({}) ", state.alerts.len())),
    );
    f.render_widget(list, area);
}

fn draw_scout(f: &mut ratatui::Frame, area: Rect, state: &UiState) {
    let items: Vec<ListItem> = state
        .assignments
        .iter()
        .map(|m| {
            let (tag, style) = match m.status {
                MatchStatus::Pending => ("PEND", Style::default().fg(Color::Yellow)),
                MatchStatus::Verified => ("VER ", Style::default().fg(Color::Green)),
                MatchStatus::Rejected => ("REJ ", Style::default().fg(Color::DarkGray)),
            };
            ListItem::new(Line::from(vec![
                Span::styled(format!("[{tag}] "), style),
                Span::styled(
                    m.detected_name.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw(format!(
                    "  near {}  score {}  {:.1} mi",
                    m.community, m.alignment_score, m.distance_miles
                )),
            ]))
        })
        .collect();

    let title = format!(
        " Scout Review ({} pending) - v verify, x reject ",
        state.pending_reviews()
    );
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().bg(Color::Indexed(236)));
    let mut list_state = ListState::default();
    list_state.select(Some(state.scout_selected));
    f.render_stateful_widget(list, area, &mut list_state);
}

fn draw_settings(f: &mut ratatui::Frame, area: Rect, state: &UiState) {
    let mut lines = vec![
        Line::from(vec![
            Span::styled("Feed URL: ", Style::default().fg(Color::Gray)),
            Span::raw(state.config.feed_url.clone()),
        ]),
        Line::from(vec![
            Span::styled("Search radius: ", Style::default().fg(Color::Gray)),
            Span::raw(format!("{} mi", state.config.search_radius_miles)),
            Span::styled("  (+/- to adjust)", Style::default().fg(Color::DarkGray)),
        ]),
        Line::from(vec![
            Span::styled("Scrape cadence: ", Style::default().fg(Color::Gray)),
            Span::raw(humantime::format_duration(state.config.scrape_frequency).to_string()),
            Span::styled("  ([/] to adjust)", Style::default().fg(Color::DarkGray)),
        ]),
        Line::from(if state.config_dirty {
            Span::styled("unsaved changes - w to save", Style::default().fg(Color::Yellow))
        } else {
            Span::styled("saved", Style::default().fg(Color::DarkGray))
        }),
        Line::from(""),
    ];

    match &state.health {
        Some(h) => {
            let style = |s: HealthState| match s {
                HealthState::Ok => Style::default().fg(Color::Green),
                HealthState::Error => Style::default().fg(Color::Red),
                HealthState::Checking => Style::default().fg(Color::Yellow),
            };
            lines.push(Line::from(vec![
                Span::styled("Feed: ", Style::default().fg(Color::Gray)),
                Span::styled(format!("{:?}", h.feed_status), style(h.feed_status)),
                Span::styled("  AI: ", Style::default().fg(Color::Gray)),
                Span::styled(format!("{:?}", h.ai_status), style(h.ai_status)),
            ]));
            lines.push(Line::from(h.message.clone()));
        }
        None => {
            lines.push(Line::from(Span::styled(
                "d to run diagnostics",
                Style::default().fg(Color::DarkGray),
            )));
        }
    }

    let panel = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Settings "));
    f.render_widget(panel, area);
}
