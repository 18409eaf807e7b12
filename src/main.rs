use std::io;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Wrap};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use clutch_props::config::SimConfig;
use clutch_props::props::Direction as Pick;
use clutch_props::roster::{Matchup, matchups};
use clutch_props::runner::spawn_simulation;
use clutch_props::simulator::RunPhase;
use clutch_props::state::{AppState, Delta, SimCommand, apply_delta};

struct App {
    state: AppState,
    should_quit: bool,
    cmd_tx: mpsc::Sender<SimCommand>,
    matchups: Vec<Matchup>,
    selected: usize,
}

impl App {
    fn new(cmd_tx: mpsc::Sender<SimCommand>) -> Self {
        Self {
            state: AppState::new(),
            should_quit: false,
            cmd_tx,
            matchups: matchups(),
            selected: 0,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('m') | KeyCode::Right => self.cycle_matchup(1),
            KeyCode::Char('n') | KeyCode::Left => self.cycle_matchup(self.matchups.len().saturating_sub(1)),
            KeyCode::Char('s') | KeyCode::Enter => self.start(),
            KeyCode::Char('x') | KeyCode::Esc => self.send(SimCommand::Stop),
            KeyCode::Char('o') => self.pick(Pick::Over),
            KeyCode::Char('u') => self.pick(Pick::Under),
            _ => {}
        }
    }

    fn cycle_matchup(&mut self, step: usize) {
        if self.state.phase.is_active() || self.matchups.is_empty() {
            return;
        }
        self.selected = (self.selected + step) % self.matchups.len();
    }

    fn selected_matchup(&self) -> Option<&Matchup> {
        self.matchups.get(self.selected)
    }

    fn start(&mut self) {
        let Some(matchup) = self.selected_matchup().cloned() else {
            self.state.push_log("[WARN] No matchup available");
            return;
        };
        let Some(tracked) = matchup.default_tracked() else {
            self.state.push_log("[WARN] Matchup has no trackable players");
            return;
        };
        self.send(SimCommand::Start { matchup, tracked });
    }

    fn pick(&mut self, pick: Pick) {
        let Some(window_id) = self.state.open_window(Instant::now()).map(|w| w.window_id) else {
            self.state.push_log("[INFO] No prediction window open");
            return;
        };
        self.send(SimCommand::SubmitPick { window_id, pick });
    }

    fn send(&mut self, cmd: SimCommand) {
        if self.cmd_tx.send(cmd).is_err() {
            self.state.push_log("[WARN] Simulation thread is gone");
        }
    }
}

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let cfg = SimConfig::from_env();
    let _log_guard = init_logging(&cfg);

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let _sim = spawn_simulation(tx, cmd_rx, cfg);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let mut app = App::new(cmd_tx);
    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

/// File logging only; the terminal UI owns stdout.
fn init_logging(cfg: &SimConfig) -> Option<WorkerGuard> {
    let dir = cfg.log_dir.as_ref()?;
    if std::fs::create_dir_all(dir).is_err() {
        return None;
    }
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,clutch_props=debug"));
    let appender = tracing_appender::rolling::never(dir, "clutch_props.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .try_init();
    Some(guard)
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(8),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(app))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(chunks[1]);
    render_props(frame, body[0], &app.state);
    render_tape(frame, body[1], &app.state);
    render_console(frame, chunks[2], &app.state);

    let footer = Paragraph::new(
        "s Start | x Stop | m/n Matchup | o Over | u Under | q Quit",
    )
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, chunks[3]);
}

fn header_text(app: &App) -> String {
    let state = &app.state;
    let matchup = state
        .matchup
        .as_ref()
        .or_else(|| app.selected_matchup())
        .map(|m| m.label())
        .unwrap_or_else(|| "-".to_string());
    let line1 = format!("CLUTCH PROPS | {matchup} | {}", state.phase.label());

    let line2 = match state.last_play() {
        Some(play) => format!(
            "Q{} {} | {} {} - {} {} | play {}/{}",
            play.quarter,
            play.clock,
            state.matchup.as_ref().map(|m| m.home.abbr.as_str()).unwrap_or("HOME"),
            play.home_score,
            play.away_score,
            state.matchup.as_ref().map(|m| m.away.abbr.as_str()).unwrap_or("AWAY"),
            play.index + 1,
            state.script_len
        ),
        None if state.phase == RunPhase::Generating => "Generating script...".to_string(),
        None => "Press s to start".to_string(),
    };
    let source = state
        .script_source
        .map(|s| s.label())
        .unwrap_or("-");
    format!("{line1}\n{line2} | source: {source} | score {:+}", state.score_total)
}

fn render_props(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default().title("Props").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if state.props.is_empty() {
        let empty = Paragraph::new("No run yet").style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, inner);
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(1),
        ])
        .split(inner);

    for (idx, prop) in state.props.iter().take(2).enumerate() {
        let current = state
            .tracked
            .iter()
            .find(|t| t.prop.player == prop.player)
            .map(|t| t.current)
            .unwrap_or(0.0);
        let ratio = if prop.line > 0.0 {
            (current / prop.line).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let color = match prop.direction {
            Pick::Over if current > prop.line => Color::Green,
            Pick::Under if current > prop.line => Color::Red,
            _ => Color::Yellow,
        };
        let gauge = Gauge::default()
            .block(Block::default().title(prop.to_string()))
            .gauge_style(Style::default().fg(color))
            .ratio(ratio)
            .label(format!("{current} / {}", prop.line));
        frame.render_widget(gauge, rows[idx]);
    }

    let now = Instant::now();
    let mut lines: Vec<Line> = Vec::new();
    if let Some(window) = state.open_window(now) {
        let left = window.closes_at.saturating_duration_since(now).as_secs();
        lines.push(Line::styled(
            format!("CLUTCH: {} - call it! ({left}s)", window.prop),
            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
        ));
        lines.push(Line::raw("o = Over   u = Under"));
    }
    for record in &state.resolved {
        let verdict = match record.is_correct() {
            Some(true) => "correct",
            Some(false) => "wrong",
            None => "no call",
        };
        lines.push(Line::raw(format!(
            "#{} {} {}: {verdict} ({})",
            record.window_id,
            record.player,
            record.category,
            record
                .score_delta
                .map(|d| format!("{d:+}"))
                .unwrap_or_else(|| "0".to_string())
        )));
    }
    if let Some(report) = &state.report {
        for line in &report.summary.stat_lines {
            lines.push(Line::styled(line.clone(), Style::default().fg(Color::DarkGray)));
        }
    }
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), rows[2]);
}

fn render_tape(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default().title("Play-by-play").borders(Borders::ALL);
    let height = block.inner(area).height as usize;
    let lines: Vec<Line> = state
        .tape
        .iter()
        .rev()
        .take(height)
        .map(|play| {
            let tracked = state
                .props
                .iter()
                .any(|p| play.involved.contains(&p.player.name));
            let style = if tracked {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default()
            };
            Line::styled(
                format!("Q{} {:>5}  {}", play.quarter, play.clock, play.description),
                style,
            )
        })
        .collect();
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_console(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default().title("Console").borders(Borders::ALL);
    let height = block.inner(area).height as usize;
    let skip = state.logs.len().saturating_sub(height);
    let lines: Vec<Line> = state
        .logs
        .iter()
        .skip(skip)
        .map(|msg| {
            let color = if msg.starts_with("[WARN]") {
                Color::Yellow
            } else if msg.starts_with("[ALERT]") {
                Color::Magenta
            } else {
                Color::Gray
            };
            Line::styled(msg.clone(), Style::default().fg(color))
        })
        .collect();
    frame.render_widget(Paragraph::new(lines).block(block), area);
}
