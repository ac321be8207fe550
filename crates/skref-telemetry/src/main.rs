//! skref-telemetry: terminal dashboard for skref simulations.
//!
//! Listens on UDP `127.0.0.1:9100` for the JSON snapshots a skref engine
//! sends when built with `Engine::with_diagnostics` (feature `diagnostics`),
//! and shows tick timing, per-tick controller outcomes, level state and
//! captured logs.
//!
//! Run with `cargo run -p skref-telemetry`, then start a skref program.

use std::collections::VecDeque;
use std::io;
use std::net::UdpSocket;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Sparkline};
use serde::Deserialize;

const LISTEN_ADDR: &str = "127.0.0.1:9100";

// ── Wire types (must match skref::diag) ─────────────────────────────────

#[derive(Deserialize, Clone, Default)]
struct DiagSnapshot {
    tick_count: u64,
    elapsed_secs: f32,
    delta_ms: f32,
    engine_state: String,
    activity_count: usize,
    #[serde(default)]
    worlds: Vec<WorldInfo>,
    #[serde(default)]
    logs: Vec<LogEntryInfo>,
}

#[derive(Deserialize, Clone, Default)]
struct WorldInfo {
    level_id: Option<String>,
    level_state: String,
    entities: usize,
    dynamic: usize,
    attached: usize,
    ticks: u64,
    updated: u32,
    skipped: u32,
    failed: u32,
    panicked: u32,
    moved: u32,
    collisions: u32,
}

#[derive(Deserialize, Clone, Default)]
struct LogEntryInfo {
    level: String,
    #[allow(dead_code)]
    target: String,
    message: String,
    timestamp_secs: f32,
}

// ── Tabs ─────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Tab {
    Overview,
    Logs,
}

impl Tab {
    const ALL: [Tab; 2] = [Tab::Overview, Tab::Logs];

    fn next(self) -> Self {
        match self {
            Tab::Overview => Tab::Logs,
            Tab::Logs => Tab::Overview,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Tab::Overview => "Overview",
            Tab::Logs => "Logs",
        }
    }
}

// ── Log level filter ────────────────────────────────────────────────────

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum LogFilter {
    All,
    Info,
    Warn,
    Error,
}

impl LogFilter {
    fn next(self) -> Self {
        match self {
            LogFilter::All => LogFilter::Info,
            LogFilter::Info => LogFilter::Warn,
            LogFilter::Warn => LogFilter::Error,
            LogFilter::Error => LogFilter::All,
        }
    }

    fn label(self) -> &'static str {
        match self {
            LogFilter::All => "ALL",
            LogFilter::Info => "INFO+",
            LogFilter::Warn => "WARN+",
            LogFilter::Error => "ERROR",
        }
    }

    fn passes(self, level: &str) -> bool {
        match self {
            LogFilter::All => true,
            LogFilter::Info => matches!(level, "INFO" | "WARN" | "ERROR"),
            LogFilter::Warn => matches!(level, "WARN" | "ERROR"),
            LogFilter::Error => level == "ERROR",
        }
    }
}

// ── App state ────────────────────────────────────────────────────────────

const HISTORY_CAP: usize = 600;
const LOG_CAP: usize = 2000;

struct App {
    latest: DiagSnapshot,
    /// Tick delta in microseconds.
    delta_history: VecDeque<u64>,
    collision_history: VecDeque<u64>,
    active_tab: Tab,
    paused: bool,
    connected: bool,
    log_entries: Vec<LogEntryInfo>,
    log_filter: LogFilter,
    log_auto_scroll: bool,
    log_scroll_offset: usize,
}

impl App {
    fn new() -> Self {
        Self {
            latest: DiagSnapshot::default(),
            delta_history: VecDeque::with_capacity(HISTORY_CAP),
            collision_history: VecDeque::with_capacity(HISTORY_CAP),
            active_tab: Tab::Overview,
            paused: false,
            connected: false,
            log_entries: Vec::new(),
            log_filter: LogFilter::Info,
            log_auto_scroll: true,
            log_scroll_offset: 0,
        }
    }

    fn push_snapshot(&mut self, snap: DiagSnapshot) {
        if self.paused {
            return;
        }
        push_capped(
            &mut self.delta_history,
            (snap.delta_ms * 1000.0).round().max(0.0) as u64,
        );
        let collisions = snap.worlds.iter().map(|w| u64::from(w.collisions)).sum();
        push_capped(&mut self.collision_history, collisions);

        self.log_entries.extend(snap.logs.iter().cloned());
        if self.log_entries.len() > LOG_CAP {
            let excess = self.log_entries.len() - LOG_CAP;
            self.log_entries.drain(..excess);
        }

        self.latest = snap;
        self.connected = true;
    }

    fn filtered_logs(&self) -> Vec<&LogEntryInfo> {
        self.log_entries
            .iter()
            .filter(|e| self.log_filter.passes(&e.level))
            .collect()
    }

    /// (info, warn, error) counts over all captured logs.
    fn log_counts(&self) -> (usize, usize, usize) {
        let (mut i, mut w, mut e) = (0, 0, 0);
        for log in &self.log_entries {
            match log.level.as_str() {
                "INFO" => i += 1,
                "WARN" => w += 1,
                "ERROR" => e += 1,
                _ => {}
            }
        }
        (i, w, e)
    }
}

fn push_capped(history: &mut VecDeque<u64>, value: u64) {
    if history.len() >= HISTORY_CAP {
        history.pop_front();
    }
    history.push_back(value);
}

// ── Main ─────────────────────────────────────────────────────────────────

fn main() -> io::Result<()> {
    let socket = UdpSocket::bind(LISTEN_ADDR).map_err(|e| {
        io::Error::new(
            e.kind(),
            format!("failed to bind {LISTEN_ADDR} (is another skref-telemetry running?): {e}"),
        )
    })?;
    socket.set_nonblocking(true)?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let result = run(&mut terminal, &socket);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    socket: &UdpSocket,
) -> io::Result<()> {
    let mut app = App::new();
    let mut buf = [0u8; 65536];

    loop {
        while let Ok(n) = socket.recv(&mut buf) {
            if let Ok(snap) = serde_json::from_slice::<DiagSnapshot>(&buf[..n]) {
                app.push_snapshot(snap);
            }
        }

        terminal.draw(|f| ui(f, &app))?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if handle_key(&mut app, key) {
                    return Ok(());
                }
            }
        }
    }
}

/// Returns `true` when the app should quit.
fn handle_key(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return true,
        KeyCode::Char('p') => app.paused = !app.paused,
        KeyCode::Char('1') => app.active_tab = Tab::Overview,
        KeyCode::Char('2') => app.active_tab = Tab::Logs,
        KeyCode::Tab => app.active_tab = app.active_tab.next(),

        KeyCode::Char('l') if app.active_tab == Tab::Logs => {
            app.log_filter = app.log_filter.next();
        }
        KeyCode::Char('g') if app.active_tab == Tab::Logs => {
            app.log_auto_scroll = !app.log_auto_scroll;
        }
        KeyCode::Up if app.active_tab == Tab::Logs => {
            app.log_auto_scroll = false;
            app.log_scroll_offset = app.log_scroll_offset.saturating_sub(1);
        }
        KeyCode::Down if app.active_tab == Tab::Logs => {
            app.log_auto_scroll = false;
            app.log_scroll_offset += 1;
        }
        _ => {}
    }
    false
}

// ── Drawing ──────────────────────────────────────────────────────────────

fn ui(f: &mut ratatui::Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Length(1), // tab bar
            Constraint::Min(6),    // tab content
            Constraint::Length(1), // help bar
        ])
        .split(f.area());

    draw_header(f, app, chunks[0]);
    draw_tab_bar(f, app, chunks[1]);
    match app.active_tab {
        Tab::Overview => draw_overview_tab(f, app, chunks[2]),
        Tab::Logs => draw_logs_tab(f, app, chunks[2]),
    }
    draw_help_bar(f, app, chunks[3]);
}

fn label(text: &str) -> Span<'_> {
    Span::styled(text, Style::default().fg(Color::DarkGray))
}

fn value(text: String) -> Span<'static> {
    Span::styled(text, Style::default().fg(Color::White))
}

fn draw_header(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let s = &app.latest;
    let (status, status_color) = if app.paused {
        ("PAUSED", Color::Yellow)
    } else if app.connected {
        ("LIVE", Color::Green)
    } else {
        ("WAITING", Color::DarkGray)
    };

    let text = Line::from(vec![
        Span::styled(
            format!("  {status}  "),
            Style::default().bg(status_color).fg(Color::Black),
        ),
        Span::raw("  "),
        label("Engine: "),
        Span::styled(
            s.engine_state.clone(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  |  "),
        label("Tick: "),
        value(s.tick_count.to_string()),
        Span::raw("  |  "),
        label("\u{0394}: "),
        value(format!("{:.1}ms", s.delta_ms)),
        Span::raw("  |  "),
        label("Activities: "),
        value(s.activity_count.to_string()),
        Span::raw("  |  "),
        label("Sim: "),
        value(format_uptime(s.elapsed_secs)),
    ]);

    let block = Block::default()
        .title(" skref-telemetry ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    f.render_widget(Paragraph::new(text).block(block), area);
}

fn draw_tab_bar(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let mut spans = vec![Span::raw(" ")];
    for (i, tab) in Tab::ALL.iter().enumerate() {
        let (num_style, label_style) = if *tab == app.active_tab {
            (
                Style::default()
                    .bg(Color::Cyan)
                    .fg(Color::Black)
                    .add_modifier(Modifier::BOLD),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )
        } else {
            (
                Style::default().fg(Color::DarkGray),
                Style::default().fg(Color::DarkGray),
            )
        };
        spans.push(Span::styled(format!(" {} ", i + 1), num_style));
        spans.push(Span::styled(format!("{} ", tab.label()), label_style));
        spans.push(Span::raw("  "));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

// ── Overview Tab ─────────────────────────────────────────────────────────

fn draw_overview_tab(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(8), Constraint::Min(4)])
        .split(area);
    draw_sparklines(f, app, chunks[0]);
    draw_level_panel(f, app, chunks[1]);
}

fn draw_sparkline(
    f: &mut ratatui::Frame,
    area: Rect,
    title: &str,
    data: &[u64],
    color: Color,
    summary: String,
) {
    let block = Block::default()
        .title(format!(" {title} "))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);
    f.render_widget(block, area);
    if inner.height < 2 {
        return;
    }
    let spark_area = Rect {
        height: inner.height - 1,
        ..inner
    };
    let stats_area = Rect {
        y: inner.y + inner.height - 1,
        height: 1,
        ..inner
    };
    f.render_widget(
        Sparkline::default().data(data).style(Style::default().fg(color)),
        spark_area,
    );
    f.render_widget(Paragraph::new(Line::from(label(&summary))), stats_area);
}

fn draw_sparklines(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let delta: Vec<u64> = app.delta_history.iter().copied().collect();
    let (d_min, d_avg, d_max) = stats(&delta);
    draw_sparkline(
        f,
        chunks[0],
        "Tick Delta",
        &delta,
        Color::Yellow,
        format!(
            "min: {:.1}ms  avg: {:.1}ms  max: {:.1}ms",
            d_min / 1000.0,
            d_avg / 1000.0,
            d_max / 1000.0
        ),
    );

    let collisions: Vec<u64> = app.collision_history.iter().copied().collect();
    let (c_min, c_avg, c_max) = stats(&collisions);
    draw_sparkline(
        f,
        chunks[1],
        "Collisions / Tick",
        &collisions,
        Color::Magenta,
        format!("min: {c_min:.0}  avg: {c_avg:.1}  max: {c_max:.0}"),
    );
}

fn draw_level_panel(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Levels ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    f.render_widget(block, area);

    if app.latest.worlds.is_empty() {
        let text = label("  No world activity reporting");
        f.render_widget(Paragraph::new(text), inner);
        return;
    }

    let mut lines = Vec::new();
    for world in &app.latest.worlds {
        let state_color = match world.level_state.as_str() {
            "ready" => Color::Green,
            "loading" => Color::Yellow,
            _ => Color::DarkGray,
        };
        lines.push(Line::from(vec![
            Span::styled(
                format!("  {:<16}", world.level_id.as_deref().unwrap_or("-")),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("{:<8}", world.level_state),
                Style::default().fg(state_color),
            ),
            label("entities "),
            value(format!("{:<5}", world.entities)),
            label("dynamic "),
            value(format!("{:<5}", world.dynamic)),
            label("attached "),
            value(format!("{:<5}", world.attached)),
            label("ticks "),
            value(world.ticks.to_string()),
        ]));

        let problem = |n: u32| {
            let color = if n > 0 { Color::Red } else { Color::White };
            Span::styled(format!("{n:<5}"), Style::default().fg(color))
        };
        lines.push(Line::from(vec![
            Span::raw("  "),
            label("updated "),
            value(format!("{:<5}", world.updated)),
            label("moved "),
            value(format!("{:<5}", world.moved)),
            label("collisions "),
            value(format!("{:<5}", world.collisions)),
            label("skipped "),
            problem(world.skipped),
            label("failed "),
            problem(world.failed),
            label("panicked "),
            problem(world.panicked),
        ]));
    }
    f.render_widget(Paragraph::new(lines), inner);
}

// ── Logs Tab ─────────────────────────────────────────────────────────────

fn draw_logs_tab(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let (i, w, e) = app.log_counts();
    let scroll = if app.log_auto_scroll { "auto" } else { "manual" };
    let block = Block::default()
        .title(format!(
            " Logs [{}]  I:{i} W:{w} E:{e}  scroll:{scroll} ",
            app.log_filter.label()
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let filtered = app.filtered_logs();
    if filtered.is_empty() {
        f.render_widget(Paragraph::new(label("  No log messages")), inner);
        return;
    }

    let visible = inner.height as usize;
    let last_page = filtered.len().saturating_sub(visible);
    let offset = if app.log_auto_scroll {
        last_page
    } else {
        app.log_scroll_offset.min(last_page)
    };

    let lines: Vec<Line> = filtered
        .iter()
        .skip(offset)
        .take(visible)
        .map(|entry| {
            let color = match entry.level.as_str() {
                "DEBUG" | "TRACE" => Color::Gray,
                "INFO" => Color::Cyan,
                "WARN" => Color::Yellow,
                "ERROR" => Color::Red,
                _ => Color::White,
            };
            Line::from(vec![
                Span::styled(
                    format!("  [{:>6.1}s] ", entry.timestamp_secs),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(
                    format!("{:<5} ", entry.level),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ),
                value(entry.message.clone()),
            ])
        })
        .collect();
    f.render_widget(Paragraph::new(lines), inner);
}

fn draw_help_bar(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Cyan));
    let mut spans = vec![
        key(" [1-2]"),
        Span::raw(" tab  "),
        key("[Tab]"),
        Span::raw(" next  "),
    ];
    if app.active_tab == Tab::Logs {
        spans.extend([
            key("[l]"),
            Span::raw(" filter  "),
            key("[g]"),
            Span::raw(" auto-scroll  "),
            key("[\u{2191}\u{2193}]"),
            Span::raw(" scroll  "),
        ]);
    }
    spans.extend([key("[p]"), Span::raw(" pause  "), key("[q]"), Span::raw(" quit")]);
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

// ── Helpers ──────────────────────────────────────────────────────────────

/// (min, avg, max), all zero for no data.
fn stats(data: &[u64]) -> (f64, f64, f64) {
    let (Some(min), Some(max)) = (data.iter().min(), data.iter().max()) else {
        return (0.0, 0.0, 0.0);
    };
    let avg = data.iter().sum::<u64>() as f64 / data.len() as f64;
    (*min as f64, avg, *max as f64)
}

fn format_uptime(secs: f32) -> String {
    let total = secs as u64;
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{h}h{m}m{s}s")
    } else if m > 0 {
        format!("{m}m{s}s")
    } else {
        format!("{secs:.1}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"{
        "tick_count": 42, "elapsed_secs": 0.42, "delta_ms": 10.0,
        "engine_state": "running", "activity_count": 1,
        "worlds": [{ "level_id": "farm", "level_state": "ready",
                     "entities": 7, "dynamic": 2, "attached": 2, "ticks": 42,
                     "updated": 2, "skipped": 0, "failed": 0, "panicked": 0,
                     "moved": 1, "collisions": 3 }],
        "logs": [{ "level": "INFO", "target": "skref::world",
                   "message": "level 'farm' ready", "timestamp_secs": 0.1 },
                 { "level": "WARN", "target": "skref::world",
                   "message": "missing frame", "timestamp_secs": 0.2 }]
    }"#;

    fn snapshot() -> DiagSnapshot {
        serde_json::from_str(SNAPSHOT).unwrap()
    }

    #[test]
    fn snapshot_feeds_history_and_logs() {
        let mut app = App::new();
        app.push_snapshot(snapshot());
        assert!(app.connected);
        assert_eq!(app.delta_history.back(), Some(&10_000));
        assert_eq!(app.collision_history.back(), Some(&3));
        assert_eq!(app.log_counts(), (1, 1, 0));

        app.log_filter = LogFilter::Warn;
        let logs = app.filtered_logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].message, "missing frame");
    }

    #[test]
    fn paused_app_ignores_snapshots() {
        let mut app = App::new();
        app.paused = true;
        app.push_snapshot(snapshot());
        assert!(!app.connected);
        assert!(app.delta_history.is_empty());
    }

    #[test]
    fn history_is_capped() {
        let mut app = App::new();
        for _ in 0..HISTORY_CAP + 5 {
            app.push_snapshot(snapshot());
        }
        assert_eq!(app.delta_history.len(), HISTORY_CAP);
    }

    #[test]
    fn missing_sections_default() {
        let snap: DiagSnapshot = serde_json::from_str(
            r#"{ "tick_count": 1, "elapsed_secs": 0, "delta_ms": 0,
                 "engine_state": "exit", "activity_count": 0 }"#,
        )
        .unwrap();
        assert!(snap.worlds.is_empty());
        assert!(snap.logs.is_empty());
    }

    #[test]
    fn keys_switch_tabs_and_filters() {
        let mut app = App::new();
        let press = |code| KeyEvent::new(code, KeyModifiers::NONE);
        assert!(!handle_key(&mut app, press(KeyCode::Tab)));
        assert_eq!(app.active_tab, Tab::Logs);
        handle_key(&mut app, press(KeyCode::Char('l')));
        assert_eq!(app.log_filter, LogFilter::Warn);
        handle_key(&mut app, press(KeyCode::Char('1')));
        assert_eq!(app.active_tab, Tab::Overview);
        assert!(handle_key(&mut app, press(KeyCode::Char('q'))));
    }

    #[test]
    fn helpers() {
        assert_eq!(stats(&[]), (0.0, 0.0, 0.0));
        assert_eq!(stats(&[1, 3]), (1.0, 2.0, 3.0));
        assert_eq!(format_uptime(75.0), "1m15s");
        assert_eq!(format_uptime(3.5), "3.5s");
    }
}
