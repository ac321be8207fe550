//! Diagnostics sender: ships live metrics to `skref-telemetry` over UDP.
//!
//! Enabled by the `diagnostics` feature flag. An engine built with
//! [`Engine::with_diagnostics`] calls [`send_diagnostics`] after every logic
//! tick; the sender throttles itself to 10 Hz, serializes a JSON
//! [`DiagSnapshot`] and sends it to `127.0.0.1:9100`.
//!
//! [`init_logger`] installs a logger that also captures records for the
//! dashboard's log tab.

use std::net::UdpSocket;
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::engine::Engine;
use crate::world::WorldReport;

/// Where `skref-telemetry` listens.
pub const TELEMETRY_ADDR: &str = "127.0.0.1:9100";

const SEND_INTERVAL: Duration = Duration::from_millis(100);
const LOG_CAPACITY: usize = 500;
const LOGS_PER_SNAPSHOT: usize = 50;

// ── DiagSender ───────────────────────────────────────────────────────────

/// Owns the outbound UDP socket and throttling state.
pub struct DiagSender {
    socket: UdpSocket,
    last_send: Option<Instant>,
}

impl DiagSender {
    /// Bind an ephemeral port aimed at [`TELEMETRY_ADDR`]. `None` if the
    /// socket cannot be set up.
    pub fn new() -> Option<Self> {
        let socket = UdpSocket::bind("127.0.0.1:0").ok()?;
        socket.connect(TELEMETRY_ADDR).ok()?;
        socket.set_nonblocking(true).ok()?;
        Some(Self {
            socket,
            last_send: None,
        })
    }

    fn due(&mut self, now: Instant) -> bool {
        match self.last_send {
            Some(last) if now.duration_since(last) < SEND_INTERVAL => false,
            _ => {
                self.last_send = Some(now);
                true
            }
        }
    }
}

// ── Snapshot types (wire format) ────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct DiagSnapshot {
    pub tick_count: u64,
    pub elapsed_secs: f32,
    pub delta_ms: f32,
    pub engine_state: &'static str,
    pub activity_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub worlds: Vec<WorldSnapshot>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub logs: Vec<LogEntrySnapshot>,
}

#[derive(Debug, Serialize)]
pub struct WorldSnapshot {
    pub level_id: Option<String>,
    pub level_state: &'static str,
    pub entities: usize,
    pub dynamic: usize,
    pub attached: usize,
    pub ticks: u64,
    pub updated: u32,
    pub skipped: u32,
    pub failed: u32,
    pub panicked: u32,
    pub moved: u32,
    pub collisions: u32,
}

impl From<WorldReport> for WorldSnapshot {
    fn from(report: WorldReport) -> Self {
        let tick = report.last_tick;
        Self {
            level_id: report.level_id,
            level_state: report.level_state.label(),
            entities: report.entities,
            dynamic: report.dynamic,
            attached: report.attached,
            ticks: report.ticks,
            updated: tick.updated,
            skipped: tick.skipped,
            failed: tick.failed,
            panicked: tick.panicked,
            moved: tick.moved,
            collisions: tick.collisions,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LogEntrySnapshot {
    pub level: String,
    pub target: String,
    pub message: String,
    pub timestamp_secs: f32,
}

/// Gather everything the dashboard shows, draining up to 50 captured logs.
pub fn snapshot(engine: &Engine) -> DiagSnapshot {
    let clock = engine.clock();
    DiagSnapshot {
        tick_count: clock.tick_count(),
        elapsed_secs: clock.elapsed_secs(),
        delta_ms: clock.delta_secs() * 1000.0,
        engine_state: engine.state().label(),
        activity_count: engine.activity_count(),
        worlds: engine.reports().into_iter().map(WorldSnapshot::from).collect(),
        logs: drain_captured_logs(LOGS_PER_SNAPSHOT),
    }
}

/// Called after every logic tick. Throttled to 10 Hz.
pub fn send_diagnostics(engine: &Engine, sender: &mut DiagSender) {
    if !sender.due(Instant::now()) {
        return;
    }
    // Fire and forget: nobody may be listening.
    if let Ok(json) = serde_json::to_vec(&snapshot(engine)) {
        let _ = sender.socket.send(&json);
    }
}

// ── Log capture ──────────────────────────────────────────────────────────

struct LogRing {
    entries: Vec<LogEntrySnapshot>,
    start: Instant,
}

impl LogRing {
    fn push(&mut self, entry: LogEntrySnapshot) {
        if self.entries.len() >= LOG_CAPACITY {
            self.entries.remove(0);
        }
        self.entries.push(entry);
    }

    fn drain(&mut self, max: usize) -> Vec<LogEntrySnapshot> {
        let n = self.entries.len().min(max);
        self.entries.drain(..n).collect()
    }
}

static LOG_RING: Mutex<Option<LogRing>> = Mutex::new(None);

/// Captures records into the ring and delegates to env_logger for stderr.
struct DiagLogger {
    inner: env_logger::Logger,
}

impl log::Log for DiagLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.inner.enabled(metadata) || metadata.level() <= log::Level::Info
    }

    fn log(&self, record: &log::Record) {
        if self.inner.enabled(record.metadata()) {
            self.inner.log(record);
        }
        if let Ok(mut guard) = LOG_RING.lock() {
            if let Some(ring) = guard.as_mut() {
                let entry = LogEntrySnapshot {
                    level: record.level().to_string(),
                    target: record.target().to_string(),
                    message: record.args().to_string(),
                    timestamp_secs: ring.start.elapsed().as_secs_f32(),
                };
                ring.push(entry);
            }
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

static DIAG_LOGGER: OnceLock<DiagLogger> = OnceLock::new();

/// Install the capturing logger. `RUST_LOG` still controls stderr output;
/// info and above are always captured.
///
/// Call this before anything logs.
pub fn init_logger() {
    start_capture();

    let inner = env_logger::Builder::new().parse_default_env().build();
    let max_level = inner.filter();
    let logger = DIAG_LOGGER.get_or_init(|| DiagLogger { inner });

    if log::set_logger(logger).is_err() {
        eprintln!("[skref] a logger is already set; log capture disabled");
        return;
    }
    log::set_max_level(max_level.max(log::LevelFilter::Info));
}

fn start_capture() {
    if let Ok(mut ring) = LOG_RING.lock() {
        *ring = Some(LogRing {
            entries: Vec::new(),
            start: Instant::now(),
        });
    }
}

fn drain_captured_logs(max: usize) -> Vec<LogEntrySnapshot> {
    let Ok(mut guard) = LOG_RING.lock() else {
        return Vec::new();
    };
    guard.as_mut().map_or_else(Vec::new, |ring| ring.drain(max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::from_fn;
    use crate::geom::Aabb2;
    use crate::input::NoInput;
    use crate::level::Level;
    use crate::world::WorldActivity;

    #[test]
    fn ring_drops_oldest_entries() {
        let mut ring = LogRing {
            entries: Vec::new(),
            start: Instant::now(),
        };
        for i in 0..LOG_CAPACITY + 3 {
            ring.push(LogEntrySnapshot {
                level: "INFO".into(),
                target: "t".into(),
                message: i.to_string(),
                timestamp_secs: 0.0,
            });
        }
        assert_eq!(ring.entries.len(), LOG_CAPACITY);
        let first = ring.drain(2);
        assert_eq!(first[0].message, "3");
        assert_eq!(ring.entries.len(), LOG_CAPACITY - 2);
    }

    #[test]
    fn sender_throttles_to_ten_hertz() {
        let Some(mut sender) = DiagSender::new() else {
            return;
        };
        let t0 = Instant::now();
        assert!(sender.due(t0));
        assert!(!sender.due(t0 + Duration::from_millis(50)));
        assert!(sender.due(t0 + Duration::from_millis(100)));
    }

    #[test]
    fn snapshot_describes_engine_and_world() {
        let mut engine = Engine::new();
        engine.start(Box::new(
            WorldActivity::new(from_fn(|id: &str| {
                Ok(Level::<2>::new(id, Aabb2::from_xy(0.0, 0.0, 4.0, 4.0)))
            }))
            .starting_at("hub"),
        ));
        engine.tick(Duration::from_millis(10), &NoInput);

        let snap = snapshot(&engine);
        assert_eq!(snap.tick_count, 1);
        assert_eq!(snap.engine_state, "running");
        assert_eq!(snap.worlds.len(), 1);
        assert_eq!(snap.worlds[0].level_id.as_deref(), Some("hub"));
        assert_eq!(snap.worlds[0].level_state, "ready");

        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["worlds"][0]["entities"], 0);
    }
}
