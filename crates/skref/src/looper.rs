//! Fixed-interval driver for an [`Engine`].
//!
//! Logic ticks and draw ticks run on one thread, interleaved and never
//! concurrent. Each logic tick polls input, then ticks the engine with the
//! time since the previous logic tick.
//!
//! [`Looper::run`] paces itself against the wall clock.
//! [`Looper::run_simulated`] walks the same schedule on virtual time without
//! sleeping, which makes runs reproducible.

use std::thread;
use std::time::{Duration, Instant};

use crate::engine::{Engine, EngineState};
use crate::input::InputSource;

#[derive(Debug, Clone, Copy)]
pub struct Looper {
    logic_interval: Duration,
    draw_interval: Duration,
    time_limit: Option<Duration>,
}

/// What a run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub logic_ticks: u64,
    pub draw_ticks: u64,
    pub elapsed: Duration,
}

impl Default for Looper {
    fn default() -> Self {
        Self {
            logic_interval: Duration::from_millis(10),
            draw_interval: Duration::from_millis(16),
            time_limit: None,
        }
    }
}

impl Looper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logic_interval(mut self, interval: Duration) -> Self {
        self.logic_interval = interval.max(Duration::from_micros(1));
        self
    }

    pub fn draw_interval(mut self, interval: Duration) -> Self {
        self.draw_interval = interval.max(Duration::from_micros(1));
        self
    }

    /// Stop after `limit` even if the engine is still running.
    pub fn time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    /// Run in real time until the engine exits or the time limit passes.
    pub fn run(&self, engine: &mut Engine, input: &mut dyn InputSource) -> LoopStats {
        let start = Instant::now();
        let mut stats = LoopStats::default();
        let mut last_logic = start;
        let mut next_logic = start;
        let mut next_draw = start;

        while engine.state() != EngineState::Exit {
            let now = Instant::now();
            if self.time_limit.is_some_and(|limit| now - start >= limit) {
                break;
            }
            if now >= next_logic {
                let dt = now - last_logic;
                last_logic = now;
                input.poll(engine.clock().now() + dt);
                engine.tick(dt, &*input);
                stats.logic_ticks += 1;
                next_logic += self.logic_interval;
                // Fell behind: drop the backlog instead of bursting.
                if next_logic < now {
                    next_logic = now + self.logic_interval;
                }
            }
            if now >= next_draw {
                engine.draw();
                stats.draw_ticks += 1;
                next_draw += self.draw_interval;
                if next_draw < now {
                    next_draw = now + self.draw_interval;
                }
            }
            let wake = next_logic.min(next_draw);
            let now = Instant::now();
            if wake > now {
                thread::sleep(wake - now);
            }
        }

        stats.elapsed = start.elapsed();
        log::debug!(
            "loop stopped after {:?}: {} logic / {} draw ticks",
            stats.elapsed,
            stats.logic_ticks,
            stats.draw_ticks
        );
        stats
    }

    /// Run the same schedule on virtual time covering `duration`.
    pub fn run_simulated(
        &self,
        engine: &mut Engine,
        input: &mut dyn InputSource,
        duration: Duration,
    ) -> LoopStats {
        let limit = self.time_limit.map_or(duration, |l| l.min(duration));
        let mut stats = LoopStats::default();
        let mut now = Duration::ZERO;
        let mut last_logic = Duration::ZERO;
        let mut next_logic = Duration::ZERO;
        let mut next_draw = Duration::ZERO;

        while engine.state() != EngineState::Exit && now <= limit {
            if now >= next_logic {
                let dt = now - last_logic;
                last_logic = now;
                input.poll(engine.clock().now() + dt);
                engine.tick(dt, &*input);
                stats.logic_ticks += 1;
                next_logic += self.logic_interval;
            }
            if now >= next_draw {
                engine.draw();
                stats.draw_ticks += 1;
                next_draw += self.draw_interval;
            }
            now = next_logic.min(next_draw);
        }

        stats.elapsed = last_logic.max(now.min(limit));
        stats
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::activity::{Activity, EngineContext};
    use crate::input::{Action, ScriptedInput};

    #[derive(Default)]
    struct Trace {
        ticks: Vec<(Duration, Duration)>,
        draws: u32,
        running_seen: bool,
    }

    struct Recorder {
        trace: Rc<RefCell<Trace>>,
        stop_at: Option<Duration>,
        finished: bool,
    }

    impl Activity for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn update(&mut self, cx: &mut EngineContext<'_>) {
            let mut trace = self.trace.borrow_mut();
            trace.ticks.push((cx.now(), cx.delta()));
            trace.running_seen |= cx.input().is_active(Action::Run);
            if self.stop_at.is_some_and(|at| cx.now() >= at) {
                self.finished = true;
            }
        }

        fn draw(&mut self) {
            self.trace.borrow_mut().draws += 1;
        }

        fn is_finished(&self) -> bool {
            self.finished
        }

        fn finish(&mut self) {
            self.finished = true;
        }
    }

    fn engine(stop_at: Option<Duration>) -> (Engine, Rc<RefCell<Trace>>) {
        let trace = Rc::new(RefCell::new(Trace::default()));
        let mut engine = Engine::new();
        engine.start(Box::new(Recorder {
            trace: trace.clone(),
            stop_at,
            finished: false,
        }));
        (engine, trace)
    }

    #[test]
    fn simulated_schedule_interleaves_logic_and_draw() {
        let (mut engine, trace) = engine(None);
        let stats = Looper::new().run_simulated(
            &mut engine,
            &mut ScriptedInput::new(),
            Duration::from_millis(100),
        );

        // Logic at 0, 10, ..., 100; draw at 0, 16, ..., 96.
        assert_eq!(stats.logic_ticks, 11);
        assert_eq!(stats.draw_ticks, 7);
        let trace = trace.borrow();
        assert_eq!(trace.ticks[0], (Duration::ZERO, Duration::ZERO));
        assert_eq!(
            trace.ticks[10],
            (Duration::from_millis(100), Duration::from_millis(10))
        );
        assert_eq!(trace.draws, 7);
    }

    #[test]
    fn stops_when_the_engine_exits() {
        let (mut engine, trace) = engine(Some(Duration::from_millis(30)));
        let stats = Looper::new().run_simulated(
            &mut engine,
            &mut ScriptedInput::new(),
            Duration::from_secs(10),
        );
        assert_eq!(stats.logic_ticks, 4);
        assert_eq!(engine.state(), EngineState::Exit);
        assert_eq!(trace.borrow().ticks.len(), 4);
    }

    #[test]
    fn input_is_polled_before_each_tick() {
        let (mut engine, trace) = engine(None);
        let mut input = ScriptedInput::new().press_at(Duration::from_millis(50), Action::Run);
        Looper::new()
            .logic_interval(Duration::from_millis(25))
            .run_simulated(&mut engine, &mut input, Duration::from_millis(50));
        assert!(trace.borrow().running_seen);
    }

    #[test]
    fn real_time_run_honours_the_time_limit() {
        let (mut engine, trace) = engine(None);
        let stats = Looper::new()
            .logic_interval(Duration::from_millis(5))
            .time_limit(Duration::from_millis(30))
            .run(&mut engine, &mut ScriptedInput::new());
        assert!(stats.logic_ticks >= 1);
        assert!(stats.elapsed >= Duration::from_millis(30));
        assert_eq!(trace.borrow().ticks.len() as u64, stats.logic_ticks);
    }
}
