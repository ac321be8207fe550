//! The engine: an ordered list of activities and the simulation clock.
//!
//! [`Engine::tick`] advances the clock by an explicit `dt` and updates every
//! live activity in start order. Activities started during a tick are
//! attached after it; finished ones are detached. When nothing is left the
//! engine moves to [`EngineState::Exit`].
//!
//! The engine never sleeps and never reads the wall clock. Driving it in
//! real time is the [`Looper`](crate::looper::Looper)'s job.

use std::time::Duration;

use crate::activity::{Activity, ActivityId, EngineContext};
use crate::input::InputSource;
use crate::time::SimClock;
use crate::world::WorldReport;

#[cfg(feature = "diagnostics")]
use crate::diag::DiagSender;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Running,
    Paused,
    Exit,
}

impl EngineState {
    pub fn label(self) -> &'static str {
        match self {
            EngineState::Running => "running",
            EngineState::Paused => "paused",
            EngineState::Exit => "exit",
        }
    }
}

pub struct Engine {
    activities: Vec<(ActivityId, Box<dyn Activity>)>,
    next_id: u32,
    state: EngineState,
    clock: SimClock,
    #[cfg(feature = "diagnostics")]
    diag: Option<DiagSender>,
}

impl Engine {
    pub fn new() -> Self {
        Self {
            activities: Vec::new(),
            next_id: 1,
            state: EngineState::Running,
            clock: SimClock::new(),
            #[cfg(feature = "diagnostics")]
            diag: None,
        }
    }

    /// Ship a snapshot to `skref-telemetry` after every tick (10 Hz at most).
    /// Silently stays off if the socket cannot be bound.
    #[cfg(feature = "diagnostics")]
    pub fn with_diagnostics(mut self) -> Self {
        self.diag = DiagSender::new();
        if self.diag.is_none() {
            log::warn!("diagnostics socket unavailable; telemetry disabled");
        }
        self
    }

    /// Take `activity` on and return the id its controllers will attach to.
    pub fn start(&mut self, mut activity: Box<dyn Activity>) -> ActivityId {
        let id = ActivityId::new(self.next_id);
        self.next_id += 1;
        activity.on_attach(id);
        log::debug!("activity '{}' attached as {id}", activity.name());
        self.activities.push((id, activity));
        id
    }

    /// One logic tick. Returns the state after the tick.
    pub fn tick(&mut self, dt: Duration, input: &dyn InputSource) -> EngineState {
        if self.state != EngineState::Running {
            return self.state;
        }
        self.clock.advance(dt);
        let (now, delta) = (self.clock.now(), self.clock.delta());

        let mut started = Vec::new();
        for (_, activity) in &mut self.activities {
            if activity.is_finished() {
                continue;
            }
            let mut cx = EngineContext::new(now, delta, input, &mut started);
            activity.update(&mut cx);
        }
        for activity in started {
            self.start(activity);
        }

        self.activities.retain_mut(|(id, activity)| {
            if !activity.is_finished() {
                return true;
            }
            activity.on_detach();
            log::info!("activity '{}' ({id}) finished", activity.name());
            false
        });
        if self.activities.is_empty() {
            log::info!("no activities left; exiting");
            self.state = EngineState::Exit;
        }

        #[cfg(feature = "diagnostics")]
        if let Some(mut sender) = self.diag.take() {
            crate::diag::send_diagnostics(self, &mut sender);
            self.diag = Some(sender);
        }
        self.state
    }

    /// One draw tick. Runs even while paused.
    pub fn draw(&mut self) {
        if self.state == EngineState::Exit {
            return;
        }
        for (_, activity) in &mut self.activities {
            activity.draw();
        }
    }

    pub fn pause(&mut self) {
        if self.state == EngineState::Running {
            self.state = EngineState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.state == EngineState::Paused {
            self.state = EngineState::Running;
        }
    }

    /// Finish every activity and stop.
    pub fn exit(&mut self) {
        for (_, activity) in &mut self.activities {
            activity.finish();
            activity.on_detach();
        }
        self.activities.clear();
        self.state = EngineState::Exit;
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    pub fn activity_count(&self) -> usize {
        self.activities.len()
    }

    /// Reports of every activity that drives a world.
    pub fn reports(&self) -> Vec<WorldReport> {
        self.activities
            .iter()
            .filter_map(|(_, activity)| activity.report())
            .collect()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
