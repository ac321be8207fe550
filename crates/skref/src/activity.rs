//! Activities: the units the [`Engine`](crate::engine::Engine) schedules.
//!
//! A running game is a stack of activities (the world, a dialog box, a death
//! screen). Each one is updated on the logic tick and drawn on the draw tick
//! until it reports itself finished, at which point the engine detaches it.

use std::fmt;
use std::time::Duration;

use crate::input::InputSource;
use crate::world::WorldReport;

/// Identity an engine assigns to an attached activity. Controllers attach to
/// the activity that drives them.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActivityId(u32);

impl ActivityId {
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActivityId({})", self.0)
    }
}

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Per-tick view of the engine handed to [`Activity::update`].
pub struct EngineContext<'a> {
    now: Duration,
    delta: Duration,
    input: &'a dyn InputSource,
    started: &'a mut Vec<Box<dyn Activity>>,
}

impl<'a> EngineContext<'a> {
    pub fn new(
        now: Duration,
        delta: Duration,
        input: &'a dyn InputSource,
        started: &'a mut Vec<Box<dyn Activity>>,
    ) -> Self {
        Self {
            now,
            delta,
            input,
            started,
        }
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn delta(&self) -> Duration {
        self.delta
    }

    pub fn input(&self) -> &'a dyn InputSource {
        self.input
    }

    /// Queue an activity; the engine attaches it after this tick.
    pub fn start_activity(&mut self, activity: Box<dyn Activity>) {
        self.started.push(activity);
    }
}

pub trait Activity {
    fn name(&self) -> &str;

    /// Called once when the engine takes the activity on.
    fn on_attach(&mut self, _id: ActivityId) {}

    fn update(&mut self, cx: &mut EngineContext<'_>);

    fn draw(&mut self) {}

    fn is_finished(&self) -> bool;

    /// Ask the activity to wrap up; it stops receiving ticks after the
    /// current one.
    fn finish(&mut self);

    /// Called once when the engine drops the activity.
    fn on_detach(&mut self) {}

    /// Live statistics, if the activity drives a world.
    fn report(&self) -> Option<WorldReport> {
        None
    }
}
