//! # World: The Per-Tick Driver
//!
//! [`WorldActivity`] owns the current level and drives its controllers.
//!
//! ## One tick
//!
//! ```text
//! pending level request? ──▶ start building it
//! build in flight?       ──▶ poll once
//! level not Ready        ──▶ no-op
//! for id in level.all()              (snapshot, registry order)
//!     level swapped this tick?  ──▶ stop
//!     entity gone / static?     ──▶ next
//!     Unattached                ──▶ attach to this activity
//!     Finished                  ──▶ next
//!     Detached / foreign        ──▶ warn "missing frame", next
//!     take controller, update, put it back
//!         NotAttached  ──▶ warn, next
//!         other error  ──▶ error, next
//!         panic        ──▶ error, controller dropped, next
//!     controller asked for a level? ──▶ start building it, stop
//! retire controllers that report finished
//! ```
//!
//! One broken controller never stops the tick.
//!
//! ## Level swaps
//!
//! ```text
//! Ready(old) ──detach_all──▶ Loading(id) ──build──▶ Ready(new)
//!                                 │
//!                                 └──error──▶ Empty
//! ```
//!
//! The old level is fully detached before the new one becomes visible, and
//! the slot is replaced in one assignment. Inside a tick the build future is
//! polled once per tick, so a builder that awaits real I/O leaves the slot
//! `Loading` across ticks; those ticks do nothing. [`WorldActivity::load_level`]
//! blocks until the build completes.

use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};
use std::time::Duration;

use crate::activity::{Activity, ActivityId, EngineContext};
use crate::builder::LevelBuilder;
use crate::controller::{Attachment, ControllerError, UpdateContext, WorldRequests};
use crate::error::BuildError;
use crate::input::InputSource;
use crate::level::Level;
use crate::visualizer::LevelVisualizer;

type PendingBuild<const N: usize> = Pin<Box<dyn Future<Output = Result<Level<N>, BuildError>>>>;

/// What the world currently holds.
pub enum LevelSlot<const N: usize> {
    Empty,
    Loading(String),
    Ready(Level<N>),
}

/// [`LevelSlot`] without the level, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LevelState {
    #[default]
    Empty,
    Loading,
    Ready,
}

impl LevelState {
    pub fn label(self) -> &'static str {
        match self {
            LevelState::Empty => "empty",
            LevelState::Loading => "loading",
            LevelState::Ready => "ready",
        }
    }
}

/// Outcome counts for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    pub updated: u32,
    /// Skipped because the controller was not attached to this world.
    pub skipped: u32,
    pub failed: u32,
    pub panicked: u32,
    pub moved: u32,
    pub collisions: u32,
    /// Controllers retired at the end of the tick.
    pub finished: u32,
}

/// Snapshot of the world for diagnostics.
#[derive(Debug, Clone, Default)]
pub struct WorldReport {
    pub level_id: Option<String>,
    pub level_state: LevelState,
    pub entities: usize,
    pub dynamic: usize,
    pub attached: usize,
    pub ticks: u64,
    pub last_tick: TickReport,
}

pub struct WorldActivity<const N: usize, B: LevelBuilder<N>> {
    id: Option<ActivityId>,
    builder: Rc<B>,
    slot: LevelSlot<N>,
    building: Option<PendingBuild<N>>,
    generation: u64,
    pending: Option<String>,
    finished: bool,
    visualizer: Option<Box<dyn LevelVisualizer<N>>>,
    ticks: u64,
    last_tick: TickReport,
}

impl<const N: usize, B: LevelBuilder<N> + 'static> WorldActivity<N, B> {
    pub fn new(builder: B) -> Self {
        Self {
            id: None,
            builder: Rc::new(builder),
            slot: LevelSlot::Empty,
            building: None,
            generation: 0,
            pending: None,
            finished: false,
            visualizer: None,
            ticks: 0,
            last_tick: TickReport::default(),
        }
    }

    /// Load `level` on the first tick.
    pub fn starting_at(mut self, level: impl Into<String>) -> Self {
        self.pending = Some(level.into());
        self
    }

    pub fn with_visualizer(mut self, visualizer: impl LevelVisualizer<N> + 'static) -> Self {
        self.visualizer = Some(Box::new(visualizer));
        self
    }

    pub fn slot(&self) -> &LevelSlot<N> {
        &self.slot
    }

    pub fn level(&self) -> Option<&Level<N>> {
        match &self.slot {
            LevelSlot::Ready(level) => Some(level),
            _ => None,
        }
    }

    pub fn level_mut(&mut self) -> Option<&mut Level<N>> {
        match &mut self.slot {
            LevelSlot::Ready(level) => Some(level),
            _ => None,
        }
    }

    pub fn level_state(&self) -> LevelState {
        match self.slot {
            LevelSlot::Empty => LevelState::Empty,
            LevelSlot::Loading(_) => LevelState::Loading,
            LevelSlot::Ready(_) => LevelState::Ready,
        }
    }

    pub fn last_tick(&self) -> TickReport {
        self.last_tick
    }

    /// Load `id` at the start of the next tick.
    pub fn request_level(&mut self, id: impl Into<String>) {
        self.pending = Some(id.into());
    }

    /// Tear down the current level and build `id` in its place, blocking
    /// until the build completes.
    pub fn load_level(&mut self, id: &str) -> Result<(), BuildError> {
        let build = self.begin_load(id);
        self.publish(pollster::block_on(build))
    }

    /// Detach the current level, mark the slot `Loading` and hand back the
    /// build. Any build still in flight is abandoned.
    fn begin_load(&mut self, id: &str) -> PendingBuild<N> {
        log::info!("loading level '{id}'");
        if let LevelSlot::Ready(old) = &mut self.slot {
            let detached = old.detach_all();
            log::debug!("detached {detached} controllers from level '{}'", old.id());
        }
        self.slot = LevelSlot::Loading(id.to_string());
        self.building = None;
        self.generation += 1;

        let builder = Rc::clone(&self.builder);
        let id = id.to_string();
        Box::pin(async move { builder.build(&id).await })
    }

    /// Start building `id` and give it one poll.
    fn start_load(&mut self, id: &str) {
        let build = self.begin_load(id);
        self.building = Some(build);
        // Failures are logged by `publish`; the world stays empty.
        let _ = self.poll_build();
    }

    fn poll_build(&mut self) -> Poll<Result<(), BuildError>> {
        let Some(build) = self.building.as_mut() else {
            return Poll::Ready(Ok(()));
        };
        let mut cx = Context::from_waker(Waker::noop());
        match build.as_mut().poll(&mut cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(result) => Poll::Ready(self.publish(result)),
        }
    }

    fn publish(&mut self, result: Result<Level<N>, BuildError>) -> Result<(), BuildError> {
        self.building = None;
        match result {
            Ok(level) => {
                log::info!("level '{}' ready with {} entities", level.id(), level.len());
                self.slot = LevelSlot::Ready(level);
                Ok(())
            }
            Err(e) => {
                if let LevelSlot::Loading(id) = &self.slot {
                    log::error!("failed to build level '{id}': {e}");
                }
                self.slot = LevelSlot::Empty;
                Err(e)
            }
        }
    }

    /// Run one tick at simulation time `now`.
    pub fn tick(
        &mut self,
        now: Duration,
        input: &dyn InputSource,
        requests: &mut WorldRequests,
    ) -> TickReport {
        if let Some(id) = self.pending.take() {
            self.start_load(&id);
        } else if self.poll_build().is_pending() {
            return TickReport::default();
        }
        let mut report = TickReport::default();
        let Some(activity) = self.id else {
            log::warn!("world ticked before being attached to an engine");
            return report;
        };
        let generation = self.generation;
        let snapshot = match &self.slot {
            LevelSlot::Ready(level) => level.all(),
            _ => return report,
        };

        for entity in snapshot {
            if self.generation != generation {
                break;
            }
            let LevelSlot::Ready(level) = &mut self.slot else {
                break;
            };
            let Some(current) = level.get_mut(entity) else {
                continue;
            };
            let kind = current.kind().to_string();
            let Some(controller) = current.controller_mut() else {
                continue;
            };
            match controller.attachment() {
                Attachment::Unattached => {
                    if let Err(e) = controller.attach(activity) {
                        log::error!("failed to attach controller of {entity} ({kind}): {e}");
                        report.failed += 1;
                        continue;
                    }
                }
                Attachment::Attached(owner) if owner == activity => {}
                Attachment::Finished => continue,
                Attachment::Attached(owner) => {
                    log::warn!("missing frame: {entity} ({kind}) is driven by activity {owner}");
                    report.skipped += 1;
                    continue;
                }
                Attachment::Detached => {
                    log::warn!("missing frame: controller of {entity} ({kind}) is detached");
                    report.skipped += 1;
                    continue;
                }
            }

            let Some(mut controller) = level.take_controller(entity) else {
                continue;
            };
            let outcome = {
                let mut cx = UpdateContext::new(entity, activity, now, level, input, requests);
                panic::catch_unwind(AssertUnwindSafe(|| controller.update(&mut cx)))
            };
            match outcome {
                Ok(result) => {
                    match result {
                        Ok(()) => report.updated += 1,
                        Err(ControllerError::NotAttached) => {
                            log::warn!("missing frame: {entity} ({kind}) updated while not attached");
                            report.skipped += 1;
                        }
                        Err(e) => {
                            log::error!("controller of {entity} ({kind}) failed: {e}");
                            report.failed += 1;
                        }
                    }
                    if let Err(mut orphan) = level.restore_controller(entity, controller) {
                        let _ = orphan.detach();
                    }
                }
                Err(payload) => {
                    log::error!(
                        "controller of {entity} ({kind}) panicked: {}; dropping it",
                        panic_message(&*payload)
                    );
                    report.panicked += 1;
                    level.drop_controller(entity);
                }
            }

            if let Some(next) = requests.level.take() {
                self.start_load(&next);
                break;
            }
        }

        if self.generation == generation {
            if let LevelSlot::Ready(level) = &mut self.slot {
                report.finished = retire_finished(level);
            }
        }
        report.moved = std::mem::take(&mut requests.moved);
        report.collisions = std::mem::take(&mut requests.collisions);
        self.ticks += 1;
        self.last_tick = report;
        report
    }

    fn detach_everything(&mut self) {
        if let LevelSlot::Ready(level) = &mut self.slot {
            level.detach_all();
        }
    }
}

fn retire_finished<const N: usize>(level: &mut Level<N>) -> u32 {
    let mut count = 0;
    for id in level.all() {
        let Some(controller) = level.get_mut(id).and_then(|e| e.controller_mut()) else {
            continue;
        };
        if controller.is_finished() && controller.is_attached() && controller.retire().is_ok() {
            log::debug!("controller of {id} finished");
            count += 1;
        }
    }
    count
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}

impl<const N: usize, B: LevelBuilder<N> + 'static> Activity for WorldActivity<N, B> {
    fn name(&self) -> &str {
        "world"
    }

    fn on_attach(&mut self, id: ActivityId) {
        self.id = Some(id);
    }

    fn update(&mut self, cx: &mut EngineContext<'_>) {
        let mut requests = WorldRequests::default();
        self.tick(cx.now(), cx.input(), &mut requests);
        for activity in requests.activities.drain(..) {
            cx.start_activity(activity);
        }
        if requests.finish {
            self.finish();
        }
    }

    fn draw(&mut self) {
        let Some(visualizer) = self.visualizer.as_mut() else {
            return;
        };
        match &self.slot {
            LevelSlot::Ready(level) => visualizer.draw(level),
            LevelSlot::Loading(id) => visualizer.draw_loading(id),
            LevelSlot::Empty => {}
        }
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn finish(&mut self) {
        self.detach_everything();
        self.finished = true;
    }

    fn on_detach(&mut self) {
        self.detach_everything();
        self.id = None;
    }

    fn report(&self) -> Option<WorldReport> {
        let level = self.level();
        Some(WorldReport {
            level_id: match &self.slot {
                LevelSlot::Ready(level) => Some(level.id().to_string()),
                LevelSlot::Loading(id) => Some(id.clone()),
                LevelSlot::Empty => None,
            },
            level_state: self.level_state(),
            entities: level.map_or(0, |l| l.len()),
            dynamic: level.map_or(0, |l| l.dynamic_count()),
            attached: level.map_or(0, |l| l.attached_count()),
            ticks: self.ticks,
            last_tick: self.last_tick,
        })
    }
}
