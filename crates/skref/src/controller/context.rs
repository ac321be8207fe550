use std::time::Duration;

use crate::activity::{Activity, ActivityId};
use crate::entity::{Entity, EntityId};
use crate::error::ControllerError;
use crate::input::InputSource;
use crate::level::Level;

/// Requests controllers leave for the world loop, applied after the entity
/// that made them has finished its update.
#[derive(Default)]
pub struct WorldRequests {
    pub(crate) level: Option<String>,
    pub(crate) finish: bool,
    pub(crate) activities: Vec<Box<dyn Activity>>,
    pub(crate) moved: u32,
    pub(crate) collisions: u32,
}

/// Everything a controller may touch during its update.
pub struct UpdateContext<'a, const N: usize> {
    entity: EntityId,
    activity: ActivityId,
    now: Duration,
    level: &'a mut Level<N>,
    input: &'a dyn InputSource,
    requests: &'a mut WorldRequests,
}

impl<'a, const N: usize> UpdateContext<'a, N> {
    pub fn new(
        entity: EntityId,
        activity: ActivityId,
        now: Duration,
        level: &'a mut Level<N>,
        input: &'a dyn InputSource,
        requests: &'a mut WorldRequests,
    ) -> Self {
        Self {
            entity,
            activity,
            now,
            level,
            input,
            requests,
        }
    }

    /// The entity being updated.
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn activity(&self) -> ActivityId {
        self.activity
    }

    /// Simulation time of this tick.
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn input(&self) -> &'a dyn InputSource {
        self.input
    }

    pub fn level(&self) -> &Level<N> {
        &*self.level
    }

    pub fn level_mut(&mut self) -> &mut Level<N> {
        &mut *self.level
    }

    /// The entity being updated, if it has not removed itself.
    pub fn this(&self) -> Result<&Entity<N>, ControllerError> {
        self.level
            .get(self.entity)
            .ok_or(ControllerError::EntityGone(self.entity))
    }

    pub fn this_mut(&mut self) -> Result<&mut Entity<N>, ControllerError> {
        let id = self.entity;
        self.level.get_mut(id).ok_or(ControllerError::EntityGone(id))
    }

    /// Swap to another level once this entity's update returns. The rest of
    /// the current tick is abandoned.
    pub fn request_level(&mut self, id: impl Into<String>) {
        self.requests.level = Some(id.into());
    }

    /// Finish the world activity after this tick.
    pub fn finish_world(&mut self) {
        self.requests.finish = true;
    }

    /// Start another activity (a dialog, an overlay) alongside the world.
    pub fn start_activity(&mut self, activity: Box<dyn Activity>) {
        self.requests.activities.push(activity);
    }

    pub(crate) fn record_move(&mut self) {
        self.requests.moved += 1;
    }

    pub(crate) fn record_collisions(&mut self, count: usize) {
        self.requests.collisions += count as u32;
    }
}
