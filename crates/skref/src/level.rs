//! # Level: Ordered Entity Registry
//!
//! A [`Level`] owns every entity of one playable area and remembers the order
//! they were attached in. That order, not draw order, is the order the world
//! loop updates them in.
//!
//! ```text
//! registry: [e0, e3, e1, e3]      ← attach order, duplicates allowed
//! slots:    [Some(e0), Some(e1), None, Some(e3)]
//! ```
//!
//! Removal is by identity: `remove(e3)` strips every registry entry for `e3`
//! and frees its slot, leaving an identical-looking sibling untouched.
//!
//! Iteration during mutation goes through [`Level::all`], which copies the
//! registry. A controller that removes a collected pickup mid-tick cannot
//! disturb the loop that is walking the copy.

use std::collections::HashSet;

use crate::controller::{Controller, ControllerError};
use crate::entity::{ControllerSlot, Entity, EntityAllocator, EntityId};
use crate::error::LevelError;
use crate::geom::{Aabb, Shape};

/// Kind tag of the unique, mandatory player entity.
pub const PLAYER_KIND: &str = "player";

pub struct Level<const N: usize> {
    id: String,
    dimensions: Aabb<N>,
    registry: Vec<EntityId>,
    slots: Vec<Option<Entity<N>>>,
    allocator: EntityAllocator,
}

impl<const N: usize> Level<N> {
    pub fn new(id: impl Into<String>, dimensions: Aabb<N>) -> Self {
        Self {
            id: id.into(),
            dimensions,
            registry: Vec::new(),
            slots: Vec::new(),
            allocator: EntityAllocator::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Playable extent.
    pub fn dimensions(&self) -> Aabb<N> {
        self.dimensions
    }

    // ── Registry ────────────────────────────────────────────────────────

    /// Take ownership of `entity` and append it to the registry.
    pub fn attach(&mut self, entity: Entity<N>) -> EntityId {
        let id = self.allocator.allocate();
        let index = id.index as usize;
        if index == self.slots.len() {
            self.slots.push(Some(entity));
        } else {
            self.slots[index] = Some(entity);
        }
        self.registry.push(id);
        id
    }

    /// Append another registry entry for an entity already in the level.
    pub fn attach_existing(&mut self, id: EntityId) -> Result<(), LevelError> {
        if !self.contains(id) {
            return Err(LevelError::UnknownEntity(id));
        }
        self.registry.push(id);
        Ok(())
    }

    /// Remove `id` and every registry entry pointing at it.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity<N>> {
        if !self.allocator.deallocate(id) {
            return None;
        }
        self.registry.retain(|e| *e != id);
        self.slots[id.index as usize].take()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.allocator.is_alive(id)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity<N>> {
        if !self.contains(id) {
            return None;
        }
        self.slots.get(id.index as usize)?.as_ref()
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity<N>> {
        if !self.contains(id) {
            return None;
        }
        self.slots.get_mut(id.index as usize)?.as_mut()
    }

    /// Copy of the registry, in attach order, duplicates included.
    pub fn all(&self) -> Vec<EntityId> {
        self.registry.clone()
    }

    /// Distinct entities in registry order.
    pub fn entities(&self) -> impl Iterator<Item = (EntityId, &Entity<N>)> {
        let mut seen = HashSet::new();
        self.registry
            .iter()
            .filter(move |id| seen.insert(**id))
            .filter_map(move |id| self.get(*id).map(|e| (*id, e)))
    }

    /// Number of distinct entities.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub fn find_by_kind(&self, kind: &str) -> Vec<EntityId> {
        self.entities()
            .filter(|(_, e)| e.kind() == kind)
            .map(|(id, _)| id)
            .collect()
    }

    pub fn find_first_by_kind(&self, kind: &str) -> Option<EntityId> {
        self.entities()
            .find(|(_, e)| e.kind() == kind)
            .map(|(id, _)| id)
    }

    /// The dynamic entity tagged [`PLAYER_KIND`]. Its absence is a content
    /// bug, reported as [`LevelError::MissingPlayer`].
    pub fn find_player(&self) -> Result<EntityId, LevelError> {
        self.entities()
            .find(|(_, e)| e.kind() == PLAYER_KIND && e.is_dynamic())
            .map(|(id, _)| id)
            .ok_or(LevelError::MissingPlayer)
    }

    /// Entities other than `exclude` whose collision shape overlaps `shape`,
    /// regardless of materiality, in registry order.
    pub fn overlapping(&self, shape: &Shape<N>, exclude: EntityId) -> Vec<EntityId> {
        self.entities()
            .filter(|(id, e)| *id != exclude && e.collision_shape().overlaps(shape))
            .map(|(id, _)| id)
            .collect()
    }

    pub fn dynamic_count(&self) -> usize {
        self.entities().filter(|(_, e)| e.is_dynamic()).count()
    }

    pub fn attached_count(&self) -> usize {
        self.entities()
            .filter(|(_, e)| e.controller().is_some_and(|c| c.is_attached()))
            .count()
    }

    // ── Controllers ─────────────────────────────────────────────────────

    /// Move the controller out so it can run with mutable access to the
    /// level. The entity stays dynamic until the controller is restored or
    /// dropped.
    pub(crate) fn take_controller(&mut self, id: EntityId) -> Option<Controller<N>> {
        let entity = self.get_mut(id)?;
        match std::mem::replace(&mut entity.controller, ControllerSlot::Running) {
            ControllerSlot::Idle(c) => Some(c),
            other => {
                entity.controller = other;
                None
            }
        }
    }

    /// Put a controller back. Hands it back if its entity is gone.
    pub(crate) fn restore_controller(
        &mut self,
        id: EntityId,
        controller: Controller<N>,
    ) -> Result<(), Controller<N>> {
        match self.get_mut(id) {
            Some(entity) => {
                entity.controller = ControllerSlot::Idle(controller);
                Ok(())
            }
            None => Err(controller),
        }
    }

    /// Forget a running controller; the entity becomes static.
    pub(crate) fn drop_controller(&mut self, id: EntityId) {
        if let Some(entity) = self.get_mut(id) {
            entity.controller = ControllerSlot::None;
        }
    }

    /// Detach one entity's controller from its activity.
    pub fn detach_controller(&mut self, id: EntityId) -> Result<(), ControllerError> {
        match self.get_mut(id).and_then(|e| e.controller_mut()) {
            Some(controller) => controller.detach(),
            None => Err(ControllerError::NotAttached),
        }
    }

    /// Detach every attached controller. Returns how many were detached.
    pub fn detach_all(&mut self) -> usize {
        let mut detached = 0;
        for entity in self.slots.iter_mut().flatten() {
            if let Some(c) = entity.controller_mut() {
                if c.is_attached() && c.detach().is_ok() {
                    detached += 1;
                }
            }
        }
        detached
    }
}
