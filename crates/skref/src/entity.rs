//! # Entities: Boxes With Identity
//!
//! An [`Entity`] is a box in the world plus the metadata the kernel needs:
//! a `kind` tag, whether it is material, a draw/update `order`, a physics
//! [`Layer`], an optional collision shape relative to its rect, and, for
//! dynamic entities, a [`Controller`].
//!
//! Entities are owned by a [`Level`](crate::level::Level) and referred to by
//! [`EntityId`]. Two entities with identical geometry and kind are still
//! distinct because identity is the id, never the value.
//!
//! ## Generational ids
//!
//! Removed slots are recycled. Each slot carries a generation that is bumped
//! on removal, so a stale id held by a controller stops resolving instead of
//! silently pointing at whatever reused the slot.
//!
//! ```text
//! EntityId { index: 5, generation: 0 }  ← egg, collected and removed
//! EntityId { index: 5, generation: 1 }  ← next spawn reusing the slot
//! ```

use std::fmt;

use crate::controller::{Controller, EntityController};
use crate::geom::{Aabb, Shape};
use crate::layer::Layer;

/// Handle to an entity inside one [`Level`](crate::level::Level).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl EntityId {
    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({}v{})", self.index, self.generation)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Issues and recycles [`EntityId`]s.
///
/// ```text
/// generations: [0, 1, 0]   ← one per slot ever allocated
/// free_list:   [1]         ← slots available for reuse
/// ```
#[derive(Default)]
pub(crate) struct EntityAllocator {
    generations: Vec<u32>,
    free_list: Vec<u32>,
}

impl EntityAllocator {
    pub fn allocate(&mut self) -> EntityId {
        if let Some(index) = self.free_list.pop() {
            EntityId {
                index,
                generation: self.generations[index as usize],
            }
        } else {
            let index = self.generations.len() as u32;
            self.generations.push(0);
            EntityId {
                index,
                generation: 0,
            }
        }
    }

    /// Returns `false` if `id` was already stale.
    pub fn deallocate(&mut self, id: EntityId) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        self.generations[id.index as usize] += 1;
        self.free_list.push(id.index);
        true
    }

    pub fn is_alive(&self, id: EntityId) -> bool {
        self.generations
            .get(id.index as usize)
            .is_some_and(|generation| *generation == id.generation)
    }

    pub fn slot_count(&self) -> usize {
        self.generations.len()
    }
}

// ── Controller slot ─────────────────────────────────────────────────────

/// Where an entity's controller currently lives.
///
/// `Running` marks a controller taken out by the update loop; the entity is
/// still dynamic while its controller executes.
pub(crate) enum ControllerSlot<const N: usize> {
    None,
    Idle(Controller<N>),
    Running,
}

// ── Entity ──────────────────────────────────────────────────────────────

/// A positioned, sized game object.
pub struct Entity<const N: usize> {
    kind: String,
    material: bool,
    order: i32,
    layer: Layer,
    rect: Aabb<N>,
    collision: Option<Shape<N>>,
    pub(crate) controller: ControllerSlot<N>,
}

impl<const N: usize> Entity<N> {
    /// Start building an entity of `kind` occupying `rect`.
    pub fn builder(kind: impl Into<String>, rect: Aabb<N>) -> EntityBuilder<N> {
        EntityBuilder {
            entity: Entity {
                kind: kind.into(),
                material: true,
                order: 0,
                layer: Layer::STATIC,
                rect,
                collision: None,
                controller: ControllerSlot::None,
            },
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn is_material(&self) -> bool {
        self.material
    }

    pub fn order(&self) -> i32 {
        self.order
    }

    pub fn layer(&self) -> Layer {
        self.layer
    }

    /// World-space box.
    pub fn rect(&self) -> Aabb<N> {
        self.rect
    }

    pub fn set_rect(&mut self, rect: Aabb<N>) {
        self.rect = rect;
    }

    /// Collision shape relative to [`rect`](Self::rect), if one was given.
    pub fn collision_offset(&self) -> Option<&Shape<N>> {
        self.collision.as_ref()
    }

    /// World-space collision shape: the offset placed at the rect's
    /// position, or the rect itself.
    pub fn collision_shape(&self) -> Shape<N> {
        match &self.collision {
            Some(offset) => offset.translate(&self.rect),
            None => Shape::Single(self.rect),
        }
    }

    /// Bounding box of [`collision_shape`](Self::collision_shape).
    pub fn collision_rect(&self) -> Aabb<N> {
        match &self.collision {
            Some(offset) => offset.bounds().translate(&self.rect),
            None => self.rect,
        }
    }

    /// Whether this entity owns a controller, including while it runs.
    pub fn is_dynamic(&self) -> bool {
        !matches!(self.controller, ControllerSlot::None)
    }

    /// The controller, unless static or currently executing.
    pub fn controller(&self) -> Option<&Controller<N>> {
        match &self.controller {
            ControllerSlot::Idle(c) => Some(c),
            _ => None,
        }
    }

    pub fn controller_mut(&mut self) -> Option<&mut Controller<N>> {
        match &mut self.controller {
            ControllerSlot::Idle(c) => Some(c),
            _ => None,
        }
    }
}

impl<const N: usize> fmt::Debug for Entity<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("kind", &self.kind)
            .field("material", &self.material)
            .field("order", &self.order)
            .field("layer", &self.layer)
            .field("rect", &self.rect)
            .field("dynamic", &self.is_dynamic())
            .finish()
    }
}

/// Fluent construction for [`Entity`]. Entities are material, order 0 and on
/// [`Layer::STATIC`] unless told otherwise.
pub struct EntityBuilder<const N: usize> {
    entity: Entity<N>,
}

impl<const N: usize> EntityBuilder<N> {
    pub fn material(mut self, material: bool) -> Self {
        self.entity.material = material;
        self
    }

    pub fn order(mut self, order: i32) -> Self {
        self.entity.order = order;
        self
    }

    pub fn layer(mut self, layer: Layer) -> Self {
        self.entity.layer = layer;
        self
    }

    /// Collision geometry relative to the rect's position.
    pub fn collision(mut self, offset: impl Into<Shape<N>>) -> Self {
        self.entity.collision = Some(offset.into());
        self
    }

    /// Make the entity dynamic, driven by `behavior`.
    pub fn controlled_by(self, behavior: impl EntityController<N> + 'static) -> Self {
        self.controller(Controller::new(behavior))
    }

    pub fn controller(mut self, controller: Controller<N>) -> Self {
        self.entity.controller = ControllerSlot::Idle(controller);
        self
    }

    pub fn build(self) -> Entity<N> {
        self.entity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{Aabb2, CompositeAabb};

    #[test]
    fn allocator_recycles_with_new_generation() {
        let mut alloc = EntityAllocator::default();
        let a = alloc.allocate();
        let b = alloc.allocate();
        assert_eq!((a.index, b.index), (0, 1));
        assert!(alloc.deallocate(a));
        assert!(!alloc.deallocate(a));
        let c = alloc.allocate();
        assert_eq!(c.index, 0);
        assert_eq!(c.generation, 1);
        assert!(!alloc.is_alive(a));
        assert!(alloc.is_alive(c));
        assert_eq!(alloc.slot_count(), 2);
    }

    #[test]
    fn collision_rect_defaults_to_rect() {
        let mut e = Entity::builder("wall", Aabb2::from_xy(3.0, 4.0, 1.0, 1.0)).build();
        assert_eq!(e.collision_rect(), e.rect());
        e.set_rect(e.rect().translate(&Aabb2::point([0.5, -0.25])));
        assert_eq!(e.collision_rect(), e.rect());
        assert_eq!(e.collision_shape(), Shape::Single(e.rect()));
    }

    #[test]
    fn collision_offset_follows_rect() {
        let e = Entity::builder("player", Aabb2::from_xy(10.0, 10.0, 1.0, 2.0))
            .collision(Aabb2::from_xy(0.25, 1.5, 0.5, 0.5))
            .build();
        assert_eq!(e.collision_rect(), Aabb2::from_xy(10.25, 11.5, 0.5, 0.5));
    }

    #[test]
    fn composite_collision_translates_every_part() {
        let e = Entity::builder("table", Aabb2::from_xy(5.0, 5.0, 3.0, 1.0))
            .collision(CompositeAabb::from_parts([
                Aabb2::from_xy(0.0, 0.5, 1.0, 0.5),
                Aabb2::from_xy(2.0, 0.5, 1.0, 0.5),
            ]))
            .build();
        let shape = e.collision_shape();
        assert_eq!(shape.parts()[1], Aabb2::from_xy(7.0, 5.5, 1.0, 0.5));
        assert_eq!(e.collision_rect(), Aabb2::from_xy(5.0, 5.5, 3.0, 0.5));
    }

    #[test]
    fn builder_defaults() {
        let e = Entity::builder("egg", Aabb2::ZERO).material(false).order(3).build();
        assert!(!e.is_material());
        assert_eq!(e.order(), 3);
        assert_eq!(e.layer(), Layer::STATIC);
        assert!(!e.is_dynamic());
        assert!(e.controller().is_none());
    }
}
