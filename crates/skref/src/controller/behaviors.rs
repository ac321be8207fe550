//! Stock movement behaviors: a keyboard-driven mover and a pursuer.

use serde::Deserialize;

use super::{Controller, ControllerError, Movable, MovementBehavior, Pace, UpdateContext};
use crate::builder::ControllerRegistry;
use crate::entity::{Entity, EntityId};
use crate::geom::{Aabb, Aabb2};
use crate::input::Action;
use crate::layer::Layer;
use crate::level::PLAYER_KIND;
use crate::math::DVec2;

/// Direction an entity last moved in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    Left,
    Right,
    Up,
    Down,
}

impl Facing {
    /// Dominant direction of a 2D offset. `None` for no offset.
    pub fn from_offset(offset: DVec2) -> Option<Facing> {
        if offset == DVec2::ZERO {
            None
        } else if offset.x.abs() >= offset.y.abs() {
            Some(if offset.x < 0.0 { Facing::Left } else { Facing::Right })
        } else {
            Some(if offset.y < 0.0 { Facing::Up } else { Facing::Down })
        }
    }
}

// ── KeyboardMover ───────────────────────────────────────────────────────

/// Moves on directional [`Action`]s in screen coordinates (y grows down).
/// Holding [`Action::Run`] multiplies speed.
#[derive(Debug)]
pub struct KeyboardMover {
    run_multiplier: f64,
    ignore: Layer,
    facing: Facing,
    touching: Vec<EntityId>,
    interaction: Option<EntityId>,
}

impl KeyboardMover {
    pub fn new() -> Self {
        Self {
            run_multiplier: 2.0,
            ignore: Layer::MOVER,
            facing: Facing::Down,
            touching: Vec::new(),
            interaction: None,
        }
    }

    pub fn with_run_multiplier(mut self, multiplier: f64) -> Self {
        self.run_multiplier = multiplier;
        self
    }

    /// Layers that never block this mover. Defaults to [`Layer::MOVER`].
    pub fn ignoring(mut self, layers: Layer) -> Self {
        self.ignore = layers;
        self
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    /// Entities overlapping the mover after its last update.
    pub fn touching(&self) -> &[EntityId] {
        &self.touching
    }

    /// The entity the player last interacted with.
    pub fn interaction(&self) -> Option<EntityId> {
        self.interaction
    }
}

impl Default for KeyboardMover {
    fn default() -> Self {
        Self::new()
    }
}

impl MovementBehavior<2> for KeyboardMover {
    fn desired_displacement(
        &mut self,
        cx: &mut UpdateContext<'_, 2>,
        pace: Pace,
    ) -> Result<Option<Aabb2>, ControllerError> {
        let input = cx.input();
        let mut direction = DVec2::ZERO;
        if input.is_active(Action::Left) {
            direction.x -= 1.0;
        }
        if input.is_active(Action::Right) {
            direction.x += 1.0;
        }
        if input.is_active(Action::Up) {
            direction.y -= 1.0;
        }
        if input.is_active(Action::Down) {
            direction.y += 1.0;
        }
        if direction == DVec2::ZERO {
            return Ok(None);
        }
        let multiplier = if input.is_active(Action::Run) {
            self.run_multiplier
        } else {
            1.0
        };
        Ok(Some(Aabb2::from(direction * pace.distance(multiplier))))
    }

    fn can_touch(&self, other: &Entity<2>) -> bool {
        other.is_material() && !other.layer().intersects(self.ignore)
    }

    fn on_entity_moved(
        &mut self,
        _cx: &mut UpdateContext<'_, 2>,
        old: &Aabb2,
        new: &Aabb2,
    ) -> Result<(), ControllerError> {
        if let Some(facing) = Facing::from_offset(new.position_vec() - old.position_vec()) {
            self.facing = facing;
        }
        Ok(())
    }

    fn on_collision_set(
        &mut self,
        cx: &mut UpdateContext<'_, 2>,
        others: &[EntityId],
    ) -> Result<(), ControllerError> {
        self.touching = others.to_vec();
        if cx.input().is_active(Action::Interact) {
            if let Some(target) = others.first() {
                log::debug!("entity {} interacts with {target}", cx.entity());
                self.interaction = Some(*target);
            }
        }
        Ok(())
    }
}

// ── Pursuer ─────────────────────────────────────────────────────────────

/// Walks straight at the player while the player is within
/// `field_of_view`, stopping on contact. Never blocked by other movers.
#[derive(Debug)]
pub struct Pursuer<const N: usize> {
    target_kind: String,
    field_of_view: f64,
    attack_range: f64,
    ignore: Layer,
    attacking: bool,
}

impl<const N: usize> Pursuer<N> {
    pub fn new(field_of_view: f64, attack_range: f64) -> Self {
        Self {
            target_kind: PLAYER_KIND.to_string(),
            field_of_view,
            attack_range,
            ignore: Layer::MOVER,
            attacking: false,
        }
    }

    /// Chase entities of another kind.
    pub fn targeting(mut self, kind: impl Into<String>) -> Self {
        self.target_kind = kind.into();
        self
    }

    /// Whether the target was within attack range after the last move.
    pub fn is_attacking(&self) -> bool {
        self.attacking
    }

    fn gap_to_target(&self, cx: &UpdateContext<'_, N>) -> Result<Option<Aabb<N>>, ControllerError> {
        let Some(target) = cx.level().find_first_by_kind(&self.target_kind) else {
            return Ok(None);
        };
        let Some(target) = cx.level().get(target) else {
            return Ok(None);
        };
        let me = cx.this()?.collision_rect();
        Ok(Some(target.collision_rect().nearest_axis_distance(&me)))
    }
}

impl<const N: usize> MovementBehavior<N> for Pursuer<N> {
    fn desired_displacement(
        &mut self,
        cx: &mut UpdateContext<'_, N>,
        pace: Pace,
    ) -> Result<Option<Aabb<N>>, ControllerError> {
        let Some(target) = cx.level().find_first_by_kind(&self.target_kind) else {
            return Ok(None);
        };
        let me = cx.this()?.collision_rect();
        let Some(them) = cx.level().get(target).map(|t| t.collision_rect()) else {
            return Ok(None);
        };
        if me.overlaps(&them) {
            return Ok(None);
        }
        let gap = them.nearest_axis_distance(&me);
        let distance = gap.hypot();
        if distance == 0.0 || distance >= self.field_of_view {
            return Ok(None);
        }
        let step = pace.distance(1.0).min(distance);
        Ok(Some(Aabb::point(gap.position.map(|g| g * step / distance))))
    }

    fn can_touch(&self, other: &Entity<N>) -> bool {
        other.is_material() && !other.layer().intersects(self.ignore)
    }

    fn on_entity_moved(
        &mut self,
        cx: &mut UpdateContext<'_, N>,
        _old: &Aabb<N>,
        _new: &Aabb<N>,
    ) -> Result<(), ControllerError> {
        self.attacking = self
            .gap_to_target(cx)?
            .is_some_and(|gap| gap.hypot() <= self.attack_range);
        Ok(())
    }
}

// ── Registry wiring ─────────────────────────────────────────────────────

/// Level-file params for `"keyboard"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KeyboardParams {
    pub speed: f64,
    pub run_multiplier: f64,
}

impl Default for KeyboardParams {
    fn default() -> Self {
        Self {
            speed: 5.0,
            run_multiplier: 2.0,
        }
    }
}

/// Level-file params for `"pursuer"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PursuerParams {
    pub speed: f64,
    pub field_of_view: f64,
    pub attack_range: f64,
}

impl Default for PursuerParams {
    fn default() -> Self {
        Self {
            speed: 2.0,
            field_of_view: 10.0,
            attack_range: 1.0,
        }
    }
}

impl ControllerRegistry<2> {
    /// Registry preloaded with `"keyboard"` and `"pursuer"`.
    pub fn with_stock_behaviors() -> Self {
        let mut registry = Self::new();
        registry.register_params("keyboard", |p: KeyboardParams| {
            Controller::new(Movable::new(
                p.speed,
                KeyboardMover::new().with_run_multiplier(p.run_multiplier),
            ))
        });
        registry.register_params("pursuer", |p: PursuerParams| {
            Controller::new(Movable::new(
                p.speed,
                Pursuer::new(p.field_of_view, p.attack_range),
            ))
        });
        registry
    }
}
