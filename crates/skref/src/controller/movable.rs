//! # Movable: Displacement, Clamping, Collision Callbacks
//!
//! [`Movable`] is the controller for anything that walks. A
//! [`MovementBehavior`] decides where it wants to go; `Movable` decides how
//! far it actually gets and who it ends up touching.
//!
//! ## One update
//!
//! ```text
//! dt = now - last_update            (0 on the very first update)
//!      │
//!      ▼
//! desired_displacement(pace) ──None / zero──────────────┐
//!      │                                                │
//!      ▼ material mover?                                │
//! current = collision box, rounded                      │
//! prospective = current + desired                       │
//! obstacles = can_touch(other) && overlaps(prospective) │
//! clamp desired against every obstacle                  │
//!      │                                                │
//!      ▼                                                │
//! rect += displacement, rounded                         │
//! on_entity_moved(old, new)                             │
//!      │                                                │
//!      ▼◀───────────────────────────────────────────────┘
//! others = overlapping(final collision box), any materiality
//! on_collision(other) for each, then on_collision_set(others)
//! last_update = now
//! ```
//!
//! ## Clamping against several obstacles
//!
//! Obstacles are gathered in registry order. Per axis, an obstacle only
//! constrains motion *toward* it, and only when the mover currently sits
//! entirely on the near side of it:
//!
//! ```text
//! moving +x, mover.far <= obstacle.pos  →  dx = min(dx, obstacle.pos - mover.far)
//! moving -x, mover.pos >= obstacle.far  →  dx = max(dx, obstacle.far - mover.pos)
//! ```
//!
//! Each clamp can only shrink the displacement, and its bound depends only
//! on the mover's starting box, so applying them in any order yields the
//! most restrictive one. Registry order is therefore irrelevant to the
//! result.
//!
//! Detection is discrete: a displacement large enough to jump clean over an
//! obstacle in one tick is not caught.

use std::time::Duration;

use super::{ControllerError, EntityController, UpdateContext};
use crate::entity::{Entity, EntityId};
use crate::geom::{Aabb, Shape};
use crate::level::Level;
use crate::math::{self, PRECISION, SPEED_PRECISION};

/// Elapsed time and base speed for one update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pace {
    pub dt: Duration,
    /// Units per second.
    pub base_speed: f64,
}

impl Pace {
    /// Distance covered this update at `multiplier` times base speed,
    /// snapped to [`SPEED_PRECISION`].
    pub fn distance(&self, multiplier: f64) -> f64 {
        math::round_to(
            self.base_speed * multiplier * self.dt.as_secs_f64(),
            SPEED_PRECISION,
        )
    }
}

/// Hooks a concrete mover plugs into [`Movable`].
pub trait MovementBehavior<const N: usize> {
    /// Where the entity wants to go this update. `None` or a zero box means
    /// "stay put"; the entity is then neither moved nor reported as moved.
    fn desired_displacement(
        &mut self,
        cx: &mut UpdateContext<'_, N>,
        pace: Pace,
    ) -> Result<Option<Aabb<N>>, ControllerError>;

    /// Whether `other` can physically block this mover.
    fn can_touch(&self, other: &Entity<N>) -> bool {
        other.is_material()
    }

    fn on_entity_moved(
        &mut self,
        _cx: &mut UpdateContext<'_, N>,
        _old: &Aabb<N>,
        _new: &Aabb<N>,
    ) -> Result<(), ControllerError> {
        Ok(())
    }

    /// Called for every entity overlapping the final collision box, material
    /// or not, whether or not the mover moved.
    fn on_collision(
        &mut self,
        _cx: &mut UpdateContext<'_, N>,
        _other: EntityId,
    ) -> Result<(), ControllerError> {
        Ok(())
    }

    fn on_collision_set(
        &mut self,
        _cx: &mut UpdateContext<'_, N>,
        _others: &[EntityId],
    ) -> Result<(), ControllerError> {
        Ok(())
    }

    fn is_finished(&self) -> bool {
        false
    }
}

/// Controller that moves its entity with collision clamping.
pub struct Movable<const N: usize, B> {
    behavior: B,
    base_speed: f64,
    last_update: Option<Duration>,
    locked: bool,
}

impl<const N: usize, B: MovementBehavior<N>> Movable<N, B> {
    pub fn new(base_speed: f64, behavior: B) -> Self {
        Self {
            behavior,
            base_speed,
            last_update: None,
            locked: false,
        }
    }

    pub fn behavior(&self) -> &B {
        &self.behavior
    }

    pub fn behavior_mut(&mut self) -> &mut B {
        &mut self.behavior
    }

    pub fn base_speed(&self) -> f64 {
        self.base_speed
    }

    /// Simulation time of the last update, `None` before the first.
    pub fn last_update(&self) -> Option<Duration> {
        self.last_update
    }

    /// Freeze the entity in place. Collision callbacks keep firing.
    pub fn lock_position(&mut self) {
        self.locked = true;
    }

    pub fn unlock_position(&mut self) {
        self.locked = false;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    fn step(&mut self, cx: &mut UpdateContext<'_, N>, dt: Duration) -> Result<(), ControllerError> {
        let pace = Pace {
            dt,
            base_speed: self.base_speed,
        };
        let desired = if self.locked {
            None
        } else {
            self.behavior.desired_displacement(cx, pace)?
        };

        if let Some(desired) = desired.filter(|d| !d.is_zero()) {
            let (material, current, old) = {
                let me = cx.this()?;
                (me.is_material(), me.collision_shape(), me.rect())
            };
            let displacement = if material {
                let behavior = &self.behavior;
                resolve_displacement(cx.level(), cx.entity(), &current, &desired, |other| {
                    behavior.can_touch(other)
                })
            } else {
                desired
            };
            let new = old.translate(&displacement).round(PRECISION);
            cx.this_mut()?.set_rect(new);
            cx.record_move();
            self.behavior.on_entity_moved(cx, &old, &new)?;
        }

        let shape = cx.this()?.collision_shape();
        let others = cx.level().overlapping(&shape, cx.entity());
        cx.record_collisions(others.len());
        for other in &others {
            self.behavior.on_collision(cx, *other)?;
        }
        self.behavior.on_collision_set(cx, &others)
    }
}

impl<const N: usize, B: MovementBehavior<N>> EntityController<N> for Movable<N, B> {
    fn update(&mut self, cx: &mut UpdateContext<'_, N>) -> Result<(), ControllerError> {
        let now = cx.now();
        let dt = self
            .last_update
            .map_or(Duration::ZERO, |last| now.saturating_sub(last));
        let result = self.step(cx, dt);
        self.last_update = Some(now);
        result
    }

    fn is_finished(&self) -> bool {
        self.behavior.is_finished()
    }

    fn name(&self) -> &'static str {
        std::any::type_name::<B>()
    }
}

/// Clamp `desired` so the mover at `current` does not enter any entity
/// `can_touch` accepts. The mover itself is skipped.
pub fn resolve_displacement<const N: usize>(
    level: &Level<N>,
    mover: EntityId,
    current: &Shape<N>,
    desired: &Aabb<N>,
    can_touch: impl Fn(&Entity<N>) -> bool,
) -> Aabb<N> {
    let current = current.round(PRECISION).bounds();
    let prospective = current.translate(desired);
    let mut resolved = *desired;
    for (id, other) in level.entities() {
        if id == mover || !can_touch(other) {
            continue;
        }
        let shape = other.collision_shape();
        for obstacle in shape.parts() {
            if obstacle.overlaps(&prospective) {
                clamp(&current, obstacle, &mut resolved);
            }
        }
    }
    resolved
}

fn clamp<const N: usize>(current: &Aabb<N>, obstacle: &Aabb<N>, displacement: &mut Aabb<N>) {
    for axis in 0..N {
        let step = displacement.position[axis];
        let near = current.position[axis];
        let far = current.far_edge(axis);
        if step > 0.0 && far <= obstacle.position[axis] {
            displacement.position[axis] = step.min(obstacle.position[axis] - far);
        } else if step < 0.0 && near >= obstacle.far_edge(axis) {
            displacement.position[axis] = step.max(obstacle.far_edge(axis) - near);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::activity::ActivityId;
    use crate::controller::WorldRequests;
    use crate::geom::{Aabb1, Aabb2, Aabb3};
    use crate::input::NoInput;
    use crate::layer::Layer;

    #[derive(Default)]
    struct Probe {
        moves: Vec<(Aabb2, Aabb2)>,
        collisions: Vec<EntityId>,
        sets: Vec<Vec<EntityId>>,
    }

    struct Scripted {
        step: Option<Aabb2>,
        follow_pace: bool,
        ignore: Layer,
        probe: Rc<RefCell<Probe>>,
    }

    impl Scripted {
        fn new(step: Option<[f64; 2]>) -> (Self, Rc<RefCell<Probe>>) {
            let probe = Rc::new(RefCell::new(Probe::default()));
            let behavior = Self {
                step: step.map(Aabb2::point),
                follow_pace: false,
                ignore: Layer::NONE,
                probe: probe.clone(),
            };
            (behavior, probe)
        }
    }

    impl MovementBehavior<2> for Scripted {
        fn desired_displacement(
            &mut self,
            _cx: &mut UpdateContext<'_, 2>,
            pace: Pace,
        ) -> Result<Option<Aabb2>, ControllerError> {
            if self.follow_pace {
                return Ok(Some(Aabb2::point([pace.distance(1.0), 0.0])));
            }
            Ok(self.step)
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
            self.probe.borrow_mut().moves.push((*old, *new));
            Ok(())
        }

        fn on_collision(
            &mut self,
            _cx: &mut UpdateContext<'_, 2>,
            other: EntityId,
        ) -> Result<(), ControllerError> {
            self.probe.borrow_mut().collisions.push(other);
            Ok(())
        }

        fn on_collision_set(
            &mut self,
            _cx: &mut UpdateContext<'_, 2>,
            others: &[EntityId],
        ) -> Result<(), ControllerError> {
            self.probe.borrow_mut().sets.push(others.to_vec());
            Ok(())
        }
    }

    fn level_with_player(x: f64) -> (Level<2>, EntityId) {
        let mut level = Level::new("test", Aabb2::from_xy(-10.0, -10.0, 20.0, 20.0));
        let player = level.attach(
            Entity::builder("player", Aabb2::from_xy(x, 0.0, 1.0, 1.0))
                .layer(Layer::PLAYER)
                .build(),
        );
        (level, player)
    }

    fn wall(level: &mut Level<2>, x: f64) -> EntityId {
        level.attach(Entity::builder("wall", Aabb2::from_xy(x, 0.0, 1.0, 1.0)).build())
    }

    fn tick(
        level: &mut Level<2>,
        id: EntityId,
        mover: &mut Movable<2, Scripted>,
        now_ms: u64,
    ) -> Result<(), ControllerError> {
        let mut requests = WorldRequests::default();
        let mut cx = UpdateContext::new(
            id,
            ActivityId::new(1),
            Duration::from_millis(now_ms),
            level,
            &NoInput,
            &mut requests,
        );
        mover.update(&mut cx)
    }

    fn rect(level: &Level<2>, id: EntityId) -> Aabb2 {
        level.get(id).unwrap().rect()
    }

    #[test]
    fn no_displacement_leaves_rect_alone() {
        for step in [None, Some([0.0, 0.0])] {
            let (mut level, player) = level_with_player(0.0);
            let (behavior, probe) = Scripted::new(step);
            let mut mover = Movable::new(1.0, behavior);
            tick(&mut level, player, &mut mover, 0).unwrap();
            tick(&mut level, player, &mut mover, 100).unwrap();
            assert_eq!(rect(&level, player), Aabb2::from_xy(0.0, 0.0, 1.0, 1.0));
            assert!(probe.borrow().moves.is_empty());
        }
    }

    #[test]
    fn mover_stops_flush_against_obstacle() {
        let (mut level, player) = level_with_player(0.0);
        let obstacle = wall(&mut level, 2.0);
        let (behavior, probe) = Scripted::new(Some([2.0, 0.0]));
        let mut mover = Movable::new(1.0, behavior);
        tick(&mut level, player, &mut mover, 0).unwrap();

        let moved = rect(&level, player);
        assert_eq!(moved.position, [1.0, 0.0]);
        assert_eq!(moved.far_edge(0), rect(&level, obstacle).position[0]);
        assert_eq!(probe.borrow().collisions, vec![obstacle]);
    }

    #[test]
    fn mover_already_in_contact_cannot_advance() {
        let (mut level, player) = level_with_player(0.0);
        wall(&mut level, 1.0);
        let (behavior, probe) = Scripted::new(Some([2.0, 0.0]));
        let mut mover = Movable::new(1.0, behavior);
        tick(&mut level, player, &mut mover, 0).unwrap();
        assert_eq!(rect(&level, player).position, [0.0, 0.0]);
        // A blocked attempt still counts as a move attempt.
        assert_eq!(probe.borrow().moves.len(), 1);
    }

    #[test]
    fn non_material_obstacle_is_passed_through_but_reported() {
        let (mut level, player) = level_with_player(0.0);
        let ghost = level.attach(
            Entity::builder("ghost", Aabb2::from_xy(1.0, 0.0, 1.0, 1.0))
                .material(false)
                .build(),
        );
        let (behavior, probe) = Scripted::new(Some([2.0, 0.0]));
        let mut mover = Movable::new(1.0, behavior);
        tick(&mut level, player, &mut mover, 0).unwrap();
        assert_eq!(rect(&level, player).position, [2.0, 0.0]);
        assert_eq!(probe.borrow().collisions, vec![ghost]);
    }

    #[test]
    fn non_material_mover_ignores_walls() {
        let mut level = Level::new("test", Aabb2::ZERO);
        let spirit = level.attach(
            Entity::builder("spirit", Aabb2::from_xy(0.0, 0.0, 1.0, 1.0))
                .material(false)
                .build(),
        );
        wall(&mut level, 2.0);
        let (behavior, _) = Scripted::new(Some([2.0, 0.0]));
        let mut mover = Movable::new(1.0, behavior);
        tick(&mut level, spirit, &mut mover, 0).unwrap();
        assert_eq!(rect(&level, spirit).position, [2.0, 0.0]);
    }

    #[test]
    fn pickup_fires_once_without_movement() {
        let (mut level, player) = level_with_player(0.0);
        let egg = level.attach(
            Entity::builder("egg", Aabb2::from_xy(0.0, 0.0, 0.5, 0.5))
                .material(false)
                .layer(Layer::PICKUP)
                .build(),
        );
        let (behavior, probe) = Scripted::new(None);
        let mut mover = Movable::new(1.0, behavior);
        tick(&mut level, player, &mut mover, 0).unwrap();
        let probe = probe.borrow();
        assert_eq!(probe.collisions, vec![egg]);
        assert_eq!(probe.sets, vec![vec![egg]]);
        assert!(probe.moves.is_empty());
    }

    #[test]
    fn walls_on_both_sides_block_both_directions() {
        for step in [1.0, -1.0] {
            let (mut level, player) = level_with_player(1.0);
            wall(&mut level, 0.0);
            wall(&mut level, 2.0);
            let (behavior, _) = Scripted::new(Some([step, 0.0]));
            let mut mover = Movable::new(1.0, behavior);
            tick(&mut level, player, &mut mover, 0).unwrap();
            assert_eq!(rect(&level, player).position, [1.0, 0.0], "step {step}");
        }
    }

    #[test]
    fn clamp_result_does_not_depend_on_registry_order() {
        for reversed in [false, true] {
            let mut level = Level::new("test", Aabb2::ZERO);
            let mover_id = level.attach(
                Entity::builder("player", Aabb2::from_xy(0.0, 0.0, 4.0, 1.0)).build(),
            );
            let near = Entity::builder("wall", Aabb2::from_xy(4.5, 0.0, 1.0, 1.0)).build();
            let far = Entity::builder("wall", Aabb2::from_xy(6.0, 0.0, 1.0, 1.0)).build();
            if reversed {
                level.attach(far);
                level.attach(near);
            } else {
                level.attach(near);
                level.attach(far);
            }
            let (behavior, _) = Scripted::new(Some([2.5, 0.0]));
            let mut mover = Movable::new(1.0, behavior);
            tick(&mut level, mover_id, &mut mover, 0).unwrap();
            assert_eq!(rect(&level, mover_id).position, [0.5, 0.0]);
        }
    }

    /// Fixed step in any dimension, recording collisions.
    struct Straight<const N: usize> {
        step: Aabb<N>,
        touched: Rc<RefCell<Vec<EntityId>>>,
    }

    impl<const N: usize> MovementBehavior<N> for Straight<N> {
        fn desired_displacement(
            &mut self,
            _cx: &mut UpdateContext<'_, N>,
            _pace: Pace,
        ) -> Result<Option<Aabb<N>>, ControllerError> {
            Ok(Some(self.step))
        }

        fn on_collision(
            &mut self,
            _cx: &mut UpdateContext<'_, N>,
            other: EntityId,
        ) -> Result<(), ControllerError> {
            self.touched.borrow_mut().push(other);
            Ok(())
        }
    }

    fn step_once<const N: usize>(
        level: &mut Level<N>,
        id: EntityId,
        step: [f64; N],
    ) -> Vec<EntityId> {
        let touched = Rc::new(RefCell::new(Vec::new()));
        let mut mover = Movable::new(
            1.0,
            Straight {
                step: Aabb::point(step),
                touched: touched.clone(),
            },
        );
        let mut requests = WorldRequests::default();
        let mut cx = UpdateContext::new(
            id,
            ActivityId::new(1),
            Duration::ZERO,
            level,
            &NoInput,
            &mut requests,
        );
        mover.update(&mut cx).unwrap();
        touched.take()
    }

    #[test]
    fn mover_stops_flush_against_obstacle_on_z() {
        let unit = [1.0, 1.0, 1.0];
        let mut level = Level::new("cube", Aabb3::new([-5.0; 3], [10.0; 3]));
        let player = level.attach(Entity::builder("player", Aabb3::new([0.0; 3], unit)).build());
        let block = level.attach(
            Entity::builder("block", Aabb3::new([0.0, 0.0, 2.0], unit)).build(),
        );

        let touched = step_once(&mut level, player, [0.5, 0.0, 2.0]);
        let moved = level.get(player).unwrap().rect();
        // Free on x, clamped on z.
        assert_eq!(moved.position, [0.5, 0.0, 1.0]);
        assert_eq!(moved.far_edge(2), level.get(block).unwrap().rect().position[2]);
        assert_eq!(touched, vec![block]);
    }

    #[test]
    fn walls_on_both_sides_block_a_one_axis_mover() {
        for step in [1.0, -1.0] {
            let mut level = Level::new("line", Aabb1::from_x(-5.0, 10.0));
            let player =
                level.attach(Entity::builder("player", Aabb1::from_x(1.0, 1.0)).build());
            let left = level.attach(Entity::builder("wall", Aabb1::from_x(0.0, 1.0)).build());
            let right = level.attach(Entity::builder("wall", Aabb1::from_x(2.0, 1.0)).build());

            let touched = step_once(&mut level, player, [step]);
            assert_eq!(level.get(player).unwrap().rect().position, [1.0], "step {step}");
            assert_eq!(touched, vec![left, right], "step {step}");
        }
    }

    #[test]
    fn layer_mask_exempts_obstacles() {
        let (mut level, player) = level_with_player(0.0);
        level.attach(
            Entity::builder("slime", Aabb2::from_xy(2.0, 0.0, 1.0, 1.0))
                .layer(Layer::MOVER)
                .build(),
        );
        let (mut behavior, _) = Scripted::new(Some([2.0, 0.0]));
        behavior.ignore = Layer::MOVER;
        let mut mover = Movable::new(1.0, behavior);
        tick(&mut level, player, &mut mover, 0).unwrap();
        assert_eq!(rect(&level, player).position, [2.0, 0.0]);
    }

    #[test]
    fn first_update_has_zero_dt() {
        let (mut level, player) = level_with_player(0.0);
        let (mut behavior, probe) = Scripted::new(None);
        behavior.follow_pace = true;
        let mut mover = Movable::new(4.0, behavior);

        tick(&mut level, player, &mut mover, 1_000).unwrap();
        assert_eq!(rect(&level, player).position, [0.0, 0.0]);
        assert!(probe.borrow().moves.is_empty());

        tick(&mut level, player, &mut mover, 1_500).unwrap();
        assert_eq!(rect(&level, player).position, [2.0, 0.0]);
        tick(&mut level, player, &mut mover, 1_750).unwrap();
        assert_eq!(rect(&level, player).position, [3.0, 0.0]);
        assert_eq!(mover.last_update(), Some(Duration::from_millis(1_750)));
    }

    #[test]
    fn locked_mover_still_collides() {
        let (mut level, player) = level_with_player(0.0);
        let egg = level.attach(
            Entity::builder("egg", Aabb2::from_xy(0.5, 0.5, 0.5, 0.5))
                .material(false)
                .build(),
        );
        let (behavior, probe) = Scripted::new(Some([1.0, 0.0]));
        let mut mover = Movable::new(1.0, behavior);
        mover.lock_position();
        tick(&mut level, player, &mut mover, 0).unwrap();
        assert_eq!(rect(&level, player).position, [0.0, 0.0]);
        assert_eq!(probe.borrow().collisions, vec![egg]);

        mover.unlock_position();
        tick(&mut level, player, &mut mover, 10).unwrap();
        assert_eq!(rect(&level, player).position, [1.0, 0.0]);
    }

    #[test]
    fn collision_rect_tracks_rect_after_moving() {
        let (mut level, player) = level_with_player(0.0);
        let (behavior, _) = Scripted::new(Some([0.3, 0.7]));
        let mut mover = Movable::new(1.0, behavior);
        for t in 0..5 {
            tick(&mut level, player, &mut mover, t * 10).unwrap();
            let e = level.get(player).unwrap();
            assert_eq!(e.collision_rect(), e.rect());
        }
        assert_eq!(rect(&level, player).position, [1.5, 3.5]);
    }

    #[test]
    fn pace_rounds_to_speed_precision() {
        let pace = Pace {
            dt: Duration::from_millis(16),
            base_speed: 3.3333,
        };
        assert_eq!(pace.distance(1.0), 0.053);
        assert_eq!(pace.distance(2.0), 0.107);
    }
}
