//! Convenience re-exports: `use skref::prelude::*` for the common items.

pub use crate::activity::{Activity, ActivityId, EngineContext};
pub use crate::builder::{
    ControllerRegistry, DataLevelBuilder, LevelBuilder, LevelData, from_fn,
};
pub use crate::controller::{
    Attachment, Controller, EntityController, Facing, KeyboardMover, Movable, MovementBehavior,
    Pace, Pursuer, UpdateContext,
};
pub use crate::engine::{Engine, EngineState};
pub use crate::entity::{Entity, EntityId};
pub use crate::error::{BuildError, ControllerError, LevelError};
pub use crate::geom::{Aabb, Aabb1, Aabb2, Aabb3, CompositeAabb, Shape};
pub use crate::input::{Action, Input, InputSource, NoInput, ScriptedInput};
pub use crate::layer::Layer;
pub use crate::level::{Level, PLAYER_KIND};
pub use crate::looper::{LoopStats, Looper};
pub use crate::math::{DVec2, DVec3};
pub use crate::time::{SimClock, Timer};
pub use crate::visualizer::{AsciiVisualizer, LevelVisualizer};
pub use crate::world::{LevelState, TickReport, WorldActivity, WorldReport};

#[cfg(feature = "keyboard")]
pub use crate::input::KeyCode;
