//! Egg pickup: headless farm run.
//!
//! A scripted farmer walks right through a fenced yard collecting eggs while
//! a fox closes in from the far side. The world finishes once the last egg
//! is collected or the fox catches up. Frames are printed as ASCII.
//!
//! Run with: `cargo run -p skref --example pickup`
//! Live metrics: start `skref-telemetry` first.

use std::time::Duration;

use skref::controller::KeyboardParams;
use skref::prelude::*;

const FARM: &str = r#"{
    "dimensions": { "position": [0, 0], "size": [20, 6] },
    "entities": [
        { "kind": "fence", "rect": { "position": [0, 0], "size": [20, 1] } },
        { "kind": "fence", "rect": { "position": [0, 5], "size": [20, 1] } },
        { "kind": "player", "layer": "player", "order": 2,
          "rect": { "position": [1, 2], "size": [1, 1] },
          "controller": { "name": "farmer", "params": { "speed": 3 } } },
        { "kind": "egg", "material": false, "layer": "pickup",
          "rect": { "position": [5, 2.25], "size": [0.5, 0.5] } },
        { "kind": "egg", "material": false, "layer": "pickup",
          "rect": { "position": [9, 2.25], "size": [0.5, 0.5] } },
        { "kind": "egg", "material": false, "layer": "pickup",
          "rect": { "position": [13, 2.25], "size": [0.5, 0.5] } },
        { "kind": "fox", "layer": "mover", "order": 1,
          "rect": { "position": [18, 2], "size": [1, 1] },
          "controller": { "name": "pursuer", "params": { "speed": 1.5 } } }
    ]
}"#;

// ── Farmer behavior ─────────────────────────────────────────────────────

/// Keyboard movement plus egg collection.
struct Farmer {
    walk: KeyboardMover,
    collected: u32,
}

impl MovementBehavior<2> for Farmer {
    fn desired_displacement(
        &mut self,
        cx: &mut UpdateContext<'_, 2>,
        pace: Pace,
    ) -> Result<Option<Aabb2>, ControllerError> {
        self.walk.desired_displacement(cx, pace)
    }

    fn can_touch(&self, other: &Entity<2>) -> bool {
        self.walk.can_touch(other)
    }

    fn on_collision(
        &mut self,
        cx: &mut UpdateContext<'_, 2>,
        other: EntityId,
    ) -> Result<(), ControllerError> {
        let Some(kind) = cx.level().get(other).map(|e| e.kind().to_string()) else {
            return Ok(());
        };
        match kind.as_str() {
            "egg" => {
                cx.level_mut().remove(other);
                self.collected += 1;
                let left = cx.level().find_by_kind("egg").len();
                log::info!("collected egg {} ({left} left)", self.collected);
                if left == 0 {
                    log::info!("all eggs collected");
                    cx.finish_world();
                }
            }
            "fox" => {
                log::info!("the fox got the farmer");
                cx.finish_world();
            }
            _ => {}
        }
        Ok(())
    }

    fn on_collision_set(
        &mut self,
        cx: &mut UpdateContext<'_, 2>,
        others: &[EntityId],
    ) -> Result<(), ControllerError> {
        self.walk.on_collision_set(cx, others)
    }
}

fn main() -> Result<(), BuildError> {
    #[cfg(feature = "diagnostics")]
    skref::diag::init_logger();
    #[cfg(not(feature = "diagnostics"))]
    env_logger::init();

    let mut registry = ControllerRegistry::with_stock_behaviors();
    registry.register_params("farmer", |p: KeyboardParams| {
        Controller::new(Movable::new(
            p.speed,
            Farmer {
                walk: KeyboardMover::new().with_run_multiplier(p.run_multiplier),
                collected: 0,
            },
        ))
    });
    let builder = DataLevelBuilder::new(registry).with_source("farm", FARM);

    // Fail fast on content bugs before anything runs.
    let farm = pollster::block_on(builder.build("farm"))?;
    if let Err(e) = farm.find_player() {
        log::error!("farm has no player: {e}");
        return Ok(());
    }

    let world = WorldActivity::new(builder)
        .starting_at("farm")
        .with_visualizer(AsciiVisualizer::new(std::io::stdout()).every(30));

    #[cfg(feature = "diagnostics")]
    let mut engine = Engine::new().with_diagnostics();
    #[cfg(not(feature = "diagnostics"))]
    let mut engine = Engine::new();
    engine.start(Box::new(world));

    let mut input = ScriptedInput::new()
        .press_at(Duration::ZERO, Action::Right)
        .press_at(Duration::from_secs(1), Action::Run)
        .release_at(Duration::from_secs(2), Action::Run);

    let stats = Looper::new().run_simulated(&mut engine, &mut input, Duration::from_secs(20));
    println!(
        "finished in {:.2}s of simulated time ({} logic ticks, {} frames), engine {}",
        stats.elapsed.as_secs_f64(),
        stats.logic_ticks,
        stats.draw_ticks,
        engine.state().label(),
    );
    Ok(())
}
