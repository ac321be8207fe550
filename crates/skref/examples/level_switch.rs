//! Level switching on a one-axis world.
//!
//! A walker heads right through the meadow. Touching a `door:<level>` entity
//! asks the world for that level; the old level is torn down and the new one
//! takes over within the same tick. Reaching the barn's `exit` finishes the
//! run. Each frame is printed as a strip of characters.
//!
//! Run with: `cargo run -p skref --example level_switch`

use std::time::Duration;

use serde::Deserialize;
use skref::prelude::*;

const MEADOW: &str = r#"{
    "dimensions": { "position": [0], "size": [16] },
    "entities": [
        { "kind": "player", "layer": "player",
          "rect": { "position": [0], "size": [1] },
          "controller": { "name": "walker", "params": { "speed": 4 } } },
        { "kind": "flower", "material": false, "rect": { "position": [5], "size": [1] } },
        { "kind": "door:barn", "material": false, "rect": { "position": [12], "size": [1] } }
    ]
}"#;

const BARN: &str = r#"{
    "dimensions": { "position": [0], "size": [10] },
    "entities": [
        { "kind": "player", "layer": "player",
          "rect": { "position": [0], "size": [1] },
          "controller": { "name": "walker", "params": { "speed": 2 } } },
        { "kind": "exit", "material": false, "rect": { "position": [8], "size": [1] } },
        { "kind": "wall", "rect": { "position": [9], "size": [1] } }
    ]
}"#;

#[derive(Deserialize)]
#[serde(default)]
struct WalkerParams {
    speed: f64,
}

impl Default for WalkerParams {
    fn default() -> Self {
        Self { speed: 1.0 }
    }
}

/// Walks right, following doors.
struct Walker;

impl MovementBehavior<1> for Walker {
    fn desired_displacement(
        &mut self,
        _cx: &mut UpdateContext<'_, 1>,
        pace: Pace,
    ) -> Result<Option<Aabb1>, ControllerError> {
        Ok(Some(Aabb1::point([pace.distance(1.0)])))
    }

    fn on_collision(
        &mut self,
        cx: &mut UpdateContext<'_, 1>,
        other: EntityId,
    ) -> Result<(), ControllerError> {
        let Some(kind) = cx.level().get(other).map(|e| e.kind().to_string()) else {
            return Ok(());
        };
        if let Some(target) = kind.strip_prefix("door:") {
            log::info!("walker takes the door to '{target}'");
            cx.request_level(target);
        } else if kind == "exit" {
            log::info!("walker left the barn");
            cx.finish_world();
        }
        Ok(())
    }
}

/// Prints a one-axis level as a strip, one cell per unit.
struct StripVisualizer {
    last: String,
}

impl LevelVisualizer<1> for StripVisualizer {
    fn draw(&mut self, level: &Level<1>) {
        let bounds = level.dimensions();
        let mut strip = vec!['-'; bounds.size[0].ceil() as usize];
        for (_, entity) in level.entities() {
            let glyph = match entity.kind() {
                PLAYER_KIND => 'P',
                kind if kind.starts_with("door:") => 'D',
                "exit" => 'E',
                _ if entity.is_material() => '#',
                _ => '*',
            };
            let at = (entity.rect().position[0] - bounds.position[0]).floor().max(0.0) as usize;
            if let Some(cell) = strip.get_mut(at) {
                *cell = glyph;
            }
        }
        let line: String = strip.into_iter().collect();
        if line != self.last {
            println!("{:>8} |{line}|", level.id());
            self.last = line;
        }
    }

    fn draw_loading(&mut self, id: &str) {
        println!("{id:>8} | loading...");
    }
}

fn main() {
    env_logger::init();

    let mut registry = ControllerRegistry::<1>::new();
    registry.register_params("walker", |p: WalkerParams| {
        Controller::new(Movable::new(p.speed, Walker))
    });
    let builder = DataLevelBuilder::new(registry)
        .with_source("meadow", MEADOW)
        .with_source("barn", BARN);

    let world = WorldActivity::new(builder)
        .starting_at("meadow")
        .with_visualizer(StripVisualizer {
            last: String::new(),
        });

    let mut engine = Engine::new();
    engine.start(Box::new(world));

    let stats = Looper::new()
        .logic_interval(Duration::from_millis(20))
        .draw_interval(Duration::from_millis(40))
        .run_simulated(&mut engine, &mut NoInput, Duration::from_secs(30));

    match engine.state() {
        EngineState::Exit => println!("done after {} logic ticks", stats.logic_ticks),
        state => println!("stopped at the time limit, engine {}", state.label()),
    }
}
