//! # Level Builders: From Data to a Live Level
//!
//! A [`LevelBuilder`] turns a level id into a fully populated
//! [`Level`]. Building is async so a builder can fetch data from wherever it
//! lives; the world awaits it to completion before any tick touches the
//! result.
//!
//! [`DataLevelBuilder`] reads JSON level documents:
//!
//! ```json
//! {
//!   "dimensions": { "position": [0, 0], "size": [20, 15] },
//!   "entities": [
//!     { "kind": "player", "layer": "player",
//!       "rect": { "position": [1, 1], "size": [1, 1] },
//!       "collision": { "position": [0.25, 0.5], "size": [0.5, 0.5] },
//!       "controller": { "name": "keyboard", "params": { "speed": 4 } } },
//!     { "kind": "egg", "material": false, "layer": "pickup",
//!       "rect": { "position": [5, 1], "size": [0.5, 0.5] } }
//!   ]
//! }
//! ```
//!
//! Controllers are looked up by name in a [`ControllerRegistry`]. A name
//! nobody registered is [`BuildError::UnknownBehaviorReference`], raised at
//! build time and never mid-simulation.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::controller::Controller;
use crate::entity::Entity;
use crate::error::BuildError;
use crate::geom::{Aabb, CompositeAabb, Shape};
use crate::layer::Layer;
use crate::level::Level;

/// Produces levels by id.
pub trait LevelBuilder<const N: usize> {
    fn build(&self, id: &str) -> impl Future<Output = Result<Level<N>, BuildError>>;
}

/// Adapt a synchronous closure into a [`LevelBuilder`].
pub fn from_fn<const N: usize, F>(f: F) -> FnLevelBuilder<F>
where
    F: Fn(&str) -> Result<Level<N>, BuildError>,
{
    FnLevelBuilder(f)
}

pub struct FnLevelBuilder<F>(F);

impl<const N: usize, F> LevelBuilder<N> for FnLevelBuilder<F>
where
    F: Fn(&str) -> Result<Level<N>, BuildError>,
{
    async fn build(&self, id: &str) -> Result<Level<N>, BuildError> {
        (self.0)(id)
    }
}

// ── Level data (wire format) ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelData {
    pub dimensions: RectData,
    #[serde(default)]
    pub entities: Vec<EntityData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RectData {
    pub position: Vec<f64>,
    pub size: Vec<f64>,
}

impl RectData {
    pub fn to_aabb<const N: usize>(&self) -> Result<Aabb<N>, BuildError> {
        let position: [f64; N] = self.position.as_slice().try_into().map_err(|_| {
            BuildError::DimensionMismatch {
                expected: N,
                found: self.position.len(),
            }
        })?;
        let size: [f64; N] =
            self.size
                .as_slice()
                .try_into()
                .map_err(|_| BuildError::DimensionMismatch {
                    expected: N,
                    found: self.size.len(),
                })?;
        if size.iter().any(|s| *s < 0.0) {
            return Err(BuildError::NegativeSize(self.size.clone()));
        }
        Ok(Aabb::new(position, size))
    }
}

/// One rect, or several forming a composite.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CollisionData {
    Single(RectData),
    Composite(Vec<RectData>),
}

impl CollisionData {
    pub fn to_shape<const N: usize>(&self) -> Result<Shape<N>, BuildError> {
        match self {
            CollisionData::Single(rect) => Ok(Shape::Single(rect.to_aabb()?)),
            CollisionData::Composite(rects) => {
                let parts = rects
                    .iter()
                    .map(RectData::to_aabb)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Shape::Composite(CompositeAabb::from_parts(parts)))
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityData {
    pub kind: String,
    #[serde(default = "default_material")]
    pub material: bool,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub layer: Option<String>,
    pub rect: RectData,
    #[serde(default)]
    pub collision: Option<CollisionData>,
    #[serde(default)]
    pub controller: Option<ControllerRef>,
}

fn default_material() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerRef {
    pub name: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

// ── ControllerRegistry ──────────────────────────────────────────────────

type Factory<const N: usize> = Box<dyn Fn(&serde_json::Value) -> Result<Controller<N>, BuildError>>;

/// Maps controller names used in level data to factories.
pub struct ControllerRegistry<const N: usize> {
    factories: HashMap<String, Factory<N>>,
}

impl<const N: usize> ControllerRegistry<N> {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a factory receiving raw JSON params (`null` when absent).
    pub fn register(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn(&serde_json::Value) -> Result<Controller<N>, BuildError> + 'static,
    ) {
        self.factories.insert(name.into(), Box::new(factory));
    }

    /// Register a factory whose params deserialize into `P`. Missing params
    /// deserialize from an empty object, so `#[serde(default)]` structs work.
    pub fn register_params<P, F>(&mut self, name: &str, factory: F)
    where
        P: DeserializeOwned,
        F: Fn(P) -> Controller<N> + 'static,
    {
        let owned = name.to_string();
        self.register(name, move |params| {
            let params = if params.is_null() {
                serde_json::Value::Object(serde_json::Map::new())
            } else {
                params.clone()
            };
            let parsed = serde_json::from_value(params).map_err(|source| {
                BuildError::InvalidParams {
                    name: owned.clone(),
                    source,
                }
            })?;
            Ok(factory(parsed))
        });
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Sorted registered names.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn create(&self, name: &str, params: &serde_json::Value) -> Result<Controller<N>, BuildError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| BuildError::UnknownBehaviorReference(name.to_string()))?;
        factory(params)
    }
}

impl<const N: usize> Default for ControllerRegistry<N> {
    fn default() -> Self {
        Self::new()
    }
}

// ── DataLevelBuilder ────────────────────────────────────────────────────

/// Builds levels from JSON documents held in memory or read from
/// `<dir>/<id>.json`. In-memory sources win.
pub struct DataLevelBuilder<const N: usize> {
    registry: ControllerRegistry<N>,
    sources: HashMap<String, String>,
    dir: Option<PathBuf>,
}

impl<const N: usize> DataLevelBuilder<N> {
    pub fn new(registry: ControllerRegistry<N>) -> Self {
        Self {
            registry,
            sources: HashMap::new(),
            dir: None,
        }
    }

    pub fn with_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn with_source(mut self, id: impl Into<String>, json: impl Into<String>) -> Self {
        self.sources.insert(id.into(), json.into());
        self
    }

    pub fn registry(&self) -> &ControllerRegistry<N> {
        &self.registry
    }

    fn read(&self, id: &str) -> Result<String, BuildError> {
        if let Some(json) = self.sources.get(id) {
            return Ok(json.clone());
        }
        let Some(dir) = &self.dir else {
            return Err(BuildError::UnknownLevel(id.to_string()));
        };
        let path = dir.join(format!("{id}.json"));
        std::fs::read_to_string(&path).map_err(|source| BuildError::Io { path, source })
    }

    /// Turn parsed level data into a live level.
    pub fn instantiate(&self, id: &str, data: &LevelData) -> Result<Level<N>, BuildError> {
        let mut level = Level::new(id, data.dimensions.to_aabb()?);
        for entity in &data.entities {
            level.attach(self.entity(entity)?);
        }
        Ok(level)
    }

    fn entity(&self, data: &EntityData) -> Result<Entity<N>, BuildError> {
        let layer = match &data.layer {
            Some(name) => {
                Layer::from_name(name).ok_or_else(|| BuildError::UnknownLayer(name.clone()))?
            }
            None => Layer::STATIC,
        };
        let mut builder = Entity::builder(data.kind.clone(), data.rect.to_aabb()?)
            .material(data.material)
            .order(data.order)
            .layer(layer);
        if let Some(collision) = &data.collision {
            builder = builder.collision(collision.to_shape()?);
        }
        if let Some(controller) = &data.controller {
            builder = builder.controller(self.registry.create(&controller.name, &controller.params)?);
        }
        Ok(builder.build())
    }
}

impl<const N: usize> LevelBuilder<N> for DataLevelBuilder<N> {
    async fn build(&self, id: &str) -> Result<Level<N>, BuildError> {
        let json = self.read(id)?;
        let data: LevelData = serde_json::from_str(&json)?;
        let level = self.instantiate(id, &data)?;
        log::debug!("built level '{id}' with {} entities", level.len());
        Ok(level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{ControllerError, EntityController, UpdateContext};
    use crate::geom::Aabb2;

    struct Still;

    impl EntityController<2> for Still {
        fn update(&mut self, _cx: &mut UpdateContext<'_, 2>) -> Result<(), ControllerError> {
            Ok(())
        }
    }

    const FARM: &str = r#"{
        "dimensions": { "position": [0, 0], "size": [20, 10] },
        "entities": [
            { "kind": "player", "layer": "player",
              "rect": { "position": [1, 1], "size": [1, 1] },
              "controller": { "name": "still" } },
            { "kind": "fence", "order": 2,
              "rect": { "position": [4, 0], "size": [3, 1] },
              "collision": [
                  { "position": [0, 0], "size": [1, 1] },
                  { "position": [2, 0], "size": [1, 1] }
              ] },
            { "kind": "egg", "material": false, "layer": "pickup",
              "rect": { "position": [8, 1], "size": [0.5, 0.5] } }
        ]
    }"#;

    fn registry() -> ControllerRegistry<2> {
        let mut registry = ControllerRegistry::new();
        registry.register("still", |_| Ok(Controller::new(Still)));
        registry
    }

    #[test]
    fn builds_level_from_json() {
        let builder = DataLevelBuilder::new(registry()).with_source("farm", FARM);
        let level = pollster::block_on(builder.build("farm")).unwrap();
        assert_eq!(level.id(), "farm");
        assert_eq!(level.dimensions(), Aabb2::from_xy(0.0, 0.0, 20.0, 10.0));
        assert_eq!(level.len(), 3);

        let player = level.find_player().unwrap();
        assert_eq!(level.get(player).unwrap().layer(), Layer::PLAYER);

        let fence = level.get(level.find_first_by_kind("fence").unwrap()).unwrap();
        assert_eq!(fence.order(), 2);
        assert!(fence.is_material());
        assert_eq!(fence.collision_shape().parts().len(), 2);
        assert_eq!(fence.collision_rect(), Aabb2::from_xy(4.0, 0.0, 3.0, 1.0));

        let egg = level.get(level.find_first_by_kind("egg").unwrap()).unwrap();
        assert!(!egg.is_material());
        assert!(!egg.is_dynamic());
    }

    #[test]
    fn unknown_controller_fails_the_build() {
        let builder = DataLevelBuilder::<2>::new(ControllerRegistry::new()).with_source("farm", FARM);
        let err = pollster::block_on(builder.build("farm")).err().unwrap();
        assert!(matches!(err, BuildError::UnknownBehaviorReference(ref name) if name == "still"));
        assert_eq!(err.to_string(), "entity controller \"still\" not found");
    }

    #[test]
    fn wrong_axis_count_is_rejected() {
        let rect = RectData {
            position: vec![0.0, 0.0, 0.0],
            size: vec![1.0, 1.0, 1.0],
        };
        assert!(matches!(
            rect.to_aabb::<2>(),
            Err(BuildError::DimensionMismatch { expected: 2, found: 3 })
        ));
        assert!(rect.to_aabb::<3>().is_ok());
    }

    #[test]
    fn bad_layer_and_missing_level() {
        let json = r#"{ "dimensions": { "position": [0], "size": [1] },
                        "entities": [ { "kind": "x", "layer": "ghost",
                                        "rect": { "position": [0], "size": [1] } } ] }"#;
        let builder = DataLevelBuilder::<1>::new(ControllerRegistry::new()).with_source("one", json);
        assert!(matches!(
            pollster::block_on(builder.build("one")),
            Err(BuildError::UnknownLayer(_))
        ));
        assert!(matches!(
            pollster::block_on(builder.build("two")),
            Err(BuildError::UnknownLevel(_))
        ));
    }

    #[test]
    fn reads_levels_from_directory() {
        let dir = std::env::temp_dir().join(format!("skref-levels-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("farm.json"), FARM).unwrap();
        let builder = DataLevelBuilder::new(registry()).with_dir(&dir);
        let level = pollster::block_on(builder.build("farm")).unwrap();
        assert_eq!(level.len(), 3);
        assert!(matches!(
            pollster::block_on(builder.build("cave")),
            Err(BuildError::Io { .. })
        ));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn invalid_params_name_the_controller() {
        let mut registry = ControllerRegistry::<2>::new();
        registry.register_params("speedy", |speed: f64| {
            assert!(speed > 0.0);
            Controller::new(Still)
        });
        assert!(registry.create("speedy", &serde_json::json!(2.5)).is_ok());
        let err = registry.create("speedy", &serde_json::json!("fast")).err().unwrap();
        assert!(matches!(err, BuildError::InvalidParams { ref name, .. } if name == "speedy"));
        assert_eq!(registry.names(), vec!["speedy"]);
    }

    #[test]
    fn closures_are_builders() {
        let builder = from_fn(|id: &str| Ok(Level::<2>::new(id, Aabb2::ZERO)));
        let level = pollster::block_on(builder.build("void")).unwrap();
        assert_eq!(level.id(), "void");
    }
}
