//! Error types.
//!
//! Lifecycle misuse and per-entity failures are [`ControllerError`]s and are
//! contained by the world loop. [`LevelError::MissingPlayer`] and
//! [`BuildError`]s are content bugs: they reach the caller and are expected
//! to stop the game.

use std::path::PathBuf;

use thiserror::Error;

use crate::entity::EntityId;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("controller is already attached")]
    AlreadyAttached,
    /// Expected while a level is being torn down; the world loop logs it and
    /// skips the entity.
    #[error("controller is not attached")]
    NotAttached,
    #[error("controller has finished")]
    Finished,
    #[error("entity {0} is no longer in the level")]
    EntityGone(EntityId),
    #[error(transparent)]
    Level(#[from] LevelError),
    #[error("{0}")]
    Failed(String),
}

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("level has no player entity")]
    MissingPlayer,
    #[error("entity {0} is not in the level")]
    UnknownEntity(EntityId),
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("entity controller \"{0}\" not found")]
    UnknownBehaviorReference(String),
    #[error("unknown physics layer \"{0}\"")]
    UnknownLayer(String),
    #[error("no source for level \"{0}\"")]
    UnknownLevel(String),
    #[error("expected {expected} axes, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("negative size {0:?}")]
    NegativeSize(Vec<f64>),
    #[error("invalid params for controller \"{name}\": {source}")]
    InvalidParams {
        name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("malformed level data: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
