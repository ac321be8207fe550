//! # Skref: Entity Stepping Kernel
//!
//! A small simulation kernel for tile-and-box games: positioned, sized
//! entities live in a [`Level`](level::Level), controllers move them once per
//! tick, and a clamping resolver keeps material entities from passing through
//! each other.
//!
//! ```text
//!  Engine ──tick(dt)──▶ WorldActivity ──registry order──▶ Controller
//!                             │                              │
//!                             │                    desired displacement
//!                             │                              ▼
//!                             │                     clamp vs obstacles
//!                             ▼                              │
//!                        LevelBuilder                 rect += displacement
//!                      (async, JSON data)                    │
//!                                                    collision callbacks
//! ```
//!
//! Geometry is one const-generic box type, [`Aabb<N>`](geom::Aabb), shared by
//! 1, 2 and 3 axis worlds. Time is a single simulation clock; every
//! controller receives the same `now` and derives its own `dt` from it, so a
//! run is reproducible given the same tick sequence.
//!
//! Start with `use skref::prelude::*`.

pub mod activity;
pub mod builder;
pub mod controller;
pub mod engine;
pub mod entity;
pub mod error;
pub mod geom;
pub mod input;
pub mod layer;
pub mod level;
pub mod looper;
pub mod math;
pub mod prelude;
pub mod time;
pub mod visualizer;
pub mod world;

#[cfg(feature = "diagnostics")]
pub mod diag;
