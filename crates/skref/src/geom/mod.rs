//! Axis-aligned box geometry.
//!
//! - [`Aabb<N>`]: one box over `N` axes (1, 2 or 3 in practice).
//! - [`CompositeAabb<N>`]: several boxes with a cached bounding box.
//! - [`Shape<N>`]: either of the above, used for collision.

mod aabb;
mod composite;

pub use aabb::{Aabb, Aabb1, Aabb2, Aabb3};
pub use composite::{CompositeAabb, Shape};
