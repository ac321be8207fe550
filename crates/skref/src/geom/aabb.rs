//! # Aabb: N-Axis Boxes
//!
//! An [`Aabb`] is a position and a size per axis. All the per-axis logic is
//! written once over `[f64; N]`, so a 2D box and a 3D box share the exact
//! same overlap rule instead of each overriding it.
//!
//! ```text
//!   pos        far = pos + size
//!    │            │
//!    ▼            ▼
//!    ┌────────────┐
//!    │   size     │        one axis; repeated N times
//!    └────────────┘
//! ```
//!
//! ## Overlap rule
//!
//! Two boxes overlap unless one starts strictly after the other ends:
//!
//! ```text
//! !(a.pos > b.far || b.pos > a.far)      on every axis
//! ```
//!
//! Touching edges therefore count as overlapping. The collision resolver
//! relies on this: a mover resting against a wall still finds the wall as an
//! obstacle and cannot step into it.
//!
//! ## Displacements and distances
//!
//! A zero-size box doubles as a vector. Desired displacements,
//! [`Aabb::nearest_axis_distance`] results and offsets are all expressed this
//! way, and [`Aabb::translate`] adds another box's position.

use std::fmt;

use crate::math::{self, DVec2, DVec3, PRECISION};

/// Axis-aligned box over `N` axes.
///
/// Sizes must be non-negative; a negative size makes every overlap test
/// meaningless. Boxes are plain values: copying never aliases.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb<const N: usize> {
    pub position: [f64; N],
    pub size: [f64; N],
}

pub type Aabb1 = Aabb<1>;
pub type Aabb2 = Aabb<2>;
pub type Aabb3 = Aabb<3>;

impl<const N: usize> Aabb<N> {
    /// Zero-size box at the origin. Also the "no movement" displacement.
    pub const ZERO: Self = Self {
        position: [0.0; N],
        size: [0.0; N],
    };

    pub fn new(position: [f64; N], size: [f64; N]) -> Self {
        debug_assert!(
            size.iter().all(|s| *s >= 0.0),
            "Aabb sizes must be non-negative: {size:?}"
        );
        Self { position, size }
    }

    /// A zero-size box, used as a vector.
    pub fn point(position: [f64; N]) -> Self {
        Self {
            position,
            size: [0.0; N],
        }
    }

    /// Far edge on `axis`, snapped to [`PRECISION`].
    pub fn far_edge(&self, axis: usize) -> f64 {
        math::round_to(self.position[axis] + self.size[axis], PRECISION)
    }

    /// Far edges on every axis.
    pub fn far(&self) -> [f64; N] {
        std::array::from_fn(|axis| self.far_edge(axis))
    }

    /// Non-strict overlap test. Touching boxes overlap.
    pub fn overlaps(&self, other: &Aabb<N>) -> bool {
        (0..N).all(|axis| {
            !(self.position[axis] > other.far_edge(axis)
                || other.position[axis] > self.far_edge(axis))
        })
    }

    /// Same size, position offset by `other`'s position.
    pub fn translate(&self, other: &Aabb<N>) -> Self {
        Self {
            position: std::array::from_fn(|axis| self.position[axis] + other.position[axis]),
            size: self.size,
        }
    }

    /// Same size, position relative to `other`'s position.
    pub fn offset_from(&self, other: &Aabb<N>) -> Self {
        Self {
            position: std::array::from_fn(|axis| self.position[axis] - other.position[axis]),
            size: self.size,
        }
    }

    /// Signed gap to `other` per axis, as a zero-size box.
    ///
    /// Four candidate gaps are measured on each axis, in this order:
    /// near-near, far-far, near-far, far-near (always `self - other`). The
    /// one with the smallest magnitude wins; ties keep the earlier candidate.
    pub fn nearest_axis_distance(&self, other: &Aabb<N>) -> Self {
        Self::point(std::array::from_fn(|axis| {
            let near = self.position[axis];
            let far = self.far_edge(axis);
            let other_near = other.position[axis];
            let other_far = other.far_edge(axis);
            let candidates = [
                near - other_near,
                far - other_far,
                near - other_far,
                far - other_near,
            ];
            let mut best = candidates[0];
            for gap in &candidates[1..] {
                if gap.abs() < best.abs() {
                    best = *gap;
                }
            }
            math::round_to(best, PRECISION)
        }))
    }

    /// Snap position and size to `digits` decimal places.
    pub fn round(&self, digits: u32) -> Self {
        Self {
            position: self.position.map(|v| math::round_to(v, digits)),
            size: self.size.map(|v| math::round_to(v, digits)),
        }
    }

    /// Whether the position is the origin on every axis.
    pub fn is_zero(&self) -> bool {
        self.position.iter().all(|v| *v == 0.0)
    }

    /// Euclidean length of the position, for boxes used as vectors.
    pub fn hypot(&self) -> f64 {
        math::hypot(&self.position)
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &Aabb<N>) -> Self {
        let position: [f64; N] =
            std::array::from_fn(|axis| self.position[axis].min(other.position[axis]));
        let size = std::array::from_fn(|axis| {
            self.far_edge(axis).max(other.far_edge(axis)) - position[axis]
        });
        Self { position, size }
    }
}

impl<const N: usize> Default for Aabb<N> {
    fn default() -> Self {
        Self::ZERO
    }
}

impl<const N: usize> fmt::Display for Aabb<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}+{:?}", self.position, self.size)
    }
}

// ── Dimension-specific constructors ─────────────────────────────────────

impl Aabb<1> {
    pub fn from_x(x: f64, width: f64) -> Self {
        Self::new([x], [width])
    }
}

impl Aabb<2> {
    pub fn from_xy(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new([x, y], [width, height])
    }

    pub fn position_vec(&self) -> DVec2 {
        DVec2::from_array(self.position)
    }

    pub fn size_vec(&self) -> DVec2 {
        DVec2::from_array(self.size)
    }
}

impl Aabb<3> {
    pub fn from_xyz(position: DVec3, size: DVec3) -> Self {
        Self::new(position.to_array(), size.to_array())
    }

    pub fn position_vec(&self) -> DVec3 {
        DVec3::from_array(self.position)
    }

    pub fn size_vec(&self) -> DVec3 {
        DVec3::from_array(self.size)
    }
}

impl From<DVec2> for Aabb<2> {
    fn from(v: DVec2) -> Self {
        Self::point(v.to_array())
    }
}

impl From<DVec3> for Aabb<3> {
    fn from(v: DVec3) -> Self {
        Self::point(v.to_array())
    }
}
