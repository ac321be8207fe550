//! Numeric helpers and glam re-exports.
//!
//! Positions are `f64` throughout. Repeated additive translation drifts, so
//! every box is snapped to [`PRECISION`] decimal places after it moves, and
//! per-tick speeds are snapped to [`SPEED_PRECISION`] so movers sharing a
//! nominal speed cover identical distances.

pub use glam::{DVec2, DVec3};

/// Decimal places kept on box positions and sizes.
pub const PRECISION: u32 = 8;

/// Decimal places kept on per-tick travel distances.
pub const SPEED_PRECISION: u32 = 3;

/// Nudge applied before rounding so values like `1.005` round up as written.
const ROUND_EPSILON: f64 = f64::EPSILON;

/// Round `value` to `digits` decimal places, half away from zero.
pub fn round_to(value: f64, digits: u32) -> f64 {
    let scale = 10f64.powi(digits as i32);
    let nudged = value + ROUND_EPSILON.copysign(value);
    (nudged * scale).round() / scale
}

/// Euclidean length of a per-axis vector.
pub fn hypot<const N: usize>(axes: &[f64; N]) -> f64 {
    axes.iter().map(|v| v * v).sum::<f64>().sqrt()
}
