//! Per-bristle bend kernel.
//!
//! Each bristle is modelled as a cubic Bézier from its root (where it meets
//! the handle) to its tip (resting on the paper). The curve is evaluated at
//! `segments + 1` evenly spaced parameters and written out as one
//! `(top, bottom)` point pair per segment.
//!
//! The kernel is a pure function of its inputs. It reads one bristle's anchors
//! and the shared parameter block and writes only that bristle's output slice,
//! so invocations can run in any order on any number of workers.
//!
//! ## Curve construction
//!
//! All points are built in a brush-aligned frame (rotated about +Z by the
//! horizontal angle) and translated by the brush position at the very end:
//!
//! - `p0` = rotated top anchor
//! - `p3` = rotated bottom anchor, dragged by `planar_distance_from_handle`
//!   along the drag direction `(cos, sin, 0)`
//! - `p1` = `p0` pulled down the bristle axis by the upper control length
//! - `p2` = `p3` pushed along the drag direction by the lower control length
//!
//! Control lengths are multiples of the base bristle length.

use glam::Vec3;

use crate::anchors::read_point;
use crate::params::ComputeParameters;

/// Floats per output point.
pub const POINT_FLOATS: usize = 3;

/// Floats per segment: a (top, bottom) point pair.
pub const SEGMENT_FLOATS: usize = 2 * POINT_FLOATS;

/// Cubic Bézier control polygon for one bristle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BristleCurve {
    pub root: Vec3,
    pub upper_control: Vec3,
    pub lower_control: Vec3,
    pub tip: Vec3,
}

impl BristleCurve {
    /// Build the curve for a bristle, in the brush-aligned frame (no translation).
    pub fn new(top: Vec3, bottom: Vec3, params: &ComputeParameters, base_length: f32) -> Self {
        let drag = params.drag_direction();
        let root = params.rotate(top);
        let rest = params.rotate(bottom);

        let axis = (root - rest).normalize_or_zero();
        let tip = rest + drag * params.planar_distance_from_handle;

        Self {
            root,
            upper_control: root - axis * (params.upper_control_point_length * base_length),
            lower_control: tip + drag * (params.lower_control_point_length * base_length),
            tip,
        }
    }

    /// Evaluate the curve at `t` in `[0, 1]`.
    ///
    /// Returns `root` exactly at `t = 0` and `tip` exactly at `t = 1`.
    pub fn evaluate(&self, t: f32) -> Vec3 {
        let u = 1.0 - t;
        let b0 = u * u * u;
        let b1 = 3.0 * u * u * t;
        let b2 = 3.0 * u * t * t;
        let b3 = t * t * t;
        self.root * b0 + self.upper_control * b1 + self.lower_control * b2 + self.tip * b3
    }
}

/// Everything a kernel invocation reads, bound once per dispatch.
#[derive(Debug, Clone, Copy)]
pub struct KernelBindings<'a> {
    pub top: &'a [f32],
    pub bottom: &'a [f32],
    pub params: &'a ComputeParameters,
    pub segments: usize,
    pub base_length: f32,
}

impl KernelBindings<'_> {
    /// Floats written per bristle.
    pub fn bristle_stride(&self) -> usize {
        SEGMENT_FLOATS * self.segments
    }

    /// Bend the bristle whose anchors start at `offset` and write its segments to `out`.
    ///
    /// Returns `false` if the anchors are out of range, `out` has the wrong
    /// length, or any produced coordinate is non-finite. `out` contents are
    /// unspecified in that case.
    pub fn invoke(&self, offset: usize, out: &mut [f32]) -> bool {
        let (Some(top), Some(bottom)) =
            (read_point(self.top, offset), read_point(self.bottom, offset))
        else {
            return false;
        };
        if out.len() != self.bristle_stride() {
            return false;
        }

        let curve = BristleCurve::new(top, bottom, self.params, self.base_length);
        let translation = self.params.brush_position();
        let step = 1.0 / self.segments as f32;

        let mut upper = curve.evaluate(0.0) + translation;
        for (segment, pair) in out.chunks_exact_mut(SEGMENT_FLOATS).enumerate() {
            let t = if segment + 1 == self.segments {
                1.0
            } else {
                (segment + 1) as f32 * step
            };
            let lower = curve.evaluate(t) + translation;

            pair[..POINT_FLOATS].copy_from_slice(&upper.to_array());
            pair[POINT_FLOATS..].copy_from_slice(&lower.to_array());
            upper = lower;
        }

        out.iter().all(|v| v.is_finite())
    }
}
