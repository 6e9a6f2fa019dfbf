//! Layout of the flat vertex buffer handed to the renderer.
//!
//! Order is bristle-major, then segment, then (top, bottom), then (x, y, z):
//! segment 0 of bristle 0 occupies the first 6 floats.

use glam::Vec3;

use crate::anchors::read_point;
use crate::kernel::{POINT_FLOATS, SEGMENT_FLOATS};

/// Shape of a vertex buffer produced by the physics pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexLayout {
    pub num_bristles: usize,
    pub num_segments: usize,
}

impl VertexLayout {
    pub fn new(num_bristles: usize, num_segments: usize) -> Self {
        Self {
            num_bristles,
            num_segments,
        }
    }

    /// Total floats: `3 * 2 * num_segments * num_bristles`.
    pub fn len(&self) -> usize {
        self.bristle_stride() * self.num_bristles
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Floats per bristle.
    pub fn bristle_stride(&self) -> usize {
        SEGMENT_FLOATS * self.num_segments
    }

    /// Number of points (two per segment).
    pub fn num_points(&self) -> usize {
        self.len() / POINT_FLOATS
    }

    /// Float offset of a segment's top point.
    pub fn segment_offset(&self, bristle: usize, segment: usize) -> Option<usize> {
        if bristle >= self.num_bristles || segment >= self.num_segments {
            return None;
        }
        Some(bristle * self.bristle_stride() + segment * SEGMENT_FLOATS)
    }

    /// Read the (top, bottom) points of one segment from `data`.
    pub fn segment(&self, data: &[f32], bristle: usize, segment: usize) -> Option<(Vec3, Vec3)> {
        let offset = self.segment_offset(bristle, segment)?;
        let top = read_point(data, offset)?;
        let bottom = read_point(data, offset + POINT_FLOATS)?;
        Some((top, bottom))
    }

    /// Root and tip of a bristle: top of its first segment, bottom of its last.
    pub fn endpoints(&self, data: &[f32], bristle: usize) -> Option<(Vec3, Vec3)> {
        let (root, _) = self.segment(data, bristle, 0)?;
        let (_, tip) = self.segment(data, bristle, self.num_segments.checked_sub(1)?)?;
        Some((root, tip))
    }
}
