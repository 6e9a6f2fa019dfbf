//! Structure-of-arrays anchor buffers.
//!
//! Bristle anchors are flattened once, at pipeline construction, into two
//! contiguous `[x, y, z, x, y, z, ...]` arrays in bristle order so the kernel
//! never chases per-bristle pointers.

use glam::Vec3;

use crate::error::PhysicsError;
use crate::types::Bristle;

/// Floats per anchor point.
pub const ANCHOR_STRIDE: usize = 3;

/// Flattened top and bottom anchors for every bristle.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorBuffers {
    top: Vec<f32>,
    bottom: Vec<f32>,
}

impl AnchorBuffers {
    /// Flatten the anchors of `bristles` in index order.
    pub fn from_bristles(bristles: &[Bristle]) -> Result<Self, PhysicsError> {
        if bristles.is_empty() {
            return Err(PhysicsError::NoBristles);
        }

        let mut top = Vec::with_capacity(ANCHOR_STRIDE * bristles.len());
        let mut bottom = Vec::with_capacity(ANCHOR_STRIDE * bristles.len());

        for bristle in bristles {
            top.extend_from_slice(&bristle.top.to_array());
            bottom.extend_from_slice(&bristle.bottom.to_array());
        }

        Ok(Self { top, bottom })
    }

    /// Wrap already-flattened anchor arrays.
    ///
    /// Both arrays must hold the same number of whole points.
    pub fn from_flat(top: Vec<f32>, bottom: Vec<f32>) -> Result<Self, PhysicsError> {
        if top.len() != bottom.len() || top.len() % ANCHOR_STRIDE != 0 {
            return Err(PhysicsError::AnchorMismatch {
                top: top.len(),
                bottom: bottom.len(),
            });
        }
        if top.is_empty() {
            return Err(PhysicsError::NoBristles);
        }
        Ok(Self { top, bottom })
    }

    pub fn num_bristles(&self) -> usize {
        self.top.len() / ANCHOR_STRIDE
    }

    pub fn top(&self) -> &[f32] {
        &self.top
    }

    pub fn bottom(&self) -> &[f32] {
        &self.bottom
    }

    /// Top anchor of bristle `index`.
    pub fn top_point(&self, index: usize) -> Option<Vec3> {
        read_point(&self.top, index * ANCHOR_STRIDE)
    }

    /// Bottom anchor of bristle `index`.
    pub fn bottom_point(&self, index: usize) -> Option<Vec3> {
        read_point(&self.bottom, index * ANCHOR_STRIDE)
    }
}

/// Read the point starting at float `offset`.
pub fn read_point(data: &[f32], offset: usize) -> Option<Vec3> {
    data.get(offset..offset + ANCHOR_STRIDE).map(Vec3::from_slice)
}
