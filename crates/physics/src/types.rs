//! Brush and bristle input types.
//!
//! These are read-only snapshots as far as the physics pipeline is concerned:
//! bristle anchors are captured once at construction, while the brush pose and
//! bristle parameters are re-read every frame.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// A single bristle, anchored in brush-local space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bristle {
    /// Anchor where the bristle meets the handle
    pub top: Vec3,
    /// Anchor at the free end of the unbent bristle
    pub bottom: Vec3,
}

impl Bristle {
    /// Create a bristle from its two anchors.
    pub fn new(top: Vec3, bottom: Vec3) -> Self {
        Self { top, bottom }
    }

    /// Unbent length of the bristle.
    pub fn length(&self) -> f32 {
        self.top.distance(self.bottom)
    }
}

/// Bend configuration shared by every bristle of a brush.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BristleParameters {
    /// How far the bristle tips are dragged in the paper plane, away from the handle
    pub planar_distance_from_handle: f32,
    /// Length of the control arm leaving the bristle root (× base length)
    pub upper_control_point_length: f32,
    /// Length of the control arm arriving at the bristle tip (× base length)
    pub lower_control_point_length: f32,
}

impl BristleParameters {
    /// Create a parameter set.
    pub fn new(
        planar_distance_from_handle: f32,
        upper_control_point_length: f32,
        lower_control_point_length: f32,
    ) -> Self {
        Self {
            planar_distance_from_handle,
            upper_control_point_length,
            lower_control_point_length,
        }
    }
}

/// A brush: an ordered, fixed set of bristles plus a mutable pose.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Brush {
    bristles: Vec<Bristle>,
    position: Vec3,
    /// Horizontal angle in degrees
    horizontal_angle: f32,
    bristle_parameters: BristleParameters,
}

impl Brush {
    /// Create a brush at the origin with zero angle and default parameters.
    pub fn new(bristles: Vec<Bristle>) -> Self {
        Self {
            bristles,
            position: Vec3::ZERO,
            horizontal_angle: 0.0,
            bristle_parameters: BristleParameters::default(),
        }
    }

    /// The bristles, in index order.
    pub fn bristles(&self) -> &[Bristle] {
        &self.bristles
    }

    /// Number of bristles.
    pub fn num_bristles(&self) -> usize {
        self.bristles.len()
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Horizontal angle in degrees.
    pub fn horizontal_angle(&self) -> f32 {
        self.horizontal_angle
    }

    pub fn set_horizontal_angle(&mut self, degrees: f32) {
        self.horizontal_angle = degrees;
    }

    pub fn bristle_parameters(&self) -> &BristleParameters {
        &self.bristle_parameters
    }

    pub fn set_bristle_parameters(&mut self, parameters: BristleParameters) {
        self.bristle_parameters = parameters;
    }
}
