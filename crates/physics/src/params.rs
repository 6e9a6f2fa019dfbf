//! The shared per-frame parameter block.
//!
//! One record is broadcast to every kernel invocation. The host overwrites it
//! in full before each dispatch; the kernel never sees a half-updated record.

use glam::Vec3;

use crate::types::Brush;

/// Brush-level scalars read by every bristle invocation.
///
/// Laid out as plain `f32`s so it can be committed to the device as one
/// contiguous record.
#[derive(Debug, Clone, Copy, PartialEq, Default, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct ComputeParameters {
    pub brush_position_x: f32,
    pub brush_position_y: f32,
    pub brush_position_z: f32,
    /// sin of the horizontal angle, precomputed host-side
    pub sin_horizontal_angle: f32,
    /// cos of the horizontal angle, precomputed host-side
    pub cos_horizontal_angle: f32,
    pub planar_distance_from_handle: f32,
    pub upper_control_point_length: f32,
    pub lower_control_point_length: f32,
}

impl ComputeParameters {
    /// Pack the current state of `brush`.
    pub fn from_brush(brush: &Brush) -> Self {
        let position = brush.position();
        let parameters = brush.bristle_parameters();
        let (sin, cos) = angle_terms(brush.horizontal_angle());

        Self {
            brush_position_x: position.x,
            brush_position_y: position.y,
            brush_position_z: position.z,
            sin_horizontal_angle: sin,
            cos_horizontal_angle: cos,
            planar_distance_from_handle: parameters.planar_distance_from_handle,
            upper_control_point_length: parameters.upper_control_point_length,
            lower_control_point_length: parameters.lower_control_point_length,
        }
    }

    /// Overwrite every field from the current state of `brush`.
    pub fn repack(&mut self, brush: &Brush) {
        *self = Self::from_brush(brush);
    }

    pub fn brush_position(&self) -> Vec3 {
        Vec3::new(
            self.brush_position_x,
            self.brush_position_y,
            self.brush_position_z,
        )
    }

    /// Unit direction in the paper plane that the bristle tips are dragged along.
    pub fn drag_direction(&self) -> Vec3 {
        Vec3::new(self.cos_horizontal_angle, self.sin_horizontal_angle, 0.0)
    }

    /// Rotate a brush-local point about +Z by the horizontal angle.
    pub fn rotate(&self, local: Vec3) -> Vec3 {
        let (sin, cos) = (self.sin_horizontal_angle, self.cos_horizontal_angle);
        Vec3::new(
            local.x * cos - local.y * sin,
            local.x * sin + local.y * cos,
            local.z,
        )
    }
}

/// sin and cos of an angle given in degrees.
///
/// Evaluated in f64 so 0 and multiples of 180 land exactly on 0 / ±1.
pub fn angle_terms(degrees: f32) -> (f32, f32) {
    let radians = (degrees as f64).to_radians();
    (radians.sin() as f32, radians.cos() as f32)
}
