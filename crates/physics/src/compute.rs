//! Per-frame bristle physics dispatch.
//!
//! [`PhysicsCompute`] owns every buffer the kernel touches. All of them are
//! allocated once in [`PhysicsCompute::new`]; each frame then runs:
//!
//! 1. Repack the brush pose into the host parameter record
//! 2. Commit the record to the device in one copy
//! 3. Run the kernel over the index table, one task per bristle
//! 4. Wait for every task (the only synchronization point)
//! 5. Download the device output into the host vertex buffer
//!
//! The host buffer keeps the last successful frame. A failed frame returns an
//! error and leaves it untouched, so the renderer can keep drawing it.

use fastbrush_config::PhysicsConfig;
use rayon::prelude::*;
use tracing::{debug, error, info, trace, warn};

use crate::anchors::{ANCHOR_STRIDE, AnchorBuffers};
use crate::device::{ComputeDevice, DeviceBuffer};
use crate::error::PhysicsError;
use crate::index::IndexTable;
use crate::kernel::KernelBindings;
use crate::layout::VertexLayout;
use crate::params::ComputeParameters;
use crate::types::Brush;

/// Bristle physics pipeline for one brush.
///
/// Bristle anchors and the segment count are fixed at construction. Only the
/// brush position, angle and bristle parameters are re-read every frame.
///
/// Taking `&mut self` in [`compute_vertex_data`](Self::compute_vertex_data)
/// rules out concurrent dispatches on the same pipeline.
#[derive(Debug)]
pub struct PhysicsCompute {
    /// Worker pool; `None` once destroyed
    device: Option<ComputeDevice>,
    in_bristle_indices: DeviceBuffer<u32>,
    in_top: DeviceBuffer<f32>,
    in_bottom: DeviceBuffer<f32>,
    out_positions: DeviceBuffer<f32>,
    /// Single-record parameter block on the device
    compute_parameters: DeviceBuffer<ComputeParameters>,
    /// Host copy of the parameter block, repacked each frame
    parameters: ComputeParameters,
    index_table: IndexTable,
    layout: VertexLayout,
    base_length: f32,
    /// Host-visible output, overwritten by each successful frame
    out: Vec<f32>,
    /// Whether `out` holds a computed frame yet
    has_frame: bool,
}

impl PhysicsCompute {
    /// Build a pipeline for `brush`.
    ///
    /// Fails without producing a pipeline if the brush has no bristles, the
    /// config is invalid, or a buffer cannot be allocated.
    pub fn new(brush: &Brush, config: &PhysicsConfig) -> Result<Self, PhysicsError> {
        config.validate()?;
        let anchors = AnchorBuffers::from_bristles(brush.bristles())?;
        Self::from_anchors(&anchors, config)
    }

    /// Build a pipeline from already-flattened anchors.
    pub fn from_anchors(
        anchors: &AnchorBuffers,
        config: &PhysicsConfig,
    ) -> Result<Self, PhysicsError> {
        config.validate()?;

        let num_bristles = anchors.num_bristles();
        if num_bristles == 0 {
            return Err(PhysicsError::NoBristles);
        }
        let layout = VertexLayout::new(num_bristles, config.segments());
        let index_table = IndexTable::new(num_bristles)?;

        let device = ComputeDevice::new(config.worker_threads)?;

        let mut in_bristle_indices = device.alloc("in_bristle_indices", num_bristles)?;
        in_bristle_indices.copy_from(index_table.as_slice())?;

        let mut in_top = device.alloc("in_top", anchors.top().len())?;
        let mut in_bottom = device.alloc("in_bottom", anchors.bottom().len())?;
        in_top.copy_from(anchors.top())?;
        in_bottom.copy_from(anchors.bottom())?;

        let out_positions = device.alloc("out_positions", layout.len())?;
        let compute_parameters = device.alloc("compute_parameters", 1)?;
        let out = host_buffer("out", layout.len())?;

        info!(
            "PhysicsCompute: {} bristles × {} segments ({} floats) on {} workers",
            num_bristles,
            layout.num_segments,
            layout.len(),
            device.num_threads()
        );

        Ok(Self {
            device: Some(device),
            in_bristle_indices,
            in_top,
            in_bottom,
            out_positions,
            compute_parameters,
            parameters: ComputeParameters::default(),
            index_table,
            layout,
            base_length: config.bristle_base_length,
            out,
            has_frame: false,
        })
    }

    /// Compute this frame's bristle geometry from the current brush pose.
    ///
    /// The returned slice is owned by the pipeline and overwritten by the
    /// next successful call. On error no new frame is available and the
    /// previous one stays readable through [`vertex_data`](Self::vertex_data).
    ///
    /// Only the pose and bristle parameters of `brush` are read. Its anchors
    /// must be the ones the pipeline was built from; rebuild the pipeline if
    /// they change. Debug builds assert this.
    pub fn compute_vertex_data(&mut self, brush: &Brush) -> Result<&[f32], PhysicsError> {
        let Some(device) = self.device.as_ref() else {
            error!("compute_vertex_data called after destroy()");
            return Err(PhysicsError::Destroyed);
        };

        if brush.num_bristles() != self.layout.num_bristles {
            warn!(
                "Brush has {} bristles, pipeline expects {}",
                brush.num_bristles(),
                self.layout.num_bristles
            );
            return Err(PhysicsError::BristleCountChanged {
                expected: self.layout.num_bristles,
                actual: brush.num_bristles(),
            });
        }
        debug_assert!(
            self.anchors_match(brush),
            "brush anchors differ from the ones the pipeline was built with"
        );

        // Set all parameters, then commit them as one record
        self.parameters.repack(brush);
        let record = std::slice::from_ref(&self.parameters);
        self.compute_parameters.copy_from(record)?;
        debug!("compute_vertex_data: parameters {:?}", self.parameters);

        let Some(params) = self.compute_parameters.as_slice().first() else {
            return Err(PhysicsError::Destroyed);
        };
        let bindings = KernelBindings {
            top: self.in_top.as_slice(),
            bottom: self.in_bottom.as_slice(),
            params,
            segments: self.layout.num_segments,
            base_length: self.base_length,
        };
        let stride = bindings.bristle_stride();
        let indices = self.in_bristle_indices.as_slice();
        let out_positions = self.out_positions.as_mut_slice();

        // Dispatch returns only once every bristle task has finished
        let outcome = device.dispatch_catching(|| {
            out_positions
                .par_chunks_mut(stride)
                .zip(indices.par_iter())
                .enumerate()
                .try_for_each(|(bristle, (region, &offset))| {
                    if bindings.invoke(offset as usize, region) {
                        Ok(())
                    } else {
                        Err(PhysicsError::KernelFault { bristle })
                    }
                })
        });

        if let Err(e) = outcome.and_then(|frame| frame) {
            error!("compute_vertex_data: frame dropped: {}", e);
            return Err(e);
        }

        self.out_positions.copy_to(&mut self.out)?;
        self.has_frame = true;
        trace!("compute_vertex_data: downloaded {} floats", self.out.len());
        Ok(self.out.as_slice())
    }

    /// The last successfully computed frame.
    ///
    /// `None` until a frame has succeeded, and after destroy.
    pub fn vertex_data(&self) -> Option<&[f32]> {
        if self.device.is_none() || !self.has_frame {
            return None;
        }
        Some(self.out.as_slice())
    }

    /// The last successfully computed frame as raw bytes for GPU upload.
    pub fn vertex_bytes(&self) -> Option<&[u8]> {
        self.vertex_data().map(bytemuck::cast_slice)
    }

    /// Release every device buffer and the worker pool.
    ///
    /// Calling this more than once is harmless. Any later
    /// [`compute_vertex_data`](Self::compute_vertex_data) call returns
    /// [`PhysicsError::Destroyed`].
    pub fn destroy(&mut self) {
        if !self.release() {
            debug!("PhysicsCompute: destroy() called on destroyed pipeline");
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.device.is_none()
    }

    pub fn layout(&self) -> VertexLayout {
        self.layout
    }

    pub fn num_bristles(&self) -> usize {
        self.layout.num_bristles
    }

    pub fn num_segments(&self) -> usize {
        self.layout.num_segments
    }

    pub fn index_table(&self) -> &IndexTable {
        &self.index_table
    }

    /// Parameter record used by the most recent dispatch.
    pub fn parameters(&self) -> &ComputeParameters {
        &self.parameters
    }

    fn anchors_match(&self, brush: &Brush) -> bool {
        let top = self.in_top.as_slice().chunks_exact(ANCHOR_STRIDE);
        let bottom = self.in_bottom.as_slice().chunks_exact(ANCHOR_STRIDE);
        brush
            .bristles()
            .iter()
            .zip(top.zip(bottom))
            .all(|(b, (t, u))| b.top.to_array() == t && b.bottom.to_array() == u)
    }

    /// Returns false if the pipeline was already released.
    fn release(&mut self) -> bool {
        let Some(device) = self.device.take() else {
            return false;
        };

        self.in_bristle_indices.release();
        self.in_top.release();
        self.in_bottom.release();
        self.out_positions.release();
        self.compute_parameters.release();
        self.out = Vec::new();
        self.has_frame = false;
        drop(device);

        info!(
            "PhysicsCompute: released {} bristles × {} segments",
            self.layout.num_bristles, self.layout.num_segments
        );
        true
    }
}

impl Drop for PhysicsCompute {
    fn drop(&mut self) {
        self.release();
    }
}

fn host_buffer(name: &'static str, len: usize) -> Result<Vec<f32>, PhysicsError> {
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| PhysicsError::Allocation { buffer: name, len })?;
    data.resize(len, 0.0);
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Bristle, BristleParameters};
    use glam::Vec3;

    fn config(segments: u32) -> PhysicsConfig {
        PhysicsConfig {
            segments_per_bristle: segments,
            worker_threads: Some(2),
            ..Default::default()
        }
    }

    /// Bristles scattered around the handle, bent by non-trivial parameters.
    fn test_brush(num_bristles: usize) -> Brush {
        let bristles = (0..num_bristles)
            .map(|i| {
                let angle = i as f32 * 0.7;
                let radius = 0.1 + 0.05 * (i % 3) as f32;
                let base = Vec3::new(radius * angle.cos(), radius * angle.sin(), 0.0);
                Bristle::new(base + Vec3::Z, base)
            })
            .collect();

        let mut brush = Brush::new(bristles);
        brush.set_bristle_parameters(BristleParameters::new(0.3, 0.4, 0.2));
        brush
    }

    fn assert_close(a: &[f32], b: &[f32], eps: f32) {
        assert_eq!(a.len(), b.len());
        for (i, (x, y)) in a.iter().zip(b).enumerate() {
            assert!((x - y).abs() <= eps, "index {i}: {x} vs {y}");
        }
    }

    #[test]
    fn test_two_straight_bristles() {
        let bristles = vec![Bristle::new(Vec3::Z, Vec3::ZERO); 2];
        let brush = Brush::new(bristles);
        let mut compute = PhysicsCompute::new(&brush, &config(1)).unwrap();

        let out = compute.compute_vertex_data(&brush).unwrap();
        assert_eq!(out.len(), 12);
        assert_eq!(&out[0..3], &[0.0, 0.0, 1.0]);
        assert_eq!(&out[3..6], &[0.0, 0.0, 0.0]);
        assert_eq!(&out[6..9], &[0.0, 0.0, 1.0]);
        assert_eq!(&out[9..12], &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_output_shape() {
        for (bristles, segments) in [(1, 1), (3, 4), (17, 8), (64, 2)] {
            let brush = test_brush(bristles);
            let mut compute = PhysicsCompute::new(&brush, &config(segments)).unwrap();
            let expected = compute.layout().len();
            let out = compute.compute_vertex_data(&brush).unwrap();
            assert_eq!(out.len(), 3 * 2 * segments as usize * bristles);
            assert_eq!(out.len(), expected);
        }
    }

    #[test]
    fn test_index_table_offsets() {
        let brush = test_brush(9);
        let compute = PhysicsCompute::new(&brush, &config(3)).unwrap();
        let table = compute.index_table();
        assert_eq!(table.len(), 9);
        for i in 0..9 {
            assert_eq!(table.get(i), Some(i * 3));
        }
    }

    #[test]
    fn test_repeated_frames_are_identical() {
        let mut brush = test_brush(32);
        brush.set_position(Vec3::new(0.5, -1.0, 2.0));
        brush.set_horizontal_angle(37.0);

        let mut compute = PhysicsCompute::new(&brush, &config(6)).unwrap();
        let first = compute.compute_vertex_data(&brush).unwrap().to_vec();
        let second = compute.compute_vertex_data(&brush).unwrap().to_vec();
        assert_eq!(first, second);
    }

    #[test]
    fn test_worker_count_does_not_change_output() {
        let mut brush = test_brush(50);
        brush.set_horizontal_angle(-20.0);

        let mut single = PhysicsCompute::new(
            &brush,
            &PhysicsConfig {
                worker_threads: Some(1),
                ..config(5)
            },
        )
        .unwrap();
        let mut many = PhysicsCompute::new(
            &brush,
            &PhysicsConfig {
                worker_threads: Some(4),
                ..config(5)
            },
        )
        .unwrap();

        let a = single.compute_vertex_data(&brush).unwrap().to_vec();
        let b = many.compute_vertex_data(&brush).unwrap().to_vec();
        assert_eq!(a, b);
    }

    #[test]
    fn test_translation_shifts_every_point() {
        let mut brush = test_brush(12);
        brush.set_horizontal_angle(30.0);
        let mut compute = PhysicsCompute::new(&brush, &config(4)).unwrap();
        let base = compute.compute_vertex_data(&brush).unwrap().to_vec();

        let d = Vec3::new(1.5, -2.0, 0.25);
        brush.set_position(d);
        let moved = compute.compute_vertex_data(&brush).unwrap().to_vec();

        let expected: Vec<f32> = base
            .chunks_exact(3)
            .flat_map(|p| (Vec3::from_slice(p) + d).to_array())
            .collect();
        assert_close(&moved, &expected, 1e-5);
    }

    #[test]
    fn test_rotation_keeps_bend_shape() {
        let mut brush = test_brush(8);
        let mut compute = PhysicsCompute::new(&brush, &config(4)).unwrap();
        let base = compute.compute_vertex_data(&brush).unwrap().to_vec();

        brush.set_horizontal_angle(90.0);
        let turned = compute.compute_vertex_data(&brush).unwrap().to_vec();

        // Quarter turn about +Z maps (x, y, z) to (-y, x, z)
        let expected: Vec<f32> = base
            .chunks_exact(3)
            .flat_map(|p| [-p[1], p[0], p[2]])
            .collect();
        assert_close(&turned, &expected, 1e-5);
    }

    #[test]
    fn test_zero_angle_uses_unrotated_frame() {
        let bristles = vec![Bristle::new(Vec3::Z, Vec3::ZERO)];
        let mut brush = Brush::new(bristles);
        brush.set_bristle_parameters(BristleParameters::new(0.5, 0.0, 0.0));
        let mut compute = PhysicsCompute::new(&brush, &config(2)).unwrap();

        let out = compute.compute_vertex_data(&brush).unwrap().to_vec();
        assert_eq!(compute.parameters().sin_horizontal_angle, 0.0);
        assert_eq!(compute.parameters().cos_horizontal_angle, 1.0);

        // Tip is dragged along +X only
        let (root, tip) = compute.layout().endpoints(&out, 0).unwrap();
        assert_eq!(root, Vec3::Z);
        assert!(tip.abs_diff_eq(Vec3::new(0.5, 0.0, 0.0), 1e-6));
    }

    #[test]
    fn test_output_buffer_is_reused() {
        let mut brush = test_brush(4);
        let mut compute = PhysicsCompute::new(&brush, &config(3)).unwrap();
        let first = compute.compute_vertex_data(&brush).unwrap().as_ptr();
        brush.set_position(Vec3::ONE);
        let second = compute.compute_vertex_data(&brush).unwrap().as_ptr();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_brush_rejected() {
        let brush = Brush::new(Vec::new());
        let err = PhysicsCompute::new(&brush, &config(4)).unwrap_err();
        assert!(matches!(err, PhysicsError::NoBristles));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_zero_segments_rejected() {
        let brush = test_brush(3);
        let err = PhysicsCompute::new(&brush, &config(0)).unwrap_err();
        assert!(matches!(err, PhysicsError::InvalidSegmentCount(0)));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_mismatched_anchors_rejected() {
        let err = AnchorBuffers::from_flat(vec![0.0; 6], vec![0.0; 9]).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_changed_bristle_count_rejected() {
        let brush = test_brush(3);
        let mut compute = PhysicsCompute::new(&brush, &config(2)).unwrap();
        let err = compute.compute_vertex_data(&test_brush(4)).unwrap_err();
        assert!(matches!(
            err,
            PhysicsError::BristleCountChanged {
                expected: 3,
                actual: 4
            }
        ));
    }

    #[test]
    fn test_faulted_frame_keeps_previous_output() {
        let mut brush = test_brush(6);
        let mut compute = PhysicsCompute::new(&brush, &config(3)).unwrap();
        let good = compute.compute_vertex_data(&brush).unwrap().to_vec();

        brush.set_position(Vec3::new(f32::NAN, 0.0, 0.0));
        let err = compute.compute_vertex_data(&brush).unwrap_err();
        assert!(matches!(err, PhysicsError::KernelFault { .. }));
        assert_eq!(compute.vertex_data().unwrap(), good.as_slice());

        // Recovers on the next valid frame
        brush.set_position(Vec3::ZERO);
        assert_eq!(compute.compute_vertex_data(&brush).unwrap(), good.as_slice());
    }

    #[test]
    fn test_compute_after_destroy_fails() {
        let brush = test_brush(2);
        let mut compute = PhysicsCompute::new(&brush, &config(2)).unwrap();
        compute.compute_vertex_data(&brush).unwrap();

        compute.destroy();
        assert!(compute.is_destroyed());
        assert!(matches!(
            compute.compute_vertex_data(&brush),
            Err(PhysicsError::Destroyed)
        ));
        assert!(compute.vertex_data().is_none());
        assert!(compute.vertex_bytes().is_none());
    }

    #[test]
    fn test_destroy_twice_is_safe() {
        let brush = test_brush(2);
        let mut compute = PhysicsCompute::new(&brush, &config(2)).unwrap();
        compute.destroy();
        compute.destroy();
        assert!(compute.is_destroyed());
    }

    #[test]
    fn test_vertex_bytes_cover_output() {
        let brush = test_brush(3);
        let mut compute = PhysicsCompute::new(&brush, &config(2)).unwrap();
        compute.compute_vertex_data(&brush).unwrap();
        let bytes = compute.vertex_bytes().unwrap();
        assert_eq!(bytes.len(), compute.layout().len() * std::mem::size_of::<f32>());
    }

    #[test]
    fn test_no_frame_before_first_success() {
        let mut brush = test_brush(4);
        let mut compute = PhysicsCompute::new(&brush, &config(2)).unwrap();
        assert!(compute.vertex_data().is_none());

        brush.set_position(Vec3::new(f32::NAN, 0.0, 0.0));
        let err = compute.compute_vertex_data(&brush).unwrap_err();
        assert!(matches!(err, PhysicsError::KernelFault { .. }));
        assert!(compute.vertex_data().is_none());
        assert!(compute.vertex_bytes().is_none());

        brush.set_position(Vec3::ZERO);
        compute.compute_vertex_data(&brush).unwrap();
        assert_eq!(compute.vertex_data().unwrap().len(), compute.layout().len());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "brush anchors differ")]
    fn test_swapped_anchors_caught_in_debug() {
        let brush = test_brush(3);
        let mut compute = PhysicsCompute::new(&brush, &config(2)).unwrap();

        let other = Brush::new(vec![Bristle::new(Vec3::X, Vec3::ZERO); 3]);
        let _ = compute.compute_vertex_data(&other);
    }
}
