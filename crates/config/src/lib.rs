//! Shared configuration for fastbrush
//!
//! This crate is the single source of truth for the pipeline-wide constants
//! of the bristle physics system: how many segments each bristle is split
//! into, the base bristle length, and how many worker threads the compute
//! backend may use.

use serde::{Deserialize, Serialize};

#[cfg(feature = "bevy")]
use bevy::prelude::Resource;

/// Default number of segments each bristle curve is split into
pub const DEFAULT_SEGMENTS_PER_BRISTLE: u32 = 8;

/// Default bristle length in brush-local units
pub const DEFAULT_BRISTLE_BASE_LENGTH: f32 = 1.0;

/// Why a [`PhysicsConfig`] was rejected
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigIssue {
    /// Segment count must be at least 1
    ZeroSegments,
    /// Base length must be finite and positive
    BaseLength(f32),
    /// Worker thread count must be at least 1 when set
    ZeroWorkers,
}

/// Configuration for the bristle physics pipeline
///
/// The segment count and base length are fixed for the lifetime of a
/// pipeline built from this config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "bevy", derive(Resource))]
#[serde(default)]
pub struct PhysicsConfig {
    /// Number of segments per bristle curve
    pub segments_per_bristle: u32,
    /// Base bristle length, scales the control point lengths
    pub bristle_base_length: f32,
    /// Worker threads for the compute backend (None = backend default)
    pub worker_threads: Option<usize>,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            segments_per_bristle: DEFAULT_SEGMENTS_PER_BRISTLE,
            bristle_base_length: DEFAULT_BRISTLE_BASE_LENGTH,
            worker_threads: None,
        }
    }
}

impl PhysicsConfig {
    /// Create a config with the given segment count and default base length
    pub fn with_segments(segments_per_bristle: u32) -> Self {
        Self {
            segments_per_bristle,
            ..Default::default()
        }
    }

    /// Check that the config can build a pipeline
    pub fn validate(&self) -> Result<(), ConfigIssue> {
        if self.segments_per_bristle == 0 {
            return Err(ConfigIssue::ZeroSegments);
        }
        if !self.bristle_base_length.is_finite() || self.bristle_base_length <= 0.0 {
            return Err(ConfigIssue::BaseLength(self.bristle_base_length));
        }
        if self.worker_threads == Some(0) {
            return Err(ConfigIssue::ZeroWorkers);
        }
        Ok(())
    }

    /// Segment count as usize for buffer sizing
    pub fn segments(&self) -> usize {
        self.segments_per_bristle as usize
    }
}
