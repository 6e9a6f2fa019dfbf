//! Error types for the bristle physics pipeline.

use fastbrush_config::ConfigIssue;
use thiserror::Error;

/// Errors that can occur while building or running the physics pipeline.
#[derive(Debug, Error)]
pub enum PhysicsError {
    #[error("Brush has no bristles")]
    NoBristles,

    #[error("Too many bristles for 32-bit anchor offsets: {0}")]
    TooManyBristles(usize),

    #[error("Invalid segment count: {0}")]
    InvalidSegmentCount(u32),

    #[error("Invalid bristle base length: {0}")]
    InvalidBaseLength(f32),

    #[error("Invalid worker thread count: 0")]
    InvalidWorkerCount,

    #[error("Anchor arrays disagree: top has {top} floats, bottom has {bottom}")]
    AnchorMismatch { top: usize, bottom: usize },

    #[error("Brush has {actual} bristles, pipeline was built for {expected}")]
    BristleCountChanged { expected: usize, actual: usize },

    #[error("Failed to allocate device buffer '{buffer}' of {len} elements")]
    Allocation { buffer: &'static str, len: usize },

    #[error("Device buffer '{buffer}' holds {expected} elements, got {actual}")]
    BufferSize {
        buffer: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Failed to start compute workers: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Pipeline used after destroy()")]
    Destroyed,

    #[error("Kernel produced non-finite geometry for bristle {bristle}")]
    KernelFault { bristle: usize },

    #[error("Kernel panicked: {0}")]
    KernelPanic(String),
}

impl From<ConfigIssue> for PhysicsError {
    fn from(issue: ConfigIssue) -> Self {
        match issue {
            ConfigIssue::ZeroSegments => PhysicsError::InvalidSegmentCount(0),
            ConfigIssue::BaseLength(length) => PhysicsError::InvalidBaseLength(length),
            ConfigIssue::ZeroWorkers => PhysicsError::InvalidWorkerCount,
        }
    }
}

impl PhysicsError {
    /// Whether this error was caused by bad pipeline configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            PhysicsError::NoBristles
                | PhysicsError::TooManyBristles(_)
                | PhysicsError::InvalidSegmentCount(_)
                | PhysicsError::InvalidBaseLength(_)
                | PhysicsError::InvalidWorkerCount
                | PhysicsError::AnchorMismatch { .. }
                | PhysicsError::BristleCountChanged { .. }
        )
    }
}
