//! Bristle physics for fastbrush.
//!
//! This crate computes, every frame, the bent geometry of every bristle in a
//! brush and hands the renderer one flat vertex buffer:
//! - Anchor points are flattened once into structure-of-arrays buffers
//! - Brush-level parameters are repacked into a single shared record per frame
//! - A data-parallel kernel bends each bristle independently
//! - Results are gathered into a fixed-size output buffer
//!
//! # Architecture
//!
//! ```text
//! Brush ──repack──▶ ComputeParameters ──commit──▶ device
//!                                                   │
//! AnchorBuffers + IndexTable ──(built once)──▶ device
//!                                                   │
//!                               parallel-for over bristles (rayon)
//!                                                   │
//!                              barrier ──download──▶ &[f32] for renderer
//! ```
//!
//! ## Key Components
//!
//! - **Types**: Bristle, Brush and BristleParameters inputs
//! - **Anchors**: Flattened top/bottom anchor arrays
//! - **Index**: Per-bristle offsets into the anchor arrays
//! - **Params**: The shared per-frame parameter block
//! - **Kernel**: The per-bristle Bézier bend
//! - **Device**: Buffers and worker pool standing in for a compute device
//! - **Compute**: Dispatch and teardown
//! - **Layout**: Reading the flat output buffer back as points

pub mod anchors;
pub mod compute;
pub mod device;
pub mod error;
pub mod index;
pub mod kernel;
pub mod layout;
pub mod params;
pub mod types;

pub use anchors::AnchorBuffers;
pub use compute::PhysicsCompute;
pub use error::PhysicsError;
pub use index::IndexTable;
pub use layout::VertexLayout;
pub use params::ComputeParameters;
pub use types::{Bristle, BristleParameters, Brush};

pub use fastbrush_config::PhysicsConfig;
