//! GPU resource management and the compute classification kernel.
//!
//! Provides headless wgpu device initialization, dynamic buffer management,
//! readback staging, shader composition and the surface-atom kernel.

/// Headless wgpu device and queue initialization.
pub mod compute_context;
/// Growable GPU buffers with automatic reallocation.
pub mod dynamic_buffer;
/// Per-trajectory radii, position and color storage buffers.
pub mod gpu_molecule;
/// Shared wgpu boilerplate helpers for compute pipelines.
pub mod pipeline_helpers;
/// Mappable staging buffers for reading kernel output.
pub mod readback;
/// WGSL shader composition with `#import` support via naga-oil.
pub mod shader_composer;
/// Surface classification compute kernel.
pub mod surface_kernel;

pub use compute_context::{ComputeContext, ComputeContextError};
pub use surface_kernel::GpuClassifier;
