//! Spatial neighbor index, rebuilt whenever frame, active set or probe
//! radius changes.

pub mod grid;

pub use grid::{GpuGridLayout, NeighborGrid};
