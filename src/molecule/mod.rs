//! Atom dataset: per-frame positions with frame-invariant radii and tags.
//!
//! The trajectory loader owns the data; classification borrows it for the
//! active frame.

pub mod lut;
pub mod trajectory;

pub use lut::AtomLut;
pub use trajectory::{AtomRecord, Trajectory};
