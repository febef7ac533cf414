//! Crate-level error types.

use std::fmt;

use crate::gpu::compute_context::ComputeContextError;

/// Errors produced by the surfdyn crate.
#[derive(Debug)]
pub enum SurfaceError {
    /// Probe radius is negative or not finite.
    InvalidProbeRadius(f32),
    /// Direction sample count must be at least one.
    InvalidSampleCount(u32),
    /// Requested frame lies outside the trajectory.
    FrameOutOfRange {
        /// Requested frame index.
        frame: usize,
        /// Number of frames in the trajectory.
        frame_count: usize,
    },
    /// An active atom index does not exist in the trajectory.
    AtomIndexOutOfRange {
        /// Offending atom index.
        index: u32,
        /// Number of atoms in the trajectory.
        atom_count: usize,
    },
    /// A trajectory frame does not hold one position per atom.
    InconsistentFrame {
        /// Frame index.
        frame: usize,
        /// Expected number of positions.
        expected: usize,
        /// Positions actually present.
        found: usize,
    },
    /// Element tag missing from the van-der-Waals radius table.
    UnknownElement(String),
    /// GPU context initialization failure.
    Gpu(ComputeContextError),
    /// The GPU backend was requested but no compute context exists.
    GpuUnavailable,
    /// Dispatch, limit or readback failure on the GPU path.
    GpuResource(String),
    /// WGSL composition failure.
    ShaderCompose(String),
    /// Failed to build the CPU worker pool.
    ThreadPool(String),
    /// Generic I/O failure.
    Io(std::io::Error),
    /// TOML options parsing/serialization failure.
    OptionsParse(String),
}

impl fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidProbeRadius(r) => {
                write!(f, "probe radius must be finite and >= 0, got {r}")
            }
            Self::InvalidSampleCount(n) => {
                write!(f, "direction sample count must be >= 1, got {n}")
            }
            Self::FrameOutOfRange { frame, frame_count } => write!(
                f,
                "frame {frame} out of range (trajectory has {frame_count} frames)"
            ),
            Self::AtomIndexOutOfRange { index, atom_count } => write!(
                f,
                "atom index {index} out of range (trajectory has {atom_count} atoms)"
            ),
            Self::InconsistentFrame {
                frame,
                expected,
                found,
            } => write!(
                f,
                "frame {frame} holds {found} positions, expected {expected}"
            ),
            Self::UnknownElement(name) => {
                write!(f, "no van-der-Waals radius for element '{name}'")
            }
            Self::Gpu(e) => write!(f, "GPU error: {e}"),
            Self::GpuUnavailable => {
                write!(f, "GPU backend requested but no compute context exists")
            }
            Self::GpuResource(msg) => write!(f, "GPU resource error: {msg}"),
            Self::ShaderCompose(msg) => {
                write!(f, "shader composition error: {msg}")
            }
            Self::ThreadPool(msg) => {
                write!(f, "failed to build worker pool: {msg}")
            }
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::OptionsParse(msg) => {
                write!(f, "options parse error: {msg}")
            }
        }
    }
}

impl std::error::Error for SurfaceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Gpu(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ComputeContextError> for SurfaceError {
    fn from(e: ComputeContextError) -> Self {
        Self::Gpu(e)
    }
}

impl From<std::io::Error> for SurfaceError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl SurfaceError {
    /// Whether the error stems from caller-supplied parameters rather than
    /// the environment. Such errors need a corrected value before retrying.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidProbeRadius(_)
                | Self::InvalidSampleCount(_)
                | Self::FrameOutOfRange { .. }
                | Self::AtomIndexOutOfRange { .. }
                | Self::InconsistentFrame { .. }
                | Self::UnknownElement(_)
        )
    }
}
