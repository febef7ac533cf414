use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::SurfaceError;
use crate::surface::{SurfaceParams, DEFAULT_PROBE_RADIUS};

/// Which classifier runs.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Thread-parallel grid classifier.
    Cpu,
    /// Compute-shader classifier.
    #[default]
    Gpu,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Surface", inline)]
#[serde(default)]
/// Parameters of one classification run.
pub struct SurfaceOptions {
    /// Solvent probe radius in angstrom.
    #[schemars(title = "Probe Radius", range(min = 0.0, max = 5.0), extend("step" = 0.05))]
    pub probe_radius: f32,
    /// Classifier backend.
    #[schemars(title = "Backend")]
    pub backend: Backend,
    /// Worker threads for the CPU backend.
    #[schemars(title = "CPU Threads", range(min = 1, max = 64))]
    pub cpu_threads: usize,
    /// Directions tested per atom.
    #[schemars(title = "Direction Samples", range(min = 1, max = 1000), extend("step" = 10))]
    pub direction_samples: u32,
    /// Surface layers peeled before the final classification.
    #[schemars(title = "Layers Removed", range(min = 0, max = 50))]
    pub layer_removal_count: usize,
    /// Trajectory frame to classify.
    #[schemars(skip)]
    pub frame: usize,
}

impl Default for SurfaceOptions {
    fn default() -> Self {
        Self {
            probe_radius: DEFAULT_PROBE_RADIUS,
            backend: Backend::default(),
            cpu_threads: 8,
            direction_samples: 100,
            layer_removal_count: 0,
            frame: 0,
        }
    }
}

impl SurfaceOptions {
    /// Validated kernel parameters.
    ///
    /// # Errors
    ///
    /// Returns the configuration error for an invalid probe radius or
    /// sample count.
    pub fn params(&self) -> Result<SurfaceParams, SurfaceError> {
        SurfaceParams::new(self.probe_radius, self.direction_samples)
    }
}
