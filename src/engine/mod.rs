//! `SurfaceEngine` owns the classifiers and runs complete computations:
//! backend selection, layer removal and timing.


use std::time::Duration;

use web_time::Instant;

use crate::error::SurfaceError;
use crate::gpu::{ComputeContext, GpuClassifier};
use crate::molecule::Trajectory;
use crate::options::{Backend, SurfaceOptions};
use crate::surface::cpu::CpuClassifier;
use crate::surface::layers::peel_layers;
use crate::surface::{Classification, SurfaceClassifier};

/// Result of [`SurfaceEngine::compute`].
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceComputation {
    /// Classification of the atoms left after layer removal.
    pub classification: Classification,
    /// Layers actually removed.
    pub layers_removed: usize,
    /// Surface atom count of each removed layer, outermost first.
    pub removed_per_layer: Vec<usize>,
    /// Backend that ran.
    pub backend: Backend,
    /// Name of the executing device.
    pub device: String,
    /// Wall-clock time of the whole computation.
    pub elapsed: Duration,
}

impl SurfaceComputation {
    /// One-line text summary.
    pub fn summary(&self) -> String {
        format!(
            "{}: {} atoms after {} removed layers -> {} internal, {} surface in {:.2} ms",
            self.device,
            self.classification.input_count(),
            self.layers_removed,
            self.classification.internal_count(),
            self.classification.surface_count(),
            self.elapsed.as_secs_f64() * 1000.0,
        )
    }
}

/// Surface classification engine holding a CPU classifier and, when a
/// compute context was supplied, a GPU classifier.
pub struct SurfaceEngine {
    cpu: CpuClassifier,
    gpu: Option<GpuClassifier>,
}

impl SurfaceEngine {
    /// Build the classifiers. Without a `context` only the CPU backend is
    /// available.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::ThreadPool`] or
    /// [`SurfaceError::ShaderCompose`] if a classifier cannot be created.
    pub fn new(
        options: &SurfaceOptions,
        context: Option<ComputeContext>,
    ) -> Result<Self, SurfaceError> {
        let cpu = CpuClassifier::new(options.cpu_threads)?;
        let gpu = context.map(GpuClassifier::new).transpose()?;
        log::info!(
            "surface engine: {}{}",
            cpu.device(),
            gpu.as_ref()
                .map(|g| format!(", {}", g.device()))
                .unwrap_or_default()
        );
        Ok(Self { cpu, gpu })
    }

    /// Whether the GPU backend is available.
    pub fn has_gpu(&self) -> bool {
        self.gpu.is_some()
    }

    /// The GPU classifier, e.g. to bind its result buffers for rendering.
    pub fn gpu(&self) -> Option<&GpuClassifier> {
        self.gpu.as_ref()
    }

    /// Worker threads of the CPU classifier.
    pub fn cpu_threads(&self) -> usize {
        self.cpu.threads()
    }

    /// Rebuild the CPU worker pool if the thread count changed.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::ThreadPool`] if the pool cannot be spawned.
    pub fn set_cpu_threads(&mut self, threads: usize) -> Result<(), SurfaceError> {
        if threads.max(1) != self.cpu.threads() {
            self.cpu = CpuClassifier::new(threads)?;
        }
        Ok(())
    }

    /// Classifier for `backend`.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::GpuUnavailable`] for [`Backend::Gpu`] without
    /// a compute context.
    pub fn classifier(
        &mut self,
        backend: Backend,
    ) -> Result<&mut dyn SurfaceClassifier, SurfaceError> {
        match backend {
            Backend::Cpu => Ok(&mut self.cpu),
            Backend::Gpu => match self.gpu.as_mut() {
                Some(gpu) => Ok(gpu),
                None => Err(SurfaceError::GpuUnavailable),
            },
        }
    }

    /// Classify `options.frame` of `trajectory`, removing
    /// `options.layer_removal_count` surface layers first.
    ///
    /// # Errors
    ///
    /// Configuration errors are returned before any work is done; backend
    /// errors abort the run without a partial result.
    pub fn compute(
        &mut self,
        trajectory: &Trajectory,
        options: &SurfaceOptions,
    ) -> Result<SurfaceComputation, SurfaceError> {
        let params = options.params()?;
        let _ = trajectory.frame_positions(options.frame)?;
        if options.backend == Backend::Cpu {
            self.set_cpu_threads(options.cpu_threads)?;
        }

        let start = Instant::now();
        let classifier = self.classifier(options.backend)?;
        let device = classifier.device();
        let peel = peel_layers(
            classifier,
            trajectory,
            options.frame,
            &params,
            options.layer_removal_count,
        )?;
        let computation = SurfaceComputation {
            classification: peel.classification,
            layers_removed: peel.layers_removed,
            removed_per_layer: peel.removed_per_layer,
            backend: options.backend,
            device,
            elapsed: start.elapsed(),
        };
        log::debug!("{}", computation.summary());
        Ok(computation)
    }
}
