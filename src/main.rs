//! Headless driver: classifies a synthetic cluster and runs the self-test.
//!
//! Usage: `surfdyn [options.toml]`

use std::path::Path;

use surfdyn::engine::SurfaceEngine;
use surfdyn::error::SurfaceError;
use surfdyn::gpu::ComputeContext;
use surfdyn::options::{Backend, Options};
use surfdyn::validation::synthetic_trajectory;

fn run() -> Result<bool, SurfaceError> {
    let mut options = match std::env::args().nth(1) {
        Some(path) => Options::load(Path::new(&path))?,
        None => Options::default(),
    };

    let context = match pollster::block_on(ComputeContext::new()) {
        Ok(context) => Some(context),
        Err(e) => {
            log::warn!("GPU unavailable ({e}), using the CPU backend");
            None
        }
    };
    if context.is_none() && options.surface.backend == Backend::Gpu {
        options.surface.backend = Backend::Cpu;
    }

    let mut engine = SurfaceEngine::new(&options.surface, context)?;

    let trajectory = synthetic_trajectory(&options.self_test)?;
    let computation = engine.compute(&trajectory, &options.surface)?;
    log::info!("{}", computation.summary());
    for (layer, count) in computation.removed_per_layer.iter().enumerate() {
        log::info!("  layer {}: {count} surface atoms removed", layer + 1);
    }

    let report = engine.self_test(&options)?;
    Ok(report.passed)
}

fn main() {
    env_logger::init();

    match run() {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    }
}
