//! Compute-shader surface classification.
//!
//! One invocation per active atom tests the shared direction set against the
//! neighbors found through the CPU-built grid, then appends the atom to the
//! internal or surface list through an atomic counter. Both lists stay on
//! the GPU for rendering and are also read back into a [`Classification`].

use crate::error::SurfaceError;
use crate::gpu::compute_context::ComputeContext;
use crate::gpu::dynamic_buffer::TypedBuffer;
use crate::gpu::gpu_molecule::GpuMolecule;
use crate::gpu::pipeline_helpers::{
    create_compute_pipeline, storage_buffer, uniform_buffer, whole_buffer,
};
use crate::gpu::readback::ReadbackBuffer;
use crate::gpu::shader_composer::ShaderComposer;
use crate::molecule::{AtomLut, Trajectory};
use crate::spatial::NeighborGrid;
use crate::surface::{
    sampling, AtomSet, Classification, SurfaceClassifier, SurfaceParams,
    COVERAGE_TOLERANCE,
};

/// Must match `@workgroup_size` in `surface_atoms.wgsl`.
const WORKGROUP_SIZE: usize = 64;

/// Two `atomic<u32>`: internal count, surface count.
const COUNTERS_SIZE: u64 = 2 * size_of::<u32>() as u64;

/// Uniform block of `surface_atoms.wgsl`.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct GpuParams {
    /// xyz: grid origin, w: cell edge.
    grid_origin: [f32; 4],
    /// xyz: cells per axis.
    grid_dims: [u32; 4],
    atom_count: u32,
    input_count: u32,
    frame: u32,
    sample_count: u32,
    probe_radius: f32,
    tolerance: f32,
    cell_atoms_offset: u32,
    _pad: u32,
}

fn workgroup_count(invocations: usize) -> usize {
    invocations.div_ceil(WORKGROUP_SIZE)
}

/// GPU implementation of [`SurfaceClassifier`].
pub struct GpuClassifier {
    context: ComputeContext,
    lut: AtomLut,
    pipeline: wgpu::ComputePipeline,
    layout: wgpu::BindGroupLayout,
    bind_group: Option<wgpu::BindGroup>,
    params: wgpu::Buffer,
    samples: TypedBuffer<[f32; 4]>,
    grid: TypedBuffer<u32>,
    input: TypedBuffer<u32>,
    counters: wgpu::Buffer,
    internal: TypedBuffer<u32>,
    surface: TypedBuffer<u32>,
    counters_readback: ReadbackBuffer,
    internal_readback: ReadbackBuffer,
    surface_readback: ReadbackBuffer,
    molecule: Option<GpuMolecule>,
    last_counts: (u32, u32),
}

impl GpuClassifier {
    /// Compile the kernel and allocate the per-run buffers on `context`.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::ShaderCompose`] if the kernel fails to
    /// compose.
    pub fn new(context: ComputeContext) -> Result<Self, SurfaceError> {
        let device = &context.device;

        let mut composer = ShaderComposer::new()?;
        let shader = composer.compose(
            device,
            "Surface Atoms Shader",
            include_str!("../../assets/shaders/compute/surface_atoms.wgsl"),
            "compute/surface_atoms.wgsl",
        )?;

        let layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Surface Atoms Bind Group Layout"),
                entries: &[
                    uniform_buffer(0),
                    storage_buffer(1, true),
                    storage_buffer(2, true),
                    storage_buffer(3, true),
                    storage_buffer(4, true),
                    storage_buffer(5, true),
                    storage_buffer(6, false),
                    storage_buffer(7, false),
                    storage_buffer(8, false),
                ],
            });
        let pipeline =
            create_compute_pipeline(device, "Surface Atoms", &shader, &[&layout]);

        let params = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Surface Params"),
            size: size_of::<GpuParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let counters = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Surface Counters"),
            size: COUNTERS_SIZE,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let input_usage = wgpu::BufferUsages::STORAGE;
        let output_usage =
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC;

        log::info!("surface kernel ready on {}", context.device_name());

        Ok(Self {
            samples: TypedBuffer::with_capacity(device, "Sample Directions", 128, input_usage),
            grid: TypedBuffer::with_capacity(device, "Neighbor Grid", 1024, input_usage),
            input: TypedBuffer::with_capacity(device, "Input Atoms", 1024, input_usage),
            internal: TypedBuffer::with_capacity(device, "Internal Atoms", 1024, output_usage),
            surface: TypedBuffer::with_capacity(device, "Surface Atoms", 1024, output_usage),
            counters_readback: ReadbackBuffer::new(device, "Counters Readback", COUNTERS_SIZE),
            internal_readback: ReadbackBuffer::new(device, "Internal Readback", 4096),
            surface_readback: ReadbackBuffer::new(device, "Surface Readback", 4096),
            context,
            lut: AtomLut::new(),
            pipeline,
            layout,
            bind_group: None,
            params,
            counters,
            molecule: None,
            last_counts: (0, 0),
        })
    }

    /// The compute context the kernel runs on.
    pub fn context(&self) -> &ComputeContext {
        &self.context
    }

    /// Currently uploaded trajectory, if any.
    pub fn molecule(&self) -> Option<&GpuMolecule> {
        self.molecule.as_ref()
    }

    /// Compacted internal atom indices of the last run, valid up to
    /// `last_counts().0`.
    pub fn internal_buffer(&self) -> &wgpu::Buffer {
        self.internal.buffer()
    }

    /// Compacted surface atom indices of the last run, valid up to
    /// `last_counts().1`.
    pub fn surface_buffer(&self) -> &wgpu::Buffer {
        self.surface.buffer()
    }

    /// `(internal, surface)` counts of the last run.
    pub fn last_counts(&self) -> (u32, u32) {
        self.last_counts
    }

    fn ensure_molecule(&mut self, trajectory: &Trajectory) -> Result<(), SurfaceError> {
        let current = self.molecule.as_ref().map(GpuMolecule::trajectory_id);
        if current != Some(trajectory.id()) {
            // Drop the old upload before allocating the new one.
            self.molecule = None;
            self.molecule = Some(GpuMolecule::upload(
                &self.context.device,
                trajectory,
                &self.lut,
            )?);
            self.bind_group = None;
        }
        Ok(())
    }

    fn create_bind_group(&self) -> Result<wgpu::BindGroup, SurfaceError> {
        let molecule = self.molecule.as_ref().ok_or_else(|| {
            SurfaceError::GpuResource("no trajectory uploaded".to_owned())
        })?;
        Ok(self
            .context
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Surface Atoms Bind Group"),
                layout: &self.layout,
                entries: &[
                    whole_buffer(0, &self.params),
                    whole_buffer(1, molecule.radii()),
                    whole_buffer(2, molecule.positions()),
                    whole_buffer(3, self.samples.buffer()),
                    whole_buffer(4, self.grid.buffer()),
                    whole_buffer(5, self.input.buffer()),
                    whole_buffer(6, &self.counters),
                    whole_buffer(7, self.internal.buffer()),
                    whole_buffer(8, self.surface.buffer()),
                ],
            }))
    }

    fn check_limits(&self, workgroups: usize, grid_words: usize) -> Result<u32, SurfaceError> {
        let limits = self.context.device.limits();
        let max_groups = limits.max_compute_workgroups_per_dimension;
        let groups = u32::try_from(workgroups)
            .ok()
            .filter(|&g| g <= max_groups)
            .ok_or_else(|| {
                SurfaceError::GpuResource(format!(
                    "{workgroups} workgroups exceed the device limit of {max_groups}"
                ))
            })?;
        let grid_bytes = (grid_words * size_of::<u32>()) as u64;
        let max_binding = u64::from(limits.max_storage_buffer_binding_size);
        if grid_bytes > max_binding {
            return Err(SurfaceError::GpuResource(format!(
                "neighbor grid needs {grid_bytes} bytes, device binding limit is {max_binding}"
            )));
        }
        Ok(groups)
    }

    /// Upload the per-run inputs. Returns `true` if any buffer was
    /// reallocated.
    fn upload_run(
        &mut self,
        atoms: &AtomSet<'_>,
        grid_data: &[u32],
        directions: &[[f32; 4]],
    ) -> bool {
        let device = &self.context.device;
        let queue = &self.context.queue;
        let n = atoms.len();
        let mut reallocated = self.samples.write(device, queue, directions);
        reallocated |= self.grid.write(device, queue, grid_data);
        reallocated |= self.input.write(device, queue, atoms.active());
        reallocated |= self.internal.reserve(device, n);
        reallocated |= self.surface.reserve(device, n);

        let bytes = (n * size_of::<u32>()) as u64;
        self.internal_readback.ensure_capacity(device, bytes);
        self.surface_readback.ensure_capacity(device, bytes);
        reallocated
    }

    fn encode_and_submit(&self, bind_group: &wgpu::BindGroup, workgroups: u32, n: usize) {
        let mut encoder = self.context.create_encoder("Surface Classification");
        encoder.clear_buffer(&self.counters, 0, None);
        {
            let mut pass =
                encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("Surface Atoms Pass"),
                    timestamp_writes: None,
                });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            pass.dispatch_workgroups(workgroups, 1, 1);
        }
        let bytes = (n * size_of::<u32>()) as u64;
        self.counters_readback
            .copy_from(&mut encoder, &self.counters, COUNTERS_SIZE);
        self.internal_readback
            .copy_from(&mut encoder, self.internal.buffer(), bytes);
        self.surface_readback
            .copy_from(&mut encoder, self.surface.buffer(), bytes);
        self.context.submit(encoder);
    }
}

impl SurfaceClassifier for GpuClassifier {
    fn device(&self) -> String {
        self.context.device_name().to_owned()
    }

    fn classify(
        &mut self,
        atoms: &AtomSet<'_>,
        params: &SurfaceParams,
    ) -> Result<Classification, SurfaceError> {
        if atoms.is_empty() {
            self.last_counts = (0, 0);
            return Ok(Classification::empty());
        }

        let n = atoms.len();
        let grid = NeighborGrid::build(
            atoms.positions(),
            atoms.radii(),
            atoms.active(),
            params.probe_radius(),
        );
        let layout = grid.gpu_layout();
        let workgroups = self.check_limits(workgroup_count(n), layout.data.len())?;

        self.ensure_molecule(atoms.trajectory())?;
        let directions = sampling::to_gpu(&sampling::sphere_directions(
            params.direction_samples(),
        ));
        if self.upload_run(atoms, &layout.data, &directions) {
            self.bind_group = None;
        }

        let gpu_params = GpuParams {
            grid_origin: layout.origin.extend(layout.cell_size).to_array(),
            grid_dims: [layout.dims[0], layout.dims[1], layout.dims[2], 0],
            atom_count: atoms.trajectory().atom_count() as u32,
            input_count: n as u32,
            frame: atoms.frame() as u32,
            sample_count: params.direction_samples(),
            probe_radius: params.probe_radius(),
            tolerance: COVERAGE_TOLERANCE,
            cell_atoms_offset: layout.cell_atoms_offset,
            _pad: 0,
        };
        self.context
            .queue
            .write_buffer(&self.params, 0, bytemuck::bytes_of(&gpu_params));

        let bind_group = match self.bind_group.take() {
            Some(bind_group) => bind_group,
            None => self.create_bind_group()?,
        };
        self.encode_and_submit(&bind_group, workgroups, n);
        self.bind_group = Some(bind_group);

        let device = &self.context.device;
        let (internal_count, surface_count) =
            match self.counters_readback.read_u32s(device, 2)?.as_slice() {
                &[internal, surface] => (internal, surface),
                _ => {
                    return Err(SurfaceError::GpuResource(
                        "counter readback returned the wrong size".to_owned(),
                    ))
                }
            };
        if internal_count as usize + surface_count as usize != n {
            return Err(SurfaceError::GpuResource(format!(
                "kernel classified {} of {n} atoms",
                internal_count as usize + surface_count as usize
            )));
        }

        let internal = self
            .internal_readback
            .read_u32s(device, internal_count as usize)?;
        let surface = self
            .surface_readback
            .read_u32s(device, surface_count as usize)?;
        self.last_counts = (internal_count, surface_count);

        log::debug!(
            "{}: {n} atoms -> {internal_count} internal, {surface_count} surface ({workgroups} workgroups)",
            self.context.device_name(),
        );

        Ok(Classification {
            input: atoms.active().to_vec(),
            internal,
            surface,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::SelfTestOptions;
    use crate::surface::cpu::CpuClassifier;
    use crate::validation::{cross_validate, synthetic_trajectory};

    fn assert_backends_agree(
        gpu: &mut GpuClassifier,
        cpu: &mut CpuClassifier,
        atoms: &AtomSet<'_>,
        params: &SurfaceParams,
    ) -> Classification {
        let expected = cpu.classify(atoms, params).unwrap();
        let actual = gpu.classify(atoms, params).unwrap();
        assert!(actual.is_partition());
        assert_eq!(actual.input_count(), atoms.len());
        assert_eq!(
            gpu.last_counts(),
            (
                actual.internal_count() as u32,
                actual.surface_count() as u32
            )
        );
        let cv = cross_validate(&expected, &actual, atoms, params);
        assert!(cv.agreement() >= 0.95, "agreement {}", cv.agreement());
        assert_eq!(cv.unexplained_count(), 0, "{:?}", cv.disagreements);
        expected
    }

    #[test]
    fn params_match_the_uniform_layout() {
        // 2 x vec4 + 8 scalars
        assert_eq!(size_of::<GpuParams>(), 64);
    }

    #[test]
    fn workgroups_round_up() {
        assert_eq!(workgroup_count(1), 1);
        assert_eq!(workgroup_count(64), 1);
        assert_eq!(workgroup_count(65), 2);
        assert_eq!(workgroup_count(6400), 100);
    }

    #[test]
    fn gpu_matches_cpu_on_cluster_and_peeled_core() {
        let Ok(context) = pollster::block_on(ComputeContext::new()) else {
            eprintln!("no GPU adapter, skipping");
            return;
        };
        let mut gpu = GpuClassifier::new(context).unwrap();
        let mut cpu = CpuClassifier::new(4).unwrap();
        let traj = synthetic_trajectory(&SelfTestOptions {
            seed: 7,
            atom_count: 2000,
            cluster_radius: 16.0,
            ..SelfTestOptions::default()
        })
        .unwrap();
        let params = SurfaceParams::new(1.2, 100).unwrap();

        let all: Vec<u32> = (0..traj.atom_count() as u32).collect();
        let atoms = AtomSet::new(&traj, 0, &all).unwrap();
        let outer = assert_backends_agree(&mut gpu, &mut cpu, &atoms, &params);
        assert!(outer.internal_count() > 0);

        // Second run on the same trajectory reuses the uploaded molecule.
        let core = AtomSet::new(&traj, 0, &outer.internal).unwrap();
        let _ = assert_backends_agree(&mut gpu, &mut cpu, &core, &params);
    }
}
