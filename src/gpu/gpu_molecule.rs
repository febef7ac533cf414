//! Per-trajectory GPU storage: radii, every frame's positions and per-atom
//! colors.
//!
//! Uploaded once per trajectory id and reused across frames, probe radii and
//! layer passes. Buffers are destroyed when the value is dropped.

use wgpu::util::DeviceExt;

use crate::error::SurfaceError;
use crate::molecule::{AtomLut, Trajectory};

/// GPU copy of one [`Trajectory`].
pub struct GpuMolecule {
    trajectory_id: u64,
    atom_count: usize,
    frame_count: usize,
    radii: wgpu::Buffer,
    positions: wgpu::Buffer,
    element_colors: wgpu::Buffer,
    residue_colors: wgpu::Buffer,
}

impl GpuMolecule {
    /// Upload `trajectory`.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::GpuResource`] if the position buffer exceeds
    /// the device's storage binding limit.
    pub fn upload(
        device: &wgpu::Device,
        trajectory: &Trajectory,
        lut: &AtomLut,
    ) -> Result<Self, SurfaceError> {
        let positions = trajectory.flattened_positions();
        let bytes = (positions.len() * size_of::<[f32; 4]>()) as u64;
        let limit = u64::from(device.limits().max_storage_buffer_binding_size);
        if bytes > limit {
            return Err(SurfaceError::GpuResource(format!(
                "trajectory needs {bytes} bytes, device binding limit is {limit}"
            )));
        }

        // Zero-sized storage bindings are invalid; pad empty inputs.
        let mut radii = trajectory.radii().to_vec();
        if radii.is_empty() {
            radii.push(0.0);
        }
        let positions = if positions.is_empty() {
            vec![[0.0; 4]]
        } else {
            positions
        };

        let molecule = Self {
            trajectory_id: trajectory.id(),
            atom_count: trajectory.atom_count(),
            frame_count: trajectory.frame_count(),
            radii: storage_init(device, "Atom Radii", &radii),
            positions: storage_init(device, "Trajectory Positions", &positions),
            element_colors: storage_init(
                device,
                "Element Colors",
                &rgba(trajectory.element_colors(lut)),
            ),
            residue_colors: storage_init(
                device,
                "Residue Colors",
                &rgba(trajectory.residue_colors(lut)),
            ),
        };
        log::debug!(
            "uploaded trajectory {}: {} atoms x {} frames ({bytes} bytes)",
            molecule.trajectory_id,
            molecule.atom_count,
            molecule.frame_count,
        );
        Ok(molecule)
    }

    /// Id of the uploaded trajectory.
    pub fn trajectory_id(&self) -> u64 {
        self.trajectory_id
    }

    /// Atoms per frame.
    pub fn atom_count(&self) -> usize {
        self.atom_count
    }

    /// Number of frames uploaded.
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Per-atom radius (`f32`).
    pub fn radii(&self) -> &wgpu::Buffer {
        &self.radii
    }

    /// Frame-major positions (`vec4<f32>`, `w` unused).
    pub fn positions(&self) -> &wgpu::Buffer {
        &self.positions
    }

    /// Per-atom CPK color (`vec4<f32>`, `a = 1`).
    pub fn element_colors(&self) -> &wgpu::Buffer {
        &self.element_colors
    }

    /// Per-atom residue color (`vec4<f32>`, `a = 1`).
    pub fn residue_colors(&self) -> &wgpu::Buffer {
        &self.residue_colors
    }
}

impl Drop for GpuMolecule {
    fn drop(&mut self) {
        self.radii.destroy();
        self.positions.destroy();
        self.element_colors.destroy();
        self.residue_colors.destroy();
    }
}

fn rgba(colors: Vec<[f32; 3]>) -> Vec<[f32; 4]> {
    let mut out: Vec<[f32; 4]> =
        colors.into_iter().map(|[r, g, b]| [r, g, b, 1.0]).collect();
    if out.is_empty() {
        out.push([0.0; 4]);
    }
    out
}

fn storage_init<T: bytemuck::Pod>(
    device: &wgpu::Device,
    label: &str,
    data: &[T],
) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::cast_slice(data),
        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
    })
}
