//! Surface atom classification.
//!
//! An atom is *surface* when at least one sample direction on its
//! probe-inflated sphere (`radius + probe_radius`) is not covered by the
//! inflated sphere of any other active atom; otherwise it is *internal*.
//! A sample lying exactly on a neighbor's inflated sphere counts as covered.
//!
//! Implementations of [`SurfaceClassifier`]:
//!
//! - [`cpu::CpuClassifier`] - grid-accelerated, thread-parallel
//! - [`crate::gpu::surface_kernel::GpuClassifier`] - compute shader with
//!   atomic-counter compaction
//! - [`reference::BruteForceClassifier`] - O(N²) cross-check

pub mod cpu;
pub mod layers;
pub mod reference;
pub mod sampling;

use glam::Vec3;

use crate::error::SurfaceError;
use crate::molecule::Trajectory;

/// Slack added to squared inflated radii when testing coverage (Å²).
///
/// Makes exactly-touching samples (including those of coincident atoms)
/// resolve as covered despite f32 rounding, identically on CPU and GPU.
pub const COVERAGE_TOLERANCE: f32 = 1e-4;

/// Default probe radius in angstrom (water).
pub const DEFAULT_PROBE_RADIUS: f32 = 1.2;

/// Validated classification parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceParams {
    probe_radius: f32,
    direction_samples: u32,
}

impl SurfaceParams {
    /// Validate and bundle the parameters.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::InvalidProbeRadius`] for negative or
    /// non-finite radii and [`SurfaceError::InvalidSampleCount`] for zero
    /// samples.
    pub fn new(
        probe_radius: f32,
        direction_samples: u32,
    ) -> Result<Self, SurfaceError> {
        if !probe_radius.is_finite() || probe_radius < 0.0 {
            return Err(SurfaceError::InvalidProbeRadius(probe_radius));
        }
        if direction_samples == 0 {
            return Err(SurfaceError::InvalidSampleCount(direction_samples));
        }
        Ok(Self {
            probe_radius,
            direction_samples,
        })
    }

    /// Probe radius in angstrom.
    pub fn probe_radius(&self) -> f32 {
        self.probe_radius
    }

    /// Number of directions tested per atom.
    pub fn direction_samples(&self) -> u32 {
        self.direction_samples
    }
}

/// Borrowed, validated view of the atoms taking part in one run.
#[derive(Debug, Clone, Copy)]
pub struct AtomSet<'a> {
    trajectory: &'a Trajectory,
    frame: usize,
    positions: &'a [Vec3],
    active: &'a [u32],
}

impl<'a> AtomSet<'a> {
    /// Atoms `active` of `trajectory` at `frame`.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::FrameOutOfRange`] or
    /// [`SurfaceError::AtomIndexOutOfRange`].
    pub fn new(
        trajectory: &'a Trajectory,
        frame: usize,
        active: &'a [u32],
    ) -> Result<Self, SurfaceError> {
        let positions = trajectory.frame_positions(frame)?;
        let atom_count = trajectory.atom_count();
        if let Some(&index) = active.iter().find(|&&i| i as usize >= atom_count)
        {
            return Err(SurfaceError::AtomIndexOutOfRange { index, atom_count });
        }
        Ok(Self {
            trajectory,
            frame,
            positions,
            active,
        })
    }

    /// The underlying trajectory.
    pub fn trajectory(&self) -> &'a Trajectory {
        self.trajectory
    }

    /// Frame index.
    pub fn frame(&self) -> usize {
        self.frame
    }

    /// Positions of all atoms (active or not) in the frame.
    pub fn positions(&self) -> &'a [Vec3] {
        self.positions
    }

    /// Radii of all atoms.
    pub fn radii(&self) -> &'a [f32] {
        self.trajectory.radii()
    }

    /// Global indices of the active atoms.
    pub fn active(&self) -> &'a [u32] {
        self.active
    }

    /// Number of active atoms.
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Whether no atom is active.
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

/// Input, internal and surface atom indices of one run.
///
/// `internal` and `surface` partition `input`. Order within each list is
/// implementation-defined; compare with [`Classification::sorted`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// Atoms that were classified.
    pub input: Vec<u32>,
    /// Atoms fully enclosed by their neighbors.
    pub internal: Vec<u32>,
    /// Solvent-accessible atoms.
    pub surface: Vec<u32>,
}

impl Classification {
    /// Result for an empty input set.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of input atoms.
    pub fn input_count(&self) -> usize {
        self.input.len()
    }

    /// Number of internal atoms.
    pub fn internal_count(&self) -> usize {
        self.internal.len()
    }

    /// Number of surface atoms.
    pub fn surface_count(&self) -> usize {
        self.surface.len()
    }

    /// Copy with every list sorted ascending.
    #[must_use]
    pub fn sorted(&self) -> Self {
        let mut out = self.clone();
        out.input.sort_unstable();
        out.internal.sort_unstable();
        out.surface.sort_unstable();
        out
    }

    /// Whether `internal` and `surface` are disjoint and together equal
    /// `input`.
    pub fn is_partition(&self) -> bool {
        let sorted = self.sorted();
        let mut merged = sorted.internal.clone();
        merged.extend_from_slice(&sorted.surface);
        merged.sort_unstable();
        merged == sorted.input
    }

    /// Per-atom surface flag over `atom_count` atoms (`false` for atoms not
    /// in `input`).
    pub fn surface_mask(&self, atom_count: usize) -> Vec<bool> {
        let mut mask = vec![false; atom_count];
        for &i in &self.surface {
            if let Some(slot) = mask.get_mut(i as usize) {
                *slot = true;
            }
        }
        mask
    }
}

/// One implementation of the surface test.
///
/// Implementations must return fresh results per call and never patch a
/// previous result.
pub trait SurfaceClassifier {
    /// Human-readable name of the executing device.
    fn device(&self) -> String;

    /// Classify every atom in `atoms`.
    ///
    /// # Errors
    ///
    /// Returns a [`SurfaceError`] when the run cannot complete; no partial
    /// result is produced.
    fn classify(
        &mut self,
        atoms: &AtomSet<'_>,
        params: &SurfaceParams,
    ) -> Result<Classification, SurfaceError>;
}

/// Whether `point` lies inside or on the inflated sphere around `center`.
#[inline]
pub fn covers(point: Vec3, center: Vec3, extended_radius: f32) -> bool {
    point.distance_squared(center)
        <= extended_radius * extended_radius + COVERAGE_TOLERANCE
}

/// Surface test for one atom against pre-gathered neighbor spheres
/// (`center`, `extended_radius`).
pub fn is_exposed(
    center: Vec3,
    extended_radius: f32,
    directions: &[Vec3],
    neighbors: &[(Vec3, f32)],
) -> bool {
    directions.iter().any(|&d| {
        let point = center + d * extended_radius;
        !neighbors
            .iter()
            .any(|&(other, other_radius)| covers(point, other, other_radius))
    })
}

#[cfg(test)]
mod tests {
    use glam::Vec4;

    use super::*;

    #[test]
    fn params_validation() {
        assert!(SurfaceParams::new(1.2, 100).is_ok());
        assert!(SurfaceParams::new(0.0, 1).is_ok());
        assert!(matches!(
            SurfaceParams::new(-0.1, 100),
            Err(SurfaceError::InvalidProbeRadius(_))
        ));
        assert!(matches!(
            SurfaceParams::new(f32::NAN, 100),
            Err(SurfaceError::InvalidProbeRadius(_))
        ));
        assert!(matches!(
            SurfaceParams::new(1.2, 0),
            Err(SurfaceError::InvalidSampleCount(0))
        ));
    }

    #[test]
    fn atom_set_rejects_bad_indices_and_frames() {
        let traj = Trajectory::from_spheres(&[Vec4::new(0.0, 0.0, 0.0, 1.0)]);
        assert!(AtomSet::new(&traj, 0, &[0]).is_ok());
        assert!(matches!(
            AtomSet::new(&traj, 0, &[1]),
            Err(SurfaceError::AtomIndexOutOfRange {
                index: 1,
                atom_count: 1
            })
        ));
        assert!(matches!(
            AtomSet::new(&traj, 2, &[0]),
            Err(SurfaceError::FrameOutOfRange { .. })
        ));
    }

    #[test]
    fn exact_touch_counts_as_covered() {
        let point = Vec3::new(2.5, 0.0, 0.0);
        assert!(covers(point, Vec3::ZERO, 2.5));
        assert!(!covers(point, Vec3::ZERO, 2.4));
    }

    #[test]
    fn partition_check() {
        let ok = Classification {
            input: vec![3, 1, 2],
            internal: vec![2],
            surface: vec![3, 1],
        };
        assert!(ok.is_partition());
        let overlapping = Classification {
            input: vec![1, 2],
            internal: vec![1, 2],
            surface: vec![2],
        };
        assert!(!overlapping.is_partition());
        assert_eq!(ok.surface_mask(4), vec![false, true, false, true]);
    }
}
