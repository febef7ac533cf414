//! Immutable per-frame atom data.

use std::sync::atomic::{AtomicU64, Ordering};

use glam::{Vec3, Vec4};

use super::lut::AtomLut;
use crate::error::SurfaceError;

static NEXT_TRAJECTORY_ID: AtomicU64 = AtomicU64::new(1);

/// One atom as delivered by a trajectory loader.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomRecord {
    /// Lower-case element name, e.g. `"carbon"`.
    pub element: String,
    /// Residue code, e.g. `"ALA"`.
    pub residue: String,
    /// Position of this atom in every frame (angstrom).
    pub positions: Vec<Vec3>,
}

/// Radii, tags and per-frame positions for every atom of a molecule.
///
/// Radii, elements and residues are shared by all frames. Frames are stored
/// frame-major: `frames[f][atom]`.
#[derive(Debug, Clone)]
pub struct Trajectory {
    id: u64,
    radii: Vec<f32>,
    elements: Vec<String>,
    residues: Vec<String>,
    frames: Vec<Vec<Vec3>>,
    centers_of_mass: Vec<Vec3>,
    bounds: Vec<(Vec3, Vec3)>,
}

impl Trajectory {
    /// Build a trajectory from raw arrays.
    ///
    /// `elements` and `residues` may be empty (untagged atoms); otherwise
    /// they must match `radii` in length.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::InconsistentFrame`] when a frame or tag list
    /// does not hold exactly one entry per atom.
    pub fn new(
        radii: Vec<f32>,
        frames: Vec<Vec<Vec3>>,
        elements: Vec<String>,
        residues: Vec<String>,
    ) -> Result<Self, SurfaceError> {
        let atom_count = radii.len();
        if let Some((frame, positions)) = frames
            .iter()
            .enumerate()
            .find(|(_, positions)| positions.len() != atom_count)
        {
            return Err(SurfaceError::InconsistentFrame {
                frame,
                expected: atom_count,
                found: positions.len(),
            });
        }
        let elements = fill_tags(elements, atom_count)?;
        let residues = fill_tags(residues, atom_count)?;

        let centers_of_mass = frames
            .iter()
            .map(|positions| {
                if positions.is_empty() {
                    Vec3::ZERO
                } else {
                    positions.iter().copied().sum::<Vec3>()
                        / positions.len() as f32
                }
            })
            .collect();
        let bounds = frames
            .iter()
            .map(|positions| {
                positions.iter().fold(
                    (Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)),
                    |(lo, hi), &p| (lo.min(p), hi.max(p)),
                )
            })
            .collect();

        Ok(Self {
            id: NEXT_TRAJECTORY_ID.fetch_add(1, Ordering::Relaxed),
            radii,
            elements,
            residues,
            frames,
            centers_of_mass,
            bounds,
        })
    }

    /// Build a trajectory from loader records, resolving radii by element.
    ///
    /// The frame count is taken from the first record; every other record
    /// must carry exactly that many positions.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::UnknownElement`] for elements without a
    /// radius and [`SurfaceError::InconsistentFrame`] when records disagree
    /// on the number of frames.
    pub fn from_records(
        records: &[AtomRecord],
        lut: &AtomLut,
    ) -> Result<Self, SurfaceError> {
        let frame_count = records.first().map_or(0, |r| r.positions.len());
        let mut radii = Vec::with_capacity(records.len());
        let mut elements = Vec::with_capacity(records.len());
        let mut residues = Vec::with_capacity(records.len());
        let mut frames = vec![Vec::with_capacity(records.len()); frame_count];

        for record in records {
            radii.push(lut.radius_angstrom(&record.element)?);
            elements.push(record.element.clone());
            residues.push(record.residue.clone());
            if record.positions.len() != frame_count {
                return Err(SurfaceError::InconsistentFrame {
                    frame: frame_count.min(record.positions.len()),
                    expected: frame_count,
                    found: record.positions.len(),
                });
            }
            for (positions, &position) in frames.iter_mut().zip(&record.positions) {
                positions.push(position);
            }
        }

        Self::new(radii, frames, elements, residues)
    }

    /// Single-frame trajectory from `xyz = center, w = radius` spheres.
    /// Element and residue tags are left empty.
    #[must_use]
    pub fn from_spheres(spheres: &[Vec4]) -> Self {
        let radii = spheres.iter().map(|s| s.w).collect();
        let positions = spheres.iter().map(|s| s.truncate()).collect();
        // One frame with one position per radius cannot be inconsistent.
        Self::new(radii, vec![positions], Vec::new(), Vec::new())
            .unwrap_or_else(|_| Self::empty())
    }

    fn empty() -> Self {
        Self {
            id: NEXT_TRAJECTORY_ID.fetch_add(1, Ordering::Relaxed),
            radii: Vec::new(),
            elements: Vec::new(),
            residues: Vec::new(),
            frames: vec![Vec::new()],
            centers_of_mass: vec![Vec3::ZERO],
            bounds: vec![(Vec3::ZERO, Vec3::ZERO)],
        }
    }

    /// Process-unique identity, stable for the lifetime of this value.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Number of atoms per frame.
    pub fn atom_count(&self) -> usize {
        self.radii.len()
    }

    /// Number of frames.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Per-atom radii in angstrom.
    pub fn radii(&self) -> &[f32] {
        &self.radii
    }

    /// Per-atom element tags.
    pub fn elements(&self) -> &[String] {
        &self.elements
    }

    /// Per-atom residue tags.
    pub fn residues(&self) -> &[String] {
        &self.residues
    }

    /// Largest atom radius, 0 for an empty molecule.
    pub fn max_radius(&self) -> f32 {
        self.radii.iter().copied().fold(0.0, f32::max)
    }

    /// Positions of all atoms in `frame`.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::FrameOutOfRange`] for an invalid frame.
    pub fn frame_positions(&self, frame: usize) -> Result<&[Vec3], SurfaceError> {
        self.frames.get(frame).map(Vec::as_slice).ok_or(
            SurfaceError::FrameOutOfRange {
                frame,
                frame_count: self.frames.len(),
            },
        )
    }

    /// Mean atom position in `frame`.
    pub fn center_of_mass(&self, frame: usize) -> Option<Vec3> {
        self.centers_of_mass.get(frame).copied()
    }

    /// Axis-aligned `(min, max)` of atom centers in `frame`.
    pub fn bounds(&self, frame: usize) -> Option<(Vec3, Vec3)> {
        self.bounds.get(frame).copied()
    }

    /// All frames flattened frame-major as `vec4` (w = 0), the layout the
    /// GPU kernel indexes as `frame * atom_count + atom`.
    pub fn flattened_positions(&self) -> Vec<[f32; 4]> {
        self.frames
            .iter()
            .flatten()
            .map(|p| [p.x, p.y, p.z, 0.0])
            .collect()
    }

    /// Per-atom CPK color.
    pub fn element_colors(&self, lut: &AtomLut) -> Vec<[f32; 3]> {
        self.elements.iter().map(|e| lut.element_color(e)).collect()
    }

    /// Per-atom residue color.
    pub fn residue_colors(&self, lut: &AtomLut) -> Vec<[f32; 3]> {
        self.residues.iter().map(|r| lut.residue_color(r)).collect()
    }
}

fn fill_tags(
    tags: Vec<String>,
    atom_count: usize,
) -> Result<Vec<String>, SurfaceError> {
    if tags.is_empty() {
        return Ok(vec![String::new(); atom_count]);
    }
    if tags.len() != atom_count {
        return Err(SurfaceError::InconsistentFrame {
            frame: 0,
            expected: atom_count,
            found: tags.len(),
        });
    }
    Ok(tags)
}
