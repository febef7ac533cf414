//! Uniform cell grid over the active atoms of one frame.
//!
//! Cells are cubes whose edge is at least the largest possible interaction
//! distance `2 * (max_radius + probe_radius)`, so any two atoms that can
//! touch through their probe-inflated spheres sit in the same or adjacent
//! cells. Storage is compressed: `cell_start[c]..cell_start[c + 1]` indexes
//! into `cell_atoms`, which holds global atom indices grouped by cell.

use glam::Vec3;

/// Upper bound on cells per active atom before cell edges are doubled.
const MAX_CELLS_PER_ATOM: u64 = 8;

/// Compressed uniform grid answering "which active atoms are near `p`".
#[derive(Debug, Clone)]
pub struct NeighborGrid {
    origin: Vec3,
    cell_size: f32,
    dims: [u32; 3],
    cell_start: Vec<u32>,
    cell_atoms: Vec<u32>,
}

/// Grid data in the flat form the compute kernel binds.
#[derive(Debug, Clone, PartialEq)]
pub struct GpuGridLayout {
    /// Minimum corner of the grid.
    pub origin: Vec3,
    /// Cell edge length.
    pub cell_size: f32,
    /// Cells along x, y and z.
    pub dims: [u32; 3],
    /// `cell_start` (`cell_count + 1` entries) followed by `cell_atoms`.
    pub data: Vec<u32>,
    /// Offset of the first `cell_atoms` entry inside `data`.
    pub cell_atoms_offset: u32,
}

impl NeighborGrid {
    /// Bucket the `active` atoms of one frame.
    ///
    /// `positions` and `radii` are indexed by global atom index; indices in
    /// `active` must be in range (checked by the caller).
    pub fn build(
        positions: &[Vec3],
        radii: &[f32],
        active: &[u32],
        probe_radius: f32,
    ) -> Self {
        if active.is_empty() {
            return Self {
                origin: Vec3::ZERO,
                cell_size: 1.0,
                dims: [1, 1, 1],
                cell_start: vec![0, 0],
                cell_atoms: Vec::new(),
            };
        }

        let (lo, hi, max_radius) = active.iter().fold(
            (Vec3::splat(f32::MAX), Vec3::splat(f32::MIN), 0.0f32),
            |(lo, hi, r), &i| {
                let p = positions[i as usize];
                (lo.min(p), hi.max(p), r.max(radii[i as usize]))
            },
        );
        let extent = hi - lo;

        let mut cell_size = (2.0 * (max_radius + probe_radius)).max(1e-3);
        let max_cells = (active.len() as u64 * MAX_CELLS_PER_ATOM).max(1);
        let mut dims = grid_dims(extent, cell_size);
        while cell_count(dims) > max_cells && cell_size.is_finite() {
            cell_size *= 2.0;
            dims = grid_dims(extent, cell_size);
        }

        let mut grid = Self {
            origin: lo,
            cell_size,
            dims,
            cell_start: Vec::new(),
            cell_atoms: Vec::new(),
        };

        // Counting sort of atoms into cells.
        let cells: Vec<u32> = active
            .iter()
            .map(|&i| grid.flat_index(grid.cell_coord(positions[i as usize])))
            .collect();
        let mut counts = vec![0u32; cell_count(dims) as usize + 1];
        for &c in &cells {
            counts[c as usize + 1] += 1;
        }
        for c in 1..counts.len() {
            counts[c] += counts[c - 1];
        }
        let mut cursor = counts.clone();
        let mut cell_atoms = vec![0u32; active.len()];
        for (&atom, &c) in active.iter().zip(&cells) {
            let slot = &mut cursor[c as usize];
            cell_atoms[*slot as usize] = atom;
            *slot += 1;
        }

        grid.cell_start = counts;
        grid.cell_atoms = cell_atoms;
        grid
    }

    /// Edge length of one cell.
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Cells along x, y and z.
    pub fn dims(&self) -> [u32; 3] {
        self.dims
    }

    /// Number of atoms bucketed into the grid.
    pub fn len(&self) -> usize {
        self.cell_atoms.len()
    }

    /// Whether no atoms were bucketed.
    pub fn is_empty(&self) -> bool {
        self.cell_atoms.is_empty()
    }

    /// Integer cell coordinate of `p`; may lie outside the grid.
    fn cell_coord(&self, p: Vec3) -> [i64; 3] {
        let c = ((p - self.origin) / self.cell_size).floor();
        [c.x as i64, c.y as i64, c.z as i64]
    }

    fn flat_index(&self, [x, y, z]: [i64; 3]) -> u32 {
        let [dx, dy, dz] = self.dims.map(i64::from);
        let x = x.clamp(0, dx - 1);
        let y = y.clamp(0, dy - 1);
        let z = z.clamp(0, dz - 1);
        (x + dx * (y + dy * z)) as u32
    }

    /// Visit every active atom in the 27 cells around `p`. Cells beyond the
    /// grid boundary contribute nothing.
    pub fn for_each_candidate(&self, p: Vec3, mut f: impl FnMut(u32)) {
        let [hx, hy, hz] = self.cell_coord(p);
        let [dx, dy, dz] = self.dims.map(i64::from);
        for z in (hz - 1).max(0)..=(hz + 1).min(dz - 1) {
            for y in (hy - 1).max(0)..=(hy + 1).min(dy - 1) {
                for x in (hx - 1).max(0)..=(hx + 1).min(dx - 1) {
                    let cell = (x + dx * (y + dy * z)) as usize;
                    let begin = self.cell_start[cell] as usize;
                    let end = self.cell_start[cell + 1] as usize;
                    for &atom in &self.cell_atoms[begin..end] {
                        f(atom);
                    }
                }
            }
        }
    }

    /// Active atoms `j != atom` with
    /// `|c_atom - c_j| <= r_atom + r_j + 2 * probe_radius`.
    pub fn neighbors_of(
        &self,
        atom: u32,
        positions: &[Vec3],
        radii: &[f32],
        probe_radius: f32,
    ) -> Vec<u32> {
        let center = positions[atom as usize];
        let reach = radii[atom as usize] + 2.0 * probe_radius;
        let mut neighbors = Vec::new();
        self.for_each_candidate(center, |other| {
            if other == atom {
                return;
            }
            let limit = reach + radii[other as usize];
            if center.distance_squared(positions[other as usize]) <= limit * limit
            {
                neighbors.push(other);
            }
        });
        neighbors
    }

    /// Flatten into the single `u32` array bound by the compute kernel.
    pub fn gpu_layout(&self) -> GpuGridLayout {
        let mut data =
            Vec::with_capacity(self.cell_start.len() + self.cell_atoms.len());
        data.extend_from_slice(&self.cell_start);
        data.extend_from_slice(&self.cell_atoms);
        GpuGridLayout {
            origin: self.origin,
            cell_size: self.cell_size,
            dims: self.dims,
            data,
            cell_atoms_offset: self.cell_start.len() as u32,
        }
    }
}

fn grid_dims(extent: Vec3, cell_size: f32) -> [u32; 3] {
    let d = (extent / cell_size).floor();
    [d.x, d.y, d.z].map(|v| (v as u32).saturating_add(1))
}

fn cell_count(dims: [u32; 3]) -> u64 {
    dims.iter()
        .fold(1u64, |acc, &d| acc.saturating_mul(u64::from(d)))
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    fn random_atoms(seed: u64, n: usize, extent: f32) -> (Vec<Vec3>, Vec<f32>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let positions = (0..n)
            .map(|_| {
                Vec3::new(
                    rng.random_range(0.0..extent),
                    rng.random_range(0.0..extent),
                    rng.random_range(0.0..extent),
                )
            })
            .collect();
        let radii = (0..n).map(|_| rng.random_range(1.2f32..1.9)).collect();
        (positions, radii)
    }

    fn brute_neighbors(
        atom: u32,
        active: &[u32],
        positions: &[Vec3],
        radii: &[f32],
        probe: f32,
    ) -> Vec<u32> {
        let c = positions[atom as usize];
        let mut out: Vec<u32> = active
            .iter()
            .copied()
            .filter(|&j| j != atom)
            .filter(|&j| {
                let limit = radii[atom as usize] + radii[j as usize] + 2.0 * probe;
                c.distance_squared(positions[j as usize]) <= limit * limit
            })
            .collect();
        out.sort_unstable();
        out
    }

    #[test]
    fn neighbors_match_brute_force() {
        let (positions, radii) = random_atoms(7, 400, 30.0);
        let active: Vec<u32> = (0..400).collect();
        let grid = NeighborGrid::build(&positions, &radii, &active, 1.4);
        assert_eq!(grid.len(), 400);
        for &atom in &active {
            let mut got = grid.neighbors_of(atom, &positions, &radii, 1.4);
            got.sort_unstable();
            assert_eq!(got, brute_neighbors(atom, &active, &positions, &radii, 1.4));
        }
    }

    #[test]
    fn only_active_atoms_are_bucketed() {
        let (positions, radii) = random_atoms(3, 100, 10.0);
        let active: Vec<u32> = (0..100).filter(|i| i % 3 == 0).collect();
        let grid = NeighborGrid::build(&positions, &radii, &active, 1.2);
        for &atom in &active {
            let mut got = grid.neighbors_of(atom, &positions, &radii, 1.2);
            got.sort_unstable();
            assert!(got.iter().all(|j| j % 3 == 0));
            assert_eq!(got, brute_neighbors(atom, &active, &positions, &radii, 1.2));
        }
    }

    #[test]
    fn empty_active_set() {
        let grid = NeighborGrid::build(&[], &[], &[], 1.2);
        assert!(grid.is_empty());
        let mut visited = 0;
        grid.for_each_candidate(Vec3::ZERO, |_| visited += 1);
        assert_eq!(visited, 0);
    }

    #[test]
    fn sparse_atoms_grow_cells_instead_of_cell_count() {
        let positions = vec![Vec3::ZERO, Vec3::splat(1.0e5)];
        let radii = vec![1.5, 1.5];
        let grid = NeighborGrid::build(&positions, &radii, &[0, 1], 1.2);
        assert!(cell_count(grid.dims()) <= 16);
        assert!(grid.cell_size() >= 2.0 * (1.5 + 1.2));
        assert!(grid.neighbors_of(0, &positions, &radii, 1.2).is_empty());
    }

    #[test]
    fn query_outside_grid_sees_boundary_cells() {
        let positions = vec![Vec3::ZERO, Vec3::X];
        let radii = vec![1.0, 1.0];
        let grid = NeighborGrid::build(&positions, &radii, &[0, 1], 0.0);
        let mut seen = Vec::new();
        grid.for_each_candidate(Vec3::new(-1.5, 0.0, 0.0), |a| seen.push(a));
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1]);
    }

    #[test]
    fn gpu_layout_concatenates_offsets_and_atoms() {
        let (positions, radii) = random_atoms(11, 50, 12.0);
        let active: Vec<u32> = (0..50).collect();
        let grid = NeighborGrid::build(&positions, &radii, &active, 1.2);
        let layout = grid.gpu_layout();
        let cells = cell_count(layout.dims) as usize;
        assert_eq!(layout.cell_atoms_offset as usize, cells + 1);
        assert_eq!(layout.data.len(), cells + 1 + 50);
        assert_eq!(layout.data[cells], 50);
    }
}
