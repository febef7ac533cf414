//! Thread-parallel CPU classification over a uniform neighbor grid.
//!
//! The active atoms are split into one contiguous chunk per worker. Each
//! worker writes only its own `(internal, surface)` lists; the lists are
//! concatenated in chunk order once every worker has finished.

use glam::Vec3;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use super::{
    is_exposed, sampling, AtomSet, Classification, SurfaceClassifier,
    SurfaceParams,
};
use crate::error::SurfaceError;
use crate::spatial::NeighborGrid;

/// Read-only data shared by all workers during one run.
struct RunContext<'a> {
    positions: &'a [Vec3],
    radii: &'a [f32],
    grid: &'a NeighborGrid,
    directions: &'a [Vec3],
    probe_radius: f32,
}

/// CPU implementation of [`SurfaceClassifier`].
pub struct CpuClassifier {
    threads: usize,
    pool: Option<ThreadPool>,
}

impl CpuClassifier {
    /// Classifier running on `threads` workers.
    ///
    /// `0` is treated as `1` (single-threaded, inline on the caller).
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::ThreadPool`] if the worker pool cannot be
    /// spawned.
    pub fn new(threads: usize) -> Result<Self, SurfaceError> {
        if threads == 0 {
            log::warn!(
                "CPU thread count 0 requested, falling back to single-threaded classification"
            );
        }
        let threads = threads.max(1);
        let pool = if threads > 1 {
            Some(
                ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("surface-worker-{i}"))
                    .build()
                    .map_err(|e| SurfaceError::ThreadPool(e.to_string()))?,
            )
        } else {
            None
        };
        Ok(Self { threads, pool })
    }

    /// Number of workers.
    pub fn threads(&self) -> usize {
        self.threads
    }

    fn classify_chunk(chunk: &[u32], ctx: &RunContext<'_>) -> (Vec<u32>, Vec<u32>) {
        let mut internal = Vec::new();
        let mut surface = Vec::new();
        let mut neighbors: Vec<(Vec3, f32)> = Vec::new();

        for &atom in chunk {
            neighbors.clear();
            neighbors.extend(
                ctx.grid
                    .neighbors_of(atom, ctx.positions, ctx.radii, ctx.probe_radius)
                    .into_iter()
                    .map(|j| {
                        (
                            ctx.positions[j as usize],
                            ctx.radii[j as usize] + ctx.probe_radius,
                        )
                    }),
            );
            let center = ctx.positions[atom as usize];
            let extended = ctx.radii[atom as usize] + ctx.probe_radius;
            if is_exposed(center, extended, ctx.directions, &neighbors) {
                surface.push(atom);
            } else {
                internal.push(atom);
            }
        }

        (internal, surface)
    }
}

impl SurfaceClassifier for CpuClassifier {
    fn device(&self) -> String {
        if self.threads == 1 {
            "CPU (single-threaded)".to_owned()
        } else {
            format!("CPU ({} threads)", self.threads)
        }
    }

    fn classify(
        &mut self,
        atoms: &AtomSet<'_>,
        params: &SurfaceParams,
    ) -> Result<Classification, SurfaceError> {
        if atoms.is_empty() {
            return Ok(Classification::empty());
        }

        let grid = NeighborGrid::build(
            atoms.positions(),
            atoms.radii(),
            atoms.active(),
            params.probe_radius(),
        );
        let directions = sampling::sphere_directions(params.direction_samples());
        let ctx = RunContext {
            positions: atoms.positions(),
            radii: atoms.radii(),
            grid: &grid,
            directions: &directions,
            probe_radius: params.probe_radius(),
        };

        let active = atoms.active();
        let partials = match &self.pool {
            Some(pool) => {
                let chunk = active.len().div_ceil(self.threads).max(1);
                pool.install(|| {
                    active
                        .par_chunks(chunk)
                        .map(|c| Self::classify_chunk(c, &ctx))
                        .collect::<Vec<_>>()
                })
            }
            None => vec![Self::classify_chunk(active, &ctx)],
        };

        let mut result = Classification {
            input: active.to_vec(),
            internal: Vec::with_capacity(active.len()),
            surface: Vec::with_capacity(active.len()),
        };
        for (internal, surface) in partials {
            result.internal.extend(internal);
            result.surface.extend(surface);
        }

        log::debug!(
            "{}: {} atoms -> {} internal, {} surface (grid {:?}, cell {:.2} Å)",
            self.device(),
            result.input_count(),
            result.internal_count(),
            result.surface_count(),
            grid.dims(),
            grid.cell_size(),
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec4;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::molecule::Trajectory;
    use crate::surface::reference::BruteForceClassifier;

    fn classify(spheres: &[Vec4], probe: f32, threads: usize) -> Classification {
        let traj = Trajectory::from_spheres(spheres);
        let active: Vec<u32> = (0..spheres.len() as u32).collect();
        let atoms = AtomSet::new(&traj, 0, &active).unwrap();
        let params = SurfaceParams::new(probe, 100).unwrap();
        CpuClassifier::new(threads)
            .unwrap()
            .classify(&atoms, &params)
            .unwrap()
    }

    /// Atoms on a jittered lattice inside a ball of `radius`.
    fn dense_cluster(seed: u64, radius: f32) -> Vec<Vec4> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut spheres = Vec::new();
        let steps = (radius / 1.5).ceil() as i32;
        for x in -steps..=steps {
            for y in -steps..=steps {
                for z in -steps..=steps {
                    let p = Vec3::new(x as f32, y as f32, z as f32) * 1.5
                        + Vec3::new(
                            rng.random_range(-0.2..0.2),
                            rng.random_range(-0.2..0.2),
                            rng.random_range(-0.2..0.2),
                        );
                    if p.length() <= radius {
                        spheres.push(p.extend(rng.random_range(1.5f32..1.9)));
                    }
                }
            }
        }
        spheres
    }

    #[test]
    fn single_atom_is_surface() {
        let result = classify(&[Vec4::new(0.0, 0.0, 0.0, 1.5)], 1.2, 1);
        assert_eq!(result.internal_count(), 0);
        assert_eq!(result.surface_count(), 1);
        assert_eq!(result.input_count(), 1);
    }

    #[test]
    fn distant_atoms_are_surface() {
        let result = classify(
            &[Vec4::new(0.0, 0.0, 0.0, 1.5), Vec4::new(20.0, 0.0, 0.0, 1.5)],
            1.2,
            2,
        );
        assert_eq!(result.sorted().surface, vec![0, 1]);
        assert!(result.internal.is_empty());
    }

    #[test]
    fn coincident_atoms_cover_each_other() {
        let result = classify(
            &[Vec4::new(1.0, 2.0, 3.0, 1.5), Vec4::new(1.0, 2.0, 3.0, 1.5)],
            1.2,
            1,
        );
        assert_eq!(result.sorted().internal, vec![0, 1]);
        assert!(result.surface.is_empty());
    }

    #[test]
    fn zero_threads_falls_back_to_single_thread() {
        let classifier = CpuClassifier::new(0).unwrap();
        assert_eq!(classifier.threads(), 1);
        let result = classify(&[Vec4::new(0.0, 0.0, 0.0, 1.5)], 1.2, 0);
        assert_eq!(result.surface_count(), 1);
    }

    #[test]
    fn dense_cluster_matches_brute_force() {
        let spheres = dense_cluster(5, 7.0);
        let traj = Trajectory::from_spheres(&spheres);
        let active: Vec<u32> = (0..spheres.len() as u32).collect();
        let atoms = AtomSet::new(&traj, 0, &active).unwrap();
        let params = SurfaceParams::new(0.5, 64).unwrap();

        let grid_result = CpuClassifier::new(4)
            .unwrap()
            .classify(&atoms, &params)
            .unwrap();
        let brute = BruteForceClassifier
            .classify(&atoms, &params)
            .unwrap();

        assert!(grid_result.is_partition());
        assert_eq!(grid_result.sorted(), brute.sorted());
        // A dense ball has a buried core and an exposed shell.
        assert!(grid_result.internal_count() > 0);
        assert!(grid_result.surface_count() > 0);
        // The atom closest to the center must be buried.
        let center_atom = (0..spheres.len())
            .min_by(|&a, &b| {
                spheres[a].truncate().length().total_cmp(&spheres[b].truncate().length())
            })
            .unwrap() as u32;
        assert!(grid_result.internal.contains(&center_atom));
    }

    #[test]
    fn thread_count_does_not_change_the_sets() {
        let spheres = dense_cluster(9, 6.0);
        let single = classify(&spheres, 1.2, 1).sorted();
        let multi = classify(&spheres, 1.2, 3).sorted();
        assert_eq!(single, multi);
    }

    #[test]
    fn reclassification_is_idempotent() {
        let spheres = dense_cluster(13, 6.0);
        let traj = Trajectory::from_spheres(&spheres);
        let active: Vec<u32> = (0..spheres.len() as u32).collect();
        let atoms = AtomSet::new(&traj, 0, &active).unwrap();
        let params = SurfaceParams::new(1.2, 100).unwrap();
        let mut classifier = CpuClassifier::new(4).unwrap();
        let first = classifier.classify(&atoms, &params).unwrap();
        let second = classifier.classify(&atoms, &params).unwrap();
        assert_eq!(first.sorted(), second.sorted());
    }

    #[test]
    fn identical_atoms_share_classification() {
        let mut spheres = dense_cluster(21, 5.0);
        let twin_index = spheres.len() / 2;
        spheres.push(spheres[twin_index]);
        let twin_index = twin_index as u32;
        let copy_index = (spheres.len() - 1) as u32;
        let result = classify(&spheres, 1.2, 2);
        assert_eq!(
            result.surface.contains(&twin_index),
            result.surface.contains(&copy_index)
        );
    }

    #[test]
    fn empty_active_set_is_not_an_error() {
        let traj = Trajectory::from_spheres(&[Vec4::new(0.0, 0.0, 0.0, 1.5)]);
        let atoms = AtomSet::new(&traj, 0, &[]).unwrap();
        let params = SurfaceParams::new(1.2, 100).unwrap();
        let result = CpuClassifier::new(2)
            .unwrap()
            .classify(&atoms, &params)
            .unwrap();
        assert_eq!(result, Classification::empty());
    }
}
