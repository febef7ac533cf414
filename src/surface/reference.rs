//! O(N²) reference classifier.
//!
//! Tests every active atom against every other active atom with the same
//! direction set as the accelerated paths. Used to cross-check the grid and
//! as the self-test baseline when no GPU is present.

use glam::Vec3;

use super::{
    is_exposed, sampling, AtomSet, Classification, SurfaceClassifier,
    SurfaceParams,
};
use crate::error::SurfaceError;

/// Single-threaded all-pairs [`SurfaceClassifier`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BruteForceClassifier;

impl SurfaceClassifier for BruteForceClassifier {
    fn device(&self) -> String {
        "CPU (brute force)".to_owned()
    }

    fn classify(
        &mut self,
        atoms: &AtomSet<'_>,
        params: &SurfaceParams,
    ) -> Result<Classification, SurfaceError> {
        let positions = atoms.positions();
        let radii = atoms.radii();
        let probe = params.probe_radius();
        let directions = sampling::sphere_directions(params.direction_samples());

        let mut result = Classification {
            input: atoms.active().to_vec(),
            ..Classification::default()
        };
        let mut neighbors: Vec<(Vec3, f32)> = Vec::with_capacity(atoms.len());
        for &atom in atoms.active() {
            neighbors.clear();
            neighbors.extend(
                atoms
                    .active()
                    .iter()
                    .filter(|&&j| j != atom)
                    .map(|&j| (positions[j as usize], radii[j as usize] + probe)),
            );
            let exposed = is_exposed(
                positions[atom as usize],
                radii[atom as usize] + probe,
                &directions,
                &neighbors,
            );
            if exposed {
                result.surface.push(atom);
            } else {
                result.internal.push(atom);
            }
        }
        Ok(result)
    }
}
