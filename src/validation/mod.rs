//! Synthetic self-test: generated structure, classifier cross-validation
//! and a random-sample exposure check of the internal atoms.

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::SurfaceError;
use crate::molecule::{AtomLut, AtomRecord, Trajectory};
use crate::options::SelfTestOptions;
use crate::spatial::NeighborGrid;
use crate::surface::{
    covers, sampling, AtomSet, Classification, SurfaceParams,
};

/// Directions used to measure how exposed a disputed atom really is.
const DENSE_SAMPLES: u32 = 2000;

/// Elements the synthetic cluster draws from (protein-like mix).
const SYNTHETIC_ELEMENTS: &[&str] =
    &["carbon", "carbon", "carbon", "nitrogen", "oxygen", "oxygen", "sulfur"];

const SYNTHETIC_RESIDUES: &[&str] =
    &["ALA", "GLY", "LEU", "SER", "LYS", "ASP", "PHE", "CYS"];

/// One atom the two classifiers disagree on.
#[derive(Debug, Clone, PartialEq)]
pub struct Disagreement {
    /// Global atom index.
    pub atom: u32,
    /// Whether the reference called the atom surface.
    pub reference_surface: bool,
    /// Share of densely sampled points on the atom's extended sphere that
    /// no neighbor covers.
    pub exposed_fraction: f32,
}

/// Comparison of two classifications of the same atom set.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossValidation {
    /// Atoms compared.
    pub compared: usize,
    /// Atoms with the same class in both results.
    pub agreeing: usize,
    /// Every disputed atom.
    pub disagreements: Vec<Disagreement>,
    /// Exposed fraction below which a disagreement counts as a boundary
    /// case (a patch smaller than the sample spacing).
    pub boundary_threshold: f32,
}

impl CrossValidation {
    /// Agreeing share, `1.0` for an empty set.
    pub fn agreement(&self) -> f64 {
        if self.compared == 0 {
            1.0
        } else {
            self.agreeing as f64 / self.compared as f64
        }
    }

    /// Disagreements explained by sub-sample-spacing exposure.
    pub fn boundary_count(&self) -> usize {
        self.disagreements
            .iter()
            .filter(|d| d.exposed_fraction < self.boundary_threshold)
            .count()
    }

    /// Disagreements not explained as boundary cases.
    pub fn unexplained_count(&self) -> usize {
        self.disagreements.len() - self.boundary_count()
    }
}

/// Result of [`exposure_test`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExposureReport {
    /// Internal atoms tested.
    pub tested: usize,
    /// Random points per atom.
    pub samples_per_atom: u32,
    /// Internal atoms with at least one uncovered random point.
    pub violations: Vec<u32>,
}

impl ExposureReport {
    /// Violating share of the tested atoms, `0.0` when nothing was tested.
    pub fn violation_rate(&self) -> f64 {
        if self.tested == 0 {
            0.0
        } else {
            self.violations.len() as f64 / self.tested as f64
        }
    }
}

/// Outcome of a full self-test run.
#[derive(Debug, Clone, PartialEq)]
pub struct SelfTestReport {
    /// Atoms in the synthetic structure.
    pub atom_count: usize,
    /// Device of the reference classification.
    pub reference_device: String,
    /// Device of the classification under test.
    pub candidate_device: String,
    /// Reference vs candidate.
    pub cross_validation: CrossValidation,
    /// Random-point check of the candidate's internal atoms.
    pub exposure: ExposureReport,
    /// Whether both checks met the configured agreement with no
    /// unexplained disagreement.
    pub passed: bool,
}

impl SelfTestReport {
    /// Assemble a report and decide pass/fail.
    ///
    /// Passes when the agreement reaches `min_agreement`, every
    /// disagreement is a boundary case, and at most `1 - min_agreement` of
    /// the internal atoms show a random exposed point.
    pub fn new(
        atom_count: usize,
        reference_device: String,
        candidate_device: String,
        cross_validation: CrossValidation,
        exposure: ExposureReport,
        min_agreement: f64,
    ) -> Self {
        let passed = cross_validation.agreement() >= min_agreement
            && cross_validation.unexplained_count() == 0
            && exposure.violation_rate() <= 1.0 - min_agreement;
        Self {
            atom_count,
            reference_device,
            candidate_device,
            cross_validation,
            exposure,
            passed,
        }
    }

    /// One-paragraph text summary.
    pub fn summary(&self) -> String {
        let cv = &self.cross_validation;
        format!(
            "self-test {}: {} atoms, {} vs {}: {:.2}% agreement ({} disagreements, {} boundary, {} unexplained); \
             exposure: {}/{} internal atoms with uncovered samples ({} samples each)",
            if self.passed { "passed" } else { "FAILED" },
            self.atom_count,
            self.reference_device,
            self.candidate_device,
            cv.agreement() * 100.0,
            cv.disagreements.len(),
            cv.boundary_count(),
            cv.unexplained_count(),
            self.exposure.violations.len(),
            self.exposure.tested,
            self.exposure.samples_per_atom,
        )
    }
}

/// Seeded random cluster: atoms uniformly distributed in a ball of
/// `cluster_radius`, elements drawn from a protein-like mix.
///
/// # Errors
///
/// Propagates trajectory construction errors.
pub fn synthetic_trajectory(
    options: &SelfTestOptions,
) -> Result<Trajectory, SurfaceError> {
    let mut rng = StdRng::seed_from_u64(options.seed);
    let records: Vec<AtomRecord> = (0..options.atom_count)
        .map(|_| {
            let element = SYNTHETIC_ELEMENTS[rng.random_range(0..SYNTHETIC_ELEMENTS.len())];
            let residue = SYNTHETIC_RESIDUES[rng.random_range(0..SYNTHETIC_RESIDUES.len())];
            let distance =
                options.cluster_radius * rng.random_range(0.0f32..1.0).cbrt();
            let position = sampling::random_direction(&mut rng) * distance;
            AtomRecord {
                element: element.to_owned(),
                residue: residue.to_owned(),
                positions: vec![position],
            }
        })
        .collect();
    Trajectory::from_records(&records, &AtomLut::new())
}

/// Compare `candidate` against `reference` over `atoms`.
///
/// Each disputed atom is re-tested with a dense direction set; disputes
/// whose exposed fraction is below `2 / direction_samples` are boundary
/// cases where the regular sampling legitimately cannot decide.
pub fn cross_validate(
    reference: &Classification,
    candidate: &Classification,
    atoms: &AtomSet<'_>,
    params: &SurfaceParams,
) -> CrossValidation {
    let atom_count = atoms.trajectory().atom_count();
    let reference_mask = reference.surface_mask(atom_count);
    let candidate_mask = candidate.surface_mask(atom_count);
    let grid = NeighborGrid::build(
        atoms.positions(),
        atoms.radii(),
        atoms.active(),
        params.probe_radius(),
    );
    let dense = sampling::sphere_directions(DENSE_SAMPLES);

    let mut agreeing = 0;
    let mut disagreements = Vec::new();
    for &atom in atoms.active() {
        let i = atom as usize;
        if reference_mask[i] == candidate_mask[i] {
            agreeing += 1;
            continue;
        }
        let uncovered = dense
            .iter()
            .filter(|&&d| !point_covered(atom, d, atoms, &grid, params))
            .count();
        disagreements.push(Disagreement {
            atom,
            reference_surface: reference_mask[i],
            exposed_fraction: uncovered as f32 / DENSE_SAMPLES as f32,
        });
    }

    CrossValidation {
        compared: atoms.len(),
        agreeing,
        disagreements,
        boundary_threshold: 2.0 / params.direction_samples() as f32,
    }
}

/// For every internal atom of `classification`, test `samples_per_atom`
/// random points on its extended sphere; every point must be covered by
/// another active atom.
pub fn exposure_test(
    atoms: &AtomSet<'_>,
    classification: &Classification,
    params: &SurfaceParams,
    seed: u64,
    samples_per_atom: u32,
) -> ExposureReport {
    let mut rng = StdRng::seed_from_u64(seed);
    let grid = NeighborGrid::build(
        atoms.positions(),
        atoms.radii(),
        atoms.active(),
        params.probe_radius(),
    );

    let violations = classification
        .internal
        .iter()
        .copied()
        .filter(|&atom| {
            (0..samples_per_atom).any(|_| {
                let d = sampling::random_direction(&mut rng);
                !point_covered(atom, d, atoms, &grid, params)
            })
        })
        .collect();

    ExposureReport {
        tested: classification.internal_count(),
        samples_per_atom,
        violations,
    }
}

/// Whether the point in direction `d` on `atom`'s extended sphere is
/// covered by another active atom.
fn point_covered(
    atom: u32,
    d: Vec3,
    atoms: &AtomSet<'_>,
    grid: &NeighborGrid,
    params: &SurfaceParams,
) -> bool {
    let positions = atoms.positions();
    let radii = atoms.radii();
    let probe = params.probe_radius();
    let point = positions[atom as usize] + d * (radii[atom as usize] + probe);
    let mut covered = false;
    grid.for_each_candidate(point, |other| {
        if !covered && other != atom {
            covered = covers(
                point,
                positions[other as usize],
                radii[other as usize] + probe,
            );
        }
    });
    covered
}
