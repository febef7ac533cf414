//! Layer removal: repeatedly peel the surface atoms and reclassify.

use super::{AtomSet, Classification, SurfaceClassifier, SurfaceParams};
use crate::error::SurfaceError;
use crate::molecule::Trajectory;

/// Outcome of [`peel_layers`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerPeel {
    /// Classification of the atoms left after peeling.
    pub classification: Classification,
    /// Layers actually removed (less than requested when the set ran empty).
    pub layers_removed: usize,
    /// Surface atom count of each removed layer, outermost first.
    pub removed_per_layer: Vec<usize>,
}

/// Classify all atoms of `frame`, then `layers` times drop the surface atoms
/// and classify the remaining internal set again.
///
/// Every pass rebuilds the neighbor grid on the shrunken set.
///
/// # Errors
///
/// Propagates configuration and backend errors from the classifier; no
/// partial result is returned.
pub fn peel_layers(
    classifier: &mut dyn SurfaceClassifier,
    trajectory: &Trajectory,
    frame: usize,
    params: &SurfaceParams,
    layers: usize,
) -> Result<LayerPeel, SurfaceError> {
    let all: Vec<u32> = (0..trajectory.atom_count() as u32).collect();
    let mut classification =
        classifier.classify(&AtomSet::new(trajectory, frame, &all)?, params)?;
    let mut removed_per_layer = Vec::with_capacity(layers);

    while removed_per_layer.len() < layers && !classification.input.is_empty() {
        removed_per_layer.push(classification.surface_count());
        let remaining = std::mem::take(&mut classification.internal);
        let atoms = AtomSet::new(trajectory, frame, &remaining)?;
        classification = classifier.classify(&atoms, params)?;
        log::debug!(
            "layer {}: {} atoms remain",
            removed_per_layer.len(),
            classification.input_count()
        );
    }

    Ok(LayerPeel {
        classification,
        layers_removed: removed_per_layer.len(),
        removed_per_layer,
    })
}

#[cfg(test)]
mod tests {
    use glam::{Vec3, Vec4};

    use super::*;
    use crate::surface::cpu::CpuClassifier;

    fn lattice_ball(radius: i32) -> Trajectory {
        let mut spheres = Vec::new();
        for x in -radius..=radius {
            for y in -radius..=radius {
                for z in -radius..=radius {
                    let p = Vec3::new(x as f32, y as f32, z as f32) * 1.4;
                    if p.length() <= radius as f32 * 1.4 {
                        spheres.push(p.extend(1.6));
                    }
                }
            }
        }
        Trajectory::from_spheres(&spheres)
    }

    #[test]
    fn zero_layers_is_a_plain_classification() {
        let traj = lattice_ball(3);
        let params = SurfaceParams::new(1.2, 100).unwrap();
        let mut cpu = CpuClassifier::new(2).unwrap();
        let peel = peel_layers(&mut cpu, &traj, 0, &params, 0).unwrap();
        assert_eq!(peel.layers_removed, 0);
        assert_eq!(peel.classification.input_count(), traj.atom_count());
        assert!(peel.classification.is_partition());
    }

    #[test]
    fn peeling_is_monotonic() {
        let traj = lattice_ball(4);
        let params = SurfaceParams::new(0.8, 100).unwrap();
        let mut cpu = CpuClassifier::new(4).unwrap();

        let mut previous = peel_layers(&mut cpu, &traj, 0, &params, 0)
            .unwrap()
            .classification
            .sorted();
        for k in 1..=3 {
            let current = peel_layers(&mut cpu, &traj, 0, &params, k)
                .unwrap()
                .classification
                .sorted();
            assert_eq!(current.input, previous.internal);
            assert!(current
                .internal
                .iter()
                .all(|i| previous.internal.binary_search(i).is_ok()));
            previous = current;
        }
    }

    #[test]
    fn peeling_stops_when_everything_is_gone() {
        let traj = Trajectory::from_spheres(&[
            Vec4::new(0.0, 0.0, 0.0, 1.5),
            Vec4::new(30.0, 0.0, 0.0, 1.5),
        ]);
        let params = SurfaceParams::new(1.2, 50).unwrap();
        let mut cpu = CpuClassifier::new(1).unwrap();
        let peel = peel_layers(&mut cpu, &traj, 0, &params, 5).unwrap();
        assert_eq!(peel.layers_removed, 1);
        assert_eq!(peel.removed_per_layer, vec![2]);
        assert_eq!(peel.classification, Classification::empty());
    }

    #[test]
    fn bad_frame_is_rejected_before_work() {
        let traj = lattice_ball(1);
        let params = SurfaceParams::new(1.2, 50).unwrap();
        let mut cpu = CpuClassifier::new(1).unwrap();
        let err = peel_layers(&mut cpu, &traj, 3, &params, 1).unwrap_err();
        assert!(err.is_configuration());
    }
}
