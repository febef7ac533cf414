//! Direction sets on the unit sphere.

use glam::Vec3;
use rand::Rng;

/// Golden angle in radians.
const GOLDEN_ANGLE: f32 = 2.399_963_2;

/// `count` near-uniform unit directions on a Fibonacci spiral.
///
/// Deterministic for a given count, so the CPU and GPU paths test exactly
/// the same points. Rows are offset by half a step, which keeps the poles
/// out of the set and makes `count == 1` well defined.
pub fn sphere_directions(count: u32) -> Vec<Vec3> {
    let n = count as f32;
    (0..count)
        .map(|i| {
            let y = 1.0 - (i as f32 + 0.5) * 2.0 / n;
            let ring = (1.0 - y * y).max(0.0).sqrt();
            let theta = GOLDEN_ANGLE * i as f32;
            Vec3::new(theta.cos() * ring, y, theta.sin() * ring)
        })
        .collect()
}

/// Uniformly distributed random unit direction.
pub fn random_direction(rng: &mut impl Rng) -> Vec3 {
    let z: f32 = rng.random_range(-1.0..=1.0);
    let phi: f32 = rng.random_range(0.0..std::f32::consts::TAU);
    let ring = (1.0 - z * z).max(0.0).sqrt();
    Vec3::new(ring * phi.cos(), ring * phi.sin(), z)
}

/// Directions packed as `vec4` for upload to a storage buffer.
pub fn to_gpu(directions: &[Vec3]) -> Vec<[f32; 4]> {
    directions.iter().map(|d| [d.x, d.y, d.z, 0.0]).collect()
}
